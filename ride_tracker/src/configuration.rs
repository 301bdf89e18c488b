use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context};
use ride_tracker_lib::{
    activity::ClassifierConfig,
    gpx_export::DEFAULT_TRACK_NAME,
    ride_tracker::TrackerConfig,
};
use serde::{Deserialize, Serialize};

/// Settings for one tracking run, read from a TOML file.
///
/// Every key is optional:
///
/// ```toml
/// record_interval_secs = 2.0
/// poll_interval_ms = 300
/// replay_record_every = 7
/// output = "ride.gpx"
///
/// [classifier]
/// window_size = 10
/// riding_min_speed = 8.0
///
/// [tracker]
/// track_name = "Ride Track with Activity"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Minimum wall-clock time between recorded points in live mode.
    pub record_interval_secs: f64,
    /// Sleep between polls in live mode.
    pub poll_interval_ms: u64,
    /// Polls between recorded points in replay mode.
    pub replay_record_every: u32,
    pub output: Option<PathBuf>,
    pub classifier: ClassifierConfig,
    pub tracker: TrackerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSection {
    pub track_name: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            record_interval_secs: 2.0,
            poll_interval_ms: 300,
            replay_record_every: 7,
            output: None,
            classifier: ClassifierConfig::default(),
            tracker: TrackerSection::default(),
        }
    }
}

impl Default for TrackerSection {
    fn default() -> Self {
        Self {
            track_name: DEFAULT_TRACK_NAME.to_string(),
        }
    }
}

const DEFAULT_RECORD_INTERVAL: Duration = Duration::from_secs(2);

impl Configuration {
    /// Parses and validates a TOML document.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Checks the values serde cannot: ranges and cross-field limits.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.record_interval_secs.is_finite() && self.record_interval_secs >= 0.0,
            "record_interval_secs must be a non-negative number of seconds, got {}",
            self.record_interval_secs
        );
        ensure!(
            Duration::try_from_secs_f64(self.record_interval_secs).is_ok(),
            "record_interval_secs is too large: {}",
            self.record_interval_secs
        );
        ensure!(self.classifier.window_size > 0, "classifier.window_size must be at least 1");
        ensure!(
            self.classifier.min_samples <= self.classifier.window_size,
            "classifier.min_samples ({}) exceeds classifier.window_size ({})",
            self.classifier.min_samples,
            self.classifier.window_size
        );
        Ok(())
    }

    /// Falls back to 2 s for values [`validate`](Self::validate) rejects.
    pub fn record_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.record_interval_secs).unwrap_or(DEFAULT_RECORD_INTERVAL)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            classifier: self.classifier.clone(),
            track_name: self.tracker.track_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Configuration::parse("").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.record_interval(), Duration::from_secs(2));
        assert_eq!(config.poll_interval(), Duration::from_millis(300));
        assert_eq!(config.tracker_config(), TrackerConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Configuration::parse(
            r#"
            replay_record_every = 1
            output = "out/ride.gpx"

            [classifier]
            window_size = 20
            riding_min_speed = 12.5

            [tracker]
            track_name = "Evening commute"
            "#,
        )
        .unwrap();

        assert_eq!(config.replay_record_every, 1);
        assert_eq!(config.output, Some(PathBuf::from("out/ride.gpx")));
        assert_eq!(config.classifier.window_size, 20);
        assert_eq!(config.classifier.riding_min_speed, 12.5);
        assert_eq!(config.classifier.min_samples, ClassifierConfig::default().min_samples);
        assert_eq!(config.poll_interval_ms, 300);
        assert_eq!(config.tracker_config().track_name, "Evening commute");
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(Configuration::parse("poll_interval_ms = \"fast\"").is_err());
    }

    #[test]
    fn rejects_unusable_record_interval() {
        for value in ["inf", "nan", "-1.0", "1e30"] {
            let text = format!("record_interval_secs = {}", value);
            let err = Configuration::parse(&text).unwrap_err();
            assert!(err.to_string().contains("record_interval_secs"), "{}: {}", value, err);
        }

        let config = Configuration {
            record_interval_secs: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(config.record_interval(), Duration::from_secs(2));
    }

    #[test]
    fn rejects_window_smaller_than_min_samples() {
        let err = Configuration::parse("[classifier]\nwindow_size = 2").unwrap_err();
        assert!(err.to_string().contains("min_samples"));

        let err =
            Configuration::parse("[classifier]\nwindow_size = 0\nmin_samples = 0").unwrap_err();
        assert!(err.to_string().contains("window_size"));

        let config =
            Configuration::parse("[classifier]\nwindow_size = 2\nmin_samples = 2").unwrap();
        assert_eq!(config.classifier.window_size, 2);
    }

    #[test]
    fn load_reports_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ride.toml");
        std::fs::write(&path, "record_interval_secs = -5.0\n").unwrap();

        let err = Configuration::load(&path).unwrap_err();
        assert!(err.to_string().contains("ride.toml"));
        assert!(format!("{:#}", err).contains("record_interval_secs"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Configuration::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
