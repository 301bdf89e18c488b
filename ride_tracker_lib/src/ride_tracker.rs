use std::{io::Write, path::Path};

use geo_types::Point;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    activity::{Activity, ActivityClassifier, ClassifierConfig},
    distance::DistanceAccumulator,
    gps_fix::{FixState, GpsFix},
    gpx_export::{export_gpx_to_file, write_gpx, ExportError, DEFAULT_TRACK_NAME},
    ride_point::RidePoint,
    sensor::SensorSample,
    statistics::{ActivityCounts, RideStatistics},
};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub classifier: ClassifierConfig,
    pub track_name: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            track_name: DEFAULT_TRACK_NAME.to_string(),
        }
    }
}

/// Turns fixes and motion samples into a labeled, distance-annotated track.
#[derive(Debug, Clone)]
pub struct RideTracker {
    track_name: String,
    classifier: ActivityClassifier,
    distance: DistanceAccumulator,
    track: Vec<RidePoint>,
    activity_counts: ActivityCounts,
    last_position: Option<Point>,
    fix_state: FixState,
}

impl RideTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            track_name: config.track_name,
            classifier: ActivityClassifier::new(config.classifier),
            distance: DistanceAccumulator::new(),
            track: Vec::new(),
            activity_counts: ActivityCounts::default(),
            last_position: None,
            fix_state: FixState::NoFix,
        }
    }

    /// Moves between `NoFix` and `FixAcquired` and returns the new state.
    pub fn observe_fix(&mut self, fix: &GpsFix) -> FixState {
        let state = fix.fix_state();
        if state != self.fix_state {
            match state {
                FixState::FixAcquired => tracing::info!(
                    "Fix acquired with {} satellites (quality {})",
                    fix.satellites,
                    fix.fix_quality
                ),
                FixState::NoFix => tracing::info!(
                    "Fix lost after {} points ({} satellites, quality {})",
                    self.track.len(),
                    fix.satellites,
                    fix.fix_quality
                ),
            }
            self.fix_state = state;
        }
        state
    }

    /// Feeds one sample into the classifier. Speed counts as zero without a fix.
    pub fn update_classifier(&mut self, fix: &GpsFix, sample: &SensorSample) -> Activity {
        let speed_kmh = if fix.has_fix() { fix.speed_kmh } else { 0.0 };
        self.classifier.add_sample(&sample.accel, &sample.gyro, speed_kmh);
        self.classifier.classify()
    }

    /// Appends a point for the current fix. Returns `None` without a fix or position.
    pub fn record_point(&mut self, fix: &GpsFix, sample: &SensorSample) -> Option<&RidePoint> {
        if self.observe_fix(fix) != FixState::FixAcquired {
            return None;
        }

        let Some(position) = fix.position() else {
            tracing::debug!("Fix without position, nothing to record");
            return None;
        };

        let activity = self.classifier.classify();
        let confidence = self.classifier.confidence();
        self.activity_counts.increment(activity);

        if let Some(previous) = self.last_position {
            self.distance.accumulate(previous, position);
        }

        self.track.push(RidePoint::new(
            fix,
            position,
            sample,
            self.distance.total_m(),
            activity,
            confidence,
        ));
        self.last_position = Some(position);

        self.track.last()
    }

    pub fn statistics(&self) -> Option<RideStatistics> {
        RideStatistics::compute(
            &self.track,
            self.distance.total_m(),
            &self.activity_counts,
            self.classifier.classify(),
        )
    }

    pub fn export_track<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        write_gpx(writer, &self.track_name, &self.track)?;
        tracing::info!("Exported {} points", self.track.len());
        Ok(())
    }

    pub fn export_track_to_file(&self, path: &Path) -> Result<(), ExportError> {
        export_gpx_to_file(path, &self.track_name, &self.track)?;
        tracing::info!("Exported {} points to {}", self.track.len(), path.display());
        Ok(())
    }

    /// Drops recorded points and totals. The classifier window is kept.
    pub fn clear_track(&mut self) {
        self.track.clear();
        self.activity_counts.clear();
        self.distance.reset();
        self.last_position = None;
    }

    pub fn points(&self) -> &[RidePoint] {
        &self.track
    }

    pub fn total_distance_m(&self) -> f64 {
        self.distance.total_m()
    }

    pub fn current_activity(&self) -> Activity {
        self.classifier.classify()
    }

    pub fn confidence(&self) -> u8 {
        self.classifier.confidence()
    }

    pub fn fix_state(&self) -> FixState {
        self.fix_state
    }

    pub fn classifier(&self) -> &ActivityClassifier {
        &self.classifier
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }
}

impl Default for RideTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
