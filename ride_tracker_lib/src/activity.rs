//! Rider activity classification.
//!
//! The classifier keeps a short window of motion statistics and labels the
//! rider from the window averages. The rules are evaluated in a fixed order
//! and the first match wins:
//!
//! 1. slow, smooth and still: idle
//! 2. walking pace: walking when the steps show up in the acceleration, or
//!    when the pace is clearly below riding speed
//! 3. riding pace: riding
//! 4. vigorous motion without a clear pace: riding above walking pace, else walking
//! 5. idle

use core::fmt;

use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::sample_window::SampleWindow;

/// Earth gravity in g, removed from the acceleration magnitude.
const GRAVITY_G: f64 = 1.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Activity {
    Idle,
    Walking,
    Riding,
    /// Not enough samples in the window yet.
    Initializing,
}

impl Activity {
    pub const ALL: [Activity; 4] = [
        Activity::Idle,
        Activity::Walking,
        Activity::Riding,
        Activity::Initializing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Idle => "IDLE",
            Activity::Walking => "WALKING",
            Activity::Riding => "RIDING",
            Activity::Initializing => "INITIALIZING",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Activity::Idle => 0,
            Activity::Walking => 1,
            Activity::Riding => 2,
            Activity::Initializing => 3,
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for the activity rules. Speeds are in km/h, acceleration
/// deviations in g and rotation rates in deg/s.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Number of samples kept in the rolling window.
    pub window_size: usize,
    /// Minimum samples before a label other than `Initializing` is produced.
    pub min_samples: usize,

    pub idle_max_speed: f64,
    pub idle_max_accel_deviation: f64,
    pub idle_max_gyro: f64,

    pub walking_min_speed: f64,
    /// Variance of the acceleration deviation that indicates footsteps.
    pub walking_step_variance: f64,
    pub walking_step_deviation: f64,
    /// Below this pace, walking speed alone decides.
    pub walking_max_speed: f64,

    pub riding_min_speed: f64,

    /// Motion that is vigorous regardless of speed.
    pub motion_accel_deviation: f64,
    pub motion_gyro: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_samples: 3,
            idle_max_speed: 1.0,
            idle_max_accel_deviation: 0.15,
            idle_max_gyro: 10.0,
            walking_min_speed: 1.0,
            walking_step_variance: 0.01,
            walking_step_deviation: 0.1,
            walking_max_speed: 6.0,
            riding_min_speed: 8.0,
            motion_accel_deviation: 0.2,
            motion_gyro: 30.0,
        }
    }
}

/// One entry of the rolling window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSample {
    /// `| |a| - 1 g |`
    pub accel_deviation: f64,
    pub gyro_magnitude: f64,
    pub speed_kmh: f64,
}

impl MotionSample {
    pub fn from_readings(accel: &Vector3<f64>, gyro: &Vector3<f64>, speed_kmh: f64) -> Self {
        Self {
            accel_deviation: (accel.norm() - GRAVITY_G).abs(),
            gyro_magnitude: gyro.norm(),
            speed_kmh,
        }
    }
}

/// Window statistics the rules are evaluated on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFeatures {
    pub samples: usize,
    pub avg_speed: f64,
    pub avg_accel_deviation: f64,
    pub avg_gyro: f64,
    /// Population variance of the acceleration deviation.
    pub accel_variance: f64,
}

impl WindowFeatures {
    fn compute(samples: &[MotionSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let avg_speed = samples.iter().map(|s| s.speed_kmh).sum::<f64>() / n;
        let avg_accel_deviation = samples.iter().map(|s| s.accel_deviation).sum::<f64>() / n;
        let avg_gyro = samples.iter().map(|s| s.gyro_magnitude).sum::<f64>() / n;
        let accel_variance = samples
            .iter()
            .map(|s| (s.accel_deviation - avg_accel_deviation).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            samples: samples.len(),
            avg_speed,
            avg_accel_deviation,
            avg_gyro,
            accel_variance,
        })
    }

    /// Applies the activity rules in order.
    pub fn decide(&self, config: &ClassifierConfig) -> Activity {
        let speed = self.avg_speed;

        if speed < config.idle_max_speed
            && self.avg_accel_deviation < config.idle_max_accel_deviation
            && self.avg_gyro < config.idle_max_gyro
        {
            return Activity::Idle;
        }

        if speed >= config.walking_min_speed && speed < config.riding_min_speed {
            let steps = self.accel_variance > config.walking_step_variance
                && self.avg_accel_deviation > config.walking_step_deviation;
            if steps || speed < config.walking_max_speed {
                return Activity::Walking;
            }
        }

        if speed >= config.riding_min_speed {
            return Activity::Riding;
        }

        if self.avg_accel_deviation > config.motion_accel_deviation
            || self.avg_gyro > config.motion_gyro
        {
            return if speed > config.walking_max_speed {
                Activity::Riding
            } else {
                Activity::Walking
            };
        }

        Activity::Idle
    }
}

#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    config: ClassifierConfig,
    window: SampleWindow<MotionSample>,
}

impl ActivityClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let window = SampleWindow::new(config.window_size);
        Self { config, window }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Adds one reading. Acceleration in g, rotation in deg/s, speed in km/h.
    pub fn add_sample(&mut self, accel: &Vector3<f64>, gyro: &Vector3<f64>, speed_kmh: f64) {
        self.window.push(MotionSample::from_readings(accel, gyro, speed_kmh));
    }

    pub fn features(&self) -> Option<WindowFeatures> {
        let samples: Vec<MotionSample> = self.window.iter().collect();
        WindowFeatures::compute(&samples)
    }

    pub fn classify(&self) -> Activity {
        if self.window.len() < self.config.min_samples {
            return Activity::Initializing;
        }

        match self.features() {
            Some(features) => features.decide(&self.config),
            None => Activity::Initializing,
        }
    }

    /// Window fill in percent. This says nothing about how certain the label is.
    pub fn confidence(&self) -> u8 {
        (self.window.len() * 100 / self.window.capacity()).min(100) as u8
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright(deviation: f64) -> Vector3<f64> {
        Vector3::new(0.0, 0.0, 1.0 + deviation)
    }

    fn spin(rate: f64) -> Vector3<f64> {
        Vector3::new(rate, 0.0, 0.0)
    }

    fn features(
        avg_speed: f64,
        avg_accel_deviation: f64,
        avg_gyro: f64,
        accel_variance: f64,
    ) -> WindowFeatures {
        WindowFeatures {
            samples: 10,
            avg_speed,
            avg_accel_deviation,
            avg_gyro,
            accel_variance,
        }
    }

    #[test]
    fn stationary_rider_is_idle_with_full_confidence() {
        let mut classifier = ActivityClassifier::default();
        for _ in 0..10 {
            classifier.add_sample(&upright(0.02), &spin(2.0), 0.2);
        }

        assert_eq!(classifier.classify(), Activity::Idle);
        assert_eq!(classifier.confidence(), 100);
    }

    #[test]
    fn steady_fast_motion_is_riding() {
        let mut classifier = ActivityClassifier::default();
        for i in 0..10 {
            let speed = 8.0 + 4.0 * i as f64 / 9.0;
            classifier.add_sample(&upright(0.01), &spin(5.0), speed);
        }

        assert_eq!(classifier.classify(), Activity::Riding);
    }

    #[test]
    fn needs_three_samples() {
        let mut classifier = ActivityClassifier::default();
        assert_eq!(classifier.classify(), Activity::Initializing);

        classifier.add_sample(&upright(0.5), &spin(50.0), 20.0);
        classifier.add_sample(&upright(0.5), &spin(50.0), 20.0);
        assert_eq!(classifier.classify(), Activity::Initializing);

        classifier.add_sample(&upright(0.5), &spin(50.0), 20.0);
        assert_eq!(classifier.classify(), Activity::Riding);
    }

    #[test]
    fn confidence_tracks_window_fill() {
        let mut classifier = ActivityClassifier::default();
        assert_eq!(classifier.confidence(), 0);

        for expected in [10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 100, 100] {
            classifier.add_sample(&upright(0.0), &spin(0.0), 0.0);
            assert_eq!(classifier.confidence(), expected);
        }
    }

    #[test]
    fn same_samples_give_same_result() {
        let samples: Vec<(f64, f64, f64)> = (0..25)
            .map(|i| {
                let i = i as f64;
                ((i * 0.37).sin().abs() * 0.4, (i * 1.3).cos().abs() * 40.0, (i * 0.5) % 14.0)
            })
            .collect();

        let mut first = ActivityClassifier::default();
        let mut second = ActivityClassifier::default();
        for (deviation, rate, speed) in &samples {
            first.add_sample(&upright(*deviation), &spin(*rate), *speed);
            second.add_sample(&upright(*deviation), &spin(*rate), *speed);
            assert_eq!(first.classify(), second.classify());
            assert_eq!(first.confidence(), second.confidence());
        }
    }

    #[test]
    fn old_samples_fall_out_of_the_window() {
        let mut classifier = ActivityClassifier::default();
        for _ in 0..10 {
            classifier.add_sample(&upright(0.05), &spin(5.0), 15.0);
        }
        assert_eq!(classifier.classify(), Activity::Riding);

        for _ in 0..10 {
            classifier.add_sample(&upright(0.01), &spin(1.0), 0.0);
        }
        assert_eq!(classifier.classify(), Activity::Idle);
        assert_eq!(classifier.sample_count(), 10);
    }

    #[test]
    fn footsteps_make_walking_at_brisk_pace() {
        let mut classifier = ActivityClassifier::default();
        for i in 0..10 {
            let deviation = if i % 2 == 0 { 0.35 } else { 0.05 };
            classifier.add_sample(&upright(deviation), &spin(15.0), 7.0);
        }

        let features = classifier.features().unwrap();
        assert!(features.accel_variance > 0.01);
        assert!(features.avg_accel_deviation > 0.1);
        assert_eq!(classifier.classify(), Activity::Walking);
    }

    #[test]
    fn rule_order_at_boundaries() {
        let config = ClassifierConfig::default();

        // Rule 1
        assert_eq!(features(0.99, 0.1, 9.0, 0.0).decide(&config), Activity::Idle);
        // Slow but shaking: falls to rule 4
        assert_eq!(features(0.5, 0.3, 5.0, 0.0).decide(&config), Activity::Walking);
        // Rule 2, pace alone
        assert_eq!(features(1.0, 0.0, 0.0, 0.0).decide(&config), Activity::Walking);
        assert_eq!(features(5.99, 0.0, 0.0, 0.0).decide(&config), Activity::Walking);
        // Rule 2 falls through at 6..8 km/h without footsteps
        assert_eq!(features(6.0, 0.0, 0.0, 0.0).decide(&config), Activity::Idle);
        assert_eq!(features(7.5, 0.05, 35.0, 0.0).decide(&config), Activity::Riding);
        assert_eq!(features(7.5, 0.25, 0.0, 0.005).decide(&config), Activity::Riding);
        // Rule 2 with footsteps
        assert_eq!(features(7.5, 0.25, 0.0, 0.02).decide(&config), Activity::Walking);
        // Rule 3
        assert_eq!(features(8.0, 0.0, 0.0, 0.0).decide(&config), Activity::Riding);
        assert_eq!(features(30.0, 0.5, 100.0, 1.0).decide(&config), Activity::Riding);
    }

    #[test]
    fn reset_returns_to_initializing() {
        let mut classifier = ActivityClassifier::default();
        for _ in 0..5 {
            classifier.add_sample(&upright(0.0), &spin(0.0), 0.0);
        }
        classifier.reset();
        assert_eq!(classifier.classify(), Activity::Initializing);
        assert_eq!(classifier.confidence(), 0);
    }

    #[test]
    fn labels_display_upper_case() {
        assert_eq!(Activity::Idle.to_string(), "IDLE");
        assert_eq!(Activity::Initializing.to_string(), "INITIALIZING");
    }
}
