#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{activity::Activity, ride_point::RidePoint};

/// Number of recorded points per activity label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    counts: [u64; Activity::ALL.len()],
}

impl ActivityCounts {
    pub fn increment(&mut self, activity: Activity) {
        self.counts[activity.index()] += 1;
    }

    pub fn get(&self, activity: Activity) -> u64 {
        self.counts[activity.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn clear(&mut self) {
        self.counts = Default::default();
    }
}

/// Share of recorded points per activity, in percent.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityBreakdown {
    pub idle: f64,
    pub walking: f64,
    pub riding: f64,
    pub initializing: f64,
}

impl ActivityBreakdown {
    pub fn from_counts(counts: &ActivityCounts, points: usize) -> Self {
        if points == 0 {
            return Self::default();
        }

        let percent = |activity: Activity| counts.get(activity) as f64 / points as f64 * 100.0;
        Self {
            idle: percent(Activity::Idle),
            walking: percent(Activity::Walking),
            riding: percent(Activity::Riding),
            initializing: percent(Activity::Initializing),
        }
    }

    pub fn get(&self, activity: Activity) -> f64 {
        match activity {
            Activity::Idle => self.idle,
            Activity::Walking => self.walking,
            Activity::Riding => self.riding,
            Activity::Initializing => self.initializing,
        }
    }
}

/// Summary of a ride so far. Derived on demand, never stored.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RideStatistics {
    pub points: usize,
    pub total_distance_m: f64,
    pub max_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub activity_breakdown: ActivityBreakdown,
    /// Live label from the classifier, not the label of the last point.
    pub current_activity: Activity,
}

impl RideStatistics {
    /// Returns `None` for an empty track.
    pub fn compute(
        track: &[RidePoint],
        total_distance_m: f64,
        counts: &ActivityCounts,
        current_activity: Activity,
    ) -> Option<Self> {
        if track.is_empty() {
            return None;
        }

        let max_speed_kmh = track.iter().map(|p| p.speed_kmh).fold(f64::MIN, f64::max);
        let avg_speed_kmh = track.iter().map(|p| p.speed_kmh).sum::<f64>() / track.len() as f64;

        Some(Self {
            points: track.len(),
            total_distance_m,
            max_speed_kmh,
            avg_speed_kmh,
            activity_breakdown: ActivityBreakdown::from_counts(counts, track.len()),
            current_activity,
        })
    }

    pub fn distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }
}
