use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use geo_types::Point;
use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{activity::Activity, gps_fix::GpsFix, sensor::SensorSample};

/// One recorded instant of a ride: where, when, how fast and doing what.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RidePoint {
    /// `x` is longitude, `y` is latitude.
    pub position: Point,
    pub altitude: Option<f64>,
    pub date: Option<NaiveDate>,
    pub time_of_day: Option<NaiveTime>,
    pub speed_kmh: f64,
    pub accel: Vector3<f64>,
    pub gyro: Vector3<f64>,
    /// Distance traveled since the first point, in meters.
    pub distance_m: f64,
    pub activity: Activity,
    pub confidence: u8,
}

impl RidePoint {
    pub fn new(
        fix: &GpsFix,
        position: Point,
        sample: &SensorSample,
        distance_m: f64,
        activity: Activity,
        confidence: u8,
    ) -> Self {
        Self {
            position,
            altitude: fix.altitude,
            date: fix.date,
            time_of_day: fix.time_of_day,
            speed_kmh: fix.speed_kmh,
            accel: sample.accel,
            gyro: sample.gyro,
            distance_m,
            activity,
            confidence,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match (self.date, self.time_of_day) {
            (Some(date), Some(time)) => Some(NaiveDateTime::new(date, time).and_utc()),
            _ => None,
        }
    }
}
