use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use geo_types::Point;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MIN_FIX_SATELLITES: u32 = 3;

/// Latest known receiver state.
///
/// Updated in place by the sentence parser. Values are never cleared, so a
/// field keeps its last decoded value until a sentence carries a new one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpsFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Meters above mean sea level.
    pub altitude: Option<f64>,
    pub time_of_day: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub fix_quality: u8,
    pub satellites: u32,
    pub speed_kmh: f64,
}

impl GpsFix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_fix(&self) -> bool {
        self.fix_quality > 0 && self.satellites >= MIN_FIX_SATELLITES
    }

    /// Current position as `(x: longitude, y: latitude)`, if both are known.
    pub fn position(&self) -> Option<Point> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match (self.date, self.time_of_day) {
            (Some(date), Some(time)) => Some(NaiveDateTime::new(date, time).and_utc()),
            _ => None,
        }
    }

    /// `HH:MM:SS`
    pub fn time_string(&self) -> Option<String> {
        self.time_of_day.map(|t| t.format("%H:%M:%S").to_string())
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> Option<String> {
        self.date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn fix_state(&self) -> FixState {
        if self.has_fix() {
            FixState::FixAcquired
        } else {
            FixState::NoFix
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixState {
    #[default]
    NoFix,
    FixAcquired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_fix_requires_quality_and_three_satellites() {
        for quality in 0..=3u8 {
            for satellites in 0..=5u32 {
                let fix = GpsFix {
                    fix_quality: quality,
                    satellites,
                    ..Default::default()
                };
                let expected = quality > 0 && satellites >= 3;
                assert_eq!(fix.has_fix(), expected, "q={quality} s={satellites}");
                assert_eq!(fix.fix_state() == FixState::FixAcquired, fix.has_fix());
            }
        }
    }

    #[test]
    fn position_needs_both_coordinates() {
        let mut fix = GpsFix::new();
        fix.latitude = Some(48.1173);
        assert!(fix.position().is_none());

        fix.longitude = Some(11.516667);
        let point = fix.position().unwrap();
        assert_eq!(point.x(), 11.516667);
        assert_eq!(point.y(), 48.1173);
    }

    #[test]
    fn formats_time_and_date() {
        let fix = GpsFix {
            time_of_day: NaiveTime::from_hms_opt(12, 35, 19),
            date: NaiveDate::from_ymd_opt(2024, 3, 23),
            ..Default::default()
        };

        assert_eq!(fix.time_string().as_deref(), Some("12:35:19"));
        assert_eq!(fix.date_string().as_deref(), Some("2024-03-23"));
        assert_eq!(fix.timestamp().unwrap().to_rfc3339(), "2024-03-23T12:35:19+00:00");
    }
}
