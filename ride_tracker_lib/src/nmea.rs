//! Parser for the two NMEA-style sentences the tracker consumes.
//!
//! `GGA` carries time, position, fix quality, satellite count and altitude.
//! `RMC` carries speed over ground and the date. Every other sentence is
//! rejected with [`ParseError::UnknownSentence`] so the caller can skip it.
//!
//! A sentence is decoded completely before anything is written to the
//! [`GpsFix`], so a failed sentence never leaves a half-applied update.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::{
    conversion::{knots_to_kmh, nmea_to_decimal, Hemisphere},
    gps_fix::GpsFix,
};

const GGA_FIELDS: usize = 15;
const RMC_FIELDS: usize = 10;

const GGA_TIME: usize = 1;
const GGA_LATITUDE: usize = 2;
const GGA_NS: usize = 3;
const GGA_LONGITUDE: usize = 4;
const GGA_EW: usize = 5;
const GGA_FIX_QUALITY: usize = 6;
const GGA_SATELLITES: usize = 7;
const GGA_ALTITUDE: usize = 9;

const RMC_SPEED_KNOTS: usize = 7;
const RMC_DATE: usize = 9;

/// Two-digit years are read as 20YY.
const CENTURY: i32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// Position and fix data.
    Gga,
    /// Course, speed and date.
    Rmc,
}

impl SentenceKind {
    fn detect(identifier: &str) -> Option<Self> {
        if identifier.contains("GGA") {
            Some(SentenceKind::Gga)
        } else if identifier.contains("RMC") {
            Some(SentenceKind::Rmc)
        } else {
            None
        }
    }

    pub fn required_fields(&self) -> usize {
        match self {
            SentenceKind::Gga => GGA_FIELDS,
            SentenceKind::Rmc => RMC_FIELDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("sentence does not start with '$'")]
    MissingPrefix,
    #[error("unrecognized sentence '{0}'")]
    UnknownSentence(String),
    #[error("{kind:?} sentence has {fields} fields, at least {required} required")]
    ShortSentence {
        kind: SentenceKind,
        fields: usize,
        required: usize,
    },
    #[error("{field} is not a valid number: '{value}'")]
    BadNumber { field: &'static str, value: String },
    #[error("invalid hemisphere '{0}'")]
    BadHemisphere(String),
    #[error("invalid UTC time '{0}'")]
    BadTime(String),
    #[error("invalid date '{0}'")]
    BadDate(String),
}

/// Parses one sentence into `fix`.
///
/// Empty fields keep the previous value, except fix quality and satellite
/// count, which fall back to 0.
pub fn parse_sentence(sentence: &str, fix: &mut GpsFix) -> Result<SentenceKind, ParseError> {
    let sentence = sentence.trim();
    if !sentence.starts_with('$') {
        return Err(ParseError::MissingPrefix);
    }

    let parts: Vec<&str> = sentence.split(',').collect();
    let identifier = parts[0];

    let Some(kind) = SentenceKind::detect(identifier) else {
        return Err(ParseError::UnknownSentence(identifier.to_string()));
    };

    if parts.len() < kind.required_fields() {
        return Err(ParseError::ShortSentence {
            kind,
            fields: parts.len(),
            required: kind.required_fields(),
        });
    }

    match kind {
        SentenceKind::Gga => GgaUpdate::decode(&parts)?.apply(fix),
        SentenceKind::Rmc => RmcUpdate::decode(&parts)?.apply(fix),
    }

    Ok(kind)
}

struct GgaUpdate {
    time_of_day: Option<NaiveTime>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    fix_quality: u8,
    satellites: u32,
    altitude: Option<f64>,
}

impl GgaUpdate {
    fn decode(parts: &[&str]) -> Result<Self, ParseError> {
        let time_of_day = non_empty(parts[GGA_TIME]).map(parse_time).transpose()?;
        let latitude = parse_coordinate(parts[GGA_LATITUDE], parts[GGA_NS], "latitude")?;
        let longitude = parse_coordinate(parts[GGA_LONGITUDE], parts[GGA_EW], "longitude")?;

        let fix_quality = non_empty(parts[GGA_FIX_QUALITY])
            .map(|value| parse_number(value, "fix quality"))
            .transpose()?
            .unwrap_or(0);
        let satellites = non_empty(parts[GGA_SATELLITES])
            .map(|value| parse_number(value, "satellite count"))
            .transpose()?
            .unwrap_or(0);

        let altitude = non_empty(parts[GGA_ALTITUDE])
            .map(|value| parse_number(value, "altitude"))
            .transpose()?;

        Ok(Self {
            time_of_day,
            latitude,
            longitude,
            fix_quality,
            satellites,
            altitude,
        })
    }

    fn apply(self, fix: &mut GpsFix) {
        if let Some(time) = self.time_of_day {
            fix.time_of_day = Some(time);
        }
        if let Some(latitude) = self.latitude {
            fix.latitude = Some(latitude);
        }
        if let Some(longitude) = self.longitude {
            fix.longitude = Some(longitude);
        }
        fix.fix_quality = self.fix_quality;
        fix.satellites = self.satellites;
        if let Some(altitude) = self.altitude {
            fix.altitude = Some(altitude);
        }
    }
}

struct RmcUpdate {
    speed_kmh: Option<f64>,
    date: Option<NaiveDate>,
}

impl RmcUpdate {
    fn decode(parts: &[&str]) -> Result<Self, ParseError> {
        let speed_kmh = non_empty(parts[RMC_SPEED_KNOTS])
            .map(|value| {
                let knots: f64 = parse_number(value, "speed over ground")?;
                if !knots.is_finite() || knots < 0.0 {
                    return Err(ParseError::BadNumber {
                        field: "speed over ground",
                        value: value.to_string(),
                    });
                }
                Ok(knots_to_kmh(knots))
            })
            .transpose()?;

        let date = non_empty(parts[RMC_DATE]).map(parse_date).transpose()?;

        Ok(Self { speed_kmh, date })
    }

    fn apply(self, fix: &mut GpsFix) {
        if let Some(speed) = self.speed_kmh {
            fix.speed_kmh = speed;
        }
        if let Some(date) = self.date {
            fix.date = Some(date);
        }
    }
}

fn non_empty(field: &str) -> Option<&str> {
    if field.is_empty() {
        None
    } else {
        Some(field)
    }
}

fn parse_number<T: core::str::FromStr>(value: &str, field: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::BadNumber {
        field,
        value: value.to_string(),
    })
}

/// A coordinate is only decoded when both the value and the hemisphere are present.
fn parse_coordinate(
    raw: &str,
    hemisphere: &str,
    field: &'static str,
) -> Result<Option<f64>, ParseError> {
    if raw.is_empty() || hemisphere.is_empty() {
        return Ok(None);
    }

    let hemisphere = Hemisphere::from_field(hemisphere)
        .ok_or_else(|| ParseError::BadHemisphere(hemisphere.to_string()))?;

    nmea_to_decimal(raw, hemisphere).map(Some).ok_or_else(|| ParseError::BadNumber {
        field,
        value: raw.to_string(),
    })
}

/// Splits the first six characters of a field into three two-digit numbers.
fn two_digit_triplet(field: &str) -> Option<(u32, u32, u32)> {
    let digits = field.get(..6)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((digits[0..2].parse().ok()?, digits[2..4].parse().ok()?, digits[4..6].parse().ok()?))
}

/// `HHMMSS[.sss]`, fractional seconds are dropped.
fn parse_time(field: &str) -> Result<NaiveTime, ParseError> {
    let bad_time = || ParseError::BadTime(field.to_string());
    let (hours, minutes, seconds) = two_digit_triplet(field).ok_or_else(bad_time)?;

    // Receivers report a leap second as second 60.
    let time = if seconds == 60 {
        NaiveTime::from_hms_milli_opt(hours, minutes, 59, 1_000)
    } else {
        NaiveTime::from_hms_opt(hours, minutes, seconds)
    };

    time.ok_or_else(bad_time)
}

/// `DDMMYY`, always in the 2000s.
fn parse_date(field: &str) -> Result<NaiveDate, ParseError> {
    let bad_date = || ParseError::BadDate(field.to_string());
    let (day, month, year) = two_digit_triplet(field).ok_or_else(bad_date)?;

    NaiveDate::from_ymd_opt(CENTURY + year as i32, month, day).ok_or_else(bad_date)
}
