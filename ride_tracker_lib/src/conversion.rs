//! Degree and unit conversions shared by the parser, the sensor drivers and the exporter.

pub const KNOTS_TO_KMH: f64 = 1.852;

/// LSB per g at the ±2 g range.
pub const ACCEL_SENSITIVITY: f64 = 16384.0;
/// LSB per deg/s at the ±250 deg/s range.
pub const GYRO_SENSITIVITY: f64 = 131.0;

pub const TEMPERATURE_SENSITIVITY: f64 = 340.0;
pub const TEMPERATURE_OFFSET: f64 = 36.53;

/// Decimal places kept for decoded coordinates.
pub const COORDINATE_PRECISION: i32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "N" => Some(Hemisphere::North),
            "S" => Some(Hemisphere::South),
            "E" => Some(Hemisphere::East),
            "W" => Some(Hemisphere::West),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hemisphere::North => "N",
            Hemisphere::South => "S",
            Hemisphere::East => "E",
            Hemisphere::West => "W",
        }
    }

    /// Width of the degree prefix in the raw `DDMM.MMMM` / `DDDMM.MMMM` field.
    pub fn degree_digits(&self) -> usize {
        match self {
            Hemisphere::North | Hemisphere::South => 2,
            Hemisphere::East | Hemisphere::West => 3,
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Converts a raw `DDMM.MMMM` (north/south) or `DDDMM.MMMM` (east/west) field
/// to signed decimal degrees rounded to six places.
pub fn nmea_to_decimal(raw: &str, hemisphere: Hemisphere) -> Option<f64> {
    let digits = hemisphere.degree_digits();

    let degrees: u32 = raw.get(..digits)?.parse().ok()?;
    let minutes: f64 = raw.get(digits..)?.parse().ok()?;
    if !minutes.is_finite() {
        return None;
    }

    let decimal = degrees as f64 + minutes / 60.0;
    let decimal = if hemisphere.is_negative() { -decimal } else { decimal };

    Some(round_to(decimal, COORDINATE_PRECISION))
}

/// Encodes signed decimal degrees as a raw coordinate field plus hemisphere.
///
/// Minutes are written with six decimals (high precision receiver output) so
/// that decoding reproduces a six-decimal coordinate.
pub fn decimal_to_nmea(value: f64, axis: Axis) -> (String, Hemisphere) {
    let hemisphere = match (axis, value < 0.0) {
        (Axis::Latitude, false) => Hemisphere::North,
        (Axis::Latitude, true) => Hemisphere::South,
        (Axis::Longitude, false) => Hemisphere::East,
        (Axis::Longitude, true) => Hemisphere::West,
    };

    // Work in whole micro-minutes so a value like 59.9999999' carries into the degrees.
    let micro_minutes = (value.abs() * 60.0 * 1e6).round() as u64;
    let degrees = micro_minutes / 60_000_000;
    let minutes = (micro_minutes % 60_000_000) as f64 / 1e6;

    let raw = match axis {
        Axis::Latitude => format!("{:02}{:09.6}", degrees, minutes),
        Axis::Longitude => format!("{:03}{:09.6}", degrees, minutes),
    };

    (raw, hemisphere)
}

pub fn knots_to_kmh(knots: f64) -> f64 {
    knots * KNOTS_TO_KMH
}

/// Joins a big-endian register pair into a signed 16-bit reading.
pub fn register_pair_to_i16(high: u8, low: u8) -> i16 {
    i16::from_be_bytes([high, low])
}

pub fn raw_accel_to_g(raw: i16) -> f64 {
    raw as f64 / ACCEL_SENSITIVITY
}

pub fn raw_gyro_to_dps(raw: i16) -> f64 {
    raw as f64 / GYRO_SENSITIVITY
}

pub fn raw_temperature_to_celsius(raw: i16) -> f64 {
    raw as f64 / TEMPERATURE_SENSITIVITY + TEMPERATURE_OFFSET
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn decodes_north_latitude() {
        let lat = nmea_to_decimal("4807.038", Hemisphere::North).unwrap();
        assert_abs_diff_eq!(lat, 48.1173, epsilon = 1e-6);
    }

    #[test]
    fn decodes_east_longitude_with_three_degree_digits() {
        let lon = nmea_to_decimal("01131.000", Hemisphere::East).unwrap();
        assert_abs_diff_eq!(lon, 11.516667, epsilon = 1e-6);
    }

    #[test]
    fn south_and_west_are_negative() {
        assert!(nmea_to_decimal("3351.000", Hemisphere::South).unwrap() < 0.0);
        assert!(nmea_to_decimal("15112.500", Hemisphere::West).unwrap() < 0.0);
        assert!(nmea_to_decimal("0000.000", Hemisphere::West).unwrap() <= 0.0);
    }

    #[test]
    fn rejects_truncated_fields() {
        assert_eq!(nmea_to_decimal("48", Hemisphere::North), None);
        assert_eq!(nmea_to_decimal("4", Hemisphere::North), None);
        assert_eq!(nmea_to_decimal("48x7.0", Hemisphere::North), None);
        assert_eq!(nmea_to_decimal("", Hemisphere::East), None);
    }

    #[test]
    fn encode_then_decode_reproduces_coordinates() {
        let coordinates = [
            (48.117300, 11.516667),
            (-33.856784, 151.215297),
            (0.000001, -0.000001),
            (-89.999999, -179.999999),
            (51.477928, -0.001545),
        ];

        for (lat, lon) in coordinates {
            let (raw_lat, ns) = decimal_to_nmea(lat, Axis::Latitude);
            let (raw_lon, ew) = decimal_to_nmea(lon, Axis::Longitude);

            assert_abs_diff_eq!(nmea_to_decimal(&raw_lat, ns).unwrap(), lat, epsilon = 1e-6);
            assert_abs_diff_eq!(nmea_to_decimal(&raw_lon, ew).unwrap(), lon, epsilon = 1e-6);
        }
    }

    #[test]
    fn encoding_carries_full_minutes_into_degrees() {
        let (raw, hemisphere) = decimal_to_nmea(47.99999999999, Axis::Latitude);
        assert_eq!(raw, "4800.000000");
        assert_eq!(hemisphere, Hemisphere::North);
    }

    #[test]
    fn converts_sensor_units() {
        assert_abs_diff_eq!(knots_to_kmh(10.0), 18.52, epsilon = 1e-9);
        assert_abs_diff_eq!(raw_accel_to_g(16384), 1.0);
        assert_abs_diff_eq!(raw_accel_to_g(-8192), -0.5);
        assert_abs_diff_eq!(raw_gyro_to_dps(131), 1.0);
        assert_abs_diff_eq!(raw_temperature_to_celsius(0), 36.53);
    }

    #[test]
    fn joins_register_pairs_as_twos_complement() {
        assert_eq!(register_pair_to_i16(0x40, 0x00), 16384);
        assert_eq!(register_pair_to_i16(0xFF, 0xFF), -1);
        assert_eq!(register_pair_to_i16(0x80, 0x00), i16::MIN);
    }
}
