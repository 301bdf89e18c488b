pub mod conversion;
pub mod gps_fix;
pub mod nmea;
pub mod sample_window;
pub mod activity;
pub mod distance;
pub mod sensor;
pub mod position_stream;
pub mod ride_point;
pub mod statistics;
pub mod ride_tracker;
pub mod gpx_export;
