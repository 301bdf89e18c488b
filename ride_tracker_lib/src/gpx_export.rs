//! GPX 1.1 export of a recorded track.
//!
//! Each point carries position, elevation, UTC time and two extension
//! elements: the activity label and the speed in km/h.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use thiserror::Error;

use crate::ride_point::RidePoint;

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const CREATOR: &str = "ride_tracker";

pub const DEFAULT_TRACK_NAME: &str = "Ride Track with Activity";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write track: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode track: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for ExportError {
    fn from(err: quick_xml::Error) -> Self {
        ExportError::Xml(err.to_string())
    }
}

/// Writes `points` as a single-segment GPX track.
pub fn write_gpx<W: Write>(
    output: W,
    track_name: &str,
    points: &[RidePoint],
) -> Result<W, ExportError> {
    let mut writer = Writer::new_with_indent(output, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut gpx = BytesStart::new("gpx");
    gpx.push_attribute(("version", "1.1"));
    gpx.push_attribute(("creator", CREATOR));
    gpx.push_attribute(("xmlns", GPX_NAMESPACE));
    writer.write_event(Event::Start(gpx))?;

    writer.write_event(Event::Start(BytesStart::new("trk")))?;
    write_element(&mut writer, "name", track_name)?;
    writer.write_event(Event::Start(BytesStart::new("trkseg")))?;

    for point in points {
        write_track_point(&mut writer, point)?;
    }

    writer.write_event(Event::End(BytesEnd::new("trkseg")))?;
    writer.write_event(Event::End(BytesEnd::new("trk")))?;
    writer.write_event(Event::End(BytesEnd::new("gpx")))?;

    let mut output = writer.into_inner();
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(output)
}

/// Creates (or truncates) `path` and writes the track to it.
pub fn export_gpx_to_file(
    path: &Path,
    track_name: &str,
    points: &[RidePoint],
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_gpx(BufWriter::new(file), track_name, points)?;
    Ok(())
}

fn write_track_point<W: Write>(
    writer: &mut Writer<W>,
    point: &RidePoint,
) -> Result<(), ExportError> {
    let latitude = point.latitude().to_string();
    let longitude = point.longitude().to_string();

    let mut trkpt = BytesStart::new("trkpt");
    trkpt.push_attribute(("lat", latitude.as_str()));
    trkpt.push_attribute(("lon", longitude.as_str()));
    writer.write_event(Event::Start(trkpt))?;

    if let Some(altitude) = point.altitude {
        write_element(writer, "ele", &altitude.to_string())?;
    }

    if let (Some(date), Some(time)) = (point.date, point.time_of_day) {
        let timestamp = format!("{}T{}Z", date.format("%Y-%m-%d"), time.format("%H:%M:%S"));
        write_element(writer, "time", &timestamp)?;
    }

    writer.write_event(Event::Start(BytesStart::new("extensions")))?;
    write_element(writer, "activity", point.activity.as_str())?;
    write_element(writer, "speed", &format!("{:.2}", point.speed_kmh))?;
    writer.write_event(Event::End(BytesEnd::new("extensions")))?;

    writer.write_event(Event::End(BytesEnd::new("trkpt")))?;
    Ok(())
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), ExportError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
