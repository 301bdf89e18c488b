//! Recorded inputs: an NMEA log in place of the receiver and a CSV of motion
//! readings in place of the IMU.

use std::{
    convert::Infallible,
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use nalgebra::Vector3;
use ride_tracker_lib::{
    conversion::TEMPERATURE_OFFSET,
    position_stream::PositionStream,
    sensor::{MotionSensor, SensorSample},
};
use thiserror::Error;

/// Serves the lines of a reader, one per poll.
pub struct LogPositionStream<R: BufRead> {
    reader: R,
    pending: Option<Vec<u8>>,
    exhausted: bool,
    lines_read: u64,
}

impl LogPositionStream<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LogPositionStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: None,
            exhausted: false,
            lines_read: 0,
        }
    }

    /// True once every line has been taken. Reads ahead one line to find out.
    pub fn is_exhausted(&mut self) -> io::Result<bool> {
        self.fill()?;
        Ok(self.exhausted && self.pending.is_none())
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.pending.is_some() || self.exhausted {
            return Ok(());
        }

        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            self.exhausted = true;
        } else {
            self.pending = Some(line);
        }
        Ok(())
    }
}

impl<R: BufRead> PositionStream for LogPositionStream<R> {
    type Error = io::Error;

    fn available(&mut self) -> Result<bool, Self::Error> {
        self.fill()?;
        Ok(self.pending.is_some())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        self.fill()?;
        let line = self.pending.take();
        if line.is_some() {
            self.lines_read += 1;
        }
        Ok(line)
    }
}

#[derive(Debug, Error)]
pub enum MotionLogError {
    #[error("could not read motion log: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: expected 6 or 7 columns, found {found}")]
    ColumnCount { row: usize, found: usize },
    #[error("row {row}: bad value {value:?}")]
    BadValue { row: usize, value: String },
    #[error("motion log has no rows")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MotionRow {
    sample: SensorSample,
    temperature: Option<f64>,
}

/// Replays `ax,ay,az,gx,gy,gz[,temp]` rows, wrapping around at the end.
///
/// Lines starting with `#` are skipped. Acceleration is in g, rotation in
/// deg/s and temperature in °C.
#[derive(Debug, Clone)]
pub struct CsvMotionSensor {
    rows: Vec<MotionRow>,
    next: usize,
}

impl CsvMotionSensor {
    pub fn open(path: &Path) -> Result<Self, MotionLogError> {
        Self::from_reader(File::open(path).map_err(csv::Error::from)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MotionLogError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (index, record) in csv.records().enumerate() {
            rows.push(parse_row(index + 1, &record?)?);
        }

        if rows.is_empty() {
            return Err(MotionLogError::Empty);
        }
        tracing::debug!("Loaded {} motion rows", rows.len());

        Ok(Self { rows, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn current(&self) -> &MotionRow {
        &self.rows[self.next]
    }
}

fn parse_row(row: usize, record: &csv::StringRecord) -> Result<MotionRow, MotionLogError> {
    if record.len() != 6 && record.len() != 7 {
        return Err(MotionLogError::ColumnCount { row, found: record.len() });
    }

    let mut values = [0.0; 7];
    for (slot, field) in values.iter_mut().zip(record.iter()) {
        *slot = field.parse().map_err(|_| MotionLogError::BadValue {
            row,
            value: field.to_string(),
        })?;
    }

    Ok(MotionRow {
        sample: SensorSample::new(
            Vector3::new(values[0], values[1], values[2]),
            Vector3::new(values[3], values[4], values[5]),
        ),
        temperature: (record.len() == 7).then_some(values[6]),
    })
}

impl MotionSensor for CsvMotionSensor {
    type Error = Infallible;

    fn read_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.current().sample.accel)
    }

    fn read_angular_rate(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(self.current().sample.gyro)
    }

    fn read_temperature(&mut self) -> Result<f64, Self::Error> {
        Ok(self.current().temperature.unwrap_or(TEMPERATURE_OFFSET))
    }

    /// Returns the current row and moves on to the next.
    fn read_sample(&mut self) -> Result<SensorSample, Self::Error> {
        let sample = self.current().sample;
        self.next = (self.next + 1) % self.rows.len();
        Ok(sample)
    }
}

/// A sensor lying still: 1 g on z, no rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationaryMotionSensor;

impl MotionSensor for StationaryMotionSensor {
    type Error = Infallible;

    fn read_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(SensorSample::at_rest().accel)
    }

    fn read_angular_rate(&mut self) -> Result<Vector3<f64>, Self::Error> {
        Ok(SensorSample::at_rest().gyro)
    }

    fn read_temperature(&mut self) -> Result<f64, Self::Error> {
        Ok(TEMPERATURE_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn log_stream_serves_one_line_per_read() {
        let mut stream = LogPositionStream::new(Cursor::new(b"$GPGGA,1\r\n\n$GPRMC,2".to_vec()));

        assert!(stream.available().unwrap());
        assert!(!stream.is_exhausted().unwrap());
        assert_eq!(stream.read_line().unwrap(), Some(b"$GPGGA,1\r\n".to_vec()));
        assert_eq!(stream.read_line().unwrap(), Some(b"\n".to_vec()));
        assert!(!stream.is_exhausted().unwrap());
        assert_eq!(stream.read_line().unwrap(), Some(b"$GPRMC,2".to_vec()));

        assert!(stream.is_exhausted().unwrap());
        assert!(!stream.available().unwrap());
        assert_eq!(stream.read_line().unwrap(), None);
        assert_eq!(stream.lines_read(), 3);
    }

    #[test]
    fn csv_sensor_cycles_rows() {
        let mut sensor = CsvMotionSensor::from_reader(
            "# ax,ay,az,gx,gy,gz,temp\n0,0,1,0,0,0\n0.1, 0.2, 0.9, 5, -5, 1, 30.5\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(sensor.len(), 2);

        assert_eq!(sensor.read_temperature().unwrap(), TEMPERATURE_OFFSET);
        assert_eq!(sensor.read_sample().unwrap(), SensorSample::at_rest());

        assert_eq!(sensor.read_acceleration().unwrap(), Vector3::new(0.1, 0.2, 0.9));
        assert_eq!(sensor.read_temperature().unwrap(), 30.5);
        let second = sensor.read_sample().unwrap();
        assert_eq!(second.gyro, Vector3::new(5.0, -5.0, 1.0));

        assert_eq!(sensor.read_sample().unwrap(), SensorSample::at_rest());
    }

    #[test]
    fn csv_sensor_rejects_bad_rows() {
        let err = CsvMotionSensor::from_reader("0,0,1,0,0,0\n0,0,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MotionLogError::ColumnCount { row: 2, found: 3 }));

        let err = CsvMotionSensor::from_reader("0,0,one,0,0,0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MotionLogError::BadValue { row: 1, ref value } if value == "one"));

        let err = CsvMotionSensor::from_reader("# only a comment\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MotionLogError::Empty));
    }

    #[test]
    fn stationary_sensor_reads_gravity() {
        let mut sensor = StationaryMotionSensor;
        assert_eq!(sensor.read_sample().unwrap(), SensorSample::at_rest());
    }
}
