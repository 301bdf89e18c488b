//! The three things the binary can do: replay, track live, parse a sentence.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::{anyhow, Context};
use ride_tracker_lib::{
    gps_fix::GpsFix,
    nmea::{parse_sentence, SentenceKind},
    position_stream::PositionStream,
    ride_tracker::RideTracker,
    sensor::MotionSensor,
};

use crate::{
    configuration::Configuration,
    polling::{PollingLoop, RecordSchedule},
    replay::{CsvMotionSensor, LogPositionStream, StationaryMotionSensor},
    serial::SerialPositionStream,
};

/// Runs a recorded NMEA log through the tracker as fast as it can be read.
pub fn replay(
    nmea: &Path,
    imu: Option<&Path>,
    config: &Configuration,
    stop: &AtomicBool,
) -> anyhow::Result<RideTracker> {
    let stream = LogPositionStream::open(nmea)
        .with_context(|| format!("Could not open {}", nmea.display()))?;
    let tracker = RideTracker::new(config.tracker_config());
    let schedule = RecordSchedule::EveryPolls(config.replay_record_every.max(1));

    tracing::info!("Replaying {}", nmea.display());
    log_classifier(&tracker);

    match imu {
        Some(path) => {
            let sensor = open_motion_log(path)?;
            replay_until_exhausted(PollingLoop::new(stream, sensor, tracker, schedule), stop)
        },
        None => {
            let polling = PollingLoop::new(stream, StationaryMotionSensor, tracker, schedule);
            replay_until_exhausted(polling, stop)
        },
    }
}

fn replay_until_exhausted<R, M>(
    mut polling: PollingLoop<LogPositionStream<R>, M>,
    stop: &AtomicBool,
) -> anyhow::Result<RideTracker>
where
    R: std::io::BufRead,
    M: MotionSensor,
{
    while !stop.load(Ordering::Relaxed) {
        if polling.stream_mut().is_exhausted().context("Could not read NMEA log")? {
            break;
        }
        polling.step().context("Could not read NMEA log")?;
    }

    tracing::info!(
        "Replayed {} lines: {} sentences parsed, {} discarded, {} points recorded",
        polling.stream().lines_read(),
        polling.reader().parsed(),
        polling.reader().discarded(),
        polling.tracker().points().len()
    );
    Ok(polling.into_tracker())
}

/// Tracks from a serial receiver until `stop` is set.
pub fn live(
    port: &str,
    baud_rate: u32,
    imu: Option<&Path>,
    config: &Configuration,
    stop: &AtomicBool,
) -> anyhow::Result<RideTracker> {
    let stream = SerialPositionStream::open(port, baud_rate)
        .with_context(|| format!("Could not open {}", port))?;
    let tracker = RideTracker::new(config.tracker_config());
    let schedule = RecordSchedule::Interval(config.record_interval());

    log_classifier(&tracker);
    tracing::info!("Waiting for GPS fix...");

    match imu {
        Some(path) => {
            let sensor = open_motion_log(path)?;
            run_live(PollingLoop::new(stream, sensor, tracker, schedule), config, stop)
        },
        None => {
            tracing::info!("No motion log given, assuming the sensor is at rest");
            let polling = PollingLoop::new(stream, StationaryMotionSensor, tracker, schedule);
            run_live(polling, config, stop)
        },
    }
}

fn open_motion_log(path: &Path) -> anyhow::Result<CsvMotionSensor> {
    CsvMotionSensor::open(path).with_context(|| format!("Could not load {}", path.display()))
}

fn log_classifier(tracker: &RideTracker) {
    let config = tracker.classifier().config();
    tracing::info!(
        "Classifying over {} samples, {} needed before the first decision",
        config.window_size,
        config.min_samples
    );
}

fn run_live<P, M>(
    polling: PollingLoop<P, M>,
    config: &Configuration,
    stop: &AtomicBool,
) -> anyhow::Result<RideTracker>
where
    P: PositionStream,
    M: MotionSensor,
{
    let mut polling = polling.with_poll_interval(config.poll_interval());
    polling
        .run(stop)
        .map_err(|err| anyhow!("Serial input failed: {}", err))?;
    Ok(polling.into_tracker())
}

/// Writes the track if an output path is set. Failure is logged, not returned.
pub fn export(tracker: &RideTracker, output: Option<&PathBuf>) -> bool {
    let Some(path) = output else {
        return false;
    };

    match tracker.export_track_to_file(path) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("Export to {} failed: {}", path.display(), err);
            false
        },
    }
}

/// Parses one sentence into a fresh fix.
pub fn parse(sentence: &str) -> anyhow::Result<(SentenceKind, GpsFix)> {
    let mut fix = GpsFix::new();
    let kind = parse_sentence(sentence.trim(), &mut fix)
        .with_context(|| format!("Could not parse {:?}", sentence))?;
    Ok((kind, fix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reports_fix() {
        let sentence = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,,,,*47\r\n";
        let (kind, fix) = parse(sentence).unwrap();
        assert_eq!(kind, SentenceKind::Gga);
        assert_eq!(fix.satellites, 8);
        assert_eq!(fix.time_string().as_deref(), Some("12:35:19"));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = parse("GPGGA,1,2").unwrap_err();
        assert!(err.to_string().contains("GPGGA,1,2"));
    }

    #[test]
    fn export_without_output_does_nothing() {
        assert!(!export(&RideTracker::default(), None));
    }

    #[test]
    fn export_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ride.gpx");
        assert!(!export(&RideTracker::default(), Some(&path)));
    }
}
