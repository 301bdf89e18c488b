use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use ride_tracker_lib::{
    activity::Activity,
    gps_fix::GpsFix,
    position_stream::{GpsReader, PollOutcome, PositionStream},
    ride_tracker::RideTracker,
    sensor::MotionSensor,
};

/// When a point is due, given that a fix is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSchedule {
    /// Wall-clock spacing, for live input.
    Interval(Duration),
    /// Every n-th poll, for replayed input that runs without sleeping.
    EveryPolls(u32),
}

/// What happened in one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub poll: PollOutcome,
    /// `None` when the motion sensor could not be read.
    pub activity: Option<Activity>,
    pub recorded: bool,
}

/// Single-threaded loop tying a position stream and a motion sensor to a tracker.
pub struct PollingLoop<P: PositionStream, M: MotionSensor> {
    stream: P,
    sensor: M,
    reader: GpsReader,
    fix: GpsFix,
    tracker: RideTracker,
    schedule: RecordSchedule,
    poll_interval: Duration,
    last_record: Option<Instant>,
    polls_since_record: u32,
    iterations: u64,
}

impl<P: PositionStream, M: MotionSensor> PollingLoop<P, M> {
    pub fn new(stream: P, sensor: M, tracker: RideTracker, schedule: RecordSchedule) -> Self {
        Self {
            stream,
            sensor,
            reader: GpsReader::new(),
            fix: GpsFix::new(),
            tracker,
            schedule,
            poll_interval: Duration::ZERO,
            last_record: None,
            polls_since_record: 0,
            iterations: 0,
        }
    }

    /// Sleep between iterations of [`run`](Self::run).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs one iteration: one sentence, one motion sample, maybe one point.
    ///
    /// Only position stream errors are returned. A failed sensor read is
    /// logged and the rest of the iteration is skipped.
    pub fn step(&mut self) -> Result<StepReport, P::Error> {
        self.iterations += 1;
        self.polls_since_record = self.polls_since_record.saturating_add(1);

        let poll = self.reader.poll(&mut self.stream, &mut self.fix)?;
        self.tracker.observe_fix(&self.fix);

        let sample = match self.sensor.read_sample() {
            Ok(sample) => sample,
            Err(err) => {
                tracing::warn!("Motion sensor read failed: {}", err);
                return Ok(StepReport {
                    poll,
                    activity: None,
                    recorded: false,
                });
            },
        };

        let activity = self.tracker.update_classifier(&self.fix, &sample);

        let mut recorded = false;
        if self.fix.has_fix() && self.record_due() {
            recorded = self.tracker.record_point(&self.fix, &sample).is_some();
            self.last_record = Some(Instant::now());
            self.polls_since_record = 0;
        }

        self.log_status(activity, recorded);

        Ok(StepReport {
            poll,
            activity: Some(activity),
            recorded,
        })
    }

    /// Steps until `stop` is set, sleeping the poll interval in between.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), P::Error> {
        while !stop.load(Ordering::Relaxed) {
            self.step()?;
            if !self.poll_interval.is_zero() {
                std::thread::sleep(self.poll_interval);
            }
        }
        tracing::info!("Stopped after {} iterations", self.iterations);
        Ok(())
    }

    fn record_due(&self) -> bool {
        match (self.schedule, self.last_record) {
            (_, None) => true,
            (RecordSchedule::Interval(interval), Some(last)) => last.elapsed() >= interval,
            (RecordSchedule::EveryPolls(polls), Some(_)) => self.polls_since_record >= polls,
        }
    }

    fn log_status(&self, activity: Activity, recorded: bool) {
        if self.fix.has_fix() {
            tracing::debug!(
                "Sats: {} Fix: {} | Lat: {:.5} Lon: {:.5} Speed: {:.1} km/h | {} ({}%) | \
                 Points: {}{}",
                self.fix.satellites,
                self.fix.fix_quality,
                self.fix.latitude.unwrap_or_default(),
                self.fix.longitude.unwrap_or_default(),
                self.fix.speed_kmh,
                activity,
                self.tracker.confidence(),
                self.tracker.points().len(),
                if recorded { " (recorded)" } else { "" }
            );
        } else {
            tracing::debug!(
                "Sats: {} Fix: {} | Waiting for fix | {} ({}%)",
                self.fix.satellites,
                self.fix.fix_quality,
                activity,
                self.tracker.confidence()
            );
        }
    }

    pub fn stream(&self) -> &P {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut P {
        &mut self.stream
    }

    pub fn fix(&self) -> &GpsFix {
        &self.fix
    }

    pub fn reader(&self) -> &GpsReader {
        &self.reader
    }

    pub fn tracker(&self) -> &RideTracker {
        &self.tracker
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn into_tracker(self) -> RideTracker {
        self.tracker
    }
}
