//! Driver owns the reader, detector and sink and runs the poll loop

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::Config;
use crate::detector::CompletionDetector;
use crate::race_state::RaceState;
use crate::region::RegionSource;
use crate::sink::ResultSink;
use crate::snapshot::{AcquireStats, SnapshotReader};
use crate::Result;

/// Time gate in front of the processing step.
///
/// The baseline only moves when a result is saved, so processing is held
/// back for one interval after each saved race and runs on every snapshot
/// otherwise. A new gate has no baseline and is open.
#[derive(Debug, Clone)]
pub struct ProcessingGate {
    interval: Duration,
    baseline: Option<Instant>,
}

impl ProcessingGate {
    pub fn new(interval: Duration) -> Self {
        Self { interval, baseline: None }
    }

    pub fn is_open(&self, now: Instant) -> bool {
        self.baseline.is_none_or(|baseline| now.saturating_duration_since(baseline) >= self.interval)
    }

    pub fn reset(&mut self, now: Instant) {
        self.baseline = Some(now);
    }
}

/// What one loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No consistent snapshot this attempt
    NoSnapshot,
    /// Snapshot acquired but the processing gate was closed
    Throttled,
    /// Snapshot processed, no race completed
    Observed,
    /// A race completed; carries where the sink stored it, if it succeeded
    Completed(Option<std::path::PathBuf>),
}

/// Counters reported when the loop ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub processed: u64,
    pub races_saved: u64,
    pub sink_failures: u64,
    pub acquire: AcquireStats,
}

/// Single-threaded result logging loop.
pub struct Driver<R, S> {
    reader: SnapshotReader<R>,
    detector: CompletionDetector,
    sink: S,
    gate: ProcessingGate,
    idle_backoff: Duration,
    /// Instant the source's recorded clock is anchored to
    replay_epoch: Option<Instant>,
    summary: RunSummary,
}

impl<R, S> Driver<R, S>
where
    R: RegionSource,
    S: ResultSink,
{
    pub fn new(source: R, sink: S, config: &Config) -> Self {
        Self {
            reader: SnapshotReader::with_expected_version(source, config.expected_version),
            detector: CompletionDetector::new(),
            sink,
            gate: ProcessingGate::new(config.processing_interval()),
            idle_backoff: config.idle_backoff(),
            replay_epoch: None,
            summary: RunSummary::default(),
        }
    }

    pub fn detector(&self) -> &CompletionDetector {
        &self.detector
    }

    pub fn reader(&self) -> &SnapshotReader<R> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut SnapshotReader<R> {
        &mut self.reader
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one iteration at time `now`.
    ///
    /// When the source carries its own clock (a recording), `now` only
    /// anchors it and the gate runs on capture times.
    /// Only a version mismatch is returned as an error.
    pub fn poll_once(&mut self, now: Instant) -> Result<PollOutcome> {
        self.summary.iterations += 1;

        let Some(snapshot) = self.reader.try_acquire()? else {
            return Ok(PollOutcome::NoSnapshot);
        };
        let now = self.source_time(now);

        if !self.gate.is_open(now) {
            trace!(sequence = snapshot.sequence(), "Processing gate closed");
            return Ok(PollOutcome::Throttled);
        }

        self.summary.processed += 1;
        let state = RaceState::project(&snapshot);
        drop(snapshot);

        let Some(event) = self.detector.observe(&state) else {
            return Ok(PollOutcome::Observed);
        };

        let stored = match self.sink.persist(event) {
            Ok(path) => {
                self.summary.races_saved += 1;
                Some(path)
            }
            Err(e) => {
                self.summary.sink_failures += 1;
                error!("Failed to save race result: {}", e);
                None
            }
        };
        self.gate.reset(now);

        Ok(PollOutcome::Completed(stored))
    }

    /// Poll until cancelled or the region closes.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<RunSummary> {
        info!("Waiting for race to end");

        loop {
            if cancel.is_cancelled() {
                info!("Driver cancelled");
                break;
            }
            if self.reader.is_closed() {
                info!("Region closed, no more data");
                break;
            }

            match self.poll_once(Instant::now())? {
                PollOutcome::NoSnapshot | PollOutcome::Throttled => self.idle(),
                PollOutcome::Observed => {}
                PollOutcome::Completed(path) => {
                    debug!(?path, "Race result handled");
                }
            }
        }

        Ok(self.summary())
    }

    /// Counters so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary { acquire: self.reader.stats(), ..self.summary.clone() }
    }

    fn source_time(&mut self, now: Instant) -> Instant {
        match self.reader.source().elapsed() {
            Some(offset) => *self.replay_epoch.get_or_insert(now) + offset,
            None => now,
        }
    }

    fn idle(&self) {
        back_off(self.idle_backoff);
    }
}

/// Wait after an attempt that produced nothing to process; zero spins.
pub fn back_off(backoff: Duration) {
    if backoff.is_zero() {
        std::hint::spin_loop();
    } else {
        std::thread::sleep(backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorState;
    use crate::event::CompletionEvent;
    use crate::recording::{RecordingRegion, RecordingWriter};
    use crate::test_utils::{Entrant, SyntheticRegion, finished_field};
    use crate::types::{RacePhase, SessionKind};
    use crate::TelemetryError;
    use std::path::PathBuf;

    /// Sink collecting events in memory.
    #[derive(Default)]
    struct MemorySink {
        events: Vec<CompletionEvent>,
        fail: bool,
    }

    impl ResultSink for MemorySink {
        fn persist(&mut self, event: CompletionEvent) -> Result<PathBuf> {
            if self.fail {
                return Err(TelemetryError::file_error(
                    "/readonly",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            self.events.push(event);
            Ok(PathBuf::from(format!("memory/{}", self.events.len())))
        }
    }

    fn driver(source: SyntheticRegion) -> Driver<SyntheticRegion, MemorySink> {
        let config = Config { idle_backoff_us: 0, ..Config::default() };
        Driver::new(source, MemorySink::default(), &config)
    }

    fn racing_field() -> Vec<Entrant> {
        vec![Entrant::new("A", 1, RacePhase::Racing), Entrant::new("B", 2, RacePhase::Racing)]
    }

    #[test]
    fn gate_is_open_until_first_reset() {
        let start = Instant::now();
        let mut gate = ProcessingGate::new(Duration::from_millis(300));
        assert!(gate.is_open(start));

        gate.reset(start);
        assert!(!gate.is_open(start + Duration::from_millis(299)));
        assert!(gate.is_open(start + Duration::from_millis(300)));
    }

    #[test]
    fn first_snapshot_is_processed_without_waiting() {
        let mut source = SyntheticRegion::new();
        source.set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        let mut driver = driver(source);

        assert_eq!(driver.poll_once(Instant::now()).unwrap(), PollOutcome::Observed);
        assert_eq!(driver.summary().processed, 1);
        assert_eq!(driver.detector().state(), DetectorState::Active);
    }

    #[test]
    fn completes_a_race_once() {
        let start = Instant::now();
        let mut driver = driver(SyntheticRegion::new());

        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        assert_eq!(driver.poll_once(start).unwrap(), PollOutcome::Observed);

        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Finished, &finished_field(2));
        let outcome = driver.poll_once(start).unwrap();
        assert_eq!(outcome, PollOutcome::Completed(Some(PathBuf::from("memory/1"))));

        // Same snapshot, later: gate open again but nothing new to report
        let later = start + Duration::from_secs(1);
        assert_eq!(driver.poll_once(later).unwrap(), PollOutcome::Observed);
        assert_eq!(driver.sink().events.len(), 1);
        assert_eq!(driver.detector().state(), DetectorState::Emitted);
    }

    #[test]
    fn processing_is_held_back_after_a_saved_race() {
        let start = Instant::now();
        let mut driver = driver(SyntheticRegion::new());

        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        driver.poll_once(start).unwrap();
        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Finished, &finished_field(2));
        assert!(matches!(driver.poll_once(start).unwrap(), PollOutcome::Completed(_)));

        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::NotStarted, &racing_field());
        assert_eq!(
            driver.poll_once(start + Duration::from_millis(100)).unwrap(),
            PollOutcome::Throttled
        );
        assert_eq!(driver.poll_once(start + Duration::from_millis(300)).unwrap(), PollOutcome::Observed);
        assert_eq!(driver.detector().state(), DetectorState::Active);
    }

    #[test]
    fn recorded_clock_drives_the_gate() {
        let mut racing = SyntheticRegion::new();
        racing.set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        let mut finished = SyntheticRegion::new();
        finished.set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        finished.set_race(SessionKind::Race, RacePhase::Finished, &finished_field(2));
        let mut restart = SyntheticRegion::new();
        for _ in 0..3 {
            restart.set_race(SessionKind::Race, RacePhase::NotStarted, &racing_field());
        }

        let mut writer = RecordingWriter::new(Vec::new()).unwrap();
        writer.append_region_at(racing.region(), Duration::ZERO).unwrap();
        writer.append_region_at(finished.region(), Duration::from_millis(100)).unwrap();
        writer.append_region_at(restart.region(), Duration::from_millis(200)).unwrap();
        writer.append_region_at(restart.region(), Duration::from_millis(400)).unwrap();
        let recording = RecordingRegion::from_bytes(writer.finish().unwrap()).unwrap();

        let config = Config { idle_backoff_us: 0, ..Config::default() };
        let mut driver = Driver::new(recording, MemorySink::default(), &config);

        // Wall clock frozen: only capture times move
        let wall = Instant::now();
        assert_eq!(driver.poll_once(wall).unwrap(), PollOutcome::Observed);
        assert!(matches!(driver.poll_once(wall).unwrap(), PollOutcome::Completed(Some(_))));
        assert_eq!(driver.poll_once(wall).unwrap(), PollOutcome::Throttled);
        assert_eq!(driver.poll_once(wall).unwrap(), PollOutcome::Observed);
        assert_eq!(driver.detector().state(), DetectorState::Active);
    }

    #[test]
    fn zero_back_off_does_not_sleep() {
        let start = Instant::now();
        for _ in 0..1000 {
            back_off(Duration::ZERO);
        }
        assert!(start.elapsed() < Duration::from_secs(1));

        let start = Instant::now();
        back_off(Duration::from_millis(2));
        assert!(start.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn write_in_progress_is_not_an_error() {
        let mut source = SyntheticRegion::new();
        source.begin_write();
        let mut driver = driver(source);

        assert_eq!(driver.poll_once(Instant::now()).unwrap(), PollOutcome::NoSnapshot);
        assert_eq!(driver.summary().acquire.write_in_progress, 1);
    }

    #[test]
    fn version_mismatch_stops_the_loop() {
        let mut source = SyntheticRegion::new();
        source.region_mut().version = 2;
        let mut driver = driver(source);

        let err = driver.run(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, TelemetryError::Version { found: 2, .. }));
    }

    #[test]
    fn sink_failure_is_logged_not_fatal() {
        let start = Instant::now();
        let mut driver = driver(SyntheticRegion::new());
        driver.sink.fail = true;

        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        driver.poll_once(start).unwrap();
        driver.reader_mut().source_mut().set_race(SessionKind::Race, RacePhase::Finished, &finished_field(2));

        assert_eq!(driver.poll_once(start).unwrap(), PollOutcome::Completed(None));
        let summary = driver.summary();
        assert_eq!(summary.sink_failures, 1);
        assert_eq!(summary.races_saved, 0);
    }

    #[test]
    fn cancelled_token_stops_before_polling() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut driver = driver(SyntheticRegion::new());

        let summary = driver.run(&cancel).unwrap();
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.acquire.attempts, 0);
    }

    #[test]
    fn run_stops_when_cancelled_from_another_thread() {
        let cancel = CancellationToken::new();
        let remote = cancel.clone();
        let mut source = SyntheticRegion::new();
        source.set_race(SessionKind::Race, RacePhase::Racing, &racing_field());
        let mut driver = driver(source);

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        let summary = driver.run(&cancel).unwrap();
        canceller.join().unwrap();

        assert!(summary.iterations > 0);
        assert_eq!(summary.processed, summary.acquire.acquired);
        assert_eq!(driver.detector().state(), DetectorState::Active);
    }
}
