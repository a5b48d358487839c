//! Race results logger for Automobilista 2.
//!
//! The game publishes its state in a shared memory region guarded by a
//! sequence counter. This crate takes consistent snapshots of that region,
//! watches the race lifecycle, and writes exactly one JSON result file per
//! completed race.
//!
//! # Pipeline
//!
//! ```text
//! RegionSource ──► SnapshotReader ──► RaceState ──► CompletionDetector ──► ResultSink
//!  (live/replay)     (seqlock copy)    (projection)    (Idle/Active/Emitted)   (JSON file)
//! ```
//!
//! [`Driver`] owns all stages and runs the poll loop.
//!
//! ## Example (recording replay)
//!
//! ```rust,no_run
//! use ams2_results::{Config, Driver, JsonFileSink, RecordingRegion};
//! use tokio_util::sync::CancellationToken;
//!
//! fn main() -> ams2_results::Result<()> {
//!     let config = Config::default();
//!     let region = RecordingRegion::open("session.ams2rec")?;
//!     let sink = JsonFileSink::new(&config.output_dir);
//!
//!     let mut driver = Driver::new(region, sink, &config);
//!     let summary = driver.run(&CancellationToken::new())?;
//!     println!("{} race(s) saved", summary.races_saved);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Region access and snapshotting
pub mod recording;
pub mod region;
pub mod snapshot;

// Race processing
pub mod detector;
pub mod event;
pub mod race_state;
pub mod sink;

// Runtime
pub mod config;
pub mod driver;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

// Core exports
pub use error::*;
pub use types::*;

pub use config::Config;
pub use detector::{CompletionDetector, DetectorState};
pub use driver::{Driver, PollOutcome, ProcessingGate, RunSummary};
pub use event::{CompletionEvent, ParticipantResult, RaceInfo};
pub use race_state::{ParticipantState, RaceConfig, RaceState};
pub use recording::{RecordingRegion, RecordingWriter};
pub use region::{RegionSource, SharedMemory};
pub use sink::{JsonFileSink, ResultSink};
pub use snapshot::{AcquireStats, Snapshot, SnapshotReader};

// Windows memory exports
#[cfg(windows)]
pub use windows::MappedRegion;

use tokio_util::sync::CancellationToken;

/// Boxed region usable from the blocking driver thread.
pub type DynRegion = Box<dyn RegionSource + Send>;

/// Connect to the live game, waiting until its mapping exists.
///
/// Returns `Ok(None)` when `cancel` fires before the game is found.
///
/// # Platform
///
/// The game's mapping only exists on Windows. On other platforms this returns
/// [`TelemetryError::UnsupportedPlatform`]; use a recording instead.
pub fn connect_live(config: &Config, cancel: &CancellationToken) -> Result<Option<DynRegion>> {
    #[cfg(windows)]
    {
        let region =
            MappedRegion::connect_with_retry(&config.mapping_name, config.connect_retry(), cancel)?;
        Ok(region.map(|region| Box::new(region) as DynRegion))
    }

    #[cfg(not(windows))]
    {
        let _ = (config, cancel);
        Err(TelemetryError::unsupported_platform("Live shared memory", "Windows"))
    }
}
