//! Persistence of completion events
//!
//! The detector only decides *when* a race is over. A [`ResultSink`] decides
//! where the result goes. [`JsonFileSink`] writes one timestamped JSON file
//! per race, e.g. `logs/data_21-06-2026_18-04-55.json`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use crate::event::CompletionEvent;
use crate::{Result, TelemetryError};

/// Receiver of completion events.
pub trait ResultSink {
    /// Persist one finished race, returning where it was stored.
    fn persist(&mut self, event: CompletionEvent) -> Result<PathBuf>;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn persist(&mut self, event: CompletionEvent) -> Result<PathBuf> {
        (**self).persist(event)
    }
}

/// Writes each result as an indented JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File name for a result saved at `time`.
    pub fn file_name(time: DateTime<Local>) -> String {
        format!("data_{}.json", time.format("%d-%m-%Y_%H-%M-%S"))
    }

    /// First free path for `time`, adding `_N` when races end within one second.
    fn free_path(&self, time: DateTime<Local>) -> PathBuf {
        let base = Self::file_name(time);
        let mut path = self.output_dir.join(&base);
        let stem = base.trim_end_matches(".json");
        let mut suffix = 1;
        while path.exists() {
            path = self.output_dir.join(format!("{}_{}.json", stem, suffix));
            suffix += 1;
        }
        path
    }

    /// Write `event` at `time`.
    pub fn persist_at(&mut self, event: &CompletionEvent, time: DateTime<Local>) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| TelemetryError::file_error(&self.output_dir, e))?;

        let path = self.free_path(time);
        let bytes = to_indented_json(event)?;

        let mut file = fs::File::create(&path).map_err(|e| TelemetryError::file_error(&path, e))?;
        file.write_all(&bytes).map_err(|e| TelemetryError::file_error(&path, e))?;
        file.sync_all().map_err(|e| TelemetryError::file_error(&path, e))?;

        debug!(bytes = bytes.len(), "Result file written");
        info!("Log saved to {}", path.display());
        Ok(path)
    }
}

impl ResultSink for JsonFileSink {
    fn persist(&mut self, event: CompletionEvent) -> Result<PathBuf> {
        self.persist_at(&event, Local::now())
    }
}

/// Serialize with four-space indentation.
fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| TelemetryError::parse_error("result serialization", e.to_string()))?;
    Ok(bytes)
}
