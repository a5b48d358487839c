//! Error types for shared memory result logging.
//!
//! All errors implement `std::error::Error` and carry enough structured
//! context to decide whether the caller should retry, reconnect or exit.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the simulator's shared region cannot be located or mapped
//! - **Version Errors**: the region layout version does not match what this build reads
//! - **Memory Errors**: a region or recording frame has the wrong size
//! - **File Errors**: result files or recordings cannot be read or written
//! - **Parse / Config Errors**: malformed recordings or configuration files
//! - **Windows API Errors**: platform-specific failures while mapping the region
//!
//! Torn reads and writes in progress are *not* errors. They are normal flow
//! control inside [`SnapshotReader`](crate::SnapshotReader) and never leave it.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use ams2_results::TelemetryError;
//!
//! let error = TelemetryError::connection_failed("shared memory not found");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for library operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for the result logger.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Failed to connect to shared memory: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Shared memory version mismatch: expected {expected}, found {found}")]
    Version { expected: u32, found: u32 },

    #[error("Region size mismatch: expected {expected} bytes, found {found}")]
    Memory { expected: usize, found: usize },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[error("Windows API error: {operation}")]
    #[cfg(windows)]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Connection { .. } => true,
            TelemetryError::File { .. } => false,
            TelemetryError::Version { .. } => false,
            TelemetryError::Memory { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::Config { .. } => false,
            TelemetryError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Connection { .. } => vec![
                "Ensure Automobilista 2 is running",
                "Enable shared memory (Project CARS 2 mode) in the game options",
                "Check Windows permissions for shared memory access",
            ],
            TelemetryError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check the output directory is writable",
                "Ensure sufficient disk space",
            ],
            TelemetryError::Version { .. } => vec![
                "Update the game to the latest version",
                "Update this tool to a build matching the game's shared memory version",
                "Set expected_version in the configuration if the layout is known to match",
            ],
            TelemetryError::Memory { .. } => vec![
                "Verify the recording was produced by a compatible build",
                "Re-record the session with this version of the tool",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check the file format",
                "Verify source data integrity",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration file for typos",
                "Remove the offending key to fall back to the default",
            ],
            TelemetryError::UnsupportedPlatform { .. } => vec![
                "Run live mode on Windows alongside the game",
                "Use `replay` with a recorded file on other platforms",
            ],
            #[cfg(windows)]
            TelemetryError::WindowsApi { .. } => vec![
                "Check Windows API permissions",
                "Restart the game to recreate the shared memory mapping",
            ],
        }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TelemetryError::File { path: path.into(), source }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TelemetryError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into() }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api_error(operation: impl Into<String>, source: core::Error) -> Self {
        TelemetryError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for unsupported platform errors.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        TelemetryError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

#[cfg(windows)]
impl From<core::Error> for TelemetryError {
    fn from(err: core::Error) -> Self {
        TelemetryError::WindowsApi {
            operation: "Unknown Windows operation".to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn io_errors_convert_to_file_errors(reason in ".*") {
                let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
                let converted: TelemetryError = io_err.into();
                match converted {
                    TelemetryError::File { source, .. } => {
                        prop_assert_eq!(source.to_string(), reason);
                    }
                    _ => prop_assert!(false, "Expected File error from io::Error conversion"),
                }
            }

            #[test]
            fn version_errors_report_both_versions(expected in any::<u32>(), found in any::<u32>()) {
                let error = TelemetryError::Version { expected, found };
                let message = error.to_string();
                prop_assert!(message.contains(&expected.to_string()));
                prop_assert!(message.contains(&found.to_string()));
                prop_assert!(!error.is_retryable());
            }
        }
    }

    #[test]
    fn error_constructors_validation() {
        let file_error = TelemetryError::file_error(
            "/test",
            std::io::Error::new(std::io::ErrorKind::NotFound, "test"),
        );
        assert!(matches!(file_error, TelemetryError::File { .. }));

        let conn_error = TelemetryError::connection_failed("test");
        assert!(matches!(conn_error, TelemetryError::Connection { .. }));

        let parse_error = TelemetryError::parse_error("recording header", "bad magic");
        assert_eq!(parse_error.to_string(), "Parse error in recording header: bad magic");

        let config_error = TelemetryError::config_error("processing_interval_ms must be positive");
        assert!(matches!(config_error, TelemetryError::Config { .. }));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TelemetryError>();

        let error = TelemetryError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn only_connection_loss_is_retryable() {
        let connection_error = TelemetryError::connection_failed("test");
        let version_error = TelemetryError::Version { expected: 14, found: 9 };
        let memory_error = TelemetryError::Memory { expected: 10, found: 5 };
        let platform_error = TelemetryError::unsupported_platform("Live telemetry", "Windows");

        assert!(connection_error.is_retryable());
        assert!(!version_error.is_retryable());
        assert!(!memory_error.is_retryable());
        assert!(!platform_error.is_retryable());

        for error in [&connection_error, &version_error, &memory_error, &platform_error] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn connection_source_is_preserved() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "mapping missing");
        let error = TelemetryError::connection_failed_with_source("open mapping", Box::new(inner));
        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), "mapping missing");
    }
}
