//! Automobilista 2 shared memory access
//!
//! The game publishes its state in a named file mapping (`$pcars2$`). This
//! module maps it read-only and exposes it as a [`RegionSource`] so the
//! platform-independent reader can take consistent snapshots of it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ams2_results::windows::MappedRegion;
//! use ams2_results::SnapshotReader;
//!
//! let region = MappedRegion::try_connect("$pcars2$")?;
//! let mut reader = SnapshotReader::new(region);
//! if let Some(snapshot) = reader.try_acquire()? {
//!     println!("sequence {}", snapshot.sequence());
//! }
//! ```
//!
//! [`RegionSource`]: crate::region::RegionSource

mod connection;

pub use connection::MappedRegion;
