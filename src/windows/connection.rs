//! Read-only view of the game's file mapping

use std::ptr::{self, NonNull, addr_of};
use std::sync::atomic::{Ordering, fence};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile,
};
use windows::core::PCWSTR;

use crate::region::{RegionSource, SharedMemory};
use crate::{Result, TelemetryError};

/// Live mapping of the simulator's shared memory.
pub struct MappedRegion {
    mapping: HANDLE,
    base: NonNull<SharedMemory>,
    name: String,
}

impl MappedRegion {
    /// Open and map `name` once.
    pub fn try_connect(name: &str) -> Result<Self> {
        trace!(name, "Opening shared memory mapping");

        let mapping = unsafe {
            let wide_name = wide_string(name);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| {
                    TelemetryError::connection_failed_with_source(
                        format!("could not open file mapping object {}", name),
                        Box::new(e),
                    )
                })?
        };

        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, SharedMemory::SIZE) };
        let Some(base) = NonNull::new(view.Value as *mut SharedMemory) else {
            let win_err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(mapping);
            }
            return Err(TelemetryError::windows_api_error("MapViewOfFile", win_err));
        };

        let region = Self { mapping, base, name: name.to_string() };
        debug!(
            name,
            version = region.version(),
            size = SharedMemory::SIZE,
            "Mapped shared memory"
        );
        Ok(region)
    }

    /// Keep trying to connect every `retry` until it works or `cancel` fires.
    ///
    /// Returns `Ok(None)` when cancelled. Non-retryable failures are returned
    /// immediately.
    pub fn connect_with_retry(
        name: &str,
        retry: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<Self>> {
        let mut attempts = 0u64;
        loop {
            if cancel.is_cancelled() {
                debug!(attempts, "Connection attempts cancelled");
                return Ok(None);
            }

            match Self::try_connect(name) {
                Ok(region) => {
                    info!(attempts = attempts + 1, "Connected to shared memory");
                    return Ok(Some(region));
                }
                Err(e) if e.is_retryable() => {
                    if attempts == 0 {
                        info!("Waiting for shared memory connection, make sure the game is running");
                    }
                    trace!(error = %e, attempts, "Connection attempt failed");
                }
                Err(e) => return Err(e),
            }

            attempts += 1;
            std::thread::sleep(retry);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RegionSource for MappedRegion {
    fn version(&self) -> u32 {
        unsafe { ptr::read_volatile(addr_of!((*self.base.as_ptr()).version)) }
    }

    fn sequence_number(&self) -> u32 {
        let sequence =
            unsafe { ptr::read_volatile(addr_of!((*self.base.as_ptr()).sequence_number)) };
        fence(Ordering::Acquire);
        sequence
    }

    fn copy_to(&mut self, dst: &mut SharedMemory) {
        // The game may be writing concurrently; the reader rejects torn copies.
        unsafe {
            ptr::copy_nonoverlapping(
                self.base.as_ptr() as *const u8,
                dst.as_bytes_mut().as_mut_ptr(),
                SharedMemory::SIZE,
            );
        }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
        debug!(name = %self.name, "Unmapped shared memory");
    }
}

// SAFETY: the view is only ever read, and the handle is a kernel object that
// may be used from any thread.
unsafe impl Send for MappedRegion {}

/// Convert string to null-terminated wide string for Windows APIs
fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
