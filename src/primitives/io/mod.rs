//! File size queries and on-disk space reservation.
//!
//! The page mapper never opens or closes files itself; it only asks the
//! caller's handle for its length and, when it owns file sizing, reserves
//! space through [`preallocate`].

use std::fs::File;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::Result;

/// Strategy used to grow the backing file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Reserve real blocks for the whole file (`posix_fallocate` on Linux).
    ///
    /// Platforms without a reservation primitive fall back to [`Allocation::SetLen`].
    #[default]
    Fallocate,
    /// Only move the end of file; the new region may be sparse.
    SetLen,
}

/// Returns the current length of `file` in bytes.
pub fn file_len(file: &File) -> Result<u64> {
    Ok(file.metadata()?.len())
}

/// Grows `file` so that it is at least `len` bytes long.
///
/// Never shrinks the file. With [`Allocation::Fallocate`] the full range
/// `0..len` is reserved in a single call so later writes into the region
/// cannot fail with `ENOSPC`.
pub fn preallocate(file: &File, len: u64, allocation: Allocation) -> Result<()> {
    trace!(len, ?allocation, "io.preallocate");
    match allocation {
        Allocation::Fallocate => fallocate(file, len),
        Allocation::SetLen => set_len_at_least(file, len),
    }
}

fn set_len_at_least(file: &File, len: u64) -> Result<()> {
    if file_len(file)? < len {
        file.set_len(len)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn fallocate(file: &File, len: u64) -> Result<()> {
    linux::posix_fallocate(file, len).map_err(Into::into)
}

#[cfg(not(target_os = "linux"))]
fn fallocate(file: &File, len: u64) -> Result<()> {
    set_len_at_least(file, len)
}

#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
mod linux {
    use std::fs::File;
    use std::io;
    use std::os::unix::io::AsRawFd;

    pub fn posix_fallocate(file: &File, len: u64) -> io::Result<()> {
        let len = libc::off_t::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "allocation too large"))?;
        loop {
            // SAFETY: the descriptor is borrowed from a live `File` for the
            // duration of the call and the kernel does not retain it.
            let res = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
            match res {
                0 => return Ok(()),
                libc::EINTR => continue,
                code => return Err(io::Error::from_raw_os_error(code)),
            }
        }
    }
}
