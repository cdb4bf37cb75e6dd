#![forbid(unsafe_code)]
//! Shared identifiers, constants and the crate-wide error type.

use std::fmt;
use std::io;

use thiserror::Error;

/// Size of one database page in bytes.
///
/// Every reader and writer of a file must agree on this value; file sizes and
/// mapping arithmetic are always whole multiples of it.
pub const PAGE_SIZE: usize = 4096;

/// Identifier of a page, i.e. its index from the start of the file.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PageId(pub u64);

impl PageId {
    /// Byte offset of the page from the start of the file.
    pub fn offset(self) -> u64 {
        self.0 * PAGE_SIZE as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by the node codec and the page mapper.
#[derive(Debug, Error)]
pub enum KvError {
    /// The buffer does not hold a well-formed node of the requested kind.
    #[error("node decode: {0}")]
    NodeDecode(&'static str),
    /// The left sibling does not sort strictly before the right sibling.
    #[error("node merge: siblings are not strictly ordered")]
    NodeMerge,
    /// The backing file is not a whole number of pages.
    #[error("mmap: file size {size} is not a multiple of page size {}", PAGE_SIZE)]
    MmapFileSize {
        /// Size of the file as reported by stat.
        size: u64,
    },
    /// A page beyond the tracked end of file was requested.
    #[error("page {page} out of bounds (file has {pages} pages)")]
    PageOutOfBounds {
        /// Requested page.
        page: PageId,
        /// Pages currently backed by the file.
        pages: u64,
    },
    /// Invalid argument or misuse of the API.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// One or more mappings could not be released cleanly.
    #[error("mmap: {failed} chunk(s) failed to release: {source}")]
    Close {
        /// Number of chunks whose release reported an error.
        failed: usize,
        /// First error observed.
        source: io::Error,
    },
    /// Error reported by the operating system.
    #[error("IO: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KvError>;

/// Number of whole pages covered by `bytes`.
pub fn pages_for(bytes: u64) -> u64 {
    bytes / PAGE_SIZE as u64
}

/// Returns true when `bytes` is a whole number of pages.
pub fn is_page_aligned(bytes: u64) -> bool {
    bytes % PAGE_SIZE as u64 == 0
}
