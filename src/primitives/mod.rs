//! Low-level primitives for building the storage engine.
//!
//! Includes byte utilities, file sizing operations and the growable
//! memory-mapped page view.

/// Byte-level utilities and encoding/decoding.
///
/// Big-endian fixed-width fields and a bounds-checked cursor.
pub mod bytes;

/// File I/O helpers.
///
/// Length queries and space reservation for page files.
pub mod io;

/// Memory-mapped page access.
///
/// Maps a page file as a growable set of chunks and keeps it consistent
/// with the file's size.
pub mod mmap;
