//! On-page data structures of the storage engine.
//!
//! Only the node formats live here; tree orchestration, allocation and
//! commit handling consume these formats from outside the crate.

/// B-tree node formats.
///
/// Binary layout, sizing, search and sibling merge for tree nodes.
pub mod btree;
