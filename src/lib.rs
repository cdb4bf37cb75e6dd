//! Storage core of an embedded key-value store.
//!
//! Two independent pieces that a copy-on-write B-tree composes:
//!
//! - [`storage::btree`]: the binary node format, with decode, encode, sizing,
//!   ordered search and sibling merge for leaf nodes.
//! - [`primitives::mmap`]: a growable shared memory mapping over the page
//!   file that also owns page-aligned file growth.
//!
//! Neither depends on the other. A caller reads page bytes through
//! [`PageMapper::page`], decodes them with [`LeafNode::decode`], and writes
//! the re-encoded node back through [`PageMapper::page_mut`].

#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod primitives;
pub mod storage;
pub mod types;

pub use config::{Config, MapperOptions};
pub use primitives::mmap::PageMapper;
pub use storage::btree::{LeafNode, Node, NodeKind};
pub use types::{KvError, PageId, Result, PAGE_SIZE};
