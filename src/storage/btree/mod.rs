#![forbid(unsafe_code)]

//! Node formats for the copy-on-write B-tree.

/// Leaf node codec, search and merge.
pub mod leaf;
/// Node kind tags and dispatching decode.
pub mod node;

pub use leaf::LeafNode;
pub use node::{Node, NodeKind, NODE_HEADER_LEN};
