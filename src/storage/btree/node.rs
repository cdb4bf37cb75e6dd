//! Node kind tags and tag-dispatched decoding.

use super::leaf::LeafNode;
use crate::primitives::bytes::buf::Cursor;
use crate::types::{KvError, Result};

/// Bytes taken by the kind tag and the entry count.
pub const NODE_HEADER_LEN: usize = 4;

/// Kind tag stored in the first two bytes of every node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum NodeKind {
    /// Leaf holding key/value pairs.
    Leaf = 1,
    /// Internal node holding separators and child pointers.
    Internal = 2,
}

impl NodeKind {
    /// Converts a raw tag to a `NodeKind`.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(Self::Leaf),
            2 => Ok(Self::Internal),
            _ => Err(KvError::NodeDecode("unknown node kind")),
        }
    }

    /// Reads the kind tag from the start of `buf`.
    pub fn peek(buf: &[u8]) -> Result<Self> {
        let tag = Cursor::new(buf)
            .read_u16()
            .ok_or(KvError::NodeDecode("buffer shorter than node header"))?;
        Self::from_u16(tag)
    }
}

/// A decoded node of any supported kind.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Node {
    /// Leaf node.
    Leaf(LeafNode),
}

impl Node {
    /// Inspects the kind tag and decodes with the matching parser.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf);
        let tag = cur
            .read_u16()
            .ok_or(KvError::NodeDecode("buffer shorter than node header"))?;
        match NodeKind::from_u16(tag)? {
            NodeKind::Leaf => LeafNode::decode_entries(&mut cur).map(Node::Leaf),
            NodeKind::Internal => Err(KvError::NodeDecode(
                "internal node decoding not supported",
            )),
        }
    }

    /// Kind tag of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
        }
    }

    /// Encodes the node.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Leaf(leaf) => leaf.encode(),
        }
    }

    /// Exact encoded length in bytes.
    pub fn size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.size(),
        }
    }

    /// Returns the leaf if this is one.
    ///
    /// Always `Some` until another node kind becomes decodable.
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
        }
    }

    /// Converts into the leaf if this is one.
    ///
    /// Always `Some` until another node kind becomes decodable.
    pub fn into_leaf(self) -> Option<LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
        }
    }
}

impl From<LeafNode> for Node {
    fn from(leaf: LeafNode) -> Self {
        Node::Leaf(leaf)
    }
}
