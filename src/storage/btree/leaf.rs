//! Leaf nodes: sorted key/value runs and their on-page encoding.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! +-----------+---------+--------------------------------------------+
//! | kind: u16 | n: u16  | n x (key_len: u16, val_len: u16, key, val) |
//! +-----------+---------+--------------------------------------------+
//! ```
//!
//! Bytes after the last entry are ignored, so a node can be decoded straight
//! from a full page.

use std::cmp::Ordering;

use tracing::trace;

use super::node::{NodeKind, NODE_HEADER_LEN};
use crate::primitives::bytes::{be, buf::Cursor};
use crate::types::{KvError, Result};

/// Per-entry header: key length plus value length.
pub const ENTRY_HEADER_LEN: usize = 4;

/// Largest key or value the 2-byte length fields can describe.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Largest number of entries the 2-byte count can describe.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

/// A decoded leaf. Keys are strictly increasing byte strings and `vals[i]`
/// belongs to `keys[i]`. The node owns copies of its bytes; nothing borrows
/// from the page it was decoded from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LeafNode {
    keys: Vec<Vec<u8>>,
    vals: Vec<Vec<u8>>,
}

impl LeafNode {
    /// Creates an empty leaf.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a leaf from entries that are already in strictly increasing key
    /// order.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Vec<u8>>,
        V: Into<Vec<u8>>,
    {
        let mut node = Self::new();
        for (key, val) in entries {
            let key = key.into();
            let val = val.into();
            check_entry(&key, &val)?;
            if let Some(last) = node.keys.last() {
                if last.as_slice() >= key.as_slice() {
                    return Err(KvError::Invalid("leaf keys must be strictly increasing"));
                }
            }
            node.push(key, val)?;
        }
        Ok(node)
    }

    /// Decodes a leaf from `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf);
        let kind = cur
            .read_u16()
            .ok_or(KvError::NodeDecode("buffer shorter than node header"))?;
        if kind != NodeKind::Leaf as u16 {
            return Err(KvError::NodeDecode("not a leaf node"));
        }
        Self::decode_entries(&mut cur)
    }

    /// Decodes `buf` into `self`, replacing its contents.
    ///
    /// On error `self` is left empty rather than holding a prefix of the
    /// entries.
    pub fn decode_into(&mut self, buf: &[u8]) -> Result<()> {
        self.keys.clear();
        self.vals.clear();
        let decoded = Self::decode(buf)?;
        *self = decoded;
        Ok(())
    }

    /// Decodes the count and entries following an already-checked kind tag.
    pub(crate) fn decode_entries(cur: &mut Cursor<'_>) -> Result<Self> {
        let n = cur
            .read_u16()
            .ok_or(KvError::NodeDecode("buffer shorter than node header"))? as usize;
        let mut keys = Vec::with_capacity(n);
        let mut vals = Vec::with_capacity(n);
        for _ in 0..n {
            let key_len = cur
                .read_u16()
                .ok_or(KvError::NodeDecode("truncated entry header"))?;
            let val_len = cur
                .read_u16()
                .ok_or(KvError::NodeDecode("truncated entry header"))?;
            let key = cur
                .take(key_len as usize)
                .ok_or(KvError::NodeDecode("truncated key"))?;
            let val = cur
                .take(val_len as usize)
                .ok_or(KvError::NodeDecode("truncated value"))?;
            keys.push(key.to_vec());
            vals.push(val.to_vec());
        }
        trace!(entries = n, bytes = cur.offset(), "leaf.decode");
        Ok(Self { keys, vals })
    }

    /// Encodes the leaf into a freshly allocated buffer of exactly
    /// [`LeafNode::size`] bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        self.encode_into(&mut out);
        out
    }

    /// Appends the encoded leaf to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        // Lengths and count were checked when entries were added.
        be::push_u16(out, NodeKind::Leaf as u16);
        be::push_u16(out, self.keys.len() as u16);
        for (key, val) in self.keys.iter().zip(&self.vals) {
            be::push_u16(out, key.len() as u16);
            be::push_u16(out, val.len() as u16);
            out.extend_from_slice(key);
            out.extend_from_slice(val);
        }
        trace!(entries = self.keys.len(), bytes = self.size(), "leaf.encode");
    }

    /// Exact encoded length in bytes.
    pub fn size(&self) -> usize {
        NODE_HEADER_LEN
            + self
                .keys
                .iter()
                .zip(&self.vals)
                .map(|(k, v)| ENTRY_HEADER_LEN + k.len() + v.len())
                .sum::<usize>()
    }

    /// Returns true when the encoded leaf fits in `page_size` bytes.
    pub fn fits(&self, page_size: usize) -> bool {
        self.size() <= page_size
    }

    /// Binary search for `key`.
    ///
    /// Returns `(i, true)` when `keys[i] == key`, otherwise `(i, false)`
    /// where `i` is the number of keys strictly less than `key`.
    pub fn search(&self, key: &[u8]) -> (usize, bool) {
        let mut lo = 0usize;
        let mut hi = self.keys.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.keys[mid].as_slice().cmp(key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return (mid, true),
            }
        }
        (lo, false)
    }

    /// Concatenates `self` (left sibling) and `other` (right sibling).
    ///
    /// Fails with [`KvError::NodeMerge`] unless the concatenated keys are
    /// strictly increasing; neither input is modified.
    pub fn merge(&self, other: &LeafNode) -> Result<LeafNode> {
        let total = self.keys.len() + other.keys.len();
        if total > MAX_ENTRIES {
            return Err(KvError::Invalid("merged leaf exceeds entry limit"));
        }
        let ordered = self
            .keys
            .iter()
            .chain(&other.keys)
            .zip(self.keys.iter().chain(&other.keys).skip(1))
            .all(|(a, b)| a < b);
        if !ordered {
            return Err(KvError::NodeMerge);
        }
        let mut keys = Vec::with_capacity(total);
        let mut vals = Vec::with_capacity(total);
        keys.extend(self.keys.iter().chain(&other.keys).cloned());
        vals.extend(self.vals.iter().chain(&other.vals).cloned());
        Ok(LeafNode { keys, vals })
    }

    /// Splits the leaf at entry `at`: the left node keeps `[0, at)` and the
    /// right node gets `[at, len)`.
    pub fn split_at(&self, at: usize) -> Result<(LeafNode, LeafNode)> {
        if at > self.keys.len() {
            return Err(KvError::Invalid("split point beyond leaf length"));
        }
        let (lk, rk) = self.keys.split_at(at);
        let (lv, rv) = self.vals.split_at(at);
        Ok((
            LeafNode {
                keys: lk.to_vec(),
                vals: lv.to_vec(),
            },
            LeafNode {
                keys: rk.to_vec(),
                vals: rv.to_vec(),
            },
        ))
    }

    /// Inserts or replaces the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: &[u8], val: &[u8]) -> Result<Option<Vec<u8>>> {
        check_entry(key, val)?;
        match self.search(key) {
            (idx, true) => Ok(Some(std::mem::replace(&mut self.vals[idx], val.to_vec()))),
            (idx, false) => {
                if self.keys.len() >= MAX_ENTRIES {
                    return Err(KvError::Invalid("leaf entry limit reached"));
                }
                self.keys.insert(idx, key.to_vec());
                self.vals.insert(idx, val.to_vec());
                Ok(None)
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        match self.search(key) {
            (idx, true) => {
                self.keys.remove(idx);
                Some(self.vals.remove(idx))
            }
            (_, false) => None,
        }
    }

    /// Looks up the value stored for `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.search(key) {
            (idx, true) => Some(self.vals[idx].as_slice()),
            (_, false) => None,
        }
    }

    /// Key at position `idx`.
    pub fn key(&self, idx: usize) -> Option<&[u8]> {
        self.keys.get(idx).map(Vec::as_slice)
    }

    /// Value at position `idx`.
    pub fn val(&self, idx: usize) -> Option<&[u8]> {
        self.vals.get(idx).map(Vec::as_slice)
    }

    /// All keys in order.
    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    /// All values in key order.
    pub fn vals(&self) -> &[Vec<u8>] {
        &self.vals
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.keys
            .iter()
            .zip(&self.vals)
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true when the leaf has no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn push(&mut self, key: Vec<u8>, val: Vec<u8>) -> Result<()> {
        if self.keys.len() >= MAX_ENTRIES {
            return Err(KvError::Invalid("leaf entry limit reached"));
        }
        self.keys.push(key);
        self.vals.push(val);
        Ok(())
    }
}

fn check_entry(key: &[u8], val: &[u8]) -> Result<()> {
    if key.len() > MAX_FIELD_LEN {
        return Err(KvError::Invalid("key longer than 65535 bytes"));
    }
    if val.len() > MAX_FIELD_LEN {
        return Err(KvError::Invalid("value longer than 65535 bytes"));
    }
    Ok(())
}
