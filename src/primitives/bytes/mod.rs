#![forbid(unsafe_code)]
//! Fixed-width big-endian fields and a bounds-checked slice cursor.

pub mod be {
    //! Big-endian helpers for the 2-byte fields of the node format.

    /// Width of every length and tag field in the node format.
    pub const U16_LEN: usize = core::mem::size_of::<u16>();

    /// Appends `v` in big-endian byte order.
    #[inline]
    pub fn push_u16(dst: &mut Vec<u8>, v: u16) {
        dst.extend_from_slice(&v.to_be_bytes());
    }

    /// Reads a big-endian `u16` from the start of `src`, if long enough.
    pub fn get_u16(src: &[u8]) -> Option<u16> {
        match src {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }
}

pub mod buf {
    //! A slice-backed cursor that reports overreads instead of panicking.

    use core::fmt;

    use super::be;

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        buf: &'a [u8],
        off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, or `None` when fewer remain.
        pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
            let end = self.off.checked_add(n)?;
            let slice = self.buf.get(self.off..end)?;
            self.off = end;
            Some(slice)
        }

        /// Reads the next big-endian `u16`.
        pub fn read_u16(&mut self) -> Option<u16> {
            self.take(be::U16_LEN).and_then(be::get_u16)
        }

        /// Current read offset.
        pub fn offset(&self) -> usize {
            self.off
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}
