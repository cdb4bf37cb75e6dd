//! Growable memory mapping over a page file.
//!
//! [`PageMapper`] exposes a file as one logical address space assembled from
//! discrete mappings ("chunks"). The first chunk is sized at init; every
//! extension maps one more chunk as large as everything mapped so far,
//! placed at the file offset where the previous chunks end:
//!
//! ```text
//! logical offset  0          S          2S                 4S
//!                 +----------+----------+------------------+
//!                 | chunk 0  | chunk 1  |     chunk 2      |
//!                 +----------+----------+------------------+
//! ```
//!
//! Chunks are independent mappings; nothing here assumes the kernel placed
//! them at adjacent virtual addresses; every access goes through
//! [`PageMapper::resolve`].
//!
//! The mapping may run past the end of the file. Page views are therefore
//! bounds-checked against the tracked file size, which only grows through
//! [`PageMapper::extend_file`]. Growth operations take `&mut self`, so the
//! borrow checker guarantees no page view is alive while chunks change.
//!
//! The mapper performs no locking; callers serialize growth themselves.

use std::fs::File;

use memmap2::{MmapMut, MmapOptions as RawMapOptions};
use tracing::{debug, info, warn};

use crate::config::MapperOptions;
use crate::primitives::io;
use crate::types::{is_page_aligned, pages_for, KvError, PageId, Result, PAGE_SIZE};

/// Capacity of the first mapping before any doubling.
pub const INITIAL_MMAP_SIZE: u64 = 64 << 20;

struct Chunk {
    /// Logical (and file) offset of the first byte of this chunk.
    offset: u64,
    map: MmapMut,
}

impl Chunk {
    fn end(&self) -> u64 {
        self.offset + self.map.len() as u64
    }
}

/// Owner of every mapping created over a single page file.
pub struct PageMapper {
    file_size: u64,
    mmap_size: u64,
    chunks: Vec<Chunk>,
    options: MapperOptions,
}

impl PageMapper {
    /// Maps `file` with default [`MapperOptions`].
    pub fn init(file: &File) -> Result<Self> {
        Self::init_with(file, MapperOptions::default())
    }

    /// Maps `file`, which must be a whole number of pages long.
    ///
    /// The first chunk starts at [`INITIAL_MMAP_SIZE`] and doubles until it
    /// covers the whole file.
    pub fn init_with(file: &File, options: MapperOptions) -> Result<Self> {
        let file_size = io::file_len(file)?;
        if !is_page_aligned(file_size) {
            return Err(KvError::MmapFileSize { size: file_size });
        }

        let mut mmap_size = INITIAL_MMAP_SIZE;
        while mmap_size < file_size {
            mmap_size = mmap_size
                .checked_mul(2)
                .ok_or(KvError::Invalid("file too large to map"))?;
        }

        let map = map_chunk(file, 0, mmap_size, &options)?;
        debug!(file_size, mmap_size, "mmap.init");
        Ok(Self {
            file_size,
            mmap_size,
            chunks: vec![Chunk { offset: 0, map }],
            options,
        })
    }

    /// Ensures at least `pages` pages are addressable through the mapping.
    ///
    /// Each step maps a new chunk the size of the current mapping at the
    /// current end, doubling capacity. Calls that are already covered are
    /// no-ops. New chunks are committed only once every step has succeeded;
    /// on failure the mapper is unchanged. This does not grow the file; see
    /// [`PageMapper::grow`].
    pub fn extend(&mut self, file: &File, pages: u64) -> Result<()> {
        let needed = pages
            .checked_mul(PAGE_SIZE as u64)
            .ok_or(KvError::Invalid("page count overflows mapping size"))?;
        let mut mmap_size = self.mmap_size;
        let mut added = Vec::new();
        while mmap_size < needed {
            let offset = mmap_size;
            let len = mmap_size;
            let doubled = len
                .checked_mul(2)
                .ok_or(KvError::Invalid("mapping size overflow"))?;
            // Chunks in `added` are unmapped when it drops on the error path.
            let map = map_chunk(file, offset, len, &self.options)?;
            added.push(Chunk { offset, map });
            mmap_size = doubled;
        }
        for chunk in added {
            debug!(
                chunk = self.chunks.len(),
                offset = chunk.offset,
                len = chunk.map.len(),
                "mmap.extend"
            );
            self.chunks.push(chunk);
        }
        self.mmap_size = mmap_size;
        Ok(())
    }

    /// Grows the file to hold at least `pages` pages.
    ///
    /// The page count advances in steps of `max(1, pages / 8)` and the whole
    /// new size is reserved in one allocation call. On failure the tracked
    /// file size is unchanged.
    pub fn extend_file(&mut self, file: &File, pages: u64) -> Result<()> {
        let current = self.file_pages();
        if current >= pages {
            return Ok(());
        }
        if pages.checked_mul(PAGE_SIZE as u64).is_none() {
            return Err(KvError::Invalid("page count overflows file size"));
        }
        let new_size = grown_page_count(current, pages)
            .and_then(|target| target.checked_mul(PAGE_SIZE as u64))
            .ok_or(KvError::Invalid("page count overflows file size"))?;
        io::preallocate(file, new_size, self.options.allocation)?;
        info!(
            from_pages = current,
            to_pages = pages_for(new_size),
            "mmap.extend_file"
        );
        self.file_size = new_size;
        Ok(())
    }

    /// Grows the file and then the mapping so `pages` pages are usable.
    pub fn grow(&mut self, file: &File, pages: u64) -> Result<()> {
        self.extend_file(file, pages)?;
        self.extend(file, pages)
    }

    /// Tracked size of the backing file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Number of pages backed by the file.
    pub fn file_pages(&self) -> u64 {
        pages_for(self.file_size)
    }

    /// Total mapped address space in bytes.
    pub fn mmap_size(&self) -> u64 {
        self.mmap_size
    }

    /// Number of chunks currently mapped.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Options the mapper was created with.
    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Resolves a logical byte offset to `(chunk index, offset within chunk)`.
    ///
    /// Chunk `i > 0` starts at `first * 2^(i-1)`, where `first` is the length
    /// of chunk 0, so the index follows from the offset directly.
    pub fn resolve(&self, offset: u64) -> Result<(usize, usize)> {
        let first = self.chunks.first().map_or(0, |chunk| chunk.map.len() as u64);
        if offset >= self.mmap_size || first == 0 {
            return Err(KvError::Invalid("offset outside mapping"));
        }
        let idx = match offset / first {
            0 => 0,
            ratio => 1 + ratio.ilog2() as usize,
        };
        let chunk = self
            .chunks
            .get(idx)
            .ok_or(KvError::Invalid("offset outside mapping"))?;
        debug_assert!(chunk.offset <= offset && offset < chunk.end());
        Ok((idx, (offset - chunk.offset) as usize))
    }

    /// Read-only view of one page.
    pub fn page(&self, id: PageId) -> Result<&[u8]> {
        let (idx, start) = self.locate(id)?;
        Ok(&self.chunks[idx].map[start..start + PAGE_SIZE])
    }

    /// Mutable view of one page. Writes reach the file through the shared
    /// mapping.
    pub fn page_mut(&mut self, id: PageId) -> Result<&mut [u8]> {
        let (idx, start) = self.locate(id)?;
        Ok(&mut self.chunks[idx].map[start..start + PAGE_SIZE])
    }

    /// Flushes every chunk to the file. Reports the first failure after
    /// attempting all chunks.
    pub fn flush(&self) -> Result<()> {
        let mut first = None;
        for chunk in &self.chunks {
            if let Err(err) = chunk.map.flush() {
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Releases every chunk in order.
    ///
    /// All chunks are released even if one fails; the first error and the
    /// number of failures are returned in [`KvError::Close`].
    pub fn close(mut self) -> Result<()> {
        release(&mut self.chunks, self.options.flush_on_close)
    }

    fn locate(&self, id: PageId) -> Result<(usize, usize)> {
        let pages = self.file_pages();
        if id.0 >= pages {
            return Err(KvError::PageOutOfBounds { page: id, pages });
        }
        // Chunk lengths are page multiples, so a page never straddles two chunks.
        self.resolve(id.offset())
    }
}

impl Drop for PageMapper {
    fn drop(&mut self) {
        if self.chunks.is_empty() {
            return;
        }
        if let Err(err) = release(&mut self.chunks, self.options.flush_on_close) {
            warn!(error = %err, "mmap.drop.release_failed");
        }
    }
}

impl std::fmt::Debug for PageMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageMapper")
            .field("file_size", &self.file_size)
            .field("mmap_size", &self.mmap_size)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

/// Page count reached from `current` by repeated `max(1, pages / 8)` steps
/// until it is at least `target`, or `None` if a step overflows.
pub fn grown_page_count(current: u64, target: u64) -> Option<u64> {
    let mut pages = current;
    while pages < target {
        pages = pages.checked_add((pages / 8).max(1))?;
    }
    Some(pages)
}

fn release(chunks: &mut Vec<Chunk>, flush: bool) -> Result<()> {
    let outcomes = chunks.drain(..).enumerate().map(|(idx, chunk)| {
        let outcome = if flush { chunk.map.flush() } else { Ok(()) };
        if let Err(err) = &outcome {
            warn!(chunk = idx, offset = chunk.offset, error = %err, "mmap.close.flush_failed");
        }
        // Dropping the map unmaps it.
        drop(chunk);
        outcome
    });
    tally_release(outcomes)
}

/// Drains every outcome, counting failures and keeping the first error.
fn tally_release(outcomes: impl Iterator<Item = std::io::Result<()>>) -> Result<()> {
    let mut failed = 0usize;
    let mut first = None;
    for outcome in outcomes {
        if let Err(err) = outcome {
            failed += 1;
            first.get_or_insert(err);
        }
    }
    match first {
        Some(source) => Err(KvError::Close { failed, source }),
        None => Ok(()),
    }
}

#[allow(unsafe_code)]
fn map_chunk(file: &File, offset: u64, len: u64, options: &MapperOptions) -> Result<MmapMut> {
    let len = usize::try_from(len).map_err(|_| KvError::Invalid("chunk exceeds address space"))?;
    let mut raw = RawMapOptions::new();
    raw.offset(offset).len(len);
    if options.populate {
        raw.populate();
    }
    // SAFETY: the mapping is MAP_SHARED over a file the caller keeps open for
    // the mapper's lifetime. Bytes past end of file are never handed out:
    // page views are bounds-checked against the tracked file size, and the
    // views borrow the mapper so they cannot outlive the chunk.
    let map = unsafe { raw.map_mut(file)? };
    Ok(map)
}
