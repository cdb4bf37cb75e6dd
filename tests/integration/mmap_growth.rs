#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::path::Path;

use leafkv::primitives::mmap::{grown_page_count, INITIAL_MMAP_SIZE};
use leafkv::{config::Allocation, KvError, MapperOptions, PageId, PageMapper, Result, PAGE_SIZE};
use tempfile::tempdir;

fn create(path: &Path, len: u64) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.set_len(len)?;
    Ok(file)
}

fn sparse() -> MapperOptions {
    MapperOptions {
        allocation: Allocation::SetLen,
        ..MapperOptions::default()
    }
}

#[test]
fn mapping_size_is_initial_times_power_of_two() -> Result<()> {
    let dir = tempdir()?;
    let file = create(&dir.path().join("pow2.db"), 0)?;
    let mut mm = PageMapper::init_with(&file, sparse())?;
    for pages in [1u64, 20_000, 20_000, 40_000, 10, 70_000] {
        let chunks_before = mm.chunk_count();
        let covered = mm.mmap_size() >= pages * PAGE_SIZE as u64;
        mm.extend(&file, pages)?;
        if covered {
            assert_eq!(mm.chunk_count(), chunks_before, "covered request mapped a chunk");
        }
        assert!(mm.mmap_size() >= pages * PAGE_SIZE as u64);
        let ratio = mm.mmap_size() / INITIAL_MMAP_SIZE;
        assert_eq!(mm.mmap_size() % INITIAL_MMAP_SIZE, 0);
        assert!(ratio.is_power_of_two(), "ratio {ratio}");
    }
    mm.close()
}

#[test]
fn file_growth_is_monotonic_and_tracked() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("grow.db");
    let file = create(&path, 0)?;
    let mut mm = PageMapper::init_with(&file, sparse())?;
    let mut last = 0;
    for target in [1u64, 2, 9, 9, 50, 51, 400, 3] {
        mm.extend_file(&file, target)?;
        let pages = mm.file_pages();
        assert!(pages >= target);
        assert!(pages >= last);
        assert_eq!(Some(pages), grown_page_count(last, target));
        assert_eq!(file.metadata()?.len(), pages * PAGE_SIZE as u64);
        last = pages;
    }
    mm.close()
}

#[test]
fn init_requires_whole_pages() -> Result<()> {
    let dir = tempdir()?;
    let file = create(&dir.path().join("ragged.db"), 3 * PAGE_SIZE as u64 - 7)?;
    let err = PageMapper::init(&file).unwrap_err();
    assert!(matches!(err, KvError::MmapFileSize { .. }));
    assert!(err.to_string().contains("multiple of page size"));
    Ok(())
}

#[test]
fn reopen_sees_grown_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reopen.db");
    {
        let file = create(&path, 0)?;
        let mut mm = PageMapper::init(&file)?;
        mm.grow(&file, 12)?;
        mm.page_mut(PageId(11))?[0] = 0xab;
        mm.close()?;
    }
    let file = OpenOptions::new().read(true).write(true).open(&path)?;
    let mm = PageMapper::init(&file)?;
    assert_eq!(mm.file_pages(), 12);
    assert_eq!(mm.page(PageId(11))?[0], 0xab);
    assert!(matches!(
        mm.page(PageId(12)),
        Err(KvError::PageOutOfBounds { .. })
    ));
    Ok(())
}
