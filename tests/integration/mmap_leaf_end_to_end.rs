#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::path::Path;

use leafkv::{
    config::Allocation, KvError, LeafNode, MapperOptions, Node, PageId, PageMapper, Result,
    PAGE_SIZE,
};
use tempfile::tempdir;

fn open_rw(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

fn write_node(mm: &mut PageMapper, id: PageId, node: &LeafNode) -> Result<()> {
    assert!(node.fits(PAGE_SIZE), "node must fit in one page");
    let bytes = node.encode();
    let page = mm.page_mut(id)?;
    page[..bytes.len()].copy_from_slice(&bytes);
    page[bytes.len()..].fill(0);
    Ok(())
}

fn leaf(prefix: &str, count: usize) -> LeafNode {
    LeafNode::from_entries((0..count).map(|i| {
        (
            format!("{prefix}{i:04}").into_bytes(),
            format!("value-{i}").into_bytes(),
        )
    }))
    .expect("sorted keys")
}

#[test]
fn leaves_survive_close_and_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("leaves.db");
    let left = leaf("a", 40);
    let right = leaf("b", 25);
    {
        let file = open_rw(&path)?;
        let mut mm = PageMapper::init(&file)?;
        mm.grow(&file, 2)?;
        write_node(&mut mm, PageId(0), &left)?;
        write_node(&mut mm, PageId(1), &right)?;
        mm.close()?;
    }

    let file = open_rw(&path)?;
    let mm = PageMapper::init(&file)?;
    assert_eq!(mm.file_pages(), 2);
    let decoded_left = LeafNode::decode(mm.page(PageId(0))?)?;
    let decoded_right = match Node::decode(mm.page(PageId(1))?)? {
        Node::Leaf(leaf) => leaf,
        other => panic!("unexpected node {other:?}"),
    };
    assert_eq!(decoded_left, left);
    assert_eq!(decoded_right, right);

    let merged = decoded_left.merge(&decoded_right)?;
    assert_eq!(merged.len(), 65);
    assert!(matches!(
        decoded_right.merge(&decoded_left),
        Err(KvError::NodeMerge)
    ));
    mm.close()
}

#[test]
fn decoded_nodes_do_not_borrow_the_mapping() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("owned.db");
    let file = open_rw(&path)?;
    let mut mm = PageMapper::init_with(
        &file,
        MapperOptions {
            allocation: Allocation::SetLen,
            ..MapperOptions::default()
        },
    )?;
    mm.grow(&file, 1)?;
    let node = leaf("k", 10);
    write_node(&mut mm, PageId(0), &node)?;

    let decoded = LeafNode::decode(mm.page(PageId(0))?)?;
    // Overwrite the page and grow the mapping; the decoded copy is unaffected.
    mm.page_mut(PageId(0))?.fill(0xff);
    mm.grow(&file, (2 * leafkv::primitives::mmap::INITIAL_MMAP_SIZE / PAGE_SIZE as u64) + 1)?;
    assert_eq!(decoded, node);
    assert!(matches!(
        LeafNode::decode(mm.page(PageId(0))?),
        Err(KvError::NodeDecode(_))
    ));
    mm.close()
}

#[test]
fn copy_on_write_update_through_pages() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("cow.db");
    let file = open_rw(&path)?;
    let mut mm = PageMapper::init(&file)?;
    mm.grow(&file, 1)?;
    write_node(&mut mm, PageId(0), &leaf("k", 8))?;

    let mut next = LeafNode::decode(mm.page(PageId(0))?)?;
    assert_eq!(next.insert(b"k0003", b"updated")?, Some(b"value-3".to_vec()));
    assert_eq!(next.insert(b"k0003x", b"new")?, None);

    let (idx, found) = next.search(b"k0003x");
    assert!(found);
    assert_eq!(idx, 4);

    mm.grow(&file, 2)?;
    write_node(&mut mm, PageId(1), &next)?;
    let old = LeafNode::decode(mm.page(PageId(0))?)?;
    let new = LeafNode::decode(mm.page(PageId(1))?)?;
    assert_eq!(old.get(b"k0003"), Some(&b"value-3"[..]));
    assert_eq!(new.get(b"k0003"), Some(&b"updated"[..]));
    assert_eq!(new.len(), old.len() + 1);
    mm.close()
}
