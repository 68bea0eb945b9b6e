//! Slide index tests.
//!
//! Tests verify:
//! - Identifiers resolve to supported entry points only
//! - The index is built once and goes stale until rebuilt

use std::sync::Arc;

use wsi_browser::format::FormatValidator;
use wsi_browser::slide::{slide_id, SlideIndex, SLIDE_ID_LEN};

use super::test_utils::{MockEngine, SlideTree};

fn index(tree: &SlideTree) -> SlideIndex<MockEngine> {
    let validator = FormatValidator::new(Arc::new(MockEngine::supporting_all()));
    SlideIndex::new(tree.root(), validator)
}

#[test]
fn test_mirax_sample_resolves() {
    let tree = SlideTree::new();
    let entry = tree.mirax("a/sample", 1);

    let index = index(&tree);
    assert!(!index.is_built());

    let id = slide_id(&entry);
    assert_eq!(id.len(), SLIDE_ID_LEN);
    assert_eq!(index.resolve(&id), Some(entry.clone()));
    assert!(index.is_built());

    // Companion files are never slides of their own
    assert_eq!(index.entries(), vec![(id, entry)]);
}

#[test]
fn test_unsupported_slides_are_not_indexed() {
    let tree = SlideTree::new();
    let czi = tree.file("zeiss.czi", b"ZISRAWFILE");
    let svs = tree.single("a.svs");

    let index = index(&tree);
    assert!(index.resolve(&slide_id(&czi)).is_none());
    assert!(index.resolve(&slide_id(&svs)).is_some());
    assert_eq!(index.entries().len(), 1);
}

#[test]
fn test_index_is_stale_until_rebuilt() {
    let tree = SlideTree::new();
    tree.single("first.svs");

    let index = index(&tree);
    assert_eq!(index.entries().len(), 1);

    let late = tree.single("late.svs");
    let late_id = slide_id(&late);
    assert!(index.resolve(&late_id).is_none());

    index.rebuild();
    assert_eq!(index.resolve(&late_id), Some(late));
    assert_eq!(index.entries().len(), 2);
}

#[test]
fn test_entries_sorted_by_path() {
    let tree = SlideTree::new();
    tree.single("z/last.svs");
    tree.single("a/first.ndpi");
    tree.single("m.scn");

    let paths: Vec<_> = index(&tree)
        .entries()
        .into_iter()
        .map(|(_, path)| path)
        .collect();
    assert_eq!(
        paths,
        vec![
            tree.path("a/first.ndpi"),
            tree.path("m.scn"),
            tree.path("z/last.svs"),
        ]
    );
}
