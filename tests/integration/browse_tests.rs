//! Directory listing tests.
//!
//! Tests verify:
//! - Partitioning into folders, slides and files with stable ordering
//! - Companion directories and joint files folded into their slide
//! - Path confinement and error cases
//! - Catalog identifiers matching the slide index

use std::sync::Arc;

use wsi_browser::browse::DirectoryBrowser;
use wsi_browser::error::BrowseError;
use wsi_browser::format::{FormatValidator, StructureType};
use wsi_browser::slide::slide_id;

use super::test_utils::{MockEngine, SlideTree, TestApp};

fn browser(tree: &SlideTree) -> DirectoryBrowser<MockEngine> {
    let validator = FormatValidator::new(Arc::new(MockEngine::supporting_all()));
    DirectoryBrowser::new(tree.root(), validator)
}

/// A root mixing every kind of entry.
fn mixed_tree() -> SlideTree {
    let tree = SlideTree::new();
    tree.file("alpha/one.txt", b"1");
    tree.file("alpha/.keep", b"");
    tree.dir("Zeta");
    tree.dir(".hidden");
    tree.dir("__pycache__");
    tree.mirax("case", 2);
    tree.vms("scan", 2);
    tree.single("b.svs");
    tree.file("readme", b"text");
    tree.file("notes.TXT", b"text");
    tree.file(".DS_Store", b"");
    tree
}

// =============================================================================
// Listing Contents
// =============================================================================

#[test]
fn test_root_listing_partitions_entries() {
    let tree = mixed_tree();
    let listing = browser(&tree).list("").unwrap();

    assert_eq!(listing.current_path, "/");
    assert_eq!(listing.parent_path, None);
    assert_eq!(listing.breadcrumb, vec!["/".to_string()]);

    let folders: Vec<&str> = listing.folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(folders, vec!["alpha", "Zeta"]);

    let slides: Vec<&str> = listing.slides.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(slides, vec!["b.svs", "case.mrxs", "scan.vms"]);

    let files: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(files, vec!["notes.TXT", "readme", "scan_macro.jpg"]);
}

#[test]
fn test_folder_entries_count_children() {
    let tree = mixed_tree();
    let listing = browser(&tree).list("/").unwrap();

    let alpha = &listing.folders[0];
    assert_eq!(alpha.path, "/alpha");
    // Hidden children are counted
    assert_eq!(alpha.item_count, 2);
    assert_eq!(listing.folders[1].item_count, 0);
}

#[test]
fn test_companion_dir_becomes_dependency() {
    let tree = mixed_tree();
    let listing = browser(&tree).list("/").unwrap();

    assert!(listing.folders.iter().all(|f| f.name != "case"));

    let mirax = listing
        .slides
        .iter()
        .find(|s| s.name == "case.mrxs")
        .unwrap();
    assert_eq!(mirax.structure_type, StructureType::WithCompanionDir);
    assert_eq!(mirax.dependencies, vec!["case/".to_string()]);
    assert_eq!(mirax.format_string, "mirax");
    assert!(mirax.is_supported);
}

#[test]
fn test_uppercase_extension_still_folds_companion_dir() {
    let tree = SlideTree::new();
    tree.file("CASE/Slidedat.ini", b"[GENERAL]\n");
    tree.file("CASE/Data0000.dat", b"chunk");
    tree.file("CASE.MRXS", b"mirax index");

    let listing = browser(&tree).list("/").unwrap();

    assert!(listing.folders.is_empty());
    assert_eq!(listing.slides.len(), 1);
    assert_eq!(listing.slides[0].name, "CASE.MRXS");
    assert_eq!(listing.slides[0].dependencies, vec!["CASE/".to_string()]);
}

#[test]
fn test_joint_files_are_not_listed() {
    let tree = mixed_tree();
    let listing = browser(&tree).list("/").unwrap();

    let names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert!(!names.contains(&"scan_0.jpg"));
    assert!(!names.contains(&"scan.opt"));

    let vms = listing.slides.iter().find(|s| s.name == "scan.vms").unwrap();
    assert_eq!(vms.structure_type, StructureType::MultiFile);
    assert_eq!(
        vms.dependencies,
        vec![
            "scan.opt".to_string(),
            "scan_0.jpg".to_string(),
            "scan_1.jpg".to_string()
        ]
    );
}

#[test]
fn test_other_file_notes() {
    let tree = mixed_tree();
    let listing = browser(&tree).list("/").unwrap();

    let readme = listing.files.iter().find(|f| f.name == "readme").unwrap();
    assert_eq!(readme.extension, None);
    assert_eq!(readme.notes, "Unknown format, no extension");
    assert!(!readme.is_supported);

    let notes = listing.files.iter().find(|f| f.name == "notes.TXT").unwrap();
    assert_eq!(notes.extension.as_deref(), Some(".TXT"));
    assert_eq!(notes.notes, "Extension .TXT not recognized");
}

#[test]
fn test_unsupported_slide_is_listed() {
    let tree = SlideTree::new();
    tree.file("zeiss.czi", b"ZISRAWFILE");

    let listing = browser(&tree).list("/").unwrap();
    assert_eq!(listing.slides.len(), 1);

    let czi = &listing.slides[0];
    assert!(!czi.is_supported);
    assert_eq!(czi.format_string, "Unknown");
    assert!(czi.dependencies.is_empty());
}

#[test]
fn test_nested_listing_paths() {
    let tree = SlideTree::new();
    tree.single("projects/2024/s1.svs");

    let b = browser(&tree);
    let listing = b.list("projects/2024/").unwrap();

    assert_eq!(listing.current_path, "/projects/2024");
    assert_eq!(listing.parent_path.as_deref(), Some("/projects"));
    assert_eq!(
        listing.breadcrumb,
        vec![
            "/".to_string(),
            "/projects".to_string(),
            "/projects/2024".to_string()
        ]
    );

    let slide = &listing.slides[0];
    assert_eq!(slide.path, "projects/2024/s1.svs");
    assert_eq!(slide.id, slide_id(&tree.path("projects/2024/s1.svs")));

    let parent = b.list("/projects").unwrap();
    assert_eq!(parent.parent_path.as_deref(), Some("/"));
    assert_eq!(parent.folders[0].path, "/projects/2024");
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_traversal_is_denied() {
    let tree = mixed_tree();
    let b = browser(&tree);

    for path in ["..", "../", "alpha/../../", "..\\..\\etc"] {
        let err = b.list(path).unwrap_err();
        assert!(
            matches!(err, BrowseError::AccessDenied { .. }),
            "{} should be denied, got {:?}",
            path,
            err
        );
    }

    // Climbing out and back in stays inside
    assert!(b.list("alpha/..").is_ok());
}

#[test]
fn test_missing_directory() {
    let tree = mixed_tree();
    let err = browser(&tree).list("nope/deeper").unwrap_err();
    assert!(matches!(err, BrowseError::NotFound { .. }));
}

#[test]
fn test_file_is_not_a_directory() {
    let tree = mixed_tree();
    let err = browser(&tree).list("b.svs").unwrap_err();
    assert!(matches!(err, BrowseError::NotADirectory { .. }));
}

// =============================================================================
// Catalog
// =============================================================================

#[test]
fn test_catalog_matches_index() {
    let tree = SlideTree::new();
    tree.single("a.svs");
    tree.mirax("nested/m", 1);
    tree.file("skip.txt", b"");

    let app = TestApp::new(tree.root(), MockEngine::supporting_all(), 2);
    let catalog = app.browser.catalog().unwrap();

    let paths: Vec<&str> = catalog.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["a.svs", "nested/m.mrxs"]);

    let mirax = &catalog[1];
    assert_eq!(mirax.name, "m.mrxs");
    assert_eq!(mirax.format, "MIRAX");
    assert_eq!(mirax.structure_type, StructureType::WithCompanionDir);

    for entry in &catalog {
        let resolved = app.tile_service.index().resolve(&entry.id).unwrap();
        assert_eq!(resolved, tree.path(&entry.path));
    }
}
