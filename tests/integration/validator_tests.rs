//! Classification tests over real directory layouts.
//!
//! Tests verify:
//! - Multi-file and companion-directory structure checks
//! - Signature fallback when the decode engine rejects a file
//! - Scan statistics and per-scan deduplication

use std::sync::Arc;

use wsi_browser::format::{FormatValidator, ScanArena, StructureType};

use super::test_utils::{MockEngine, SlideTree};

fn validator(engine: MockEngine) -> FormatValidator<MockEngine> {
    FormatValidator::new(Arc::new(engine))
}

// =============================================================================
// Companion Directory (MIRAX)
// =============================================================================

#[test]
fn test_mirax_with_companion_dir() {
    let tree = SlideTree::new();
    let entry = tree.mirax("case", 2);

    let v = validator(MockEngine::supporting_all());
    let mut arena = ScanArena::new();
    let d = v.classify(&entry, &mut arena).unwrap();

    assert_eq!(d.name, "MIRAX");
    assert!(d.is_supported);
    assert_eq!(d.structure_type, StructureType::WithCompanionDir);
    assert_eq!(d.companion_dirs, vec![tree.path("case")]);
    assert_eq!(d.metadata_files, vec![tree.path("case/Slidedat.ini")]);
    assert_eq!(
        d.joint_files,
        vec![
            tree.path("case/Data0000.dat"),
            tree.path("case/Data0001.dat"),
            tree.path("case/Slidedat.ini"),
        ]
    );
    assert_eq!(d.format_string.as_deref(), Some("mirax"));
    assert_eq!(
        d.notes,
        "Index with companion dir 'case/' containing 2 data files"
    );
    assert!(d.detection_method.contains("Slidedat.ini"));
}

#[test]
fn test_mirax_without_slidedat_is_ignored() {
    let tree = SlideTree::new();
    tree.file("case/Data0000.dat", b"chunk");
    let entry = tree.file("case.mrxs", b"index");

    let v = validator(MockEngine::supporting_all());
    let mut arena = ScanArena::new();
    assert!(v.classify(&entry, &mut arena).is_none());

    let stats = arena.stats();
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.ignored, 1);
    assert_eq!(stats.detected, 0);
}

#[test]
fn test_mirax_without_data_chunks_is_ignored() {
    let tree = SlideTree::new();
    tree.file("case/Slidedat.ini", b"[GENERAL]\n");
    let entry = tree.file("case.mrxs", b"index");

    let v = validator(MockEngine::supporting_all());
    assert!(v.classify(&entry, &mut ScanArena::new()).is_none());
}

#[test]
fn test_mirax_without_companion_dir_is_ignored() {
    let tree = SlideTree::new();
    let entry = tree.file("case.mrxs", b"index");

    let v = validator(MockEngine::supporting_all());
    assert!(v.classify(&entry, &mut ScanArena::new()).is_none());
}

// =============================================================================
// Multi-File (VMS)
// =============================================================================

#[test]
fn test_vms_collects_joints_and_index() {
    let tree = SlideTree::new();
    let entry = tree.vms("scan", 2);

    let v = validator(MockEngine::supporting_all());
    let d = v.classify(&entry, &mut ScanArena::new()).unwrap();

    assert_eq!(d.name, "Hamamatsu VMS");
    assert_eq!(d.structure_type, StructureType::MultiFile);
    // Macro image is left out; the .opt index is a joint
    assert_eq!(
        d.joint_files,
        vec![
            tree.path("scan.opt"),
            tree.path("scan_0.jpg"),
            tree.path("scan_1.jpg"),
        ]
    );
    assert_eq!(d.metadata_files, vec![entry.clone()]);
    assert_eq!(d.notes, "Index with 2 JPEG tiles, index file present");
}

#[test]
fn test_vms_without_header_is_ignored() {
    let tree = SlideTree::new();
    tree.file("scan_0.jpg", b"jpeg");
    let entry = tree.file("scan.vms", b"[Something Else]\n");

    let v = validator(MockEngine::supporting_all());
    assert!(v.classify(&entry, &mut ScanArena::new()).is_none());
}

#[test]
fn test_vms_without_images_is_ignored() {
    let tree = SlideTree::new();
    let entry = tree.file("scan.vms", b"[Virtual Microscope Specimen]\n");

    let v = validator(MockEngine::supporting_all());
    assert!(v.classify(&entry, &mut ScanArena::new()).is_none());
}

#[test]
fn test_vms_rejected_by_engine_is_ignored() {
    let tree = SlideTree::new();
    let entry = tree.vms("scan", 1);

    // Structure is fine but nothing confirms it and VMS has no signature
    let v = validator(MockEngine::new());
    let mut arena = ScanArena::new();
    assert!(v.classify(&entry, &mut arena).is_none());
    assert_eq!(arena.stats().ignored, 1);
}

// =============================================================================
// Signature Fallback
// =============================================================================

#[test]
fn test_czi_signature_fallback() {
    let tree = SlideTree::new();
    let entry = tree.file("zeiss.czi", b"ZISRAWFILE\0\0\0\0payload");

    let v = validator(MockEngine::new());
    let d = v.classify(&entry, &mut ScanArena::new()).unwrap();

    assert_eq!(d.name, "Zeiss CZI");
    assert!(!d.is_supported);
    assert_eq!(d.structure_type, StructureType::SingleFile);
    assert_eq!(d.format_string, None);
    assert_eq!(d.detection_method, "Signature detection (ZISRAWFILE header)");
}

#[test]
fn test_czi_without_magic_is_ignored() {
    let tree = SlideTree::new();
    let entry = tree.file("zeiss.czi", b"not a czi");

    let v = validator(MockEngine::new());
    assert!(v.classify(&entry, &mut ScanArena::new()).is_none());
}

#[test]
fn test_faulted_probe_falls_back_to_signature() {
    let tree = SlideTree::new();
    let entry = tree.file("zeiss.czi", b"ZISRAWFILE");

    let v = validator(MockEngine::new().with_fault("czi"));
    let mut arena = ScanArena::new();
    let d = v.classify(&entry, &mut arena).unwrap();

    assert!(!d.is_supported);
    assert_eq!(arena.stats().errors, 1);
}

#[test]
fn test_faulted_probe_without_signature_is_ignored() {
    let tree = SlideTree::new();
    let entry = tree.single("broken.svs");

    let v = validator(MockEngine::new().with_fault("svs"));
    let mut arena = ScanArena::new();
    assert!(v.classify(&entry, &mut arena).is_none());

    let stats = arena.stats();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.ignored, 1);
}

// =============================================================================
// TIFF Variants
// =============================================================================

#[test]
fn test_tiff_variant_label_from_tag() {
    let tree = SlideTree::new();
    let entry = tree.single("stain.tiff");

    let v = validator(MockEngine::new().with_tag("tiff", "ventana"));
    let d = v.classify(&entry, &mut ScanArena::new()).unwrap();

    assert_eq!(d.name, "Ventana TIFF");
    assert_eq!(d.notes, "Detected as ventana");
    assert_eq!(d.structure_type, StructureType::SingleFile);
}

#[test]
fn test_trestle_attaches_overlap_files() {
    let tree = SlideTree::new();
    let entry = tree.single("tr.tif");
    tree.file("tr.tif-0b", b"overlap");
    tree.file("tr.tif-1b", b"overlap");

    let v = validator(MockEngine::new().with_tag("tif", "trestle"));
    let d = v.classify(&entry, &mut ScanArena::new()).unwrap();

    assert_eq!(d.name, "Trestle TIFF");
    assert_eq!(
        d.joint_files,
        vec![tree.path("tr.tif-0b"), tree.path("tr.tif-1b")]
    );
}

// =============================================================================
// Scans and Statistics
// =============================================================================

#[test]
fn test_uppercase_extension_is_recognized() {
    let tree = SlideTree::new();
    let entry = tree.single("UPPER.SVS");

    let v = validator(MockEngine::supporting_all());
    let d = v.classify(&entry, &mut ScanArena::new()).unwrap();
    assert_eq!(d.name, "Aperio SVS");
}

#[test]
fn test_same_file_classified_once_per_arena() {
    let tree = SlideTree::new();
    let entry = tree.single("a.svs");

    let v = validator(MockEngine::supporting_all());
    let mut arena = ScanArena::new();
    assert!(v.classify(&entry, &mut arena).is_some());
    assert!(v.classify(&entry, &mut arena).is_none());

    let stats = arena.stats();
    assert_eq!(stats.scanned, 2);
    assert_eq!(stats.detected, 1);
    assert_eq!(stats.ignored, 1);

    // A fresh arena starts over
    assert!(v.classify(&entry, &mut ScanArena::new()).is_some());
}

#[test]
fn test_missing_and_directory_candidates_are_ignored() {
    let tree = SlideTree::new();
    let dir = tree.dir("folder.svs");

    let v = validator(MockEngine::supporting_all());
    let mut arena = ScanArena::new();
    assert!(v.classify(&dir, &mut arena).is_none());
    assert!(v.classify(&tree.path("missing.svs"), &mut arena).is_none());
    assert_eq!(arena.stats().ignored, 2);
}

#[test]
fn test_recursive_scan_statistics() {
    let tree = SlideTree::new();
    tree.single("a.svs");
    tree.mirax("nested/m", 1);
    tree.file("notes.txt", b"hello");
    tree.file("zeiss.czi", b"ZISRAWFILE");

    let v = validator(MockEngine::supporting_all());
    let report = v.scan(tree.root(), true);

    let names: Vec<&str> = report.slides.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Aperio SVS", "MIRAX", "Zeiss CZI"]);

    let stats = report.stats;
    // a.svs, notes.txt, zeiss.czi, nested/m.mrxs, nested/m/{Slidedat.ini, Data0000.dat}
    assert_eq!(stats.scanned, 6);
    assert_eq!(stats.detected, 3);
    assert_eq!(stats.scanned, stats.detected + stats.ignored);
}

#[test]
fn test_flat_scan_stays_at_top_level() {
    let tree = SlideTree::new();
    tree.single("top.svs");
    tree.single("sub/deep.svs");

    let v = validator(MockEngine::supporting_all());
    let report = v.scan(tree.root(), false);

    assert_eq!(report.slides.len(), 1);
    assert_eq!(report.slides[0].entry_point, tree.path("top.svs"));
    assert_eq!(report.stats.scanned, 1);
}
