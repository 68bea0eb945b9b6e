//! Per-extension structural rules.
//!
//! Each supported vendor format is described by a [`FormatRule`] holding a
//! [`StructuralCheck`] variant. A structural check only looks at the file
//! layout around the candidate; the authoritative decode-capability check is
//! composed on top of it by the validator.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::warn;

use super::descriptor::StructureType;
use super::signature::contains_header_marker;

// =============================================================================
// Rule Table
// =============================================================================

/// Sibling layout expected by a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCheck {
    /// No sibling requirement
    SingleFile,

    /// INI entry point indexing image files in the same directory
    MultiFile {
        /// Section header expected near the start of the entry point
        header_marker: &'static str,
        /// Glob for joint image files, applied after the entry stem
        image_glob: &'static str,
        /// Kind of image file, for diagnostics
        image_kind: &'static str,
        /// Optional auxiliary index file extension
        index_extension: Option<&'static str>,
    },

    /// Directory with the entry point's stem holding data chunks
    CompanionDir {
        /// File that must exist inside the companion directory
        marker_file: &'static str,
        /// Glob for data chunks inside the companion directory
        chunk_glob: &'static str,
    },

    /// Single TIFF whose variant is only known after the authoritative check
    TiffVariant {
        /// Glob for optional adjacent overlap files of Trestle slides
        adjacent_glob: &'static str,
    },
}

impl StructuralCheck {
    /// Structure type assigned to descriptors produced by this check.
    pub const fn structure_type(&self) -> StructureType {
        match self {
            StructuralCheck::SingleFile | StructuralCheck::TiffVariant { .. } => {
                StructureType::SingleFile
            }
            StructuralCheck::MultiFile { .. } => StructureType::MultiFile,
            StructuralCheck::CompanionDir { .. } => StructureType::WithCompanionDir,
        }
    }
}

/// Structural knowledge about one vendor format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRule {
    /// Human-readable format label
    pub label: &'static str,

    /// Expected on-disk layout
    pub check: StructuralCheck,

    /// Magic bytes recognizing the format when the decode engine cannot
    pub signature: Option<&'static [u8]>,

    /// Detection method reported on success
    pub detection_method: &'static str,

    /// Notes reported for single-file formats
    pub notes: &'static str,
}

const SINGLE_FILE_METHOD: &str = "Decode engine format validation";

const RULES: &[(&str, FormatRule)] = &[
    (
        "vms",
        FormatRule {
            label: "Hamamatsu VMS",
            check: StructuralCheck::MultiFile {
                header_marker: "[Virtual Microscope Specimen]",
                image_glob: "*.jpg",
                image_kind: "JPEG",
                index_extension: Some("opt"),
            },
            signature: None,
            detection_method: "VMS INI validation + JPEG joints detection",
            notes: "",
        },
    ),
    (
        "vmu",
        FormatRule {
            label: "Hamamatsu VMU",
            check: StructuralCheck::MultiFile {
                header_marker: "[Uncompressed Virtual Microscope Specimen]",
                image_glob: "*.ngr",
                image_kind: "NGR",
                index_extension: None,
            },
            signature: None,
            detection_method: "VMU INI validation + NGR joints detection",
            notes: "",
        },
    ),
    (
        "ndpi",
        FormatRule {
            label: "Hamamatsu NDPI",
            check: StructuralCheck::SingleFile,
            signature: None,
            detection_method: SINGLE_FILE_METHOD,
            notes: "Single TIFF-like file, no joints required",
        },
    ),
    (
        "mrxs",
        FormatRule {
            label: "MIRAX",
            check: StructuralCheck::CompanionDir {
                marker_file: "Slidedat.ini",
                chunk_glob: "Data*.dat",
            },
            signature: None,
            detection_method: "MRXS index + companion dir validation + Slidedat.ini check",
            notes: "",
        },
    ),
    (
        "svs",
        FormatRule {
            label: "Aperio SVS",
            check: StructuralCheck::SingleFile,
            signature: None,
            detection_method: SINGLE_FILE_METHOD,
            notes: "Single-file TIFF format",
        },
    ),
    (
        "scn",
        FormatRule {
            label: "Leica SCN",
            check: StructuralCheck::SingleFile,
            signature: None,
            detection_method: SINGLE_FILE_METHOD,
            notes: "Single BigTIFF file",
        },
    ),
    (
        "bif",
        FormatRule {
            label: "Ventana BIF",
            check: StructuralCheck::SingleFile,
            signature: None,
            detection_method: SINGLE_FILE_METHOD,
            notes: "Single-file BIF format",
        },
    ),
    (
        "svslide",
        FormatRule {
            label: "Sakura",
            check: StructuralCheck::SingleFile,
            signature: None,
            detection_method: SINGLE_FILE_METHOD,
            notes: "SQLite database format",
        },
    ),
    (
        "czi",
        FormatRule {
            label: "Zeiss CZI",
            check: StructuralCheck::SingleFile,
            signature: Some(b"ZISRAWFILE"),
            detection_method: SINGLE_FILE_METHOD,
            notes: "Single-file CZI with embedded image pyramid",
        },
    ),
    (
        "tif",
        FormatRule {
            label: "TIFF",
            check: StructuralCheck::TiffVariant {
                adjacent_glob: "*.tif-*b",
            },
            signature: None,
            detection_method: "Decode engine format validation on TIFF",
            notes: "",
        },
    ),
    (
        "tiff",
        FormatRule {
            label: "TIFF",
            check: StructuralCheck::TiffVariant {
                adjacent_glob: "*.tif-*b",
            },
            signature: None,
            detection_method: "Decode engine format validation on TIFF",
            notes: "",
        },
    ),
];

/// Look up the rule for a lowercase extension without the leading dot.
pub fn rule_for_extension(extension: &str) -> Option<&'static FormatRule> {
    RULES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, rule)| rule)
}

/// Lowercase extension of a path, without the dot.
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Extensions of formats whose entry point has a companion directory.
pub fn companion_dir_extensions() -> impl Iterator<Item = &'static str> {
    RULES
        .iter()
        .filter(|(_, rule)| matches!(rule.check, StructuralCheck::CompanionDir { .. }))
        .map(|(ext, _)| *ext)
}

/// Display name of a TIFF variant from its format tag.
pub fn tiff_variant_label(format_tag: &str) -> String {
    match format_tag {
        "aperio" => "Aperio TIFF".to_string(),
        "ventana" => "Ventana TIFF".to_string(),
        "trestle" => "Trestle TIFF".to_string(),
        "generic-tiff" => "Generic Pyramidal TIFF".to_string(),
        "philips" => "Philips TIFF".to_string(),
        other => format!("TIFF ({})", other),
    }
}

// =============================================================================
// Structural Checks
// =============================================================================

/// Files discovered by a successful structural check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralMatch {
    pub joint_files: Vec<PathBuf>,
    pub companion_dirs: Vec<PathBuf>,
    pub metadata_files: Vec<PathBuf>,
    pub notes: String,
}

/// Outcome of a structural check.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralResult {
    /// The layout matches the format
    Matched(StructuralMatch),

    /// The layout does not match; the reason is for diagnostics
    Rejected(String),
}

impl StructuralCheck {
    /// Verify the sibling layout around `entry`.
    pub fn verify(&self, entry: &Path) -> StructuralResult {
        match *self {
            StructuralCheck::SingleFile | StructuralCheck::TiffVariant { .. } => {
                StructuralResult::Matched(StructuralMatch::default())
            }
            StructuralCheck::MultiFile {
                header_marker,
                image_glob,
                image_kind,
                index_extension,
            } => verify_multi_file(entry, header_marker, image_glob, image_kind, index_extension),
            StructuralCheck::CompanionDir {
                marker_file,
                chunk_glob,
            } => verify_companion_dir(entry, marker_file, chunk_glob),
        }
    }
}

fn verify_multi_file(
    entry: &Path,
    header_marker: &str,
    image_glob: &str,
    image_kind: &str,
    index_extension: Option<&str>,
) -> StructuralResult {
    if !contains_header_marker(entry, header_marker) {
        return StructuralResult::Rejected(format!("missing {} header", header_marker));
    }

    let (Some(dir), Some(stem)) = (entry.parent(), file_stem(entry)) else {
        return StructuralResult::Rejected("entry point has no parent or stem".to_string());
    };

    let images: Vec<PathBuf> = matching_files(dir, &stem, image_glob)
        .into_iter()
        .filter(|path| !is_auxiliary_image(path))
        .collect();

    if images.is_empty() {
        warn!(
            entry = %entry.display(),
            "{} index without {} joints",
            header_marker, image_kind
        );
        return StructuralResult::Rejected(format!("no {} joint files", image_kind));
    }

    let image_count = images.len();
    let mut joint_files = images;
    let index_file = index_extension
        .map(|ext| entry.with_extension(ext))
        .filter(|path| path.is_file());
    if let Some(ref index) = index_file {
        joint_files.push(index.clone());
    }
    joint_files.sort();
    joint_files.dedup();

    let mut notes = format!("Index with {} {} tiles", image_count, image_kind);
    if index_file.is_some() {
        notes.push_str(", index file present");
    }

    StructuralResult::Matched(StructuralMatch {
        joint_files,
        companion_dirs: Vec::new(),
        metadata_files: vec![entry.to_path_buf()],
        notes,
    })
}

fn verify_companion_dir(entry: &Path, marker_file: &str, chunk_glob: &str) -> StructuralResult {
    let Some(companion) = companion_dir_of(entry) else {
        return StructuralResult::Rejected("entry point has no parent or stem".to_string());
    };

    if !companion.is_dir() {
        warn!(
            entry = %entry.display(),
            "missing companion dir (expected {}/)",
            companion.display()
        );
        return StructuralResult::Rejected("missing companion directory".to_string());
    }

    let marker = companion.join(marker_file);
    if !marker.is_file() {
        warn!(
            companion = %companion.display(),
            "companion dir missing {}",
            marker_file
        );
        return StructuralResult::Rejected(format!("missing {}", marker_file));
    }

    let chunks = matching_files(&companion, "", chunk_glob);
    if chunks.is_empty() {
        warn!(
            companion = %companion.display(),
            "companion dir missing {} files",
            chunk_glob
        );
        return StructuralResult::Rejected(format!("no {} files", chunk_glob));
    }

    let joint_files = directory_entries(&companion);
    let companion_name = companion
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    StructuralResult::Matched(StructuralMatch {
        joint_files,
        notes: format!(
            "Index with companion dir '{}/' containing {} data files",
            companion_name,
            chunks.len()
        ),
        companion_dirs: vec![companion],
        metadata_files: vec![marker],
    })
}

/// Trestle overlap files adjacent to a TIFF entry point.
pub fn adjacent_files(entry: &Path, adjacent_glob: &str) -> Vec<PathBuf> {
    match (entry.parent(), file_stem(entry)) {
        (Some(dir), Some(stem)) => matching_files(dir, &stem, adjacent_glob),
        _ => Vec::new(),
    }
}

/// The directory with the entry point's stem beside it.
pub fn companion_dir_of(entry: &Path) -> Option<PathBuf> {
    let stem = file_stem(entry)?;
    Some(entry.parent()?.join(stem))
}

// =============================================================================
// Helpers
// =============================================================================

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Overview and map images shipped next to the real tiles.
fn is_auxiliary_image(path: &Path) -> bool {
    file_stem(path)
        .map(|stem| stem.contains("_macro") || stem.contains("_map"))
        .unwrap_or(false)
}

fn glob_matcher(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern).case_insensitive(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            warn!("invalid glob pattern {}: {}", pattern, e);
            None
        }
    }
}

/// Regular files in `dir` whose name starts with `prefix` and matches `pattern`.
fn matching_files(dir: &Path, prefix: &str, pattern: &str) -> Vec<PathBuf> {
    let Some(matcher) = glob_matcher(pattern) else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with(prefix) && matcher.is_match(name))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

fn directory_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    paths
}

// =============================================================================
// Tests
// =============================================================================
