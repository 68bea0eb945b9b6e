//! Validated slide descriptors and scan statistics.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// =============================================================================
// StructureType
// =============================================================================

/// How a slide is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StructureType {
    /// Everything lives in the entry point
    #[serde(rename = "single-file")]
    SingleFile,

    /// The entry point indexes sibling image files in the same directory
    #[serde(rename = "multi-file")]
    MultiFile,

    /// The entry point has a directory with the same stem beside it
    #[serde(rename = "with-companion-dir")]
    WithCompanionDir,
}

impl StructureType {
    /// The wire name of this structure type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StructureType::SingleFile => "single-file",
            StructureType::MultiFile => "multi-file",
            StructureType::WithCompanionDir => "with-companion-dir",
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SlideDescriptor
// =============================================================================

/// One validated slide.
///
/// Descriptors are only built by the validator after the structural check for
/// their format passed, so the entry point was a regular file, multi-file
/// slides had at least one joint file and companion directories held their
/// marker file at construction time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideDescriptor {
    /// Human-readable format label (e.g. "MIRAX")
    pub name: String,

    /// File the decode engine must be given to open the slide
    pub entry_point: PathBuf,

    /// Whether the decode engine confirmed it can open the slide
    pub is_supported: bool,

    /// On-disk layout
    pub structure_type: StructureType,

    /// Files required alongside the entry point, sorted
    pub joint_files: Vec<PathBuf>,

    /// Directories required alongside the entry point
    pub companion_dirs: Vec<PathBuf>,

    /// Files carrying descriptive metadata
    pub metadata_files: Vec<PathBuf>,

    /// Format tag reported by the authoritative check
    pub format_string: Option<String>,

    /// How the slide was recognized
    pub detection_method: String,

    /// Free-form diagnostics
    pub notes: String,
}

// =============================================================================
// ScanStatistics
// =============================================================================

/// Counters updated by every classification attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    /// Files submitted for classification
    pub scanned: usize,

    /// Files that produced a descriptor
    pub detected: usize,

    /// Files that produced nothing
    pub ignored: usize,

    /// Authoritative checks that faulted
    pub errors: usize,
}
