//! Slide classification.
//!
//! The validator combines the structural rule for a file's extension with the
//! decode engine's authoritative check:
//!
//! ```text
//! path ──► regular file? ──► dedup ──► rule table ──► structural check
//!                                                          │
//!                      descriptor ◄── detect_format ◄──────┘
//!                           ▲               │ nothing
//!                           └── signature ◄─┘ (opt-in per format)
//! ```
//!
//! Scan-scoped state (processed entry points and statistics) lives in a
//! [`ScanArena`] handed to every call, so concurrent scans never share it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::descriptor::{ScanStatistics, SlideDescriptor};
use super::rules::{
    adjacent_files, lowercase_extension, rule_for_extension, tiff_variant_label, FormatRule,
    StructuralCheck, StructuralMatch, StructuralResult,
};
use super::signature::starts_with_magic;
use crate::slide::DecodeEngine;

// =============================================================================
// ScanArena
// =============================================================================

/// State of one classification pass.
#[derive(Debug, Default)]
pub struct ScanArena {
    processed: HashSet<PathBuf>,
    stats: ScanStatistics,
}

impl ScanArena {
    /// Create an empty arena with zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics accumulated so far.
    pub fn stats(&self) -> ScanStatistics {
        self.stats
    }

    /// Whether this resolved entry point already produced a descriptor.
    pub fn contains(&self, resolved: &Path) -> bool {
        self.processed.contains(resolved)
    }

    fn ignore(&mut self) {
        self.stats.ignored += 1;
    }
}

/// Result of a directory scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every descriptor found, supported or not, in scan order
    pub slides: Vec<SlideDescriptor>,

    /// Counters for the whole scan
    pub stats: ScanStatistics,
}

// =============================================================================
// FormatValidator
// =============================================================================

/// Classifies candidate files into slide descriptors.
pub struct FormatValidator<E: DecodeEngine> {
    engine: Arc<E>,
}

impl<E: DecodeEngine> Clone for FormatValidator<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Outcome of the authoritative check.
enum Capability {
    Confirmed(String),
    Unrecognized,
    Faulted,
}

impl<E: DecodeEngine> FormatValidator<E> {
    /// Create a validator confirming slides with `engine`.
    pub fn new(engine: Arc<E>) -> Self {
        Self { engine }
    }

    /// The decode engine used for confirmation.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Classify one candidate file.
    ///
    /// Returns `None` when the file is not a slide entry point. Every call
    /// updates the arena's statistics; a produced descriptor also marks the
    /// resolved entry point as processed.
    pub fn classify(&self, path: &Path, arena: &mut ScanArena) -> Option<SlideDescriptor> {
        arena.stats.scanned += 1;

        if !path.is_file() {
            arena.ignore();
            return None;
        }

        let resolved = match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!(path = %path.display(), "cannot resolve candidate: {}", e);
                arena.ignore();
                return None;
            }
        };
        if arena.contains(&resolved) {
            debug!(path = %path.display(), "already classified");
            arena.ignore();
            return None;
        }

        let Some(rule) = lowercase_extension(path).and_then(|ext| rule_for_extension(&ext)) else {
            debug!(path = %path.display(), "unknown extension");
            arena.ignore();
            return None;
        };

        let found = match rule.check.verify(path) {
            StructuralResult::Matched(found) => found,
            StructuralResult::Rejected(reason) => {
                debug!(path = %path.display(), "not a {}: {}", rule.label, reason);
                arena.ignore();
                return None;
            }
        };

        let descriptor = match self.confirm(path, arena) {
            Capability::Confirmed(tag) => Some(supported_descriptor(path, rule, found, tag)),
            Capability::Unrecognized | Capability::Faulted => {
                signature_descriptor(path, rule, found)
            }
        };

        match descriptor {
            Some(descriptor) => {
                arena.stats.detected += 1;
                arena.processed.insert(resolved);
                if descriptor.is_supported {
                    info!("Detected {}: {}", descriptor.name, path.display());
                } else {
                    warn!(
                        "Detected {} but the decode engine cannot open it: {}",
                        descriptor.name,
                        path.display()
                    );
                }
                Some(descriptor)
            }
            None => {
                debug!(path = %path.display(), "not confirmed by the decode engine");
                arena.ignore();
                None
            }
        }
    }

    /// Classify every regular file under `root`.
    ///
    /// Files are visited in file-name order, one level only unless
    /// `recursive`. A fresh arena is used, so statistics start from zero.
    pub fn scan(&self, root: &Path, recursive: bool) -> ScanReport {
        info!(root = %root.display(), recursive, "Starting slide scan");

        let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut arena = ScanArena::new();
        let mut slides = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during scan: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(descriptor) = self.classify(entry.path(), &mut arena) {
                slides.push(descriptor);
            }
        }

        let stats = arena.stats();
        info!(
            scanned = stats.scanned,
            detected = stats.detected,
            ignored = stats.ignored,
            errors = stats.errors,
            "Slide scan complete"
        );

        ScanReport { slides, stats }
    }

    fn confirm(&self, path: &Path, arena: &mut ScanArena) -> Capability {
        match self.engine.detect_format(path) {
            Ok(Some(tag)) => {
                debug!(path = %path.display(), format = %tag, "confirmed by decode engine");
                Capability::Confirmed(tag)
            }
            Ok(None) => Capability::Unrecognized,
            Err(e) => {
                debug!(path = %path.display(), "decode engine probe failed: {}", e);
                arena.stats.errors += 1;
                Capability::Faulted
            }
        }
    }
}

// =============================================================================
// Descriptor Construction
// =============================================================================

fn supported_descriptor(
    path: &Path,
    rule: &FormatRule,
    found: StructuralMatch,
    tag: String,
) -> SlideDescriptor {
    let mut joint_files = found.joint_files;
    let (name, notes) = match rule.check {
        StructuralCheck::TiffVariant { adjacent_glob } => {
            let mut notes = format!("Detected as {}", tag);
            if tag == "trestle" {
                let adjacent = adjacent_files(path, adjacent_glob);
                if !adjacent.is_empty() {
                    notes.push_str(&format!(", {} adjacent overlap files", adjacent.len()));
                }
                joint_files.extend(adjacent);
            }
            (tiff_variant_label(&tag), notes)
        }
        _ if found.notes.is_empty() => (rule.label.to_string(), rule.notes.to_string()),
        _ => (rule.label.to_string(), found.notes),
    };
    joint_files.sort();
    joint_files.dedup();

    SlideDescriptor {
        name,
        entry_point: path.to_path_buf(),
        is_supported: true,
        structure_type: rule.check.structure_type(),
        joint_files,
        companion_dirs: found.companion_dirs,
        metadata_files: found.metadata_files,
        format_string: Some(tag),
        detection_method: rule.detection_method.to_string(),
        notes,
    }
}

fn signature_descriptor(
    path: &Path,
    rule: &FormatRule,
    found: StructuralMatch,
) -> Option<SlideDescriptor> {
    let magic = rule.signature?;
    if !starts_with_magic(path, magic) {
        return None;
    }

    Some(SlideDescriptor {
        name: rule.label.to_string(),
        entry_point: path.to_path_buf(),
        is_supported: false,
        structure_type: rule.check.structure_type(),
        joint_files: found.joint_files,
        companion_dirs: found.companion_dirs,
        metadata_files: found.metadata_files,
        format_string: None,
        detection_method: format!(
            "Signature detection ({} header)",
            String::from_utf8_lossy(magic)
        ),
        notes: "Recognized by signature but the decode engine cannot open it".to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
