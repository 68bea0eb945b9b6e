//! One-level directory listing with slide recognition.
//!
//! Paths exchanged with clients are virtual: `/` is the slides root and
//! segments are separated by `/`. A listing partitions the entries of one
//! directory into sub-folders, recognized slides and other files. Files that
//! belong to a slide (joint files, companion directories) are folded into
//! that slide instead of being listed on their own.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::safety::confine;
use crate::error::BrowseError;
use crate::format::{
    companion_dir_extensions, FormatValidator, ScanArena, SlideDescriptor, StructureType,
};
use crate::slide::{slide_id, DecodeEngine};

// =============================================================================
// Listing Types
// =============================================================================

/// Contents of one directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseListing {
    pub current_path: String,
    pub parent_path: Option<String>,
    pub breadcrumb: Vec<String>,
    pub folders: Vec<FolderEntry>,
    pub slides: Vec<SlideEntry>,
    pub files: Vec<FileEntry>,
}

/// A navigable sub-directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderEntry {
    pub name: String,
    /// Virtual path of the folder
    pub path: String,
    /// Direct children, hidden ones included
    pub item_count: usize,
}

/// A recognized slide entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideEntry {
    pub name: String,
    /// Path relative to the root
    pub path: String,
    pub id: String,
    pub format_string: String,
    pub structure_type: StructureType,
    pub is_supported: bool,
    pub notes: String,
    /// Joint files and companion directories relative to the root;
    /// directories end with `/`
    pub dependencies: Vec<String>,
}

/// A file that is not a slide entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Extension with its leading dot
    pub extension: Option<String>,
    pub is_supported: bool,
    pub notes: String,
}

/// One slide in a full-tree catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    /// File name of the entry point
    pub name: String,
    /// Path relative to the root
    pub path: String,
    /// Format label
    pub format: String,
    pub structure_type: StructureType,
    pub is_supported: bool,
}

// =============================================================================
// DirectoryBrowser
// =============================================================================

/// Lists directories below a fixed root.
pub struct DirectoryBrowser<E: DecodeEngine> {
    root: PathBuf,
    validator: FormatValidator<E>,
}

impl<E: DecodeEngine> DirectoryBrowser<E> {
    pub fn new(root: impl Into<PathBuf>, validator: FormatValidator<E>) -> Self {
        Self {
            root: root.into(),
            validator,
        }
    }

    /// The configured root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List one directory level.
    pub fn list(&self, relative_path: &str) -> Result<BrowseListing, BrowseError> {
        let virtual_path = normalize_virtual(relative_path);
        let root_abs = fs::canonicalize(&self.root).map_err(|e| BrowseError::Io {
            path: "/".to_string(),
            message: e.to_string(),
        })?;

        let current_dir = confine(
            &root_abs,
            virtual_path.trim_start_matches('/'),
        )
        .map_err(|e| {
            warn!(requested = %relative_path, "rejected path: {}", e.reason);
            BrowseError::from(e)
        })?;

        if !current_dir.exists() {
            return Err(BrowseError::NotFound { path: virtual_path });
        }
        if !current_dir.is_dir() {
            return Err(BrowseError::NotADirectory { path: virtual_path });
        }

        let io_error = |e: std::io::Error| BrowseError::Io {
            path: virtual_path.clone(),
            message: e.to_string(),
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(&current_dir).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                dirs.push(name);
            } else if path.is_file() {
                files.push(name);
            }
        }
        sort_case_insensitive(&mut dirs);
        sort_case_insensitive(&mut files);

        let folders = self.folder_entries(&current_dir, &virtual_path, &dirs, &files);
        let (slides, other_files) = self.classify_files(&root_abs, &current_dir, &files);

        debug!(
            path = %virtual_path,
            folders = folders.len(),
            slides = slides.len(),
            files = other_files.len(),
            "listed directory"
        );

        Ok(BrowseListing {
            parent_path: parent_of(&virtual_path),
            breadcrumb: breadcrumb(&virtual_path),
            current_path: virtual_path,
            folders,
            slides,
            files: other_files,
        })
    }

    /// Every slide below the root, supported or not.
    pub fn catalog(&self) -> Result<Vec<CatalogEntry>, BrowseError> {
        let root_abs = fs::canonicalize(&self.root).map_err(|e| BrowseError::Io {
            path: "/".to_string(),
            message: e.to_string(),
        })?;

        let report = self.validator.scan(&root_abs, true);
        Ok(report
            .slides
            .into_iter()
            .map(|slide| CatalogEntry {
                id: slide_id(&slide.entry_point),
                name: file_name(&slide.entry_point),
                path: relative_to(&root_abs, &slide.entry_point),
                format: slide.name,
                structure_type: slide.structure_type,
                is_supported: slide.is_supported,
            })
            .collect())
    }

    fn folder_entries(
        &self,
        current_dir: &Path,
        virtual_path: &str,
        dirs: &[String],
        files: &[String],
    ) -> Vec<FolderEntry> {
        dirs.iter()
            .filter(|name| {
                let suppressed = files.iter().any(|file| is_companion_owner(file, name));
                if suppressed {
                    debug!(folder = %name, "companion directory folded into its slide");
                }
                !suppressed
            })
            .map(|name| FolderEntry {
                name: name.clone(),
                path: join_virtual(virtual_path, name),
                item_count: fs::read_dir(current_dir.join(name))
                    .map(|entries| entries.count())
                    .unwrap_or(0),
            })
            .collect()
    }

    fn classify_files(
        &self,
        root_abs: &Path,
        current_dir: &Path,
        files: &[String],
    ) -> (Vec<SlideEntry>, Vec<FileEntry>) {
        let mut arena = ScanArena::new();
        let classified: Vec<(&String, Option<SlideDescriptor>)> = files
            .iter()
            .map(|name| (name, self.validator.classify(&current_dir.join(name), &mut arena)))
            .collect();

        // Joint files living in this directory, whatever their sort position
        let joints: HashSet<PathBuf> = classified
            .iter()
            .filter_map(|(_, descriptor)| descriptor.as_ref())
            .flat_map(|descriptor| descriptor.joint_files.iter().cloned())
            .collect();

        let mut slides = Vec::new();
        let mut others = Vec::new();
        for (name, descriptor) in classified {
            let path = current_dir.join(name);
            if joints.contains(&path) {
                continue;
            }
            match descriptor {
                Some(descriptor) => slides.push(SlideEntry {
                    name: name.clone(),
                    path: relative_to(root_abs, &path),
                    id: slide_id(&path),
                    format_string: descriptor
                        .format_string
                        .clone()
                        .unwrap_or_else(|| "Unknown".to_string()),
                    structure_type: descriptor.structure_type,
                    is_supported: descriptor.is_supported,
                    dependencies: dependencies(root_abs, &descriptor),
                    notes: descriptor.notes,
                }),
                None => others.push(file_entry(name)),
            }
        }
        (slides, others)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("__")
}

fn sort_case_insensitive(names: &mut [String]) {
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_entry(name: &str) -> FileEntry {
    let extension = Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()));
    let notes = match &extension {
        Some(ext) => format!("Extension {} not recognized", ext),
        None => "Unknown format, no extension".to_string(),
    };
    FileEntry {
        name: name.to_string(),
        extension,
        is_supported: false,
        notes,
    }
}

/// Root-relative path with `/` separators.
fn relative_to(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn dependencies(root: &Path, descriptor: &SlideDescriptor) -> Vec<String> {
    let mut deps: Vec<String> = descriptor
        .companion_dirs
        .iter()
        .map(|dir| format!("{}/", relative_to(root, dir)))
        .collect();

    deps.extend(
        descriptor
            .joint_files
            .iter()
            .filter(|file| !descriptor.companion_dirs.iter().any(|dir| file.starts_with(dir)))
            .map(|file| relative_to(root, file)),
    );
    deps
}

/// True when `file` is `<dir_name>.<ext>` for an extension that owns a
/// companion directory. The stem matches exactly, the extension in any case.
fn is_companion_owner(file: &str, dir_name: &str) -> bool {
    file.strip_prefix(dir_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|ext| companion_dir_extensions().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Canonical virtual form: leading `/`, `/` separators, no trailing `/`.
fn normalize_virtual(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

fn join_virtual(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn parent_of(virtual_path: &str) -> Option<String> {
    if virtual_path == "/" {
        return None;
    }
    match virtual_path.rfind('/') {
        Some(0) | None => Some("/".to_string()),
        Some(idx) => Some(virtual_path[..idx].to_string()),
    }
}

/// Cumulative prefixes of a virtual path, starting at `/`.
pub fn breadcrumb(virtual_path: &str) -> Vec<String> {
    let mut crumbs = vec!["/".to_string()];
    let mut current = String::new();
    for segment in virtual_path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        crumbs.push(current.clone());
    }
    crumbs
}
