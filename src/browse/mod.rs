//! Directory navigation below the slides root.
//!
//! - [`confine`] keeps every requested path inside the root
//! - [`DirectoryBrowser`] lists one level and folds multi-file slides together

mod browser;
mod safety;

pub use browser::{
    breadcrumb, BrowseListing, CatalogEntry, DirectoryBrowser, FileEntry, FolderEntry, SlideEntry,
};
pub use safety::confine;
