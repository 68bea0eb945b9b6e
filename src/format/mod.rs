//! Slide-format structural validation.
//!
//! Many whole-slide formats spread one logical image across several files. This
//! module decides, from file layout alone, which file is the entry point of a
//! slide, which sibling files and directories it depends on, and which layout
//! it uses. The decode engine is only consulted for the final confirmation.
//!
//! # Supported layouts
//!
//! - **single-file**: SVS, NDPI, SCN, BIF, SVSLIDE, CZI and TIFF variants
//! - **multi-file**: Hamamatsu VMS/VMU, an INI entry point indexing sibling images
//! - **with-companion-dir**: MIRAX, an index file beside a directory of data chunks

pub mod descriptor;
pub mod rules;
pub mod signature;
pub mod validator;

pub use descriptor::{ScanStatistics, SlideDescriptor, StructureType};
pub use rules::{
    companion_dir_extensions, lowercase_extension, rule_for_extension, tiff_variant_label,
    FormatRule, StructuralCheck,
};
pub use validator::{FormatValidator, ScanArena, ScanReport};
