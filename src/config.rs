//! Configuration management for the slide browser.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `WSI_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use wsi_browser::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Scan(config) => println!("Scanning {}", config.slides_root.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `WSI_HOST` - Server bind address (default: 0.0.0.0)
//! - `WSI_PORT` - Server port (default: 8000)
//! - `WSI_SLIDES_ROOT` - Directory holding the slides (default: Slides)
//! - `WSI_CACHE_SLIDES` - Max open slide handles (default: 5)
//! - `WSI_LRU_EVICTION` - Evict least recently used handles instead of oldest
//! - `WSI_JPEG_QUALITY` - Default JPEG quality (default: 85)
//! - `WSI_OVERVIEW_MAX_SIZE` - Default overview size (default: 2000)
//! - `WSI_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `WSI_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::slide::{EvictionPolicy, DEFAULT_HANDLE_CACHE_CAPACITY};
use crate::tile::{DEFAULT_JPEG_QUALITY, DEFAULT_OVERVIEW_MAX_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default slides directory.
pub const DEFAULT_SLIDES_ROOT: &str = "Slides";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

/// Largest accepted default overview size.
const MAX_OVERVIEW_SIZE: u32 = 16384;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Browser - Browse whole-slide image folders and stream their tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-browser")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// The selected subcommand.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server.
    Serve(ServeConfig),

    /// Classify every file below a directory and print the slides found.
    Scan(ScanConfig),
}

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WSI_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WSI_PORT")]
    pub port: u16,

    /// Directory holding the slides. Every served path stays inside it.
    #[arg(long, default_value = DEFAULT_SLIDES_ROOT, env = "WSI_SLIDES_ROOT")]
    pub slides_root: PathBuf,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of slides kept open.
    #[arg(long, default_value_t = DEFAULT_HANDLE_CACHE_CAPACITY, env = "WSI_CACHE_SLIDES")]
    pub cache_slides: usize,

    /// Evict the least recently used slide instead of the oldest one.
    #[arg(long, default_value_t = false, env = "WSI_LRU_EVICTION")]
    pub lru_eviction: bool,

    // =========================================================================
    // Image Configuration
    // =========================================================================
    /// Default JPEG quality for tiles and overviews (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Default longest side of overview images in pixels.
    #[arg(long, default_value_t = DEFAULT_OVERVIEW_MAX_SIZE, env = "WSI_OVERVIEW_MAX_SIZE")]
    pub overview_max_size: u32,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "WSI_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WSI_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.slides_root.as_os_str().is_empty() {
            return Err(
                "Slides root is required. Set --slides-root or WSI_SLIDES_ROOT".to_string(),
            );
        }
        if !self.slides_root.is_dir() {
            return Err(format!(
                "Slides root {} is not a directory",
                self.slides_root.display()
            ));
        }

        if self.cache_slides == 0 {
            return Err("cache_slides must be greater than 0".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.overview_max_size == 0 || self.overview_max_size > MAX_OVERVIEW_SIZE {
            return Err(format!(
                "overview_max_size must be between 1 and {}",
                MAX_OVERVIEW_SIZE
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Handle eviction policy selected by the flags.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        if self.lru_eviction {
            EvictionPolicy::Lru
        } else {
            EvictionPolicy::Fifo
        }
    }
}

/// Options for `scan`.
#[derive(Args, Debug, Clone)]
pub struct ScanConfig {
    /// Directory to scan.
    #[arg(long, default_value = DEFAULT_SLIDES_ROOT, env = "WSI_SLIDES_ROOT")]
    pub slides_root: PathBuf,

    /// Descend into sub-directories.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub recursive: bool,

    /// Print descriptors as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ScanConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.slides_root.is_dir() {
            return Err(format!(
                "Slides root {} is not a directory",
                self.slides_root.display()
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
