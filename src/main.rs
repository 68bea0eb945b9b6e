//! WSI Browser - Browse whole-slide image folders and stream their tiles.
//!
//! This binary starts the HTTP server or runs a one-off scan.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_browser::{
    browse::DirectoryBrowser,
    config::{Cli, Command, ScanConfig, ServeConfig},
    format::FormatValidator,
    server::{create_router, AppState, RouterConfig},
    slide::{RasterEngine, SlideHandleCache, SlideIndex},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Scan(config) => run_scan(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let root = match canonical_root(&config.slides_root) {
        Ok(root) => root,
        Err(code) => return code,
    };

    info!("WSI Browser v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Slides root: {}", root.display());
    info!(
        "  Cache: {} open slide(s), {:?} eviction",
        config.cache_slides,
        config.eviction_policy()
    );
    info!(
        "  Defaults: JPEG quality {}, overview {}px",
        config.jpeg_quality, config.overview_max_size
    );
    if config.cors_origins.is_none() {
        warn!("  CORS: any origin");
    }

    let engine = Arc::new(RasterEngine::new());
    let validator = FormatValidator::new(engine.clone());
    let index = Arc::new(SlideIndex::new(root.clone(), validator.clone()));
    let handles =
        SlideHandleCache::with_capacity(engine, config.cache_slides, config.eviction_policy());
    let tile_service = Arc::new(TileService::new(index, handles));
    let browser = Arc::new(DirectoryBrowser::new(root, validator));

    let state = AppState::new(tile_service.clone(), browser)
        .with_jpeg_quality(config.jpeg_quality)
        .with_overview_max_size(config.overview_max_size);

    let router = create_router(state, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/api/slides", addr);
    info!("    curl 'http://{}/api/slides/browse?path='", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    tile_service.release_all();
    info!("Released all open slides");

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_cache_max_age(config.cache_max_age);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Scan Command
// =============================================================================

fn run_scan(config: ScanConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let root = match canonical_root(&config.slides_root) {
        Ok(root) => root,
        Err(code) => return code,
    };

    let validator = FormatValidator::new(Arc::new(RasterEngine::new()));
    let report = validator.scan(&root, config.recursive);

    if config.json {
        let json = serde_json::json!({
            "slides": report.slides,
            "statistics": report.stats,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("Slides under {}", root.display());
    println!("═════════════════════════════════");
    if report.slides.is_empty() {
        println!("  (no slides found)");
    }
    for slide in &report.slides {
        let marker = if slide.is_supported { "✓" } else { "✗" };
        let entry = slide
            .entry_point
            .strip_prefix(&root)
            .unwrap_or(&slide.entry_point);
        println!(
            "{} {} [{}, {}]",
            marker,
            entry.display(),
            slide.name,
            slide.structure_type
        );
        if !slide.notes.is_empty() {
            println!("    {}", slide.notes);
        }
    }
    println!();
    println!(
        "Scanned {} file(s): {} detected, {} ignored, {} error(s)",
        report.stats.scanned, report.stats.detected, report.stats.ignored, report.stats.errors
    );

    ExitCode::SUCCESS
}

// =============================================================================
// Shared
// =============================================================================

fn canonical_root(root: &std::path::Path) -> Result<PathBuf, ExitCode> {
    std::fs::canonicalize(root).map_err(|e| {
        error!("Cannot resolve slides root {}: {}", root.display(), e);
        eprintln!("Error: cannot resolve {}: {}", root.display(), e);
        ExitCode::FAILURE
    })
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_browser=debug,tower_http=debug"
    } else {
        "wsi_browser=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
