//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /api/slides/{slide_id}/tiles/{level}/{col}/{row}.jpg      │
//! │                                                                 │
//! │  ┌─────────────────────────┐  ┌─────────────────────────────┐   │
//! │  │        handlers         │  │           routes            │   │
//! │  │ (requests, JSON errors) │  │ (router config, CORS, trace)│   │
//! │  └─────────────────────────┘  └─────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    browse_handler, dzi_handler, health_handler, overview_handler, slide_info_handler,
    slides_handler, tile_handler, AppState, BrowseQueryParams, ErrorResponse, HealthResponse,
    OverviewQueryParams, SlidesResponse, TilePathParams, TileQueryParams,
};
pub use routes::{create_router, RouterConfig};
