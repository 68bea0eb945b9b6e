//! API integration tests for browsing, metadata and tile retrieval.
//!
//! Tests verify:
//! - Tile retrieval, padding and out-of-bounds handling
//! - Directory listing and traversal rejection
//! - Error cases (missing slide, invalid level, quality, row)
//! - HTTP response codes and headers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use wsi_browser::slide::slide_id;

use super::test_utils::{is_valid_jpeg, MockEngine, SlideTree, TestApp, MOCK_GRAY};

struct Api {
    tree: SlideTree,
    router: Router,
    id: String,
}

fn api() -> Api {
    let tree = SlideTree::new();
    tree.single("a.svs");
    tree.mirax("cases/m", 1);
    tree.file("cases/readme.txt", b"notes");

    let router = TestApp::new(tree.root(), MockEngine::supporting_all(), 2).router();
    let id = slide_id(&tree.path("a.svs"));
    Api { tree, router, id }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = get(router, uri).await;
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn decode(jpeg: &[u8]) -> RgbImage {
    image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map(DynamicImage::into_rgb8)
        .unwrap()
}

// =============================================================================
// Health and Catalog
// =============================================================================

#[tokio::test]
async fn test_health() {
    let api = api();
    let (status, json) = get_json(&api.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_slides_catalog() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["slides"][0]["path"], "a.svs");
    assert_eq!(json["slides"][0]["id"], api.id.as_str());
    assert_eq!(json["slides"][1]["path"], "cases/m.mrxs");
    assert_eq!(json["slides"][1]["structure_type"], "with-companion-dir");
}

// =============================================================================
// Browsing
// =============================================================================

#[tokio::test]
async fn test_browse_root() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides/browse?path=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_path"], "/");
    assert!(json["parent_path"].is_null());
    assert_eq!(json["folders"][0]["name"], "cases");
    assert_eq!(json["slides"][0]["name"], "a.svs");
    assert_eq!(json["slides"][0]["structure_type"], "single-file");
}

#[tokio::test]
async fn test_browse_without_path_lists_root() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides/browse").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_path"], "/");
}

#[tokio::test]
async fn test_browse_subfolder() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides/browse?path=cases").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_path"], "/cases");
    assert_eq!(json["parent_path"], "/");
    // Companion folder "m" is folded into m.mrxs
    assert_eq!(json["folders"].as_array().unwrap().len(), 0);
    assert_eq!(json["slides"][0]["dependencies"][0], "cases/m/");
    assert_eq!(json["files"][0]["name"], "readme.txt");
}

#[tokio::test]
async fn test_browse_traversal_forbidden() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides/browse?path=../../etc").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "access_denied");
    assert_eq!(json["status"], 403);
}

#[tokio::test]
async fn test_browse_missing_directory() {
    let api = api();
    let (status, json) = get_json(&api.router, "/api/slides/browse?path=nowhere").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_browse_file_is_bad_request() {
    let api = api();
    let (status, _) = get_json(&api.router, "/api/slides/browse?path=a.svs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_slide_info() {
    let api = api();
    let uri = format!("/api/slides/{}/info", api.id);
    let (status, json) = get_json(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["slide_id"], api.id.as_str());
    assert_eq!(json["dimensions"], serde_json::json!([1000, 800]));
    assert_eq!(json["level_count"], 3);
    assert_eq!(json["level_downsamples"], serde_json::json!([1.0, 2.0, 4.0]));
    assert_eq!(json["vendor"], "mock");
}

#[tokio::test]
async fn test_dzi() {
    let api = api();
    let uri = format!("/api/slides/{}/dzi", api.id);
    let (status, json) = get_json(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["width"], 1000);
    assert_eq!(json["height"], 800);
    assert_eq!(json["tile_size"], 256);
    assert_eq!(json["overlap"], 0);
    assert_eq!(json["format"], "jpeg");
    assert_eq!(json["levels"], 3);
}

#[tokio::test]
async fn test_unknown_slide_not_found() {
    let api = api();
    for uri in [
        "/api/slides/000000000000/info",
        "/api/slides/000000000000/dzi",
        "/api/slides/000000000000/overview",
        "/api/slides/000000000000/tiles/0/0/0.jpg",
    ] {
        let (status, json) = get_json(&api.router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["error"], "not_found");
    }
}

#[tokio::test]
async fn test_decode_failure_hides_paths() {
    let api = api();
    // Build the index, then remove the file before it is ever opened
    let (status, _) = get_json(&api.router, "/api/slides/000000000000/dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    std::fs::remove_file(api.tree.path("a.svs")).unwrap();

    let uri = format!("/api/slides/{}/info", api.id);
    let (status, _, body) = get(&api.router, &uri).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let text = String::from_utf8_lossy(&body);
    assert!(!text.contains(api.tree.root().to_string_lossy().as_ref()));
}

// =============================================================================
// Overview
// =============================================================================

#[tokio::test]
async fn test_overview() {
    let api = api();
    let uri = format!("/api/slides/{}/overview?max_size=100", api.id);
    let (status, headers, body) = get(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
    assert!(is_valid_jpeg(&body));
    assert_eq!(decode(&body).dimensions(), (100, 80));
}

#[tokio::test]
async fn test_overview_invalid_quality() {
    let api = api();
    let uri = format!("/api/slides/{}/overview?quality=0", api.id);
    let (status, json) = get_json(&api.router, &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_quality");
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let api = api();
    let uri = format!("/api/slides/{}/tiles/0/0/0.jpg", api.id);
    let (status, headers, body) = get(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert!(is_valid_jpeg(&body), "Response should be a valid JPEG");

    let tile = decode(&body);
    assert_eq!(tile.dimensions(), (256, 256));
    assert!(tile.get_pixel(128, 128)[0].abs_diff(MOCK_GRAY) < 10);
}

#[tokio::test]
async fn test_tile_row_without_extension() {
    let api = api();
    let uri = format!("/api/slides/{}/tiles/0/1/1", api.id);
    let (status, _, body) = get(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert!(is_valid_jpeg(&body));
}

#[tokio::test]
async fn test_edge_tile_padded_black() {
    let api = api();
    // Level 2 is 250x200, a single partial tile
    let uri = format!("/api/slides/{}/tiles/2/0/0.jpg", api.id);
    let (status, _, body) = get(&api.router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    let tile = decode(&body);
    assert_eq!(tile.dimensions(), (256, 256));
    assert!(tile.get_pixel(100, 100)[0] > 150);
    assert!(tile.get_pixel(254, 254)[0] < 40);
}

#[tokio::test]
async fn test_tile_out_of_bounds_no_content() {
    let api = api();
    for (col, row) in [(4, 0), (0, 4), (99, 99)] {
        let uri = format!("/api/slides/{}/tiles/0/{}/{}.jpg", api.id, col, row);
        let (status, _, body) = get(&api.router, &uri).await;
        assert_eq!(status, StatusCode::NO_CONTENT, "{}", uri);
        assert!(body.is_empty());
    }
}

#[tokio::test]
async fn test_tile_invalid_level() {
    let api = api();
    let uri = format!("/api/slides/{}/tiles/3/0/0.jpg", api.id);
    let (status, json) = get_json(&api.router, &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_level");
}

#[tokio::test]
async fn test_tile_invalid_quality() {
    let api = api();
    for quality in [0, 101] {
        let uri = format!("/api/slides/{}/tiles/0/0/0.jpg?quality={}", api.id, quality);
        let (status, json) = get_json(&api.router, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_quality");
    }
}

#[tokio::test]
async fn test_tile_quality_changes_size() {
    let api = api();
    let low = format!("/api/slides/{}/tiles/0/0/0.jpg?quality=5", api.id);
    let high = format!("/api/slides/{}/tiles/0/0/0.jpg?quality=100", api.id);

    let (low_status, _, low_body) = get(&api.router, &low).await;
    let (high_status, _, high_body) = get(&api.router, &high).await;

    assert_eq!(low_status, StatusCode::OK);
    assert_eq!(high_status, StatusCode::OK);
    assert!(low_body.len() <= high_body.len());
}

#[tokio::test]
async fn test_tile_invalid_row() {
    let api = api();
    let uri = format!("/api/slides/{}/tiles/0/0/abc.jpg", api.id);
    let (status, json) = get_json(&api.router, &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_request");
}

#[tokio::test]
async fn test_unsupported_slide_not_served() {
    let tree = SlideTree::new();
    tree.file("zeiss.czi", b"ZISRAWFILE");
    let router = TestApp::new(tree.root(), MockEngine::supporting_all(), 2).router();

    // Listed by the catalog, absent from the tile index
    let (_, json) = get_json(&router, "/api/slides").await;
    assert_eq!(json["slides"][0]["is_supported"], false);
    let id = json["slides"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/slides/{}/info", id);
    let (status, _) = get_json(&router, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
