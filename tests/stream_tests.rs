mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::*;

fn video_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i % 251) as u8).collect()
}

async fn setup() -> (axum::Router, i64, tempfile::TempDir) {
    let pool = test_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, video_bytes()).unwrap();
    let id = insert_movie(&pool, "Clip", &path.to_string_lossy()).await;
    (offline_app(pool), id, dir)
}

#[tokio::test]
async fn full_request_returns_whole_file() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get(&format!("/api/media/stream/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "video/mp4");
    assert_eq!(header(&response, "content-length"), "1000");
    assert_eq!(header(&response, "accept-ranges"), "bytes");
    assert_eq!(body_bytes(response).await, video_bytes());
}

#[tokio::test]
async fn bounded_range_returns_partial_content() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get_with_range(&format!("/api/media/stream/{id}"), "bytes=0-99"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), "bytes 0-99/1000");
    assert_eq!(header(&response, "content-length"), "100");
    assert_eq!(header(&response, "content-type"), "video/mp4");
    assert_eq!(body_bytes(response).await, video_bytes()[..100].to_vec());
}

#[tokio::test]
async fn open_ended_range_runs_to_end_of_file() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get_with_range(&format!("/api/media/stream/{id}"), "bytes=900-"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), "bytes 900-999/1000");
    assert_eq!(body_bytes(response).await, video_bytes()[900..].to_vec());
}

#[tokio::test]
async fn range_end_past_file_is_clamped() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get_with_range(&format!("/api/media/stream/{id}"), "bytes=950-5000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), "bytes 950-999/1000");
    assert_eq!(body_bytes(response).await.len(), 50);
}

#[tokio::test]
async fn range_beyond_file_is_not_satisfiable() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get_with_range(&format!("/api/media/stream/{id}"), "bytes=2000-"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&response, "content-range"), "bytes */1000");
}

#[tokio::test]
async fn malformed_range_serves_whole_file() {
    let (app, id, _dir) = setup().await;

    let response = app
        .oneshot(get_with_range(&format!("/api/media/stream/{id}"), "frames=1-2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.len(), 1000);
}

#[tokio::test]
async fn unknown_media_is_not_found() {
    let (app, _id, _dir) = setup().await;

    let response = app.oneshot(get("/api/media/stream/9999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Media not found");
}

#[tokio::test]
async fn file_removed_from_disk_is_not_found() {
    let (app, id, dir) = setup().await;
    std::fs::remove_file(dir.path().join("clip.mp4")).unwrap();

    let response = app
        .oneshot(get(&format!("/api/media/stream/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
