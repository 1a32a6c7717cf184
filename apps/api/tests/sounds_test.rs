//! Integration tests for the sound library and sound profile endpoints
//!
//! Deletes must remove stored files before the rows that reference them,
//! and a failed file removal must leave the rows in place.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::*;

fn delete_sound(token: Option<&str>, id: &str) -> axum::http::Request<axum::body::Body> {
    let builder = request(Method::POST, "/api/sounds/delete");
    let builder = match token {
        Some(token) => with_session(builder, token),
        None => builder,
    };
    json_body(builder, json!({"id": id}))
}

fn delete_profile(token: &str, id: &str) -> axum::http::Request<axum::body::Body> {
    empty_body(with_session(
        request(Method::DELETE, &format!("/api/sound-profiles/{}", id)),
        token,
    ))
}

#[tokio::test]
async fn test_list_sounds_newest_first() {
    let app = TestApp::new();
    let profile = app.seed_profile("Foley");
    app.backend.seed_row(
        "sounds",
        json!({
            "profile_id": profile, "name": "Old", "category": "foley",
            "storage_path": "a.wav", "mime_type": "audio/wav", "size_bytes": 1,
            "created_at": "2024-01-01T00:00:00Z"
        }),
    );
    app.backend.seed_row(
        "sounds",
        json!({
            "profile_id": profile, "name": "New", "category": "foley",
            "storage_path": "b.wav", "mime_type": "audio/wav", "size_bytes": 1,
            "created_at": "2024-06-01T00:00:00Z"
        }),
    );

    let response = app.send(get("/api/sounds")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), Some("100"));
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let names: Vec<_> = body["sounds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["New", "Old"]);
}

#[tokio::test]
async fn test_list_sounds_by_profile() {
    let app = TestApp::new();
    let foley = app.seed_profile("Foley");
    let ambience = app.seed_profile("Ambience");
    app.seed_sound(foley, "foley/door.wav");
    app.seed_sound(ambience, "ambience/rain.wav");

    let response = app
        .send(get(&format!("/api/sounds?profileId={}", ambience)))
        .await;

    let body = body_json(response).await;
    let sounds = body["sounds"].as_array().unwrap();
    assert_eq!(sounds.len(), 1);
    assert_eq!(sounds[0]["storage_path"], "ambience/rain.wav");
}

#[tokio::test]
async fn test_list_sounds_rejects_bad_profile_id() {
    let app = TestApp::new();

    let response = app.send(get("/api/sounds?profileId=abc")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_anonymous_delete_is_rejected_without_mutation() {
    let app = TestApp::new();
    let profile = app.seed_profile("Foley");
    let sound = app.seed_sound(profile, "foley/door.wav");

    let response = app.send(delete_sound(None, &sound.to_string())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.backend.call_count("storage."), 0);
    assert_eq!(app.backend.call_count("db.delete"), 0);
    assert!(app.backend.object(BUCKET, "foley/door.wav").is_some());
}

#[tokio::test]
async fn test_client_delete_is_rejected_without_mutation() {
    let app = TestApp::new();
    let token = app.client_token();
    let profile = app.seed_profile("Foley");
    let sound = app.seed_sound(profile, "foley/door.wav");

    let response = app.send(delete_sound(Some(token.as_str()), &sound.to_string())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.backend.call_count("storage."), 0);
    assert_eq!(app.backend.rows("sounds").len(), 1);
}

#[tokio::test]
async fn test_admin_delete_removes_file_before_row() {
    let app = TestApp::new();
    let token = app.admin_token();
    let profile = app.seed_profile("Foley");
    let sound = app.seed_sound(profile, "foley/door.wav");

    let response = app.send(delete_sound(Some(token.as_str()), &sound.to_string())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), Some("20"));
    assert_eq!(body_json(response).await["message"], "Sound deleted");

    let removed = app.backend.call_position("storage.remove:sounds").unwrap();
    let deleted = app.backend.call_position("db.delete:sounds").unwrap();
    assert!(removed < deleted);
    assert!(app.backend.object(BUCKET, "foley/door.wav").is_none());
    assert!(app.backend.rows("sounds").is_empty());
}

#[tokio::test]
async fn test_storage_failure_keeps_row() {
    let app = TestApp::new();
    let token = app.admin_token();
    let profile = app.seed_profile("Foley");
    let sound = app.seed_sound(profile, "foley/door.wav");
    app.backend.fail_storage_remove();

    let response = app.send(delete_sound(Some(token.as_str()), &sound.to_string())).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to delete sound file");
    assert_eq!(app.backend.call_count("db.delete"), 0);
    assert_eq!(app.backend.rows("sounds").len(), 1);
}

#[tokio::test]
async fn test_delete_unknown_sound() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app
        .send(delete_sound(Some(token.as_str()), &uuid::Uuid::new_v4().to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.backend.call_count("storage."), 0);
}

#[tokio::test]
async fn test_delete_requires_valid_id() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app.send(delete_sound(Some(token.as_str()), "")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_creates_profile() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app
        .send(json_body(
            with_session(request(Method::POST, "/api/sound-profiles"), &token),
            json!({"name": "Night Ambience", "description": "Crickets and wind"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["profile"]["slug"], "night-ambience");
    assert_eq!(app.backend.rows("sound_profiles").len(), 1);
}

#[tokio::test]
async fn test_anonymous_cannot_create_profile() {
    let app = TestApp::new();

    let response = app
        .send(post_json("/api/sound-profiles", json!({"name": "Foley"})))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.backend.rows("sound_profiles").is_empty());
}

#[tokio::test]
async fn test_profile_delete_runs_files_then_sounds_then_profile() {
    let app = TestApp::new();
    let token = app.admin_token();
    let foley = app.seed_profile("Foley");
    let ambience = app.seed_profile("Ambience");
    app.seed_sound(foley, "foley/door.wav");
    app.seed_sound(foley, "foley/steps.wav");
    app.seed_sound(ambience, "ambience/rain.wav");

    let response = app.send(delete_profile(&token, &foley.to_string())).await;

    assert_eq!(response.status(), StatusCode::OK);
    let files = app.backend.call_position("storage.remove:sounds").unwrap();
    let sounds = app.backend.call_position("db.delete:sounds").unwrap();
    let profile = app.backend.call_position("db.delete:sound_profiles").unwrap();
    assert!(files < sounds);
    assert!(sounds < profile);

    assert_eq!(app.backend.object_paths(BUCKET), vec!["ambience/rain.wav"]);
    assert_eq!(app.backend.rows("sounds").len(), 1);
    assert_eq!(app.backend.rows("sound_profiles").len(), 1);
}

#[tokio::test]
async fn test_profile_delete_stops_when_sounds_cannot_be_deleted() {
    let app = TestApp::new();
    let token = app.admin_token();
    let foley = app.seed_profile("Foley");
    app.seed_sound(foley, "foley/door.wav");
    app.backend.fail_deletes_on("sounds");

    let response = app.send(delete_profile(&token, &foley.to_string())).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to delete profile sounds");
    assert_eq!(app.backend.call_count("db.delete:sound_profiles"), 0);
    assert_eq!(app.backend.rows("sound_profiles").len(), 1);
}

#[tokio::test]
async fn test_profile_delete_unknown_profile() {
    let app = TestApp::new();
    let token = app.admin_token();

    let response = app
        .send(delete_profile(&token, &uuid::Uuid::new_v4().to_string()))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
