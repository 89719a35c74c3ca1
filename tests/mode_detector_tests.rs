use axum::{
    extract::FromRequestParts,
    http::{Request, header, request::Parts},
};
use composition_gate::{
    AppConfig,
    access::{
        EditorMode,
        mode::{PREVIEW_COOKIE, issue_preview_token, preview_token_is_valid},
    },
    models::ReleaseState,
};

const PREVIEW_SECRET: &str = "test-preview-secret";

fn config() -> AppConfig {
    AppConfig {
        preview_secret: PREVIEW_SECRET.to_string(),
        ..AppConfig::default()
    }
}

fn parts(uri: &str, preview_token: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = preview_token {
        builder = builder.header(header::COOKIE, format!("{PREVIEW_COOKIE}={token}"));
    }
    let (parts, _) = builder.body(()).unwrap().into_parts();
    parts
}

async fn detect(uri: &str, preview_token: Option<&str>) -> EditorMode {
    let mut parts = parts(uri, preview_token);
    EditorMode::from_request_parts(&mut parts, &config())
        .await
        .unwrap()
}

// --- Pure Detection ---

#[test]
fn test_bypass_requires_both_signals() {
    assert!(!EditorMode::detect(false, false).is_editor_bypass());
    assert!(!EditorMode::detect(false, true).is_editor_bypass());
    assert!(!EditorMode::detect(true, false).is_editor_bypass());
    assert!(EditorMode::detect(true, true).is_editor_bypass());
}

#[test]
fn test_preview_selects_draft_content() {
    assert_eq!(EditorMode::detect(true, false).release_state(), ReleaseState::Preview);
    assert_eq!(EditorMode::detect(false, true).release_state(), ReleaseState::Published);
}

// --- Preview Token ---

#[test]
fn test_preview_token_round_trip_and_wrong_secret() {
    let token = issue_preview_token(PREVIEW_SECRET).unwrap();
    assert!(preview_token_is_valid(PREVIEW_SECRET, &token));
    assert!(!preview_token_is_valid("another-secret", &token));
    assert!(!preview_token_is_valid(PREVIEW_SECRET, "not-a-token"));
}

// --- Request Extraction ---

#[tokio::test]
async fn test_query_flag_alone_grants_nothing() {
    let mode = detect("/pages/about?is_incontext_editing_mode=true", None).await;
    assert!(!mode.is_preview());
    assert!(!mode.is_editor_bypass());
}

#[tokio::test]
async fn test_forged_preview_cookie_is_ignored() {
    let mode = detect("/pages/about?is_incontext_editing_mode=true", Some("forged")).await;
    assert!(!mode.is_preview());
    assert!(!mode.is_editor_bypass());
}

#[tokio::test]
async fn test_valid_preview_without_editor_flag() {
    let token = issue_preview_token(PREVIEW_SECRET).unwrap();
    let mode = detect("/pages/about", Some(&token)).await;
    assert!(mode.is_preview());
    assert!(!mode.is_editor_bypass());
}

#[tokio::test]
async fn test_valid_preview_with_editor_flag_bypasses() {
    let token = issue_preview_token(PREVIEW_SECRET).unwrap();
    let mode = detect("/pages/about?lang=en&is_incontext_editing_mode=true", Some(&token)).await;
    assert!(mode.is_editor_bypass());

    let mode = detect("/pages/about?is_incontext_editing_mode=false", Some(&token)).await;
    assert!(!mode.is_editor_bypass());
}
