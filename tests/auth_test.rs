//! # Token and Authorization Tests
//!
//! These tests verify token issuance at session creation, role resolution
//! from presented tokens, slug-named sessions, and role-scoped redaction
//! of the helper token.

use annotate_video::auth::Role;
use annotate_video::db;
use annotate_video::error::ApiError;
use annotate_video::oembed::VideoMetadata;
use annotate_video::store::{SessionCredentials, Store};

/// Helper to create a store backed by a temp-file database and audio dir
/// Returns (store, guards) - keep the guards alive for the test's duration
async fn create_test_store() -> (Store, tempfile::TempDir, tempfile::TempDir) {
    let (pool, db_guard) = db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    db::init_database_schema(&pool).await.unwrap();

    let audio_guard = tempfile::tempdir().unwrap();
    let store = Store::new(pool, audio_guard.path().to_path_buf());
    (store, db_guard, audio_guard)
}

async fn create_session(store: &Store, name: Option<&str>) -> SessionCredentials {
    store
        .create_session("https://youtu.be/abc", name, VideoMetadata::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_session_returns_two_distinct_tokens_and_an_id() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;

    assert!(!created.id.is_empty());
    assert_ne!(created.creator_token, created.helper_token);
    // 128-bit tokens, 64-bit random ids, URL-safe encoded
    assert_eq!(created.creator_token.len(), 22);
    assert_eq!(created.helper_token.len(), 22);
    assert_eq!(created.id.len(), 11);
}

#[tokio::test]
async fn test_create_session_caches_video_metadata() {
    let (store, _db, _audio) = create_test_store().await;

    let metadata = VideoMetadata {
        title: Some("Guitar Lesson 3".to_string()),
        thumbnail_url: Some("https://img.example/abc.jpg".to_string()),
    };
    let created = store
        .create_session("https://youtu.be/abc", None, metadata)
        .await
        .unwrap();

    assert_eq!(created.youtube_title.as_deref(), Some("Guitar Lesson 3"));
    assert_eq!(
        created.youtube_thumbnail.as_deref(),
        Some("https://img.example/abc.jpg")
    );
}

#[tokio::test]
async fn test_create_session_requires_youtube_url() {
    let (store, _db, _audio) = create_test_store().await;

    let err = store
        .create_session("   ", None, VideoMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_named_session_gets_slug_id() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, Some("Tashi's  Talk!!")).await;
    assert_eq!(created.id, "tashis-talk");
}

#[tokio::test]
async fn test_duplicate_session_name_is_a_conflict() {
    let (store, _db, _audio) = create_test_store().await;

    create_session(&store, Some("My Session")).await;
    let err = store
        .create_session(
            "https://youtu.be/other",
            Some("My Session"),
            VideoMetadata::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_all_punctuation_name_is_rejected() {
    let (store, _db, _audio) = create_test_store().await;

    let err = store
        .create_session("https://youtu.be/abc", Some("!!!"), VideoMetadata::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_creator_token_resolves_to_creator_role() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;
    let view = store
        .get_session(&created.id, &created.creator_token)
        .await
        .unwrap();

    assert_eq!(view.role, Role::Creator);
}

#[tokio::test]
async fn test_helper_token_resolves_to_helper_role() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;
    let view = store
        .get_session(&created.id, &created.helper_token)
        .await
        .unwrap();

    assert_eq!(view.role, Role::Helper);
}

#[tokio::test]
async fn test_helper_token_is_redacted_for_helpers() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;

    let creator_view = store
        .get_session(&created.id, &created.creator_token)
        .await
        .unwrap();
    assert_eq!(
        creator_view.helper_token.as_deref(),
        Some(created.helper_token.as_str())
    );

    let helper_view = store
        .get_session(&created.id, &created.helper_token)
        .await
        .unwrap();
    assert!(helper_view.helper_token.is_none());
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;
    let err = store
        .get_session(&created.id, "not-a-real-token")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Authorization));
}

#[tokio::test]
async fn test_unknown_session_fails_like_a_wrong_token() {
    let (store, _db, _audio) = create_test_store().await;

    let created = create_session(&store, None).await;
    let err = store
        .get_session("no-such-session", &created.creator_token)
        .await
        .unwrap_err();

    // Same error as a bad token: session ids must not be probeable
    assert!(matches!(err, ApiError::Authorization));
}

#[tokio::test]
async fn test_tokens_do_not_cross_sessions() {
    let (store, _db, _audio) = create_test_store().await;

    let first = create_session(&store, None).await;
    let second = create_session(&store, None).await;

    let err = store
        .get_session(&first.id, &second.creator_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));
}
