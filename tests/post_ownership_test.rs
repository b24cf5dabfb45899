//! # Post Authorship and Ownership Tests
//!
//! These tests verify that a post's author type is captured from the
//! authenticated role, never changes, and gates edits and deletes to the
//! matching role.

use annotate_video::auth::Role;
use annotate_video::db;
use annotate_video::error::ApiError;
use annotate_video::oembed::VideoMetadata;
use annotate_video::store::{Marker, SessionCredentials, Store};
use bytes::Bytes;

async fn create_test_store() -> (Store, tempfile::TempDir, tempfile::TempDir) {
    let (pool, db_guard) = db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    db::init_database_schema(&pool).await.unwrap();

    let audio_guard = tempfile::tempdir().unwrap();
    let store = Store::new(pool, audio_guard.path().to_path_buf());
    (store, db_guard, audio_guard)
}

async fn create_session_with_marker(store: &Store) -> (SessionCredentials, Marker) {
    let session = store
        .create_session("https://youtu.be/abc", None, VideoMetadata::default())
        .await
        .unwrap();
    let marker = store
        .create_marker(&session.id, &session.creator_token, 5.0, Some(15.0))
        .await
        .unwrap();
    (session, marker)
}

#[tokio::test]
async fn test_author_type_comes_from_the_presented_token() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let helper_post = store
        .create_post(
            marker.id,
            &session.helper_token,
            Some("hi".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(helper_post.author_type, Role::Helper);

    let creator_post = store
        .create_post(
            marker.id,
            &session.creator_token,
            Some("hello".to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(creator_post.author_type, Role::Creator);
}

#[tokio::test]
async fn test_post_requires_text_or_audio() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let err = store
        .create_post(marker.id, &session.helper_token, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    // Empty text counts as absent
    let err = store
        .create_post(marker.id, &session.helper_token, Some(String::new()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn test_audio_post_stores_the_attachment() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let post = store
        .create_post(
            marker.id,
            &session.helper_token,
            None,
            Some(Bytes::from_static(b"recorded audio")),
        )
        .await
        .unwrap();

    let name = post.audio_filename.as_deref().unwrap();
    assert!(name.ends_with(".mp3"));
    assert!(store.attachments().exists(name).await);

    let path = store.attachments().path_for(name).unwrap();
    let content = tokio::fs::read(&path).await.unwrap();
    assert_eq!(content, b"recorded audio");
}

#[tokio::test]
async fn test_post_on_unknown_marker_is_not_found() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, _marker) = create_session_with_marker(&store).await;

    let err = store
        .create_post(
            31337,
            &session.creator_token,
            Some("hi".to_string()),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_post_requires_a_valid_token() {
    let (store, _db, _audio) = create_test_store().await;
    let (_session, marker) = create_session_with_marker(&store).await;

    let err = store
        .create_post(marker.id, "bogus-token", Some("hi".to_string()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));
}

#[tokio::test]
async fn test_creator_cannot_edit_a_helper_post() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let post = store
        .create_post(
            marker.id,
            &session.helper_token,
            Some("helper wrote this".to_string()),
            None,
        )
        .await
        .unwrap();

    let err = store
        .update_post(post.id, &session.creator_token, "creator takeover")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));

    let err = store
        .delete_post(post.id, &session.creator_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));
}

#[tokio::test]
async fn test_helper_cannot_edit_a_creator_post() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let post = store
        .create_post(
            marker.id,
            &session.creator_token,
            Some("creator wrote this".to_string()),
            None,
        )
        .await
        .unwrap();

    let err = store
        .update_post(post.id, &session.helper_token, "helper takeover")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));

    let err = store
        .delete_post(post.id, &session.helper_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Authorization));
}

#[tokio::test]
async fn test_author_can_edit_their_own_post() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let post = store
        .create_post(
            marker.id,
            &session.helper_token,
            Some("first draft".to_string()),
            None,
        )
        .await
        .unwrap();

    let updated = store
        .update_post(post.id, &session.helper_token, "second draft")
        .await
        .unwrap();

    assert_eq!(updated.text_content.as_deref(), Some("second draft"));
    // Authorship is fixed at creation
    assert_eq!(updated.author_type, Role::Helper);
    assert_eq!(updated.id, post.id);
}

#[tokio::test]
async fn test_author_can_delete_their_own_post() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let post = store
        .create_post(
            marker.id,
            &session.creator_token,
            Some("disposable".to_string()),
            None,
        )
        .await
        .unwrap();

    store
        .delete_post(post.id, &session.creator_token)
        .await
        .unwrap();

    let view = store
        .get_session(&session.id, &session.creator_token)
        .await
        .unwrap();
    assert!(view.markers[0].posts.is_empty());
}

#[tokio::test]
async fn test_update_of_unknown_post_is_not_found() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, _marker) = create_session_with_marker(&store).await;

    let err = store
        .update_post(555, &session.creator_token, "text")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_text_with_quotes_and_unicode_round_trips() {
    let (store, _db, _audio) = create_test_store().await;
    let (session, marker) = create_session_with_marker(&store).await;

    let text = "it's a \"quoted\" note; naïve 音楽 100%";
    let post = store
        .create_post(
            marker.id,
            &session.creator_token,
            Some(text.to_string()),
            None,
        )
        .await
        .unwrap();
    assert_eq!(post.text_content.as_deref(), Some(text));

    let view = store
        .get_session(&session.id, &session.creator_token)
        .await
        .unwrap();
    assert_eq!(view.markers[0].posts[0].text_content.as_deref(), Some(text));
}
