//! Domain store: sessions, markers and posts with role-gated CRUD,
//! marker range validation, cascade deletes and attachment reaping.
//!
//! Every operation follows the same order: authorize, validate, mutate.
//! The store is an explicit handle - constructed once at startup, passed
//! where it is needed, and cheap to build against a temp database in tests.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::attachments::{self, AttachmentStore};
use crate::auth::{self, Role};
use crate::error::ApiError;
use crate::oembed::VideoMetadata;
use crate::queries;
use crate::{get_marker_lock, MarkerLocks};

/// A marker row
#[derive(Debug, Clone, serde::Serialize)]
pub struct Marker {
    pub id: i64,
    pub session_id: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub created_at_ms: i64,
}

/// A post row
#[derive(Debug, Clone, serde::Serialize)]
pub struct Post {
    pub id: i64,
    pub marker_id: i64,
    pub author_type: Role,
    pub text_content: Option<String>,
    pub audio_filename: Option<String>,
    pub created_at_ms: i64,
}

/// What session creation hands back - the only time tokens leave the system
#[derive(Debug, serde::Serialize)]
pub struct SessionCredentials {
    pub id: String,
    pub creator_token: String,
    pub helper_token: String,
    pub youtube_title: Option<String>,
    pub youtube_thumbnail: Option<String>,
}

/// One row of the administrative session listing
///
/// Includes both tokens; the listing is an operator surface (see DESIGN.md).
#[derive(Debug, serde::Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub youtube_url: String,
    pub youtube_title: Option<String>,
    pub youtube_thumbnail: Option<String>,
    pub creator_token: String,
    pub helper_token: String,
    pub created_at_ms: i64,
    pub marker_count: i64,
}

/// A marker with its posts, as assembled into a session view
#[derive(Debug, serde::Serialize)]
pub struct MarkerView {
    pub id: i64,
    pub session_id: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub created_at_ms: i64,
    pub posts: Vec<Post>,
}

/// The assembled session tree: markers ordered by start time, posts
/// chronological, helper token present only for the creator
#[derive(Debug, serde::Serialize)]
pub struct SessionView {
    pub id: String,
    pub youtube_url: String,
    pub youtube_title: Option<String>,
    pub youtube_thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_token: Option<String>,
    pub created_at_ms: i64,
    pub role: Role,
    pub markers: Vec<MarkerView>,
}

/// start_time >= 0; end_time, when present, strictly after start_time
pub fn validate_bounds(start_time: f64, end_time: Option<f64>) -> Result<(), ApiError> {
    if !start_time.is_finite() || start_time < 0.0 {
        return Err(ApiError::Validation(
            "start_time must be a non-negative number".to_string(),
        ));
    }
    if let Some(end_time) = end_time {
        if !end_time.is_finite() || end_time <= start_time {
            return Err(ApiError::Validation(
                "end_time must be greater than start_time".to_string(),
            ));
        }
    }
    Ok(())
}

pub struct Store {
    pool: SqlitePool,
    attachments: AttachmentStore,
    marker_locks: MarkerLocks,
}

impl Store {
    pub fn new(pool: SqlitePool, audio_dir: PathBuf) -> Self {
        Self {
            pool,
            attachments: AttachmentStore::new(audio_dir),
            marker_locks: MarkerLocks::default(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Create a session. Unauthenticated: this is where the tokens come
    /// from, returned exactly once to the caller.
    pub async fn create_session(
        &self,
        youtube_url: &str,
        session_name: Option<&str>,
        metadata: VideoMetadata,
    ) -> Result<SessionCredentials, ApiError> {
        if youtube_url.trim().is_empty() {
            return Err(ApiError::Validation("youtube_url is required".to_string()));
        }

        let id = match session_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                let slug = auth::derive_slug(name);
                if slug.is_empty() {
                    return Err(ApiError::Validation(
                        "session_name contains no usable characters".to_string(),
                    ));
                }
                let sql = queries::sessions::exists(&slug);
                let taken: Option<i32> = sqlx::query_scalar(&sql)
                    .fetch_optional(&self.pool)
                    .await?;
                if taken.is_some() {
                    return Err(ApiError::Conflict(
                        "a session with this name already exists".to_string(),
                    ));
                }
                slug
            }
            None => auth::generate_session_id(),
        };

        let creator_token = auth::issue_token();
        let helper_token = auth::issue_token();

        let sql = queries::sessions::insert(
            &id,
            youtube_url,
            metadata.title.as_deref(),
            metadata.thumbnail_url.as_deref(),
            &creator_token,
            &helper_token,
            now_ms(),
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique_violation(e, "a session with this name already exists"))?;

        Ok(SessionCredentials {
            id,
            creator_token,
            helper_token,
            youtube_title: metadata.title,
            youtube_thumbnail: metadata.thumbnail_url,
        })
    }

    /// Assemble the full session tree for any valid token holder
    pub async fn get_session(&self, session_id: &str, token: &str) -> Result<SessionView, ApiError> {
        let role = self.require_any_role(session_id, token).await?;
        self.assemble_session_view(session_id, role).await
    }

    /// Delete a session with everything under it: markers, posts and
    /// attachment files. Creator only.
    pub async fn delete_session(&self, session_id: &str, token: &str) -> Result<(), ApiError> {
        self.require_role(session_id, token, Role::Creator).await?;

        // Attachment names are enumerated in the same transaction that
        // deletes the rows; losing the list would leak storage forever.
        let mut tx = self.pool.begin().await?;

        let sql = queries::posts::select_audio_filenames_for_session(session_id);
        let names: Vec<Option<String>> = sqlx::query_scalar(&sql).fetch_all(&mut *tx).await?;

        let sql = queries::sessions::delete_by_id(session_id);
        sqlx::query(&sql).execute(&mut *tx).await?;

        tx.commit().await?;

        self.attachments.reap(names).await;
        Ok(())
    }

    /// All sessions with their marker counts, newest first. Operator
    /// surface: the rows carry both tokens.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        let sql = queries::sessions::select_all_with_marker_counts();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| SessionSummary {
                id: row.get(0),
                youtube_url: row.get(1),
                youtube_title: row.get(2),
                youtube_thumbnail: row.get(3),
                creator_token: row.get(4),
                helper_token: row.get(5),
                created_at_ms: row.get(6),
                marker_count: row.get(7),
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Markers
    // ------------------------------------------------------------------

    /// Create a point or range marker. Creator only; range markers must
    /// not overlap an existing range in the same session.
    pub async fn create_marker(
        &self,
        session_id: &str,
        token: &str,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<Marker, ApiError> {
        self.require_role(session_id, token, Role::Creator).await?;
        validate_bounds(start_time, end_time)?;

        // The lock spans check and insert: two concurrent overlapping
        // creates must not both pass the check.
        let lock = get_marker_lock(&self.marker_locks, session_id);
        let _guard = lock.lock().await;

        if let Some(end_time) = end_time {
            self.check_overlap(session_id, start_time, end_time, None)
                .await?;
        }

        let sql = queries::markers::insert(session_id, start_time, end_time, now_ms());
        let result = sqlx::query(&sql).execute(&self.pool).await?;

        self.fetch_marker(result.last_insert_rowid()).await
    }

    /// Partial update of a marker's times; absent fields keep the stored
    /// values. Creator only. The overlap check runs again, excluding the
    /// marker itself.
    pub async fn update_marker(
        &self,
        marker_id: i64,
        token: &str,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) -> Result<Marker, ApiError> {
        let current = self.fetch_marker(marker_id).await?;
        self.require_role(&current.session_id, token, Role::Creator)
            .await?;

        // A stored end_time cannot be cleared through this path: a range
        // marker stays a range marker.
        let new_start = start_time.unwrap_or(current.start_time);
        let new_end = end_time.or(current.end_time);

        validate_bounds(new_start, new_end)?;

        let lock = get_marker_lock(&self.marker_locks, &current.session_id);
        let _guard = lock.lock().await;

        if let Some(new_end) = new_end {
            self.check_overlap(&current.session_id, new_start, new_end, Some(marker_id))
                .await?;
        }

        let sql = queries::markers::update_times(marker_id, new_start, new_end);
        sqlx::query(&sql).execute(&self.pool).await?;

        self.fetch_marker(marker_id).await
    }

    /// Delete a marker, its posts and their attachments. Creator only;
    /// unconditional once authorized.
    pub async fn delete_marker(&self, marker_id: i64, token: &str) -> Result<(), ApiError> {
        let session_id = self.session_id_of_marker(marker_id).await?;
        self.require_role(&session_id, token, Role::Creator).await?;

        let mut tx = self.pool.begin().await?;

        let sql = queries::posts::select_audio_filenames_for_marker(marker_id);
        let names: Vec<Option<String>> = sqlx::query_scalar(&sql).fetch_all(&mut *tx).await?;

        let sql = queries::markers::delete_by_id(marker_id);
        sqlx::query(&sql).execute(&mut *tx).await?;

        tx.commit().await?;

        self.attachments.reap(names).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    /// Create a post under a marker. Any valid token; the author type is
    /// the authenticated role, never client-supplied.
    pub async fn create_post(
        &self,
        marker_id: i64,
        token: &str,
        text_content: Option<String>,
        audio: Option<Bytes>,
    ) -> Result<Post, ApiError> {
        let session_id = self.session_id_of_marker(marker_id).await?;
        let role = self.require_any_role(&session_id, token).await?;

        let text_content = text_content.filter(|text| !text.is_empty());
        if text_content.is_none() && audio.is_none() {
            return Err(ApiError::Validation(
                "either text_content or audio is required".to_string(),
            ));
        }

        // Attachment first, row second: a crash between the two leaves an
        // orphan file, never a row pointing at a missing file.
        let audio_filename = match &audio {
            Some(data) => {
                let name = attachments::generate_file_name();
                self.attachments.save(&name, data).await?;
                Some(name)
            }
            None => None,
        };

        let sql = queries::posts::insert(
            marker_id,
            role.as_str(),
            text_content.as_deref(),
            audio_filename.as_deref(),
            now_ms(),
        );
        let result = match sqlx::query(&sql).execute(&self.pool).await {
            Ok(result) => result,
            Err(e) => {
                // Compensate: the row never landed, so the file must go too.
                self.attachments.reap(vec![audio_filename]).await;
                return Err(e.into());
            }
        };

        self.fetch_post(result.last_insert_rowid()).await
    }

    /// Edit a post's text. Only the role that authored it may edit.
    pub async fn update_post(
        &self,
        post_id: i64,
        token: &str,
        text_content: &str,
    ) -> Result<Post, ApiError> {
        let (post, session_id) = self.fetch_post_with_session(post_id).await?;
        let role = self.require_any_role(&session_id, token).await?;
        if role != post.author_type {
            return Err(ApiError::Authorization);
        }

        let sql = queries::posts::update_text(post_id, text_content);
        sqlx::query(&sql).execute(&self.pool).await?;

        self.fetch_post(post_id).await
    }

    /// Delete a post and its attachment. Only the role that authored it.
    pub async fn delete_post(&self, post_id: i64, token: &str) -> Result<(), ApiError> {
        let (post, session_id) = self.fetch_post_with_session(post_id).await?;
        let role = self.require_any_role(&session_id, token).await?;
        if role != post.author_type {
            return Err(ApiError::Authorization);
        }

        let sql = queries::posts::delete_by_id(post_id);
        sqlx::query(&sql).execute(&self.pool).await?;

        self.attachments.reap(vec![post.audio_filename]).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn require_any_role(&self, session_id: &str, token: &str) -> Result<Role, ApiError> {
        auth::authorize(&self.pool, session_id, token)
            .await?
            .ok_or(ApiError::Authorization)
    }

    async fn require_role(
        &self,
        session_id: &str,
        token: &str,
        required: Role,
    ) -> Result<Role, ApiError> {
        match auth::authorize(&self.pool, session_id, token).await? {
            Some(role) if role == required => Ok(role),
            _ => Err(ApiError::Authorization),
        }
    }

    async fn check_overlap(
        &self,
        session_id: &str,
        candidate_start: f64,
        candidate_end: f64,
        exclude_id: Option<i64>,
    ) -> Result<(), ApiError> {
        let sql =
            queries::markers::count_overlapping(session_id, candidate_start, candidate_end, exclude_id);
        let overlapping: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;

        if overlapping > 0 {
            return Err(ApiError::Conflict(
                "marker range overlaps with an existing range".to_string(),
            ));
        }
        Ok(())
    }

    async fn session_id_of_marker(&self, marker_id: i64) -> Result<String, ApiError> {
        let sql = queries::markers::select_session_id(marker_id);
        sqlx::query_scalar(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("marker {} not found", marker_id)))
    }

    async fn fetch_marker(&self, id: i64) -> Result<Marker, ApiError> {
        let sql = queries::markers::select_by_id(id);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("marker {} not found", id)))?;
        Ok(marker_from_row(&row))
    }

    async fn fetch_post(&self, id: i64) -> Result<Post, ApiError> {
        let sql = queries::posts::select_by_id(id);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("post {} not found", id)))?;
        post_from_row(&row)
    }

    async fn fetch_post_with_session(&self, id: i64) -> Result<(Post, String), ApiError> {
        let sql = queries::posts::select_with_session(id);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("post {} not found", id)))?;
        let post = post_from_row(&row)?;
        let session_id: String = row.get(6);
        Ok((post, session_id))
    }

    async fn assemble_session_view(
        &self,
        session_id: &str,
        role: Role,
    ) -> Result<SessionView, ApiError> {
        let sql = queries::sessions::select_by_id(session_id);
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("session '{}' not found", session_id)))?;

        let sql = queries::markers::select_for_session(session_id);
        let marker_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut markers = Vec::with_capacity(marker_rows.len());
        for marker_row in &marker_rows {
            let marker = marker_from_row(marker_row);

            let sql = queries::posts::select_for_marker(marker.id);
            let post_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
            let posts = post_rows
                .iter()
                .map(post_from_row)
                .collect::<Result<Vec<_>, _>>()?;

            markers.push(MarkerView {
                id: marker.id,
                session_id: marker.session_id,
                start_time: marker.start_time,
                end_time: marker.end_time,
                created_at_ms: marker.created_at_ms,
                posts,
            });
        }

        let helper_token = if role == Role::Creator {
            Some(row.get::<String, _>(4))
        } else {
            None
        };

        Ok(SessionView {
            id: row.get(0),
            youtube_url: row.get(1),
            youtube_title: row.get(2),
            youtube_thumbnail: row.get(3),
            helper_token,
            created_at_ms: row.get(5),
            role,
            markers,
        })
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn marker_from_row(row: &SqliteRow) -> Marker {
    Marker {
        id: row.get(0),
        session_id: row.get(1),
        start_time: row.get(2),
        end_time: row.get(3),
        created_at_ms: row.get(4),
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post, ApiError> {
    let author_type: String = row.get(2);
    Ok(Post {
        id: row.get(0),
        marker_id: row.get(1),
        author_type: Role::from_db(&author_type)?,
        text_content: row.get(3),
        audio_filename: row.get(4),
        created_at_ms: row.get(5),
    })
}

/// Two concurrent creates can both pass the slug existence check; the
/// primary key then decides, and the loser gets the same conflict.
fn conflict_on_unique_violation(e: sqlx::Error, message: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return ApiError::Conflict(message.to_string());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_accept_point_and_range() {
        assert!(validate_bounds(0.0, None).is_ok());
        assert!(validate_bounds(5.0, None).is_ok());
        assert!(validate_bounds(5.0, Some(15.0)).is_ok());
    }

    #[test]
    fn test_bounds_reject_negative_start() {
        assert!(validate_bounds(-0.5, None).is_err());
    }

    #[test]
    fn test_bounds_reject_end_not_after_start() {
        assert!(validate_bounds(10.0, Some(10.0)).is_err());
        assert!(validate_bounds(10.0, Some(4.0)).is_err());
    }

    #[test]
    fn test_bounds_reject_non_finite() {
        assert!(validate_bounds(f64::NAN, None).is_err());
        assert!(validate_bounds(0.0, Some(f64::INFINITY)).is_err());
    }
}
