use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::{Markers, Posts};

/// INSERT INTO posts (marker_id, author_type, text_content, audio_filename, created_at_ms)
/// VALUES (?, ?, ?, ?, ?)
pub fn insert(
    marker_id: i64,
    author_type: &str,
    text_content: Option<&str>,
    audio_filename: Option<&str>,
    created_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(Posts::Table)
        .columns([
            Posts::MarkerId,
            Posts::AuthorType,
            Posts::TextContent,
            Posts::AudioFilename,
            Posts::CreatedAtMs,
        ])
        .values_panic([
            marker_id.into(),
            author_type.into(),
            text_content.map(|s| s.to_string()).into(),
            audio_filename.map(|s| s.to_string()).into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, marker_id, author_type, text_content, audio_filename, created_at_ms
/// FROM posts WHERE id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns([
            Posts::Id,
            Posts::MarkerId,
            Posts::AuthorType,
            Posts::TextContent,
            Posts::AudioFilename,
            Posts::CreatedAtMs,
        ])
        .from(Posts::Table)
        .and_where(Expr::col(Posts::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, marker_id, author_type, text_content, audio_filename, created_at_ms
/// FROM posts WHERE marker_id = ? ORDER BY created_at_ms ASC, id ASC
///
/// Chronological ordering is a contract with timeline clients; id breaks
/// ties between posts created in the same millisecond.
pub fn select_for_marker(marker_id: i64) -> String {
    Query::select()
        .columns([
            Posts::Id,
            Posts::MarkerId,
            Posts::AuthorType,
            Posts::TextContent,
            Posts::AudioFilename,
            Posts::CreatedAtMs,
        ])
        .from(Posts::Table)
        .and_where(Expr::col(Posts::MarkerId).eq(marker_id))
        .order_by(Posts::CreatedAtMs, Order::Asc)
        .order_by(Posts::Id, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT p.id, p.marker_id, p.author_type, p.text_content, p.audio_filename,
///        p.created_at_ms, m.session_id
/// FROM posts p
/// JOIN markers m ON p.marker_id = m.id
/// WHERE p.id = ?
pub fn select_with_session(id: i64) -> String {
    Query::select()
        .column((Posts::Table, Posts::Id))
        .column((Posts::Table, Posts::MarkerId))
        .column((Posts::Table, Posts::AuthorType))
        .column((Posts::Table, Posts::TextContent))
        .column((Posts::Table, Posts::AudioFilename))
        .column((Posts::Table, Posts::CreatedAtMs))
        .column((Markers::Table, Markers::SessionId))
        .from(Posts::Table)
        .inner_join(
            Markers::Table,
            Expr::col((Posts::Table, Posts::MarkerId)).equals((Markers::Table, Markers::Id)),
        )
        .and_where(Expr::col((Posts::Table, Posts::Id)).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE posts SET text_content = ? WHERE id = ?
pub fn update_text(id: i64, text_content: &str) -> String {
    Query::update()
        .table(Posts::Table)
        .value(Posts::TextContent, text_content)
        .and_where(Expr::col(Posts::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM posts WHERE id = ?
pub fn delete_by_id(id: i64) -> String {
    Query::delete()
        .from_table(Posts::Table)
        .and_where(Expr::col(Posts::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT audio_filename FROM posts WHERE marker_id = ?
pub fn select_audio_filenames_for_marker(marker_id: i64) -> String {
    Query::select()
        .column(Posts::AudioFilename)
        .from(Posts::Table)
        .and_where(Expr::col(Posts::MarkerId).eq(marker_id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT audio_filename FROM posts
/// WHERE marker_id IN (SELECT id FROM markers WHERE session_id = ?)
pub fn select_audio_filenames_for_session(session_id: &str) -> String {
    let markers_of_session = Query::select()
        .column(Markers::Id)
        .from(Markers::Table)
        .and_where(Expr::col(Markers::SessionId).eq(session_id))
        .to_owned();

    Query::select()
        .column(Posts::AudioFilename)
        .from(Posts::Table)
        .and_where(Expr::col(Posts::MarkerId).in_subquery(markers_of_session))
        .to_string(SqliteQueryBuilder)
}
