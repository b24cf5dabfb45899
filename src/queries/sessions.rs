use sea_query::{Expr, Func, Order, Query, SqliteQueryBuilder};

use crate::schema::{Markers, Sessions};

/// INSERT INTO sessions (id, youtube_url, youtube_title, youtube_thumbnail,
/// creator_token, helper_token, created_at_ms) VALUES (?, ?, ?, ?, ?, ?, ?)
pub fn insert(
    id: &str,
    youtube_url: &str,
    youtube_title: Option<&str>,
    youtube_thumbnail: Option<&str>,
    creator_token: &str,
    helper_token: &str,
    created_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(Sessions::Table)
        .columns([
            Sessions::Id,
            Sessions::YoutubeUrl,
            Sessions::YoutubeTitle,
            Sessions::YoutubeThumbnail,
            Sessions::CreatorToken,
            Sessions::HelperToken,
            Sessions::CreatedAtMs,
        ])
        .values_panic([
            id.into(),
            youtube_url.into(),
            youtube_title.map(|s| s.to_string()).into(),
            youtube_thumbnail.map(|s| s.to_string()).into(),
            creator_token.into(),
            helper_token.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT 1 FROM sessions WHERE id = ? (for slug collision checks)
pub fn exists(id: &str) -> String {
    Query::select()
        .expr(Expr::val(1))
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT creator_token, helper_token FROM sessions WHERE id = ?
pub fn select_tokens(id: &str) -> String {
    Query::select()
        .columns([Sessions::CreatorToken, Sessions::HelperToken])
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, youtube_url, youtube_title, youtube_thumbnail, helper_token, created_at_ms
/// FROM sessions WHERE id = ?
///
/// The creator token is never selected for assembly; it only leaves the
/// system once, from the create operation.
pub fn select_by_id(id: &str) -> String {
    Query::select()
        .columns([
            Sessions::Id,
            Sessions::YoutubeUrl,
            Sessions::YoutubeTitle,
            Sessions::YoutubeThumbnail,
            Sessions::HelperToken,
            Sessions::CreatedAtMs,
        ])
        .from(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM sessions WHERE id = ?
pub fn delete_by_id(id: &str) -> String {
    Query::delete()
        .from_table(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT s.*, COUNT(DISTINCT m.id) AS marker_count
/// FROM sessions s
/// LEFT JOIN markers m ON s.id = m.session_id
/// GROUP BY s.id
/// ORDER BY s.created_at_ms DESC
pub fn select_all_with_marker_counts() -> String {
    Query::select()
        .column((Sessions::Table, Sessions::Id))
        .column((Sessions::Table, Sessions::YoutubeUrl))
        .column((Sessions::Table, Sessions::YoutubeTitle))
        .column((Sessions::Table, Sessions::YoutubeThumbnail))
        .column((Sessions::Table, Sessions::CreatorToken))
        .column((Sessions::Table, Sessions::HelperToken))
        .column((Sessions::Table, Sessions::CreatedAtMs))
        .expr_as(
            Func::count_distinct(Expr::col((Markers::Table, Markers::Id))),
            sea_query::Alias::new("marker_count"),
        )
        .from(Sessions::Table)
        .left_join(
            Markers::Table,
            Expr::col((Sessions::Table, Sessions::Id))
                .equals((Markers::Table, Markers::SessionId)),
        )
        .group_by_col((Sessions::Table, Sessions::Id))
        .order_by((Sessions::Table, Sessions::CreatedAtMs), Order::Desc)
        .to_string(SqliteQueryBuilder)
}
