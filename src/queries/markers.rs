use sea_query::{Expr, Func, Order, Query, SqliteQueryBuilder};

use crate::schema::Markers;

/// INSERT INTO markers (session_id, start_time, end_time, created_at_ms)
/// VALUES (?, ?, ?, ?)
pub fn insert(
    session_id: &str,
    start_time: f64,
    end_time: Option<f64>,
    created_at_ms: i64,
) -> String {
    Query::insert()
        .into_table(Markers::Table)
        .columns([
            Markers::SessionId,
            Markers::StartTime,
            Markers::EndTime,
            Markers::CreatedAtMs,
        ])
        .values_panic([
            session_id.into(),
            start_time.into(),
            end_time.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, session_id, start_time, end_time, created_at_ms
/// FROM markers WHERE id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns([
            Markers::Id,
            Markers::SessionId,
            Markers::StartTime,
            Markers::EndTime,
            Markers::CreatedAtMs,
        ])
        .from(Markers::Table)
        .and_where(Expr::col(Markers::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, session_id, start_time, end_time, created_at_ms
/// FROM markers WHERE session_id = ? ORDER BY start_time ASC
///
/// Ascending start_time ordering is a contract with timeline clients.
pub fn select_for_session(session_id: &str) -> String {
    Query::select()
        .columns([
            Markers::Id,
            Markers::SessionId,
            Markers::StartTime,
            Markers::EndTime,
            Markers::CreatedAtMs,
        ])
        .from(Markers::Table)
        .and_where(Expr::col(Markers::SessionId).eq(session_id))
        .order_by(Markers::StartTime, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT session_id FROM markers WHERE id = ?
pub fn select_session_id(id: i64) -> String {
    Query::select()
        .column(Markers::SessionId)
        .from(Markers::Table)
        .and_where(Expr::col(Markers::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT COUNT(id) FROM markers
/// WHERE session_id = ?
/// AND end_time IS NOT NULL
/// AND end_time > ?   -- candidate start
/// AND start_time < ? -- candidate end
/// [AND id <> ?]      -- when re-validating an update, the marker itself
///
/// Ranges are half-open [start, end): touching endpoints do not overlap.
/// Point markers (NULL end_time) never participate.
pub fn count_overlapping(
    session_id: &str,
    candidate_start: f64,
    candidate_end: f64,
    exclude_id: Option<i64>,
) -> String {
    let mut query = Query::select();
    query
        .expr(Func::count(Expr::col(Markers::Id)))
        .from(Markers::Table)
        .and_where(Expr::col(Markers::SessionId).eq(session_id))
        .and_where(Expr::col(Markers::EndTime).is_not_null())
        .and_where(Expr::col(Markers::EndTime).gt(candidate_start))
        .and_where(Expr::col(Markers::StartTime).lt(candidate_end));

    if let Some(id) = exclude_id {
        query.and_where(Expr::col(Markers::Id).ne(id));
    }

    query.to_string(SqliteQueryBuilder)
}

/// UPDATE markers SET start_time = ?, end_time = ? WHERE id = ?
pub fn update_times(id: i64, start_time: f64, end_time: Option<f64>) -> String {
    Query::update()
        .table(Markers::Table)
        .value(Markers::StartTime, start_time)
        .value(Markers::EndTime, end_time)
        .and_where(Expr::col(Markers::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM markers WHERE id = ?
pub fn delete_by_id(id: i64) -> String {
    Query::delete()
        .from_table(Markers::Table)
        .and_where(Expr::col(Markers::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}
