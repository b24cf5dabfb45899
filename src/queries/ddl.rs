use sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use crate::schema::{Markers, Metadata, Posts, Sessions};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS sessions (
///     id TEXT PRIMARY KEY,
///     youtube_url TEXT NOT NULL,
///     youtube_title TEXT,
///     youtube_thumbnail TEXT,
///     creator_token TEXT NOT NULL,
///     helper_token TEXT NOT NULL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_sessions_table() -> String {
    Table::create()
        .table(Sessions::Table)
        .if_not_exists()
        .col(ColumnDef::new(Sessions::Id).string().primary_key())
        .col(ColumnDef::new(Sessions::YoutubeUrl).string().not_null())
        .col(ColumnDef::new(Sessions::YoutubeTitle).string())
        .col(ColumnDef::new(Sessions::YoutubeThumbnail).string())
        .col(ColumnDef::new(Sessions::CreatorToken).string().not_null())
        .col(ColumnDef::new(Sessions::HelperToken).string().not_null())
        .col(
            ColumnDef::new(Sessions::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS markers (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
///     start_time REAL NOT NULL,
///     end_time REAL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_markers_table() -> String {
    Table::create()
        .table(Markers::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Markers::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Markers::SessionId).string().not_null())
        .col(ColumnDef::new(Markers::StartTime).double().not_null())
        .col(ColumnDef::new(Markers::EndTime).double())
        .col(
            ColumnDef::new(Markers::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Markers::Table, Markers::SessionId)
                .to(Sessions::Table, Sessions::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS posts (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     marker_id INTEGER NOT NULL REFERENCES markers(id) ON DELETE CASCADE,
///     author_type TEXT NOT NULL,
///     text_content TEXT,
///     audio_filename TEXT,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_posts_table() -> String {
    Table::create()
        .table(Posts::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Posts::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Posts::MarkerId).big_integer().not_null())
        .col(ColumnDef::new(Posts::AuthorType).string().not_null())
        .col(ColumnDef::new(Posts::TextContent).string())
        .col(ColumnDef::new(Posts::AudioFilename).string())
        .col(
            ColumnDef::new(Posts::CreatedAtMs)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Posts::Table, Posts::MarkerId)
                .to(Markers::Table, Markers::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_markers_session_start ON markers(session_id, start_time)
pub fn create_markers_session_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_markers_session_start")
        .table(Markers::Table)
        .col(Markers::SessionId)
        .col(Markers::StartTime)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_posts_marker_id ON posts(marker_id)
pub fn create_posts_marker_id_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_posts_marker_id")
        .table(Posts::Table)
        .col(Posts::MarkerId)
        .to_string(SqliteQueryBuilder)
}
