use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Sessions table - one annotation workspace per shared video
#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    YoutubeUrl,
    YoutubeTitle,
    YoutubeThumbnail,
    CreatorToken,
    HelperToken,
    CreatedAtMs,
}

/// Markers table - point or range annotations on a session timeline
#[derive(Iden)]
pub enum Markers {
    Table,
    Id,
    SessionId,
    StartTime,
    EndTime,
    CreatedAtMs,
}

/// Posts table - text/audio comments attached to a marker
#[derive(Iden)]
pub enum Posts {
    Table,
    Id,
    MarkerId,
    AuthorType,
    TextContent,
    AudioFilename,
    CreatedAtMs,
}
