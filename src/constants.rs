/// Expected database schema version
/// All databases must use this version for compatibility
pub const EXPECTED_DB_VERSION: &str = "1";

/// Entropy of a role token in bytes (128 bits). Tokens are capability
/// secrets: whoever presents one holds the role.
pub const TOKEN_BYTES: usize = 16;

/// Entropy of a randomly generated session id in bytes (64 bits).
/// Session ids are also treated as unguessable.
pub const SESSION_ID_BYTES: usize = 8;

/// File extension for stored audio attachments
pub const AUDIO_FILE_EXT: &str = "mp3";

/// Default cap on an uploaded attachment body
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default timeout for the video metadata lookup in seconds
pub const DEFAULT_OEMBED_TIMEOUT_SECS: u64 = 10;
