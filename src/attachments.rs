//! Binary attachment storage (audio files referenced by posts) and the
//! reaper that removes them when their owning rows are deleted.
//!
//! Files live flat under one directory and are addressed by base name only.
//! Rows reference files, never the other way around: an orphaned file is
//! tolerable, a row pointing at a missing file is not.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::warn;
use uuid::Uuid;

use crate::constants::AUDIO_FILE_EXT;
use crate::error::ApiError;

/// Accept only a bare file name: no separators, no traversal segments
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if name.contains('/') || name.contains('\\') {
        return None;
    }
    Some(name)
}

/// Generate a fresh attachment name for an uploaded audio file
pub fn generate_file_name() -> String {
    format!("{}.{}", Uuid::new_v4(), AUDIO_FILE_EXT)
}

pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a client-supplied name to a path inside the store
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        sanitize_file_name(name).map(|name| self.dir.join(name))
    }

    /// Write an attachment; a failure here aborts the create that owns it
    pub async fn save(&self, name: &str, data: &[u8]) -> Result<(), ApiError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| ApiError::Attachment(format!("invalid attachment name '{}'", name)))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ApiError::Attachment(format!("cannot create audio directory: {}", e)))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Attachment(format!("cannot write '{}': {}", name, e)))?;

        Ok(())
    }

    pub async fn exists(&self, name: &str) -> bool {
        match self.path_for(name) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Remove one attachment. Ok(false) when the file was already gone.
    pub async fn remove(&self, name: &str) -> std::io::Result<bool> {
        let path = match self.path_for(name) {
            Some(path) => path,
            None => return Ok(false),
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove every named attachment after the owning rows are gone
    ///
    /// Missing files are fine (idempotent); other I/O failures are logged
    /// and skipped, since the rows are already deleted and the delete must
    /// not be resurrected. Returns the number of files actually removed.
    pub async fn reap(&self, names: Vec<Option<String>>) -> usize {
        let mut removed = 0;
        for name in names.into_iter().flatten() {
            match self.remove(&name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("Failed to remove attachment '{}': {}", name, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_bare_names() {
        assert_eq!(sanitize_file_name("voice.mp3"), Some("voice.mp3"));
        assert_eq!(sanitize_file_name("a-b_c.mp3"), Some("a-b_c.mp3"));
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert_eq!(sanitize_file_name("../secret.mp3"), None);
        assert_eq!(sanitize_file_name("a/b.mp3"), None);
        assert_eq!(sanitize_file_name("a\\b.mp3"), None);
        assert_eq!(sanitize_file_name("/etc/passwd"), None);
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn test_generated_names_carry_audio_extension() {
        let name = generate_file_name();
        assert!(name.ends_with(".mp3"));
        assert!(sanitize_file_name(&name).is_some());
    }
}
