//! Video metadata lookup via the YouTube oEmbed endpoint
//!
//! Consumed by session creation only. The lookup is bounded by a request
//! timeout so a slow upstream cannot stall creation indefinitely; any
//! failure rejects the session as having an invalid source URL.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Cached title/thumbnail for a session's video
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub thumbnail_url: Option<String>,
}

pub struct OembedClient {
    http: reqwest::Client,
}

impl OembedClient {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Internal(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Resolve title and thumbnail for a video URL
    pub async fn lookup(&self, video_url: &str) -> Result<VideoMetadata, ApiError> {
        let url = format!(
            "{}?url={}&format=json",
            OEMBED_ENDPOINT,
            urlencoding::encode(video_url)
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Dependency(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::Dependency(format!(
                "metadata endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<VideoMetadata>()
            .await
            .map_err(|e| ApiError::Dependency(e.to_string()))
    }
}
