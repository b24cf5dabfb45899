//! HTTP dispatcher: maps the REST surface onto the domain store
//!
//! Thin by design. Handlers extract inputs, call one store operation and
//! serialize the result; all policy lives behind the store boundary.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use fs2::FileExt;
use serde::Deserialize;
use std::fs::File;
use std::io::ErrorKind;
use std::sync::Arc as StdArc;
use tokio_util::io::ReaderStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::ServeConfig;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::oembed::OembedClient;
use crate::store::Store;

// State for the API handlers
pub struct AppState {
    pub store: Store,
    pub oembed: OembedClient,
}

/// Run the annotation server until the process is terminated
pub fn serve(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(config.audio_dir())?;

    // One server per data directory; a second writer on the same database
    // would undermine the overlap guard.
    let lock_path = data_dir.join(".annotate_video.lock");
    let lock_file = File::create(&lock_path)?;
    lock_file.try_lock_exclusive().map_err(|_| {
        format!(
            "Another instance is already serving data directory: {}",
            data_dir.display()
        )
    })?;

    println!("Starting annotation server");
    println!("Data directory: {}", data_dir.display());
    println!("Listening on: http://[::]:{} (IPv4 + IPv6)", config.port);
    println!("Endpoints:");
    println!("  POST   /api/sessions  - Create a session (returns both tokens, once)");
    println!("  GET    /api/sessions  - List sessions (operator surface; includes tokens)");
    println!("  GET    /api/sessions/:id?token=  - Session with markers and posts");
    println!("  DELETE /api/sessions/:id?token=  - Delete session (creator)");
    println!("  POST   /api/sessions/:id/markers?token=  - Create marker (creator)");
    println!("  PUT    /api/markers/:id?token=  - Update marker times (creator)");
    println!("  DELETE /api/markers/:id?token=  - Delete marker (creator)");
    println!("  POST   /api/markers/:id/posts?token=  - Create post (creator or helper)");
    println!("  PUT    /api/posts/:id?token=  - Edit post text (author role)");
    println!("  DELETE /api/posts/:id?token=  - Delete post (author role)");
    println!("  GET    /api/audio/:filename  - Stream an audio attachment");
    println!("  GET    /health  - Health check");

    // Create tokio runtime and run server
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = db::open_database_pool(&config.db_path()).await?;
        db::init_database_schema(&pool).await?;
        db::check_database_version(&pool).await?;

        let app_state = StdArc::new(AppState {
            store: Store::new(pool, config.audio_dir()),
            oembed: OembedClient::new(config.oembed_timeout())?,
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let mut app = Router::new()
            .route("/health", get(health_handler))
            .route(
                "/api/sessions",
                post(create_session_handler).get(list_sessions_handler),
            )
            .route(
                "/api/sessions/{session_id}",
                get(get_session_handler).delete(delete_session_handler),
            )
            .route(
                "/api/sessions/{session_id}/markers",
                post(create_marker_handler),
            )
            .route(
                "/api/markers/{marker_id}",
                put(update_marker_handler)
                    .patch(update_marker_handler)
                    .delete(delete_marker_handler),
            )
            .route("/api/markers/{marker_id}/posts", post(create_post_handler))
            .route(
                "/api/posts/{post_id}",
                put(update_post_handler).delete(delete_post_handler),
            )
            .route("/api/audio/{filename}", get(audio_handler))
            .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
            .layer(cors)
            .with_state(app_state);

        // Serve a built frontend next to the API when configured
        if let Some(static_dir) = &config.static_dir {
            app = app.fallback_service(ServeDir::new(static_dir));
        }

        let listener = tokio::net::TcpListener::bind(format!("[::]:{}", config.port))
            .await
            .map_err(|e| format!("Failed to bind to port {}: {}", config.port, e))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| format!("Server error: {}", e))?;

        Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
    })
    .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    drop(lock_file);
    Ok(())
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl TokenQuery {
    /// An absent token fails exactly like a wrong one
    fn require(&self) -> ApiResult<&str> {
        self.token.as_deref().ok_or(ApiError::Authorization)
    }
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    youtube_url: Option<String>,
    session_name: Option<String>,
}

async fn create_session_handler(
    State(state): State<StdArc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let youtube_url = request
        .youtube_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("youtube_url is required".to_string()))?;

    url::Url::parse(youtube_url)
        .map_err(|e| ApiError::Validation(format!("youtube_url is not a valid URL: {}", e)))?;

    let metadata = state.oembed.lookup(youtube_url).await?;
    let created = state
        .store
        .create_session(youtube_url, request.session_name.as_deref(), metadata)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_sessions_handler(
    State(state): State<StdArc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let sessions = state.store.list_sessions().await?;
    Ok(Json(serde_json::json!({ "sessions": sessions })))
}

async fn get_session_handler(
    State(state): State<StdArc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let view = state.store.get_session(&session_id, query.require()?).await?;
    Ok(Json(view))
}

async fn delete_session_handler(
    State(state): State<StdArc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    state
        .store
        .delete_session(&session_id, query.require()?)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Deserialize)]
struct CreateMarkerRequest {
    start_time: Option<f64>,
    end_time: Option<f64>,
}

async fn create_marker_handler(
    State(state): State<StdArc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<CreateMarkerRequest>,
) -> ApiResult<impl IntoResponse> {
    let start_time = request
        .start_time
        .ok_or_else(|| ApiError::Validation("start_time is required".to_string()))?;

    let marker = state
        .store
        .create_marker(&session_id, query.require()?, start_time, request.end_time)
        .await?;

    Ok((StatusCode::CREATED, Json(marker)))
}

#[derive(Deserialize)]
struct UpdateMarkerRequest {
    start_time: Option<f64>,
    end_time: Option<f64>,
}

async fn update_marker_handler(
    State(state): State<StdArc<AppState>>,
    Path(marker_id): Path<i64>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<UpdateMarkerRequest>,
) -> ApiResult<impl IntoResponse> {
    let marker = state
        .store
        .update_marker(
            marker_id,
            query.require()?,
            request.start_time,
            request.end_time,
        )
        .await?;
    Ok(Json(marker))
}

async fn delete_marker_handler(
    State(state): State<StdArc<AppState>>,
    Path(marker_id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    state.store.delete_marker(marker_id, query.require()?).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn create_post_handler(
    State(state): State<StdArc<AppState>>,
    Path(marker_id): Path<i64>,
    Query(query): Query<TokenQuery>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let token = query.require()?.to_string();

    let mut text_content: Option<String> = None;
    let mut audio: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("text_content") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid text_content: {}", e)))?;
                text_content = Some(text);
            }
            Some("audio") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("invalid audio upload: {}", e)))?;
                if !data.is_empty() {
                    audio = Some(data);
                }
            }
            _ => {}
        }
    }

    let post = state
        .store
        .create_post(marker_id, &token, text_content, audio)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Deserialize)]
struct UpdatePostRequest {
    text_content: Option<String>,
}

async fn update_post_handler(
    State(state): State<StdArc<AppState>>,
    Path(post_id): Path<i64>,
    Query(query): Query<TokenQuery>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    let text_content = request
        .text_content
        .ok_or_else(|| ApiError::Validation("text_content is required".to_string()))?;

    let post = state
        .store
        .update_post(post_id, query.require()?, &text_content)
        .await?;
    Ok(Json(post))
}

async fn delete_post_handler(
    State(state): State<StdArc<AppState>>,
    Path(post_id): Path<i64>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    state.store.delete_post(post_id, query.require()?).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn audio_handler(
    State(state): State<StdArc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = state
        .store
        .attachments()
        .path_for(&filename)
        .ok_or_else(|| ApiError::Validation("invalid audio filename".to_string()))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!(
                "audio file '{}' not found",
                filename
            )))
        }
        Err(e) => return Err(e.into()),
    };

    let file_metadata = file.metadata().await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(file_metadata.len()));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000"),
    );
    if let Ok(modified) = file_metadata.modified() {
        if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(modified)) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body))
}
