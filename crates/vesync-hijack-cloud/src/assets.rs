//! Static file serving for firmware images.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

const INDEX_FILE: &str = "index.html";

/// Serves files from a fixed root directory.
///
/// - Paths that would leave the root return 404
/// - Directories fall back to their `index.html`
/// - `GET` streams the file, `HEAD` sends headers only, anything else is 400
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto the root, resolving `.` and `..` lexically.
    ///
    /// Returns `None` if the path climbs above the root.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        let mut depth = 0usize;

        for segment in request_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    depth = depth.checked_sub(1)?;
                    resolved.pop();
                }
                _ if segment.contains('\\') || segment.contains(':') => return None,
                _ => {
                    resolved.push(segment);
                    depth += 1;
                }
            }
        }
        Some(resolved)
    }

    /// Build the response for one request.
    pub async fn respond(&self, method: &Method, request_path: &str) -> Response {
        let Some(mut path) = self.resolve(request_path) else {
            debug!(request_path, "rejecting path outside asset root");
            return StatusCode::NOT_FOUND.into_response();
        };

        let mut metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => return StatusCode::NOT_FOUND.into_response(),
        };
        if metadata.is_dir() {
            path.push(INDEX_FILE);
            metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(_) => return StatusCode::NOT_FOUND.into_response(),
            };
        }
        if !metadata.is_file() {
            return StatusCode::NOT_FOUND.into_response();
        }

        let content_length = [(header::CONTENT_LENGTH, metadata.len().to_string())];
        match *method {
            Method::HEAD => (StatusCode::OK, content_length).into_response(),
            Method::GET => match tokio::fs::File::open(&path).await {
                Ok(file) => (
                    StatusCode::OK,
                    content_length,
                    Body::from_stream(ReaderStream::new(file)),
                )
                    .into_response(),
                Err(err) => {
                    error!(path = %path.display(), error = %err, "failed to open asset");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            _ => StatusCode::BAD_REQUEST.into_response(),
        }
    }
}
