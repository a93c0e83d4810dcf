//! Response building: fixed pages, static files, redirects.
//!
//! # Responsibilities
//! - Hold the index, message and error documents
//! - Resolve request paths inside the web root
//! - Guess content types from file extensions (mime_guess)
//!
//! # Design Decisions
//! - Pages are read once at construction; embedded copies stand in for
//!   files missing from the web root
//! - Any failure to resolve or read a static file is a 404, never an error

use std::path::{Component, Path, PathBuf};

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const DEFAULT_INDEX: &str = include_str!("../../front/index.html");
const DEFAULT_MESSAGE: &str = include_str!("../../front/message.html");
const DEFAULT_ERROR: &str = include_str!("../../front/error.html");

/// Content type used when the extension is unknown.
pub const FALLBACK_MIME: &str = "text/plain";

/// The fixed HTML documents served by the front door.
#[derive(Debug, Clone)]
pub struct Pages {
    index: Bytes,
    message: Bytes,
    error: Bytes,
}

impl Pages {
    /// Read `index.html`, `message.html` and `error.html` from `web_root`.
    pub fn load(web_root: &Path) -> Self {
        Self {
            index: read_page(web_root, "index.html", DEFAULT_INDEX),
            message: read_page(web_root, "message.html", DEFAULT_MESSAGE),
            error: read_page(web_root, "error.html", DEFAULT_ERROR),
        }
    }

    pub fn index(&self) -> Response {
        html(StatusCode::OK, self.index.clone())
    }

    pub fn message(&self) -> Response {
        html(StatusCode::OK, self.message.clone())
    }

    pub fn not_found(&self) -> Response {
        html(StatusCode::NOT_FOUND, self.error.clone())
    }
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            index: Bytes::from_static(DEFAULT_INDEX.as_bytes()),
            message: Bytes::from_static(DEFAULT_MESSAGE.as_bytes()),
            error: Bytes::from_static(DEFAULT_ERROR.as_bytes()),
        }
    }
}

fn read_page(web_root: &Path, name: &str, fallback: &'static str) -> Bytes {
    let path = web_root.join(name);
    match std::fs::read(&path) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Page not readable, using built-in copy");
            Bytes::from_static(fallback.as_bytes())
        }
    }
}

fn html(status: StatusCode, body: Bytes) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

/// 302 back to the index page.
pub fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// Guess a content type from the path's extension.
pub fn guess_mime(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
}

/// Map a URL path onto a file inside `web_root`.
///
/// Returns `None` for paths that escape the root or do not decode.
pub fn resolve_static(web_root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path.strip_prefix('/').unwrap_or(url_path)).ok()?;
    let relative = Path::new(decoded.as_ref());

    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(web_root.join(relative))
}

/// Serve a static file, or `None` if it does not exist or cannot be read.
pub async fn serve_static(web_root: &Path, url_path: &str) -> Option<Response> {
    let path = resolve_static(web_root, url_path)?;
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, guess_mime(&path))],
                Body::from(bytes),
            )
                .into_response(),
        ),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Static file unreadable");
            None
        }
    }
}
