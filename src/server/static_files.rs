// src/server/static_files.rs

use std::io;
use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use super::livereload::inject_script;
use super::ServerState;

/// Content types for the file kinds a static site ships.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("html", "text/html; charset=utf-8"),
    ("htm", "text/html; charset=utf-8"),
    ("css", "text/css; charset=utf-8"),
    ("js", "text/javascript; charset=utf-8"),
    ("mjs", "text/javascript; charset=utf-8"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", "text/plain; charset=utf-8"),
    ("xml", "application/xml"),
    ("svg", "image/svg+xml"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
];

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    ext.and_then(|ext| {
        CONTENT_TYPES
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, ct)| *ct)
    })
    .unwrap_or("application/octet-stream")
}

/// Map a request path onto a file under `root`.
///
/// Returns `None` when the path tries to climb out of the root.
pub fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let mut resolved = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || s.contains('\0') => return None,
            s => resolved.push(s),
        }
    }
    Some(resolved)
}

/// Fallback handler: every path not claimed by another route is a file.
pub async fn serve_path(State(state): State<ServerState>, uri: Uri) -> Response {
    let request_path = uri.path();
    let Some(mut file) = resolve_request_path(&state.root, request_path) else {
        warn!(path = %request_path, "rejected path outside the served root");
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    };

    if tokio::fs::metadata(&file).await.is_ok_and(|m| m.is_dir()) {
        if !request_path.ends_with('/') {
            return Redirect::permanent(&format!("{request_path}/")).into_response();
        }
        file.push("index.html");
    }

    let bytes = match tokio::fs::read(&file).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %request_path, "not found");
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
        Err(e) => {
            warn!(path = %request_path, error = %e, "failed to read file");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    let content_type = content_type_for(&file);
    let body = if state.live_reload && content_type.starts_with("text/html") {
        inject_script(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };

    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}
