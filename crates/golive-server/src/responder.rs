//! Static file responder.
//!
//! Maps request paths onto the serving root. HTML responses, including the
//! generated listing and error pages, carry the reload client when live
//! reload is enabled.

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::error::ServerError;
use crate::inject::inject;
use crate::pages::{self, ListingEntry};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A fully materialized HTTP reply.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Resolves request paths against a serving root.
pub struct StaticResponder {
    root: PathBuf,
    reload_port: Option<u16>,
}

impl StaticResponder {
    /// Create a responder for `root`.
    ///
    /// With `reload_port` set, every HTML reply gets the reload client
    /// pointing at that port.
    #[must_use]
    pub fn new(root: PathBuf, reload_port: Option<u16>) -> Self {
        Self { root, reload_port }
    }

    /// Serving root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the reply for `request_path` (the URI path, still percent-encoded).
    pub async fn respond(&self, request_path: &str) -> Reply {
        let Some(relative) = decode_path(request_path) else {
            tracing::debug!(path = request_path, "Refused path outside serving root");
            return self.not_found(request_path);
        };

        if relative.as_os_str().is_empty() {
            return self.serve_root().await;
        }

        let path = self.root.join(&relative);
        let target = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => path.join("index.html"),
            Ok(_) => path,
            Err(e) if is_missing(&e) => return self.not_found(request_path),
            Err(source) => return self.read_failed(path, source),
        };

        let body = match tokio::fs::read(&target).await {
            Ok(body) => body,
            Err(e) if is_missing(&e) => return self.not_found(request_path),
            Err(source) => return self.read_failed(target, source),
        };

        if is_html(&target) {
            return self.html(StatusCode::OK, &body);
        }

        Reply {
            status: StatusCode::OK,
            content_type: mime_guess::from_path(&target)
                .first_or_octet_stream()
                .to_string(),
            body,
        }
    }

    /// Serve `index.html`, or the listing of top-level HTML files.
    async fn serve_root(&self) -> Reply {
        let index = self.root.join("index.html");
        match tokio::fs::read(&index).await {
            Ok(body) => return self.html(StatusCode::OK, &body),
            Err(e) if is_missing(&e) => {}
            Err(source) => return self.read_failed(index, source),
        }

        match list_html_files(&self.root).await {
            Ok(entries) => self.html(StatusCode::OK, pages::render_listing(&entries).as_bytes()),
            Err(source) => self.read_failed(self.root.clone(), source),
        }
    }

    fn not_found(&self, request_path: &str) -> Reply {
        let message = format!("Nothing is served at {request_path}");
        let page = pages::render_error(404, "Not Found", &message);
        self.html(StatusCode::NOT_FOUND, page.as_bytes())
    }

    fn read_failed(&self, path: PathBuf, source: io::Error) -> Reply {
        let error = ServerError::FileRead { path, source };
        tracing::warn!(error = %error, "Failed to serve file");

        let page = pages::render_error(500, "Internal Server Error", &error.to_string());
        self.html(StatusCode::INTERNAL_SERVER_ERROR, page.as_bytes())
    }

    fn html(&self, status: StatusCode, body: &[u8]) -> Reply {
        let body = match self.reload_port {
            Some(port) => inject(body, port),
            None => body.to_vec(),
        };
        Reply {
            status,
            content_type: HTML_CONTENT_TYPE.to_owned(),
            body,
        }
    }
}

/// Decode a request path into a root-relative path.
///
/// Returns `None` for anything that could leave the root.
fn decode_path(request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    if decoded.contains('\0') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn is_html(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
}

fn is_missing(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Top-level `.html` files in `root`, sorted by name.
async fn list_html_files(root: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(root).await?;

    while let Some(entry) = dir.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !is_html(&path) {
            continue;
        }

        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .map(|time| {
                chrono::DateTime::<chrono::Local>::from(time)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();

        entries.push(ListingEntry { name, modified });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
