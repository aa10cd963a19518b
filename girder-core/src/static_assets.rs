//! Static resource short-circuit.
//!
//! Before routing, the dispatcher asks its [`ResourceResolver`] whether the
//! request names a static file. [`StaticDirectory`] serves regular files from
//! a root directory with a MIME type and a `Cache-Control` header; anything it
//! cannot resolve falls through to the route table.

use crate::logging::{debug, warn};
use crate::{HttpRequest, HttpResponse};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Cache strategy for static assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Cache-Control: no-cache, no-store, must-revalidate
    NoCache,
    /// Cache-Control: public, max-age=N
    Public(Duration),
    /// Cache-Control: public, max-age=31536000, immutable
    Immutable,
}

impl CacheStrategy {
    pub fn to_header_value(&self) -> String {
        match self {
            CacheStrategy::NoCache => "no-cache, no-store, must-revalidate".to_string(),
            CacheStrategy::Public(duration) => format!("public, max-age={}", duration.as_secs()),
            CacheStrategy::Immutable => "public, max-age=31536000, immutable".to_string(),
        }
    }
}

/// File type classification used for the Content-Type header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    JavaScript,
    Stylesheet,
    Image,
    Font,
    Html,
    Json,
    Text,
    Other,
}

impl FileType {
    /// Detect file type from path extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("js") | Some("mjs") => FileType::JavaScript,
            Some("css") => FileType::Stylesheet,
            Some("png") | Some("jpg") | Some("jpeg") | Some("gif") | Some("svg") | Some("webp")
            | Some("ico") => FileType::Image,
            Some("woff") | Some("woff2") | Some("ttf") | Some("otf") => FileType::Font,
            Some("html") | Some("htm") => FileType::Html,
            Some("json") => FileType::Json,
            Some("txt") | Some("csv") => FileType::Text,
            _ => FileType::Other,
        }
    }

    pub fn mime_type(&self, path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match self {
            FileType::JavaScript => "application/javascript",
            FileType::Stylesheet => "text/css",
            FileType::Image => match ext.as_deref() {
                Some("png") => "image/png",
                Some("jpg") | Some("jpeg") => "image/jpeg",
                Some("gif") => "image/gif",
                Some("svg") => "image/svg+xml",
                Some("webp") => "image/webp",
                _ => "image/x-icon",
            },
            FileType::Font => match ext.as_deref() {
                Some("woff") => "font/woff",
                Some("woff2") => "font/woff2",
                Some("ttf") => "font/ttf",
                _ => "font/otf",
            },
            FileType::Html => "text/html;charset=UTF-8",
            FileType::Json => "application/json",
            FileType::Text => match ext.as_deref() {
                Some("csv") => "text/csv",
                _ => "text/plain;charset=UTF-8",
            },
            FileType::Other => "application/octet-stream",
        }
    }
}

/// Resolves requests to static resources ahead of routing.
pub trait ResourceResolver: Send + Sync {
    /// A complete response when the request names a static resource.
    fn resolve(&self, request: &HttpRequest) -> Option<HttpResponse>;
}

/// Serves regular files below a root directory.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    root: PathBuf,
    cache: CacheStrategy,
}

impl StaticDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: CacheStrategy::Public(Duration::from_secs(3600)),
        }
    }

    pub fn with_cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path to a file below the root.
    ///
    /// `None` for undecodable paths and for any `..`, root or prefix
    /// component.
    fn resolve_path(&self, request_path: &str) -> Option<PathBuf> {
        let decoded = urlencoding::decode(request_path).ok()?;
        let relative = Path::new(decoded.trim_start_matches('/'));

        let mut full = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    warn!(path = request_path, "Rejected path traversal attempt");
                    return None;
                }
            }
        }
        Some(full)
    }
}

impl ResourceResolver for StaticDirectory {
    fn resolve(&self, request: &HttpRequest) -> Option<HttpResponse> {
        if request.method != "GET" && request.method != "HEAD" {
            return None;
        }
        let path = self.resolve_path(&request.path)?;
        if !path.is_file() {
            return None;
        }

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Static file unreadable");
                return None;
            }
        };
        debug!(path = %path.display(), size = content.len(), "Serving static file");

        let file_type = FileType::from_path(&path);
        let body = if request.method == "HEAD" { Vec::new() } else { content };
        Some(
            HttpResponse::ok()
                .with_header("Content-Type", file_type.mime_type(&path))
                .with_header("Cache-Control", self.cache.to_header_value())
                .with_body(body),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, StaticDirectory) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), "body{}").unwrap();
        std::fs::write(dir.path().join("logo.png"), [137, 80, 78, 71]).unwrap();
        let statics = StaticDirectory::new(dir.path());
        (dir, statics)
    }

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_path(Path::new("a.JS")), FileType::JavaScript);
        assert_eq!(FileType::from_path(Path::new("a.woff2")), FileType::Font);
        assert_eq!(FileType::from_path(Path::new("a")), FileType::Other);
        assert_eq!(FileType::Image.mime_type(Path::new("x.jpeg")), "image/jpeg");
    }

    #[test]
    fn test_serves_existing_file() {
        let (_dir, statics) = fixture();
        let response = statics.resolve(&HttpRequest::new("GET", "/css/site.css")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/css"));
        assert_eq!(response.header("cache-control"), Some("public, max-age=3600"));
        assert_eq!(response.body_string(), "body{}");
    }

    #[test]
    fn test_head_has_no_body() {
        let (_dir, statics) = fixture();
        let response = statics.resolve(&HttpRequest::new("HEAD", "/logo.png")).unwrap();
        assert_eq!(response.header("content-type"), Some("image/png"));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_falls_through() {
        let (_dir, statics) = fixture();
        assert!(statics.resolve(&HttpRequest::new("GET", "/missing.css")).is_none());
        assert!(statics.resolve(&HttpRequest::new("GET", "/css")).is_none());
        assert!(statics.resolve(&HttpRequest::new("POST", "/logo.png")).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let (_dir, statics) = fixture();
        assert!(statics.resolve(&HttpRequest::new("GET", "/../secret.txt")).is_none());
        assert!(statics.resolve(&HttpRequest::new("GET", "/css/%2e%2e/%2e%2e/secret.txt")).is_none());
    }

    #[test]
    fn test_cache_strategies() {
        assert_eq!(CacheStrategy::NoCache.to_header_value(), "no-cache, no-store, must-revalidate");
        assert_eq!(
            CacheStrategy::Immutable.to_header_value(),
            "public, max-age=31536000, immutable"
        );
    }
}
