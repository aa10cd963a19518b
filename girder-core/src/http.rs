// HTTP request and response types

use crate::form::UploadedFile;
use crate::params::ParameterSpace;
use crate::pattern::PathParams;
use crate::session::Session;
use crate::HttpStatus;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// HTTP methods a route can be declared with.
///
/// `ANY` is a route-side wildcard; it never appears on an incoming request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    ANY,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively. An empty name means `ANY`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "HEAD" => Some(HttpMethod::HEAD),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            "ANY" | "" => Some(HttpMethod::ANY),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::ANY => "ANY",
        }
    }

    /// Whether a route declared with this method accepts `request_method`.
    pub fn accepts(&self, request_method: &str) -> bool {
        match self {
            HttpMethod::ANY => true,
            declared => declared.as_str().eq_ignore_ascii_case(request_method),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP request wrapper
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    /// Request path without the query string
    pub path: String,
    pub query_string: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub path_params: PathParams,
    pub params: ParameterSpace,
    pub uploads: Vec<UploadedFile>,
    pub session: Option<Session>,
    /// Request-scope attributes; a rendered view's model lands here.
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl HttpRequest {
    /// Build a request from a method and a request target.
    ///
    /// A `?query` suffix on the target is split off and decoded into
    /// [`HttpRequest::params`].
    pub fn new(method: impl Into<String>, target: impl AsRef<str>) -> Self {
        let target = target.as_ref();
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        Self {
            method: method.into().to_uppercase(),
            path: path.to_string(),
            query_string: query.to_string(),
            headers: HashMap::new(),
            body: Vec::new(),
            path_params: PathParams::new(),
            params: ParameterSpace::parse(query),
            uploads: Vec::new(),
            session: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(key, value);
        self
    }

    pub fn with_upload(mut self, upload: UploadedFile) -> Self {
        self.uploads.push(upload);
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Header lookup, case-insensitive on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the body is an urlencoded form
    pub fn is_form_urlencoded(&self) -> bool {
        self.content_type()
            .map(|ct| {
                ct.to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            })
            .unwrap_or(false)
    }

    /// Decode an urlencoded body into the parameter space, after the query
    /// values.
    pub fn merge_form_body(&mut self) {
        if self.is_form_urlencoded() && !self.body.is_empty() {
            let body = String::from_utf8_lossy(&self.body).into_owned();
            self.params.extend_from_encoded(&body);
        }
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// First value of a query/form parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.params.first(name)
    }

    /// Single upload by form field name
    pub fn upload(&self, field_name: &str) -> Option<&UploadedFile> {
        self.uploads.iter().find(|u| u.field_name == field_name)
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(name.into(), value);
    }
}

/// HTTP response wrapper
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatus::Ok.code())
    }

    pub fn with_status(status: HttpStatus) -> Self {
        Self::new(status.code())
    }

    pub fn not_found() -> Self {
        Self::with_status(HttpStatus::NotFound)
    }

    pub fn internal_server_error() -> Self {
        Self::with_status(HttpStatus::InternalServerError)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Serialize `value` as the body with the UTF-8 JSON content type.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body = serde_json::to_vec(value)?;
        self.set_header("Content-Type", crate::json::JSON_CONTENT_TYPE);
        Ok(self)
    }

    /// Replace a header, matching the existing name case-insensitively.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(HttpMethod::from_str("get"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_str(""), Some(HttpMethod::ANY));
        assert_eq!(HttpMethod::from_str("any"), Some(HttpMethod::ANY));
        assert_eq!(HttpMethod::from_str("TRACE"), None);
    }

    #[test]
    fn test_any_accepts_every_verb() {
        for verb in ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"] {
            assert!(HttpMethod::ANY.accepts(verb));
        }
        assert!(HttpMethod::GET.accepts("get"));
        assert!(!HttpMethod::GET.accepts("POST"));
    }

    #[test]
    fn test_request_target_splits_query() {
        let request = HttpRequest::new("get", "/search?q=rust&page=2");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/search");
        assert_eq!(request.query("q"), Some("rust"));
        assert_eq!(request.query("page"), Some("2"));
    }

    #[test]
    fn test_form_body_merges_after_query() {
        let mut request = HttpRequest::new("POST", "/emp?name=query")
            .with_header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
            .with_body(b"name=form&age=31".to_vec());
        request.merge_form_body();
        assert_eq!(
            request.params.get("name"),
            Some(&["query".to_string(), "form".to_string()][..])
        );
        assert_eq!(request.query("age"), Some("31"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest::new("GET", "/").with_header("Accept", "application/json");
        assert_eq!(request.header("accept"), Some("application/json"));

        let mut response = HttpResponse::ok().with_header("content-type", "text/plain");
        response.set_header("Content-Type", "text/html");
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
    }
}
