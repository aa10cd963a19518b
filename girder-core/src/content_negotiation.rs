//! Content negotiation for rendered errors.
//!
//! The dispatcher answers failures in the representation the client is most
//! likely to parse. JSON is chosen when any of these literal checks holds:
//!
//! - the `Accept` header contains `application/json`
//! - the path ends in `.json`
//! - a `format` parameter equals `json`
//!
//! Everything else gets HTML. The checks are case-sensitive and ignore
//! quality values.
//!
//! ```
//! use girder_core::content_negotiation::ResponseFormat;
//! use girder_core::HttpRequest;
//!
//! let request = HttpRequest::new("GET", "/report.json");
//! assert_eq!(ResponseFormat::negotiate(&request), ResponseFormat::Json);
//! ```

use crate::HttpRequest;

/// Representation used for a response the dispatcher renders itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Json,
}

impl ResponseFormat {
    /// Pick JSON for likely API clients, HTML otherwise.
    pub fn negotiate(request: &HttpRequest) -> Self {
        let accepts_json = request
            .header("accept")
            .is_some_and(|header| header.contains("application/json"));
        let json_suffix = request.path.ends_with(".json");
        let json_param = request
            .params
            .get("format")
            .is_some_and(|values| values.iter().any(|v| v == "json"));

        if accepts_json || json_suffix || json_param {
            ResponseFormat::Json
        } else {
            ResponseFormat::Html
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ResponseFormat::Json)
    }
}
