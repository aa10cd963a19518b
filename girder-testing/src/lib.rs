//! Testing utilities for Girder applications.
//!
//! - **TestClient** drives a `Dispatcher` in-process
//! - **TestRequestBuilder** assembles headers, parameters, uploads and session state
//! - **TestServer** serves a `Dispatcher` on an ephemeral port
//! - **Assertions** for status, headers, content types and JSON envelopes
//!
//! ## Quick Start
//!
//! ```
//! use girder_core::{Dispatcher, HandlerResult, ParamSpec, RouteBuilder, RouteTable};
//! use girder_testing::*;
//!
//! let mut routes = RouteTable::new();
//! routes
//!     .add(
//!         RouteBuilder::get("/hello/{name}", |_ctx, args| {
//!             let name: String = args.value("name").unwrap_or_default();
//!             Ok(HandlerResult::text(format!("Hello, {}!", name)))
//!         })
//!         .param(ParamSpec::of::<String>("name")),
//!     )
//!     .unwrap();
//!
//! let client = TestClient::new(Dispatcher::new(routes));
//! let response = client.get("/hello/ada");
//! assert_status(&response, 200);
//! assert_html_content_type(&response);
//! assert_eq!(response.body_string(), "Hello, ada!");
//! ```
//!
//! ## Sessions and JSON
//!
//! ```
//! use girder_core::{AuthPolicy, Dispatcher, HandlerResult, RouteBuilder, RouteTable};
//! use girder_testing::*;
//!
//! let mut routes = RouteTable::new();
//! routes
//!     .add(
//!         RouteBuilder::get("/api/me", |ctx, _args| {
//!             let session = ctx.request.session.as_ref();
//!             let user = session.and_then(|s| s.get::<String>("currentUser"));
//!             HandlerResult::value(serde_json::json!({ "user": user }))
//!         })
//!         .auth(AuthPolicy::authenticated())
//!         .json(),
//!     )
//!     .unwrap();
//!
//! let client = TestClient::new(Dispatcher::new(routes));
//! assert_status(&client.get("/api/me"), 401);
//!
//! let response = client.send(
//!     TestRequestBuilder::get("/api/me").session_attribute("currentUser", "ada"),
//! );
//! assert_envelope(&response, "success", 200);
//! assert_eq!(response.envelope_data().unwrap()["user"], "ada");
//! ```

mod assertions;
mod test_client;
mod test_server;

pub use assertions::{
    assert_body_contains, assert_client_error, assert_envelope, assert_header,
    assert_html_content_type, assert_http_status, assert_json, assert_json_content_type,
    assert_server_error, assert_status, assert_success,
};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
pub use test_server::{RawResponse, TestServer};

// Re-export common testing utilities
pub use tokio::test as tokio_test;
