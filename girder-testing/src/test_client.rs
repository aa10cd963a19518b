// Test HTTP Client

use girder_core::{Dispatcher, Error, HttpRequest, HttpResponse, Session, UploadedFile};
use serde::Serialize;
use std::sync::Arc;

/// Drives a [`Dispatcher`] directly, without a socket.
///
/// Requests go through the same pipeline the hosting adapter uses, so route
/// lookup, guards, binding and rendering all behave as they would in
/// production.
#[derive(Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
}

impl TestClient {
    /// Create a new test client
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Make a GET request
    pub fn get(&self, target: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("GET", target))
    }

    /// GET with `Accept: application/json`
    pub fn get_json(&self, target: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("GET", target).accept_json())
    }

    /// POST urlencoded form fields
    pub fn post_form(&self, target: &str, fields: &[(&str, &str)]) -> TestResponse {
        let builder = fields
            .iter()
            .fold(TestRequestBuilder::new("POST", target), |b, (k, v)| {
                b.form(*k, *v)
            });
        self.send(builder)
    }

    /// Make a DELETE request
    pub fn delete(&self, target: &str) -> TestResponse {
        self.send(TestRequestBuilder::new("DELETE", target))
    }

    pub fn send(&self, builder: TestRequestBuilder) -> TestResponse {
        self.dispatch(builder.build())
    }

    pub fn dispatch(&self, request: HttpRequest) -> TestResponse {
        TestResponse::new(self.dispatcher.dispatch(request))
    }
}

/// Builder for test requests
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    uploads: Vec<UploadedFile>,
    session: Option<Session>,
    body: Vec<u8>,
}

impl TestRequestBuilder {
    /// `target` may carry its own `?query`.
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            uploads: Vec::new(),
            session: None,
            body: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    pub fn post(target: &str) -> Self {
        Self::new("POST", target)
    }

    /// Add a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn accept_json(self) -> Self {
        self.header("Accept", "application/json")
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a form field. Form values follow query values, as they do when
    /// the adapter decodes a body.
    pub fn form(mut self, key: &str, value: &str) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }

    pub fn upload(
        mut self,
        field_name: &str,
        file_name: &str,
        content_type: &str,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.uploads.push(UploadedFile::new(
            field_name,
            file_name,
            content_type,
            content.into(),
        ));
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Set one session attribute, opening a session if there is none.
    pub fn session_attribute<T: Serialize>(mut self, key: &str, value: T) -> Self {
        let session = self
            .session
            .get_or_insert_with(|| Session::new(uuid::Uuid::new_v4().to_string()));
        session.set(key, value);
        self
    }

    /// Set the body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set JSON body
    pub fn json<T: Serialize>(mut self, data: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(data)?;
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    /// Build the request
    pub fn build(self) -> HttpRequest {
        let mut request = HttpRequest::new(self.method, &self.target).with_body(self.body);

        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        for (key, value) in self.query.into_iter().chain(self.form) {
            request = request.with_param(key, value);
        }
        for upload in self.uploads {
            request = request.with_upload(upload);
        }
        if let Some(session) = self.session {
            request = request.with_session(session);
        }
        request
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    response: HttpResponse,
}

impl TestResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self { response }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.response.status
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.header(key)
    }

    /// Get the response body as string
    pub fn body_string(&self) -> String {
        self.response.body_string()
    }

    /// Get the response body as JSON
    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.response.body)
            .map_err(|e| format!("Serialization error: {}", e))
    }

    /// `data` member of a JSON envelope
    pub fn envelope_data(&self) -> Result<serde_json::Value, String> {
        let mut envelope: serde_json::Value = self.body_json()?;
        envelope
            .get_mut("data")
            .map(serde_json::Value::take)
            .ok_or_else(|| "response is not a JSON envelope".to_string())
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn into_inner(self) -> HttpResponse {
        self.response
    }
}
