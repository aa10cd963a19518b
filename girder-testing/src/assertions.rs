// Test assertions for HTTP responses

use crate::TestResponse;
use girder_core::HttpStatus;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(
        actual, expected,
        "Expected status {}, got {}. Body: {}",
        expected,
        actual,
        response.body_string()
    );
}

/// Assert that a response has a specific HTTP status
pub fn assert_http_status(response: &TestResponse, expected: HttpStatus) {
    assert_status(response, expected.code());
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert the `status`/`code` pair of a JSON envelope.
pub fn assert_envelope(response: &TestResponse, status: &str, code: u16) {
    let envelope: serde_json::Value = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(envelope["status"], status, "Envelope: {}", envelope);
    assert_eq!(envelope["code"], code, "Envelope: {}", envelope);
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert that a response body contains a string
pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response is successful (2xx status)
pub fn assert_success(response: &TestResponse) {
    let status = response.status();
    assert!(
        (200..300).contains(&status),
        "Expected successful status (2xx), got {}",
        status
    );
}

/// Assert that a response is a client error (4xx status)
pub fn assert_client_error(response: &TestResponse) {
    let status = response.status();
    assert!(
        (400..500).contains(&status),
        "Expected client error status (4xx), got {}",
        status
    );
}

/// Assert that a response is a server error (5xx status)
pub fn assert_server_error(response: &TestResponse) {
    let status = response.status();
    assert!(
        (500..600).contains(&status),
        "Expected server error status (5xx), got {}",
        status
    );
}

/// Assert that a response has JSON content type
pub fn assert_json_content_type(response: &TestResponse) {
    let content_type = response.header("Content-Type");
    assert!(
        content_type
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false),
        "Expected JSON content type, got {:?}",
        content_type
    );
}

/// Assert that a response has HTML content type
pub fn assert_html_content_type(response: &TestResponse) {
    let content_type = response.header("Content-Type");
    assert!(
        content_type
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false),
        "Expected HTML content type, got {:?}",
        content_type
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use girder_core::{HttpResponse, JsonResponse};

    fn json_response() -> TestResponse {
        TestResponse::new(
            HttpResponse::ok()
                .with_json(&JsonResponse::success(serde_json::json!({"id": 1})))
                .unwrap(),
        )
    }

    #[test]
    fn test_passing_assertions() {
        let response = json_response();
        assert_status(&response, 200);
        assert_http_status(&response, HttpStatus::Ok);
        assert_success(&response);
        assert_json_content_type(&response);
        assert_envelope(&response, "success", 200);
        assert_body_contains(&response, "\"id\":1");
    }

    #[test]
    fn test_status_classes() {
        let missing = TestResponse::new(HttpResponse::not_found());
        assert_client_error(&missing);

        let failed = TestResponse::new(HttpResponse::internal_server_error());
        assert_server_error(&failed);
    }

    #[test]
    #[should_panic(expected = "Expected status 404")]
    fn test_status_mismatch_panics() {
        assert_status(&json_response(), 404);
    }

    #[test]
    #[should_panic(expected = "Expected HTML content type")]
    fn test_html_content_type_mismatch_panics() {
        assert_html_content_type(&json_response());
    }
}
