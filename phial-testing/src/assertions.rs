// Test assertions for dispatched responses

use crate::TestResponse;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status().unwrap_or(0);
    assert_eq!(
        actual, expected,
        "Expected status {}, got {}",
        expected, actual
    );
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual.as_deref(),
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert the exact response body
pub fn assert_body(response: &TestResponse, expected: impl AsRef<[u8]>) {
    let actual = response.body();
    assert_eq!(
        &actual[..],
        expected.as_ref(),
        "Expected body {:?}, got {:?}",
        String::from_utf8_lossy(expected.as_ref()),
        String::from_utf8_lossy(&actual)
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

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert that the application sent nothing
pub fn assert_no_response(response: &TestResponse) {
    assert!(
        response.is_empty(),
        "Expected no messages, got {:?}",
        response.messages()
    );
}
