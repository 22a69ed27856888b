//! Response assertions for cafe E2E tests.

use serde_json::Value;

/// Assert that `response` is the JSON error envelope with `status` and
/// `message`, returning the parsed body.
pub async fn assert_error_envelope(response: reqwest::Response, status: u16, message: &str) -> Value {
    assert_eq!(response.status().as_u16(), status, "unexpected status");
    let body: Value = response
        .json()
        .await
        .expect("error response should be JSON");

    assert_eq!(body["success"], false, "body: {body}");
    assert_eq!(body["error"], status, "body: {body}");
    assert_eq!(body["message"], message, "body: {body}");
    body
}

/// Assert that `response` is a 200 success body and return it.
pub async fn assert_success(response: reqwest::Response) -> Value {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .expect("success response should be JSON");

    assert_eq!(status.as_u16(), 200, "body: {body}");
    assert_eq!(body["success"], true, "body: {body}");
    body
}

/// Titles of the drinks in a `{"drinks": [...]}` body, in order.
pub fn drink_titles(body: &Value) -> Vec<String> {
    body["drinks"]
        .as_array()
        .expect("drinks should be an array")
        .iter()
        .map(|drink| {
            drink["title"]
                .as_str()
                .expect("title should be a string")
                .to_string()
        })
        .collect()
}
