//! Shared HTTP response handling.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use picbed_common::{Error, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = "picbed/0.1";

/// Build the shared HTTP client.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Map a transport error.
pub fn network(context: &str, err: reqwest::Error) -> Error {
    Error::Network(format!("{}: {}", context, err))
}

/// Pull a human-readable message out of an error body.
///
/// JSON bodies yield their `message`, `errmsg`, `description` or
/// `error.message` field; anything else is returned verbatim.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    ["message", "errmsg", "description", "msg"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .or_else(|| value.pointer("/error/message").and_then(|v| v.as_str()))
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

/// Turn a non-success status into the matching error.
pub async fn status_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Error::Authentication(format!("{} - {}", status, message))
    } else {
        Error::status(status.as_u16(), message)
    }
}

/// Fail unless the response carries a 2xx status.
pub async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

/// Check the status and parse a JSON body.
pub async fn handle_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response).await?;
    response
        .json()
        .await
        .map_err(|e| Error::ResponseShape(format!("Failed to parse response: {}", e)))
}
