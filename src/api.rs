use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Error, Result};

const TOKEN_URL: &str = "https://www.warcraftlogs.com/oauth/token";
const GRAPHQL_URL: &str = "https://www.warcraftlogs.com/api/v2/client";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authenticated session against the Warcraft Logs v2 API.
///
/// Owns the HTTP client and the OAuth token for one invocation; the caller
/// constructs it and passes it into the pipeline.
pub struct WclClient {
    http: Client,
    token: String,
}

impl WclClient {
    /// Build a session from WCL_CLIENT_ID / WCL_CLIENT_SECRET.
    pub fn from_env() -> Result<Self> {
        let client_id = env::var("WCL_CLIENT_ID")
            .map_err(|_| Error::Auth("WCL_CLIENT_ID is not set".to_string()))?;
        let client_secret = env::var("WCL_CLIENT_SECRET")
            .map_err(|_| Error::Auth("WCL_CLIENT_SECRET is not set".to_string()))?;
        Self::new(&client_id, &client_secret)
    }

    /// Request a client-credentials token and keep it for this session.
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::fetch(format!("failed to build HTTP client: {e}"), false))?;

        info!(
            action = "authenticate",
            component = "api_client",
            "Requesting access token"
        );

        let response = http
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth("client credentials were rejected".to_string()));
        }
        if !status.is_success() {
            return Err(status_error(status, &response.text().unwrap_or_default()));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| Error::Auth(format!("token response was not understood: {e}")))?;

        Ok(WclClient {
            http,
            token: token.access_token,
        })
    }

    /// Run one GraphQL query and return the full response document.
    pub fn query(&self, query: &str, variables: Value) -> Result<Value> {
        let payload = json!({ "query": query, "variables": variables });

        let response = self
            .http
            .post(GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(
                "access token was rejected; re-authenticate".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(status_error(status, &response.text().unwrap_or_default()));
        }

        let document: Value = response
            .json()
            .map_err(|e| Error::Malformed(format!("response was not valid JSON: {e}")))?;

        if let Some(errors) = document.get("errors").and_then(Value::as_array) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            warn!(
                action = "query",
                component = "api_client",
                errors = ?messages,
                "API returned errors"
            );
            return Err(Error::fetch(
                format!("API returned errors: {}", messages.join("; ")),
                false,
            ));
        }

        Ok(document)
    }
}

/// Walk a JSON pointer into a response document, failing with context when
/// the shape is not what the schema promises.
pub fn pointer<'a>(document: &'a Value, path: &str) -> Result<&'a Value> {
    document
        .pointer(path)
        .ok_or_else(|| Error::Malformed(format!("missing {path} in response")))
}

/// Collect every page of an events stream, feeding nextPageTimestamp back
/// as the next page's startTime.
pub fn paged_events(client: &WclClient, query: &str, mut variables: Value) -> Result<Vec<Value>> {
    let mut events = Vec::new();

    loop {
        let document = client.query(query, variables.clone())?;
        let node = pointer(&document, "/data/reportData/report/events")?;

        if let Some(data) = node.get("data").and_then(Value::as_array) {
            events.extend(data.iter().cloned());
        }

        match node.get("nextPageTimestamp").and_then(Value::as_f64) {
            Some(next) => variables["startTime"] = json!(next),
            None => break,
        }
    }

    Ok(events)
}

/// Rate limits and server-side failures are worth retrying; everything
/// else the provider rejected outright.
fn status_error(status: StatusCode, body: &str) -> Error {
    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
    let body: String = body.chars().take(300).collect();
    Error::fetch(format!("HTTP {status}: {body}"), retryable)
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::fetch(
        format!("transport error: {e}"),
        e.is_timeout() || e.is_connect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_retryable() {
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "slow down").is_retryable());
        assert!(status_error(StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!status_error(StatusCode::BAD_REQUEST, "nope").is_retryable());
        assert!(!status_error(StatusCode::NOT_FOUND, "").is_retryable());
    }

    #[test]
    fn pointer_reports_missing_paths() {
        let document = json!({ "data": { "reportData": null } });
        assert!(pointer(&document, "/data/reportData").is_ok());
        let err = pointer(&document, "/data/reportData/reports").unwrap_err();
        assert!(err.to_string().contains("/data/reportData/reports"));
    }
}
