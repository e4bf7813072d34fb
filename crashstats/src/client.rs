//! HTTP access to the Crash Stats API.
//!
//! Everything above this module talks to a [`Transport`], so the search and
//! facet engines can be driven by an in-memory fake in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::config::Config;
use crate::error::{Error, Result};

pub const SUPERSEARCH_ENDPOINT: &str = "/api/SuperSearch/";
pub const RAW_CRASH_ENDPOINT: &str = "/api/RawCrash/";
pub const PROCESSED_CRASH_ENDPOINT: &str = "/api/ProcessedCrash/";
pub const REPROCESSING_ENDPOINT: &str = "/api/Reprocessing/";

/// Header carrying the API token.
pub const AUTH_HEADER: &str = "Auth-Token";

/// Status and body of a POST whose status the caller wants to inspect.
#[derive(Debug, Clone)]
pub struct PostResponse {
    pub status: u16,
    pub body: String,
}

impl PostResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `endpoint` and decode the JSON body.
    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value>;

    /// GET `endpoint` and return the raw body.
    async fn get_bytes(&self, endpoint: &str, query: &[(String, String)]) -> Result<Vec<u8>>;

    /// POST a form to `endpoint`.
    async fn post_form(&self, endpoint: &str, form: &[(String, String)]) -> Result<PostResponse>;

    /// Whether requests carry an API token.
    fn has_token(&self) -> bool;
}

/// reqwest-backed client for a Crash Stats host.
pub struct CrashStatsClient {
    client: Client,
    host: String,
    api_token: Option<String>,
}

impl CrashStatsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.host, endpoint)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.header(AUTH_HEADER, token),
            None => request,
        }
    }

    async fn send_get(&self, endpoint: &str, query: &[(String, String)]) -> Result<Response> {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, params = ?query, "GET");

        let response = self
            .authorize(self.client.get(&url).query(query))
            .send()
            .await?;
        self.check_status(response).await
    }

    /// Map error statuses onto the error taxonomy.
    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        match status {
            StatusCode::FORBIDDEN if self.api_token.is_some() => Err(Error::BadCredential(message)),
            StatusCode::BAD_REQUEST => Err(Error::BadRequest(message)),
            _ => Err(Error::TransientService {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

/// Pull the service's `error` field out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").map(render_error_value))
        .unwrap_or_else(|| "No error provided".to_string())
}

fn render_error_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Transport for CrashStatsClient {
    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value> {
        let response = self.send_get(endpoint, query).await?;
        Ok(response.json().await?)
    }

    async fn get_bytes(&self, endpoint: &str, query: &[(String, String)]) -> Result<Vec<u8>> {
        let response = self.send_get(endpoint, query).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn post_form(&self, endpoint: &str, form: &[(String, String)]) -> Result<PostResponse> {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, items = form.len(), "POST");

        let response = self.authorize(self.client.post(&url).form(form)).send().await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN && self.api_token.is_some() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::BadCredential(error_message(&body)));
        }

        Ok(PostResponse {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }

    fn has_token(&self) -> bool {
        self.api_token.is_some()
    }
}

/// `abcd` followed by one `x` per hidden character.
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    let hidden = token.chars().count().saturating_sub(4);
    format!("{}{}", visible, "x".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"error": "unknown field foo"}"#), "unknown field foo");
        assert_eq!(error_message(r#"{"error": {"field": "bad"}}"#), r#"{"field":"bad"}"#);
        assert_eq!(error_message("<html>oops</html>"), "No error provided");
        assert_eq!(error_message(r#"{"detail": "x"}"#), "No error provided");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("935e136cdfe1"), "935exxxxxxxx");
        assert_eq!(mask_token("abc"), "abc");
        assert_eq!(mask_token(""), "");
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let config = Config {
            host: "http://example.com/".to_string(),
            api_token: Some(String::new()),
            ..Config::default()
        };
        let client = CrashStatsClient::new(&config).unwrap();
        assert_eq!(client.host(), "http://example.com");
        assert_eq!(client.url(SUPERSEARCH_ENDPOINT), "http://example.com/api/SuperSearch/");
        // Empty tokens are treated as no token
        assert!(!client.has_token());
    }

    #[test]
    fn test_post_response_success() {
        let ok = PostResponse { status: 200, body: String::new() };
        let bad = PostResponse { status: 500, body: String::new() };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }
}
