//! In-memory `Transport` for driving the engines without a network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use crashstats::client::{PostResponse, Transport};
use crashstats::{Error, Result};
use serde_json::Value;

pub type Query = Vec<(String, String)>;

type JsonHandler = Box<dyn Fn(&str, &Query) -> Result<Value> + Send + Sync>;
type BytesHandler = Box<dyn Fn(&str, &Query) -> Result<Vec<u8>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub endpoint: String,
    pub query: Query,
}

impl Recorded {
    /// All values for `key`, in order.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values(key).first().copied()
    }

    pub fn number(&self, key: &str) -> u64 {
        self.value(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }
}

pub struct FakeTransport {
    json: JsonHandler,
    bytes: BytesHandler,
    post_statuses: Mutex<VecDeque<u16>>,
    token: bool,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            json: Box::new(|endpoint, _| {
                Err(Error::UnexpectedResponse(format!("no JSON for {}", endpoint)))
            }),
            bytes: Box::new(|endpoint, _| {
                Err(Error::UnexpectedResponse(format!("no bytes for {}", endpoint)))
            }),
            post_statuses: Mutex::new(VecDeque::new()),
            token: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_json<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Query) -> Result<Value> + Send + Sync + 'static,
    {
        self.json = Box::new(handler);
        self
    }

    pub fn with_bytes<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Query) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.bytes = Box::new(handler);
        self
    }

    /// Statuses returned by successive POSTs; 200 once exhausted.
    pub fn with_post_statuses(self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.post_statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_token(mut self) -> Self {
        self.token = true;
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, endpoint: &str, query: &[(String, String)]) -> Query {
        let query = query.to_vec();
        self.requests.lock().unwrap().push(Recorded {
            method,
            endpoint: endpoint.to_string(),
            query: query.clone(),
        });
        query
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get_json(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value> {
        let query = self.record("GET", endpoint, query);
        (self.json)(endpoint, &query)
    }

    async fn get_bytes(&self, endpoint: &str, query: &[(String, String)]) -> Result<Vec<u8>> {
        let query = self.record("GET", endpoint, query);
        (self.bytes)(endpoint, &query)
    }

    async fn post_form(&self, endpoint: &str, form: &[(String, String)]) -> Result<PostResponse> {
        self.record("POST", endpoint, form);
        let status = self.post_statuses.lock().unwrap().pop_front().unwrap_or(200);
        Ok(PostResponse {
            status,
            body: String::new(),
        })
    }

    fn has_token(&self) -> bool {
        self.token
    }
}

/// Value of `key` in a recorded query.
pub fn query_value<'a>(query: &'a Query, key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}
