//! Minimal JSON HTTP client used by task actions.
//!
//! Wraps a shared `reqwest::Client` (one connection pool per run) and
//! turns every non-2xx answer, timeout or transport error into a
//! [`RequestFailure`], so tasks can simply use `?`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ConfigError, RequestFailure};

/// Longest response body kept in a failure message
const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, RequestFailure> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post_json<T>(&self, path: &str, body: &T) -> Result<ApiResponse, RequestFailure>
    where
        T: Serialize + ?Sized,
    {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put_json<T>(&self, path: &str, body: &T) -> Result<ApiResponse, RequestFailure>
    where
        T: Serialize + ?Sized,
    {
        self.send(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, RequestFailure> {
        self.send(self.request(Method::DELETE, path)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiResponse, RequestFailure> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(RequestFailure::UnexpectedStatus {
                status: status.as_u16(),
                body: text.trim().to_string(),
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json(&self) -> Result<Value, RequestFailure> {
        serde_json::from_slice(&self.body)
            .map_err(|e| RequestFailure::Transport(format!("invalid JSON body: {e}")))
    }

    /// The `id` field of a JSON object body, as a string.
    ///
    /// Accepts string ids (e.g. Mongo ObjectId hex) and numeric ids.
    pub fn entity_id(&self) -> Option<String> {
        match self.json().ok()?.get("id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}
