//! services/app/src/adapters/http.rs
//!
//! The thin HTTP client shared by all backend adapters. It owns the base
//! URL and reads the bearer credential from the session store's token slot
//! on every request, so a login or logout is picked up immediately.

use campus_core::ports::{PortError, PortResult};
use campus_core::session::TokenSlot;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("campus-app/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the platform backends.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    token: Arc<TokenSlot>,
}

impl BackendClient {
    /// Creates a client rooted at `base_url`. The token slot is written by
    /// the session store; this client only reads it.
    pub fn new(base_url: impl Into<String>, token: Arc<TokenSlot>) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.get().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PortResult<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        let builder = self.authorized(self.client.get(&url)).await;
        let response = builder.send().await.map_err(transport)?;
        Self::handle_response(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PortResult<T> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        let builder = self.authorized(self.client.post(&url).json(body)).await;
        let response = builder.send().await.map_err(transport)?;
        Self::handle_response(response).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PortResult<T> {
        let url = self.url(path);
        tracing::debug!("PUT {}", url);
        let builder = self.authorized(self.client.put(&url).json(body)).await;
        let response = builder.send().await.map_err(transport)?;
        Self::handle_response(response).await
    }

    /// Handles the HTTP response, checking for errors and parsing JSON.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> PortResult<T> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // The documented recovery for callers is logout + re-auth.
            return Err(PortError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(
                response.url().path().to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Backend returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Malformed(e.to_string()))
    }
}

fn transport(e: reqwest::Error) -> PortError {
    PortError::Unexpected(format!("Transport error: {e}"))
}
