//! Remote backend speaking the hosted service's HTTP APIs: a table API under
//! `/rest/v1` and a password-auth API under `/auth/v1`.

mod auth;
mod data;
mod query;
mod wire;

use parking_lot::Mutex;
use poster_studio_sdk::{AuthListeners, Secret, ServiceError, Session};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

/// Why a [`RestBackend`] could not be built.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("backend url is not configured")]
    MissingUrl,

    #[error("backend anon key is not configured")]
    MissingAnonKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct RestBackend {
    client: reqwest::Client,
    base: Url,
    anon_key: Secret,
    session: Mutex<Option<Session>>,
    listeners: AuthListeners,
}

impl RestBackend {
    /// # Errors
    /// When the url or key is missing, or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, SetupError> {
        let mut base = config.url.clone().ok_or(SetupError::MissingUrl)?;
        let anon_key = config.anon_key.clone().ok_or(SetupError::MissingAnonKey)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            anon_key,
            session: Mutex::new(None),
            listeners: AuthListeners::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|e| ServiceError::unavailable(format!("invalid endpoint '{path}': {e}")))
    }

    /// Token of the live session, else the anon key.
    async fn bearer(&self) -> Secret {
        self.live_session()
            .await
            .map_or_else(|| self.anon_key.clone(), |s| s.access_token)
    }

    fn authorize(&self, builder: RequestBuilder, token: &Secret) -> RequestBuilder {
        builder
            .header("apikey", self.anon_key.expose())
            .bearer_auth(token.expose())
    }

    /// Sends `builder` and decodes a successful JSON body.
    ///
    /// `credentials` marks calls where 400 and 401 mean wrong credentials.
    async fn execute<T: DeserializeOwned>(
        builder: RequestBuilder,
        credentials: bool,
    ) -> Result<T, ServiceError> {
        let response = Self::send(builder, credentials).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::unavailable(format!("malformed response: {e}")))
    }

    async fn send(builder: RequestBuilder, credentials: bool) -> Result<Response, ServiceError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::unavailable(format!("request timed out: {e}"))
            } else {
                ServiceError::unavailable(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = map_status(status, &error_message(&body), credentials);
        tracing::debug!(status = status.as_u16(), error = %error, "Backend request failed");
        Err(error)
    }
}

fn map_status(status: StatusCode, message: &str, credentials: bool) -> ServiceError {
    if status.is_server_error() {
        return ServiceError::unavailable(format!("server error {}: {message}", status.as_u16()));
    }
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED if credentials => {
            ServiceError::InvalidCredentials
        }
        StatusCode::NOT_FOUND => ServiceError::NotFound,
        _ => ServiceError::rejected(status.as_u16(), message),
    }
}

/// Human-readable message of an error body, whichever API produced it.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| value.get(key)?.as_str().map(str::to_owned))
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod rest_tests;
