//! REST client for the Revline backend.
//!
//! Plain JSON-over-HTTPS against the auth endpoints. The client holds a
//! [`CredentialProvider`] and reads the currently installed bearer token
//! when building each request, so whatever the session manager installed
//! last is what goes on the wire - the client itself never writes the
//! credential.

pub mod types;

pub use types::{ApiErrorBody, AuthResponse, LoginRequest, RegisterRequest, User};

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CommerceConfig;
use crate::credentials::CredentialProvider;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connect, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend rejected the credential (401).
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Server-provided message, possibly empty.
        message: String,
    },

    /// Backend reported a non-success status other than 401.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, possibly empty.
        message: String,
    },
}

impl ApiError {
    /// A message suitable for display, preferring what the server said.
    #[must_use]
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Server { message, .. } | Self::Unauthorized { message }
                if !message.is_empty() =>
            {
                message.clone()
            }
            _ => fallback.to_owned(),
        }
    }
}

/// Client for the Revline backend REST API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialProvider,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Http`] if the underlying HTTP client cannot be
    /// built.
    pub fn new(
        config: &CommerceConfig,
        credentials: CredentialProvider,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.trim_end_matches('/').to_owned(),
                credentials,
            }),
        })
    }

    /// The credential provider this client reads from.
    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.inner.credentials
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth Endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for rejected credentials and
    /// [`ApiError::Server`] for other backend failures.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/login", request).await
    }

    /// `POST /auth/register`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Server`] with the backend's message on failure
    /// (e.g. an already-registered email).
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post_json("/auth/register", request).await
    }

    /// `POST /auth/logout`. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures or non-success statuses; the
    /// session manager logs and ignores it.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self.request(Method::POST, "/auth/logout").send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(error_for(status, &text))
    }

    /// `GET /auth/me` - resolve the installed token to a user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for a stale or invalid token.
    pub async fn me(&self) -> Result<User, ApiError> {
        let response = self.request(Method::GET, "/auth/me").send().await?;
        parse_json(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request Plumbing
    // ─────────────────────────────────────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self.inner.http.request(method, url);
        // Read the credential at build time: whatever the session manager
        // installed last is what this request carries.
        if let Some(token) = self.inner.credentials.current() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        parse_json(response).await
    }
}

/// Parse a response body, mapping non-success statuses to errors.
async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    // Body as text first for better error diagnostics
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_for(status, &text));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Build the error for a non-success response.
fn error_for(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized { message };
    }

    tracing::error!(status = %status, server_message = %message, "backend request failed");
    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_unauthorized_with_message() {
        let err = error_for(StatusCode::UNAUTHORIZED, "{\"message\":\"bad token\"}");
        assert!(matches!(
            err,
            ApiError::Unauthorized { ref message } if message == "bad token"
        ));
    }

    #[test]
    fn test_error_for_server_without_body() {
        let err = error_for(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(
            err,
            ApiError::Server { status: 500, ref message } if message.is_empty()
        ));
    }

    #[test]
    fn test_display_message_prefers_server_text() {
        let err = ApiError::Server {
            status: 422,
            message: "email already registered".to_owned(),
        };
        assert_eq!(
            err.display_message("Something went wrong"),
            "email already registered"
        );
    }

    #[test]
    fn test_display_message_fallback() {
        let err = ApiError::Server {
            status: 500,
            message: String::new(),
        };
        assert_eq!(
            err.display_message("Something went wrong"),
            "Something went wrong"
        );
    }
}
