//! Wire types for the Revline backend auth endpoints.
//!
//! Bodies beyond the fields named here are a backend concern; the client
//! only depends on what it reads.

use serde::{Deserialize, Serialize};

use revline_core::{Email, Role, UserId};

/// Authenticated user profile as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    pub id: UserId,
    /// Account email address.
    pub email: Email,
    /// Account role.
    #[serde(default)]
    pub role: Role,
}

/// Body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name for the new account.
    pub name: String,
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Response from `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated user.
    pub user: User,
}

/// Error body shape used by the backend for failed requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}
