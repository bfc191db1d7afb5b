//! Bearer credential binding for outgoing requests.
//!
//! The HTTP client's `Authorization` header is shared mutable state with
//! exactly one legitimate writer: the session manager. Instead of mutating
//! a library-global default-headers map, the binding is an explicit
//! [`CredentialProvider`] handle injected into the API client, which reads
//! the current token when building each request.

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;

/// Shared, single-writer holder for the current bearer token.
///
/// Clones share the same slot. The session manager writes; everything that
/// issues authenticated requests reads via [`current`](Self::current).
#[derive(Clone, Default)]
pub struct CredentialProvider {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl CredentialProvider {
    /// Create an empty provider (no credential installed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a bearer token.
    ///
    /// An empty string means "no token" and is treated as [`clear`](Self::clear);
    /// an empty credential is never stored.
    pub fn set(&self, token: &str) {
        if token.is_empty() {
            self.clear();
            return;
        }
        *self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(SecretString::from(token.to_owned()));
    }

    /// Remove the installed token, if any.
    pub fn clear(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The currently installed token.
    #[must_use]
    pub fn current(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a token is currently installed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token", &if self.is_set() { "[REDACTED]" } else { "[NONE]" })
            .finish()
    }
}
