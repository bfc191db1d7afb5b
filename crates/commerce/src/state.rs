//! Wired-together commerce state for embedders.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::cart::CartStore;
use crate::checkout::CheckoutOrchestrator;
use crate::config::CommerceConfig;
use crate::credentials::CredentialProvider;
use crate::session::SessionManager;
use crate::storage::{JsonFileStorage, Storage, StorageError};

/// Error creating the commerce state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// The session, cart, and checkout wired over shared storage and a shared
/// credential provider.
///
/// This struct is cheaply cloneable via `Arc` and is what UI code holds.
#[derive(Clone)]
pub struct CommerceState {
    inner: Arc<CommerceStateInner>,
}

struct CommerceStateInner {
    session: SessionManager,
    cart: CartStore,
    checkout: CheckoutOrchestrator,
}

impl CommerceState {
    /// Wire up the full commerce core from configuration.
    ///
    /// Storage is file-backed under `config.storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage directory cannot be created or the
    /// HTTP client cannot be built.
    pub fn new(config: &CommerceConfig) -> Result<Self, StateError> {
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.storage_dir)?);
        Self::with_storage(config, storage)
    }

    /// Wire up the commerce core over a caller-supplied store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: &CommerceConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, StateError> {
        let credentials = CredentialProvider::new();
        let api = ApiClient::new(config, credentials.clone())?;

        let session = SessionManager::new(api, credentials, Arc::clone(&storage));
        let cart = CartStore::new(Arc::clone(&storage));
        let checkout =
            CheckoutOrchestrator::new(cart.clone(), storage, config.checkout_latency);

        Ok(Self {
            inner: Arc::new(CommerceStateInner {
                session,
                cart,
                checkout,
            }),
        })
    }

    /// Get a reference to the session manager.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the checkout orchestrator.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }
}
