//! Revline Commerce - client-side session and commerce state core.
//!
//! This crate owns the stateful heart of the Revline storefront client: the
//! authentication session, the shopping cart, and the checkout flow. All of
//! it survives restarts through a small key-value persistence layer and
//! keeps the HTTP client's bearer credential in sync with the session.
//!
//! # Architecture
//!
//! - [`storage`] - durable JSON key-value persistence (file-backed or
//!   in-memory)
//! - [`credentials`] - the single mutable binding between the session and
//!   the `Authorization` header on outgoing requests
//! - [`api`] - REST client for the Revline backend auth endpoints
//! - [`session`] - the authentication state machine
//! - [`cart`] - cart line items, derived totals, persistence on every
//!   mutation
//! - [`checkout`] - converts the cart into an immutable order record
//! - [`state`] - wires the pieces together for embedders
//!
//! # Example
//!
//! ```rust,ignore
//! use revline_commerce::{CommerceConfig, CommerceState};
//!
//! let config = CommerceConfig::from_env()?;
//! let state = CommerceState::new(&config)?;
//!
//! state.session().restore_session().await;
//! state.cart().add_item(item);
//! let order = state.checkout().checkout(customer).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod credentials;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use cart::{CartItem, CartStore};
pub use checkout::{CheckoutError, CheckoutOrchestrator, CustomerInfo, Order, OrderStatus};
pub use config::{CommerceConfig, ConfigError};
pub use credentials::CredentialProvider;
pub use session::{SessionManager, SessionSnapshot, SessionStatus};
pub use state::{CommerceState, StateError};
pub use storage::{JsonFileStorage, MemoryStorage, Storage, StorageError, StorageExt};
