//! Revline Core - Shared types library.
//!
//! This crate provides common types used across all Revline components:
//! - `commerce` - Client-side session and commerce state core
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and
//!   product kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
