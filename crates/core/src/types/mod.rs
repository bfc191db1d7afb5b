//! Core types for Revline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod kind;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use kind::{ItemKind, Role};
pub use price::{Price, PriceError};
