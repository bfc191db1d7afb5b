//! Catalog and account enums.

use serde::{Deserialize, Serialize};

/// The kind of product a cart line refers to.
///
/// Together with the product ID this forms the identity key of a cart line:
/// a restomod build and a service package may share a raw ID without
/// colliding in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A restored/modified vehicle build.
    Restomod,
    /// A service or upgrade package.
    Package,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restomod => write!(f, "restomod"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// Account role reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular storefront customer.
    #[default]
    Customer,
    /// Back-office administrator.
    Admin,
    /// Any role this client version does not know about.
    #[serde(other)]
    Unknown,
}
