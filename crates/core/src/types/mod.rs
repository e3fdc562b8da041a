//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{AmountOverflow, CURRENCY, Price, TAX_RATE};
pub use role::{Role, RoleParseError};
