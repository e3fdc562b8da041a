//! Atelier Core - Shared domain types.
//!
//! This crate provides the types used across all Atelier components:
//! - `server` - JSON API for the back office and the public catalog
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. The cart lives here because its arithmetic must agree
//! with the order total computed on the server.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles and prices
//! - [`cart`] - Shopping cart state and totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartArticle, CartError, CartItem};
pub use types::*;
