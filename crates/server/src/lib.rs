//! Atelier server library.
//!
//! The HTTP API for the back office (users, articles, clients, suppliers)
//! and the public catalog with order submission, exposed as a library so
//! the CLI and tests can reuse it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
