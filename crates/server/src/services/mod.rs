//! Business logic services.
//!
//! - [`auth`] - Login, signup and account management
//! - [`email`] - Order and contact notifications over SMTP

pub mod auth;
pub mod email;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
