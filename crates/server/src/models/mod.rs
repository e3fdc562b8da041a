//! Domain models for the server.

pub mod session;
pub mod user;

pub use session::{CurrentUser, SessionPayload};
pub use user::User;
