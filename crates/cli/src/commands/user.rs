//! User account commands.

use atelier_core::Role;
use atelier_server::db::users::UserRepository;
use atelier_server::services::AuthService;
use atelier_server::services::auth::NewAccount;

use super::{CliError, connect};

/// Create a user with an explicit role.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(email: &str, name: &str, password: &str, role: &str) -> Result<i32, CliError> {
    let role: Role = role.parse()?;
    let pool = connect().await?;

    tracing::info!("Creating user: {} ({})", email, role);

    if role != Role::Admin && !UserRepository::new(&pool).any_exist().await? {
        tracing::warn!("First account is not an admin; nobody will be able to manage users");
    }

    let user = AuthService::new(&pool)
        .create_user(&NewAccount {
            username: name,
            email,
            password,
            role,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id.as_i32())
}
