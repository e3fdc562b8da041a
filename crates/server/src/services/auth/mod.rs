//! Authentication and account management.
//!
//! Passwords are hashed with Argon2id. Login failures are uniform: unknown
//! email, wrong password and inactive account all yield
//! [`AuthError::InvalidCredentials`].

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use atelier_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserChanges, UserRepository};
use crate::models::User;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Fields for an account created by an administrator.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Administrator edit of an account. `None` keeps the current value.
#[derive(Debug, Default)]
pub struct AccountUpdate<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password: Option<&'a str>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// A user's edit of their own profile.
#[derive(Debug, Default)]
pub struct ProfileUpdate<'a> {
    pub username: Option<&'a str>,
    pub email: Option<&'a str>,
    /// Required when `new_password` is set.
    pub current_password: Option<&'a str>,
    pub new_password: Option<&'a str>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown, the
    /// password is wrong or the account is inactive.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            tracing::info!(user_id = %user.id, "Login refused for inactive account");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Self-service signup; the account gets the `client` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.create_user(&NewAccount {
            username,
            email,
            password,
            role: Role::Client,
        })
        .await
    }

    /// Create an account with an explicit role.
    ///
    /// # Errors
    ///
    /// See [`AuthService::register`].
    #[instrument(skip(self, account), fields(email = %account.email, role = %account.role))]
    pub async fn create_user(&self, account: &NewAccount<'_>) -> Result<User, AuthError> {
        let username = validate_username(account.username)?;
        let email = Email::parse(account.email)?;
        validate_password(account.password)?;
        let password_hash = hash_password(account.password)?;

        let user = self
            .users
            .create(&NewUser {
                username,
                email: &email,
                password_hash: &password_hash,
                role: account.role,
            })
            .await
            .map_err(conflict_as_existing)?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Apply an administrator's edit to an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has `id`, plus the
    /// validation errors of [`AuthService::create_user`].
    pub async fn update_user(
        &self,
        id: UserId,
        update: &AccountUpdate<'_>,
    ) -> Result<User, AuthError> {
        let username = update.username.map(validate_username).transpose()?;
        let email = update.email.map(Email::parse).transpose()?;
        let password_hash = match update.password.filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        self.users
            .update(
                id,
                &UserChanges {
                    username,
                    email: email.as_ref(),
                    password_hash: password_hash.as_deref(),
                    role: update.role,
                    is_active: update.is_active,
                },
            )
            .await
            .map_err(conflict_as_existing)
    }

    /// Apply a user's edit to their own profile.
    ///
    /// Changing the password requires the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is
    /// missing or wrong, plus the errors of [`AuthService::update_user`].
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate<'_>,
    ) -> Result<User, AuthError> {
        let new_password = update.new_password.filter(|p| !p.is_empty());

        if new_password.is_some() {
            let current = update
                .current_password
                .ok_or(AuthError::InvalidCredentials)?;
            let hash = self
                .users
                .get_password_hash_by_id(id)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            verify_password(current, &hash)?;
        }

        self.update_user(
            id,
            &AccountUpdate {
                username: update.username,
                email: update.email,
                password: new_password,
                role: None,
                is_active: None,
            },
        )
        .await
    }
}

fn conflict_as_existing(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        RepositoryError::NotFound => AuthError::UserNotFound,
        other => AuthError::Repository(other),
    }
}

fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is required".to_owned()));
    }
    Ok(username)
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
