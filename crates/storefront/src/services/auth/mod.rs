//! Authentication service.
//!
//! Email and password accounts with argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;

use handicrafts_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length.
const MAX_NAME_LENGTH: usize = 100;

/// Requested profile changes.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    /// Required when `new_password` is set.
    pub current_password: Option<&'a str>,
    pub new_password: Option<&'a str>,
}

/// Authentication service.
///
/// Handles user registration, login, and profile changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change name and email, and optionally the password.
    ///
    /// A password change requires the current password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong.
    /// Returns `AuthError::UserAlreadyExists` if the email belongs to someone else.
    /// Returns validation errors as for [`Self::register`].
    #[tracing::instrument(skip(self, update), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate<'_>,
    ) -> Result<User, AuthError> {
        let name = validate_name(update.name)?;
        let email = Email::parse(update.email)?;

        let new_password = update.new_password.filter(|p| !p.is_empty());
        let new_hash = match new_password {
            Some(new_password) => {
                validate_password(new_password)?;
                let current_hash = self
                    .users
                    .get_password_hash_by_id(user_id)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => AuthError::UserNotFound,
                        other => AuthError::Repository(other),
                    })?;
                verify_password(update.current_password.unwrap_or_default(), &current_hash)?;
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        let user = self
            .users
            .update_profile(user_id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        if let Some(hash) = new_hash {
            self.users.update_password(user_id, &hash).await?;
            tracing::info!("Password changed");
        }

        Ok(user)
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::MissingName);
    }
    Ok(name)
}

/// Validate password meets requirements.
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::pool;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let pool = pool().await;
        let auth = AuthService::new(&pool);

        let user = auth
            .register("Meera", "Meera@Example.com", "handloom-22")
            .await
            .unwrap();
        assert_eq!(user.name, "Meera");
        assert_eq!(user.email.as_str(), "meera@example.com");

        let logged_in = auth.login("meera@example.com", "handloom-22").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            auth.login("meera@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "handloom-22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let pool = pool().await;
        let auth = AuthService::new(&pool);

        auth.register("Meera", "meera@example.com", "handloom-22")
            .await
            .unwrap();
        let err = auth
            .register("Other", "MEERA@example.com", "another-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert_eq!(err.code(), "email_taken");
    }

    #[tokio::test]
    async fn test_password_change_requires_current_password() {
        let pool = pool().await;
        let auth = AuthService::new(&pool);
        let user = auth
            .register("Meera", "meera@example.com", "handloom-22")
            .await
            .unwrap();

        let wrong = ProfileUpdate {
            name: "Meera R",
            email: "meera@example.com",
            current_password: Some("nope"),
            new_password: Some("new-password-1"),
        };
        assert!(matches!(
            auth.update_profile(user.id, &wrong).await,
            Err(AuthError::InvalidCredentials)
        ));

        let right = ProfileUpdate {
            current_password: Some("handloom-22"),
            ..wrong
        };
        let updated = auth.update_profile(user.id, &right).await.unwrap();
        assert_eq!(updated.name, "Meera R");
        assert!(auth.login("meera@example.com", "new-password-1").await.is_ok());
    }
}
