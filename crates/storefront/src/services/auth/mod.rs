//! Authentication service.
//!
//! Provides password authentication for users and administrators, user
//! registration with a recovery question, and password recovery.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;

use tienda_core::{Email, RecoveryQuestionId};

use crate::db::{AdministratorRepository, RepositoryError, UserRepository};
use crate::models::{Administrator, NewUser, RecoveryQuestion, User};
use crate::services::validation::ValidationErrors;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

const DUPLICATE_EMAIL: &str = "An account already exists for this email";

/// Registration form submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationInput {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub recovery_question: String,
    pub recovery_answer: String,
}

/// Password recovery submission (second step).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecoveryInput {
    pub email: String,
    pub answer: String,
    pub password: String,
    pub confirm_password: String,
}

/// Authentication service.
///
/// Handles registration, login for both principal kinds and password recovery.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
    administrators: &'a dyn AdministratorRepository,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserRepository,
        administrators: &'a dyn AdministratorRepository,
    ) -> Self {
        Self {
            users,
            administrators,
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a new user with a recovery question.
    ///
    /// Every field is checked before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with all messages if any field is invalid
    /// or the email is already registered.
    pub async fn register_user(
        &self,
        input: &RegistrationInput,
        questions: &[RecoveryQuestion],
    ) -> Result<User, AuthError> {
        let mut errors = ValidationErrors::new();

        let email = match Email::parse(&input.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(format!("Email: {e}"));
                None
            }
        };
        if let Err(msg) = validate_password(&input.password) {
            errors.push(msg);
        }
        errors.check(
            input.password == input.confirm_password,
            "Passwords do not match",
        );
        let question = input
            .recovery_question
            .parse::<RecoveryQuestionId>()
            .ok()
            .filter(|id| questions.iter().any(|q| q.id == *id));
        errors.check(question.is_some(), "Choose a recovery question");
        errors.check(
            !input.recovery_answer.trim().is_empty(),
            "Recovery answer is required",
        );
        if let Some(email) = &email {
            errors.check(!self.users.exists(email).await?, DUPLICATE_EMAIL);
        }

        errors.into_result().map_err(AuthError::Validation)?;
        let (Some(email), Some(recovery_question)) = (email, question) else {
            return Err(AuthError::Validation(ValidationErrors::new()));
        };

        let new_user = NewUser {
            email,
            password_hash: hash_secret(&input.password)?,
            recovery_question,
            recovery_answer_hash: hash_secret(&normalise_answer(&input.recovery_answer))?,
        };

        self.users.create(new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AuthError::Validation(ValidationErrors::from(DUPLICATE_EMAIL.to_owned()))
            }
            other => AuthError::Repository(other),
        })
    }

    /// Login a user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or
    /// malformed or the password is wrong, and `AuthError::Blocked` if the
    /// account is suspended.
    pub async fn login_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_secret(password, &password_hash)?;

        if user.is_blocked() {
            return Err(AuthError::Blocked);
        }

        Ok(user)
    }

    /// The recovery question registered for an email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if no account matches.
    pub async fn recovery_question(&self, email: &str) -> Result<RecoveryQuestionId, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        self.users
            .find_recovery(&email)
            .await?
            .map(|r| r.question)
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Set a new password after checking the recovery answer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the new password is invalid and
    /// `AuthError::InvalidCredentials` if the account or answer does not match.
    pub async fn recover_password(&self, input: &RecoveryInput) -> Result<(), AuthError> {
        let mut errors = ValidationErrors::new();
        if let Err(msg) = validate_password(&input.password) {
            errors.push(msg);
        }
        errors.check(
            input.password == input.confirm_password,
            "Passwords do not match",
        );
        errors.into_result().map_err(AuthError::Validation)?;

        let email = Email::parse(&input.email).map_err(|_| AuthError::InvalidCredentials)?;
        let recovery = self
            .users
            .find_recovery(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_secret(&normalise_answer(&input.answer), &recovery.answer_hash)?;

        let password_hash = hash_secret(&input.password)?;
        self.users
            .update_password(recovery.user_id, &password_hash)
            .await?;

        tracing::info!(user_id = %recovery.user_id, "Password recovered");
        Ok(())
    }

    // =========================================================================
    // Administrators
    // =========================================================================

    /// Login an administrator with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login_administrator(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Administrator, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (admin, password_hash) = self
            .administrators
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_secret(password, &password_hash)?;

        Ok(admin)
    }

    /// Create an administrator account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::AlreadyExists` if the email is already registered.
    pub async fn create_administrator(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Administrator, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password).map_err(AuthError::WeakPassword)?;
        let password_hash = hash_secret(password)?;

        self.administrators
            .create(&email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Check password requirements, returning the message to show on failure.
fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Recovery answers compare trimmed and lower-cased.
fn normalise_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Hash a password or recovery answer using Argon2id.
fn hash_secret(secret: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a secret against a hash.
fn verify_secret(secret: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(secret.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tienda_core::BlockReasonId;

    use super::*;
    use crate::db::{CatalogRepository, InMemoryStore};

    fn registration(email: &str) -> RegistrationInput {
        RegistrationInput {
            email: email.to_owned(),
            password: "correct horse".to_owned(),
            confirm_password: "correct horse".to_owned(),
            recovery_question: "1".to_owned(),
            recovery_answer: "  Firulais ".to_owned(),
        }
    }

    async fn register(store: &InMemoryStore, email: &str) -> User {
        let questions = store.recovery_questions().await.unwrap();
        AuthService::new(store, store)
            .register_user(&registration(email), &questions)
            .await
            .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_secret("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_secret("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_secret("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = InMemoryStore::seeded();
        let user = register(&store, "Ana@Example.com").await;
        assert_eq!(user.email.as_str(), "ana@example.com");

        let auth = AuthService::new(&store, &store);
        let logged_in = auth
            .login_user("ana@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_register_accumulates_messages() {
        let store = InMemoryStore::seeded();
        let questions = store.recovery_questions().await.unwrap();
        let input = RegistrationInput {
            email: "not-an-email".to_owned(),
            password: "short".to_owned(),
            confirm_password: "different".to_owned(),
            recovery_question: "99".to_owned(),
            recovery_answer: "   ".to_owned(),
        };

        let Err(AuthError::Validation(errors)) = AuthService::new(&store, &store)
            .register_user(&input, &questions)
            .await
        else {
            panic!("expected validation failure");
        };

        assert_eq!(errors.messages().len(), 5);
        assert!(UserRepository::find_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = InMemoryStore::seeded();
        register(&store, "ana@example.com").await;

        let questions = store.recovery_questions().await.unwrap();
        let Err(AuthError::Validation(errors)) = AuthService::new(&store, &store)
            .register_user(&registration("ana@example.com"), &questions)
            .await
        else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.messages(), [DUPLICATE_EMAIL]);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = InMemoryStore::seeded();
        register(&store, "ana@example.com").await;
        let auth = AuthService::new(&store, &store);

        for (email, password) in [
            ("ana@example.com", "wrong password"),
            ("nobody@example.com", "correct horse"),
            ("not an email", "correct horse"),
        ] {
            assert!(matches!(
                auth.login_user(email, password).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn test_blocked_user_cannot_login() {
        let store = InMemoryStore::seeded();
        let user = register(&store, "ana@example.com").await;
        store
            .set_block_reason(user.id, Some(BlockReasonId::new(1)))
            .await
            .unwrap();

        let auth = AuthService::new(&store, &store);
        assert!(matches!(
            auth.login_user("ana@example.com", "correct horse").await,
            Err(AuthError::Blocked)
        ));
        assert!(matches!(
            auth.login_user("ana@example.com", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_recover_password() {
        let store = InMemoryStore::seeded();
        register(&store, "ana@example.com").await;
        let auth = AuthService::new(&store, &store);

        assert_eq!(
            auth.recovery_question("ana@example.com").await.unwrap(),
            RecoveryQuestionId::new(1)
        );

        let mut input = RecoveryInput {
            email: "ana@example.com".to_owned(),
            answer: "rex".to_owned(),
            password: "brand new pass".to_owned(),
            confirm_password: "brand new pass".to_owned(),
        };
        assert!(matches!(
            auth.recover_password(&input).await,
            Err(AuthError::InvalidCredentials)
        ));

        input.answer = "FIRULAIS".to_owned();
        auth.recover_password(&input).await.unwrap();

        assert!(
            auth.login_user("ana@example.com", "brand new pass")
                .await
                .is_ok()
        );
        assert!(
            auth.login_user("ana@example.com", "correct horse")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_administrator_login() {
        let store = InMemoryStore::seeded();
        let auth = AuthService::new(&store, &store);
        let admin = auth
            .create_administrator("admin@tienda.dev", "s3cret-admin")
            .await
            .unwrap();

        assert_eq!(
            auth.login_administrator("admin@tienda.dev", "s3cret-admin")
                .await
                .unwrap()
                .id,
            admin.id
        );
        assert!(matches!(
            auth.login_administrator("admin@tienda.dev", "nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.create_administrator("admin@tienda.dev", "another-pass")
                .await,
            Err(AuthError::AlreadyExists)
        ));
        assert!(matches!(
            auth.create_administrator("admin@tienda.dev", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
