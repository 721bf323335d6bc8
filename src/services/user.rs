//! User service
//!
//! Accounts, sessions and the shipping details attached to an account:
//! - Registration (the first account becomes admin)
//! - Login/logout with opaque session tokens
//! - Self-or-admin profile access
//! - Admin user management

use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, UpdateUserDetailsInput, UpdateUserInput, User, UserDetails, UserRole};
use crate::services::password::{hash_password, is_acceptable_password, verify_password, MIN_PASSWORD_LENGTH};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Default session lifetime in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or session
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// The caller may not touch this account
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a shopper account.
    ///
    /// The very first account in an empty database is made admin.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a missing name, malformed email or short password
    /// - `UserExists` if the email is taken
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        validate_account_fields(&input.name, &input.email, &input.password)?;

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::User
        };

        self.insert_user(input.name, input.email, &input.password, role, None)
            .await
    }

    /// Check credentials and open a new session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(input.email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        let password_valid =
            verify_password(&input.password, &user.password_hash).context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::debug!("User {} logged in", user.id);
        Ok((session, user))
    }

    /// Invalidate a session token. Unknown tokens are not an error.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are removed and treated as missing.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to remove expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    /// Change the caller's password after checking the current one
    pub async fn change_password(&self, user_id: i64, input: ChangePasswordInput) -> Result<(), UserServiceError> {
        let user = self.require_user(user_id).await?;

        let current_ok = verify_password(&input.current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !current_ok {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        if !is_acceptable_password(&input.new_password) {
            return Err(password_too_short());
        }

        let hash = hash_password(&input.new_password).context("Failed to hash password")?;
        self.user_repo
            .update_password(user.id, &hash)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    /// All accounts with the `user` role (admin view)
    pub async fn list_users(&self) -> Result<Vec<User>, UserServiceError> {
        let users = self
            .user_repo
            .list_by_role(UserRole::User)
            .await
            .context("Failed to list users")?;
        Ok(users)
    }

    /// Admin account creation, optionally with an explicit role
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        validate_account_fields(&input.name, &input.email, &input.password)?;
        validate_age(input.age)?;
        let role = input.role.unwrap_or_default();
        self.insert_user(input.name, input.email, &input.password, role, input.age)
            .await
    }

    /// Remove an account and its sessions
    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        self.session_repo
            .delete_by_user(id)
            .await
            .context("Failed to delete user sessions")?;
        let deleted = self.user_repo.delete(id).await.context("Failed to delete user")?;
        if !deleted {
            return Err(UserServiceError::NotFound);
        }
        Ok(())
    }

    /// Read an account; only the owner or an admin may
    pub async fn get_user(&self, actor: &User, id: i64) -> Result<User, UserServiceError> {
        ensure_self_or_admin(actor, id)?;
        self.require_user(id).await
    }

    /// Update name, email or age of an account (owner or admin)
    pub async fn update_user(&self, actor: &User, id: i64, input: UpdateUserInput) -> Result<User, UserServiceError> {
        ensure_self_or_admin(actor, id)?;
        let mut user = self.require_user(id).await?;

        if let Some(name) = input.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(UserServiceError::ValidationError("Name cannot be empty".to_string()));
            }
            user.name = name.to_string();
        }

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if !is_plausible_email(&email) {
                return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
            }
            if email != user.email && self.email_taken(&email).await? {
                return Err(email_exists(&email));
            }
            user.email = email;
        }

        if input.age.is_some() {
            validate_age(input.age)?;
            user.age = input.age;
        }

        match self.user_repo.update(&user).await {
            Ok(updated) => Ok(updated),
            Err(e) if is_unique_violation(&e) => Err(email_exists(&user.email)),
            Err(e) => Err(UserServiceError::InternalError(e.context("Failed to update user"))),
        }
    }

    /// Shipping details of the account with `email`
    pub async fn get_details(&self, actor: &User, email: &str) -> Result<UserDetails, UserServiceError> {
        Ok(self.user_for_email(actor, email).await?.details)
    }

    /// Whether every shipping detail of the account is filled in
    pub async fn details_complete(&self, actor: &User, email: &str) -> Result<bool, UserServiceError> {
        Ok(self.get_details(actor, email).await?.is_complete())
    }

    /// Merge supplied shipping details into the account
    pub async fn update_details(
        &self,
        actor: &User,
        email: &str,
        input: UpdateUserDetailsInput,
    ) -> Result<UserDetails, UserServiceError> {
        let mut user = self.user_for_email(actor, email).await?;
        input.apply_to(&mut user.details);
        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user details")?;
        Ok(updated.details)
    }

    async fn user_for_email(&self, actor: &User, email: &str) -> Result<User, UserServiceError> {
        if !actor.can_access_email(email) {
            return Err(UserServiceError::Forbidden(
                "You can only access your own details".to_string(),
            ));
        }
        self.user_repo
            .get_by_email(email.trim())
            .await
            .context("Failed to get user by email")?
            .ok_or(UserServiceError::NotFound)
    }

    async fn require_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?
            .ok_or(UserServiceError::NotFound)
    }

    async fn email_taken(&self, email: &str) -> Result<bool, UserServiceError> {
        let existing = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?;
        Ok(existing.is_some())
    }

    async fn insert_user(
        &self,
        name: String,
        email: String,
        password: &str,
        role: UserRole,
        age: Option<i64>,
    ) -> Result<User, UserServiceError> {
        let email = email.trim().to_lowercase();
        if self.email_taken(&email).await? {
            return Err(email_exists(&email));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let mut user = User::new(name.trim().to_string(), email, password_hash, role);
        user.age = age;

        match self.user_repo.create(&user).await {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => Err(email_exists(&user.email)),
            Err(e) => Err(UserServiceError::InternalError(e.context("Failed to create user"))),
        }
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

fn validate_account_fields(name: &str, email: &str, password: &str) -> Result<(), UserServiceError> {
    if name.trim().is_empty() {
        return Err(UserServiceError::ValidationError("Name cannot be empty".to_string()));
    }
    if email.trim().is_empty() {
        return Err(UserServiceError::ValidationError("Email cannot be empty".to_string()));
    }
    if !is_plausible_email(email.trim()) {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    if !is_acceptable_password(password) {
        return Err(password_too_short());
    }
    Ok(())
}

fn validate_age(age: Option<i64>) -> Result<(), UserServiceError> {
    match age {
        Some(age) if !(0..=150).contains(&age) => Err(UserServiceError::ValidationError(
            "Age must be between 0 and 150".to_string(),
        )),
        _ => Ok(()),
    }
}

/// `local@domain.tld` with no whitespace
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn ensure_self_or_admin(actor: &User, id: i64) -> Result<(), UserServiceError> {
    if actor.is_admin() || actor.id == id {
        Ok(())
    } else {
        Err(UserServiceError::Forbidden(
            "You can only access your own account".to_string(),
        ))
    }
}

fn password_too_short() -> UserServiceError {
    UserServiceError::ValidationError(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LENGTH
    ))
}

fn email_exists(email: &str) -> UserServiceError {
    UserServiceError::UserExists(format!("Email '{}' is already registered", email))
}

/// Input for registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Admin-side account creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<UserRole>,
    pub age: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordInput {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> UserService {
        setup_with_expiration(DEFAULT_SESSION_EXPIRATION_DAYS).await
    }

    async fn setup_with_expiration(days: i64) -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool);
        UserService::with_session_expiration(user_repo, session_repo, days)
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let service = setup_test_service().await;

        let first = service
            .register(RegisterInput::new("Root", "root@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(first.role, UserRole::Admin);

        let second = service
            .register(RegisterInput::new("Ada", "ada@example.com", "password123"))
            .await
            .unwrap();
        assert_eq!(second.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let service = setup_test_service().await;

        let cases = [
            RegisterInput::new("", "a@example.com", "password"),
            RegisterInput::new("Ada", "not-an-email", "password"),
            RegisterInput::new("Ada", "a@example.com", "12345"),
        ];
        for input in cases {
            assert!(matches!(
                service.register(input).await,
                Err(UserServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email_ignores_case() {
        let service = setup_test_service().await;
        service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();

        let result = service
            .register(RegisterInput::new("Other", "ADA@example.com", "password"))
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();

        let (session, logged_in) = service
            .login(LoginInput::new("Ada@Example.com", "password"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let service = setup_test_service().await;
        service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();

        let wrong = service.login(LoginInput::new("ada@example.com", "nope-nope")).await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service.login(LoginInput::new("bob@example.com", "password")).await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_cleaned() {
        let service = setup_with_expiration(-1).await;
        service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();
        let (first, _) = service.login(LoginInput::new("ada@example.com", "password")).await.unwrap();
        service.login(LoginInput::new("ada@example.com", "password")).await.unwrap();

        assert!(service.validate_session(&first.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let service = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();

        let wrong = service
            .change_password(
                user.id,
                ChangePasswordInput {
                    current_password: "bad".into(),
                    new_password: "newpassword".into(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        service
            .change_password(
                user.id,
                ChangePasswordInput {
                    current_password: "password".into(),
                    new_password: "newpassword".into(),
                },
            )
            .await
            .unwrap();
        assert!(service.login(LoginInput::new("ada@example.com", "newpassword")).await.is_ok());
        assert!(service.login(LoginInput::new("ada@example.com", "password")).await.is_err());
    }

    #[tokio::test]
    async fn test_self_or_admin_access() {
        let service = setup_test_service().await;
        let admin = service
            .register(RegisterInput::new("Root", "root@example.com", "password"))
            .await
            .unwrap();
        let ada = service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();
        let bob = service
            .register(RegisterInput::new("Bob", "bob@example.com", "password"))
            .await
            .unwrap();

        assert!(service.get_user(&ada, ada.id).await.is_ok());
        assert!(service.get_user(&admin, ada.id).await.is_ok());
        assert!(matches!(
            service.get_user(&bob, ada.id).await,
            Err(UserServiceError::Forbidden(_))
        ));

        let updated = service
            .update_user(
                &ada,
                ada.id,
                UpdateUserInput {
                    name: Some("Ada L".into()),
                    age: Some(36),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L");
        assert_eq!(updated.age, Some(36));

        let taken = service
            .update_user(
                &admin,
                ada.id,
                UpdateUserInput {
                    email: Some("bob@example.com".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(taken, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_details_update_and_completeness() {
        let service = setup_test_service().await;
        let ada = service
            .register(RegisterInput::new("Ada", "ada@example.com", "password"))
            .await
            .unwrap();
        assert!(!service.details_complete(&ada, "ada@example.com").await.unwrap());

        let details = service
            .update_details(
                &ada,
                "ada@example.com",
                UpdateUserDetailsInput {
                    full_name: Some("Ada Lovelace".into()),
                    address: Some("12 Analytical Row".into()),
                    city: Some("London".into()),
                    state: Some("London".into()),
                    country: Some("UK".into()),
                    zip_code: Some("N1".into()),
                    phone_number: Some("+44 1".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(details.city, "London");
        assert!(service.details_complete(&ada, "ADA@example.com").await.unwrap());

        let bob = service
            .register(RegisterInput::new("Bob", "bob@example.com", "password"))
            .await
            .unwrap();
        assert!(matches!(
            service.get_details(&bob, "ada@example.com").await,
            Err(UserServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_create_list_delete() {
        let service = setup_test_service().await;
        service
            .register(RegisterInput::new("Root", "root@example.com", "password"))
            .await
            .unwrap();

        let created = service
            .create_user(CreateUserInput {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "password".into(),
                role: None,
                age: Some(30),
            })
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::User);

        let users = service.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "ada@example.com");

        service.delete_user(created.id).await.unwrap();
        assert!(matches!(
            service.delete_user(created.id).await,
            Err(UserServiceError::NotFound)
        ));
    }

    #[test]
    fn test_is_plausible_email() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
        assert!(!is_plausible_email("a@.co"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        /// Any registered credentials log in and resolve back to the same user.
        #[test]
        fn login_roundtrip(
            name in "[A-Za-z]{3,10}",
            local in "[a-z]{3,10}",
            password in "[a-zA-Z0-9!@#$%^&*]{6,20}"
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_test_service().await;
                let email = format!("{}@example.com", local);
                let user = service
                    .register(RegisterInput::new(name, email.clone(), password.clone()))
                    .await
                    .expect("Registration should succeed");

                let (session, _) = service
                    .login(LoginInput::new(email, password))
                    .await
                    .expect("Login should succeed");
                let resolved = service
                    .validate_session(&session.id)
                    .await
                    .expect("Validation should not error")
                    .expect("Session should resolve");

                prop_assert_eq!(resolved.id, user.id);
                prop_assert_ne!(resolved.password_hash, String::new());
                Ok(())
            });
            result?;
        }
    }
}
