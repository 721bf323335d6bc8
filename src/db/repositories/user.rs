//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::{User, UserDetails, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist name, email, age, role and details
    async fn update(&self, user: &User) -> Result<User>;

    /// Replace the password hash
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    /// List users with the given role, newest first
    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        create_user(self.pool.sqlite(), user).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        get_user_by_id(self.pool.sqlite(), id).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        get_user_by_email(self.pool.sqlite(), email).await
    }

    async fn update(&self, user: &User) -> Result<User> {
        update_user(self.pool.sqlite(), user).await
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count users")?;
        Ok(row.get("count"))
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>> {
        list_users_by_role(self.pool.sqlite(), role).await
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, age, full_name, address, city, state, \
                            country, zip_code, phone_number, created_at, updated_at";

async fn create_user(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let d = &user.details;

    let result = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, role, age, full_name, address, city, state,
                           country, zip_code, phone_number, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(user.email.to_lowercase())
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.age)
    .bind(&d.full_name)
    .bind(&d.address)
    .bind(&d.city)
    .bind(&d.state)
    .bind(&d.country)
    .bind(&d.zip_code)
    .bind(&d.phone_number)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        email: user.email.to_lowercase(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user).transpose()
}

async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;

    row.as_ref().map(row_to_user).transpose()
}

async fn update_user(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let d = &user.details;

    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, role = ?, age = ?, full_name = ?, address = ?, city = ?,
            state = ?, country = ?, zip_code = ?, phone_number = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(user.email.to_lowercase())
    .bind(user.role.to_string())
    .bind(user.age)
    .bind(&d.full_name)
    .bind(&d.address)
    .bind(&d.city)
    .bind(&d.state)
    .bind(&d.country)
    .bind(&d.zip_code)
    .bind(&d.phone_number)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    get_user_by_id(pool, user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User not found after update"))
}

async fn list_users_by_role(pool: &SqlitePool, role: UserRole) -> Result<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE role = ? ORDER BY created_at DESC, id DESC",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(role.to_string())
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;

    rows.iter().map(row_to_user).collect()
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        age: row.get("age"),
        details: UserDetails {
            full_name: row.get("full_name"),
            address: row.get("address"),
            city: row.get("city"),
            state: row.get("state"),
            country: row.get("country"),
            zip_code: row.get("zip_code"),
            phone_number: row.get("phone_number"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    fn create_test_user(name: &str, email: &str) -> User {
        User::new(
            name.to_string(),
            email.to_string(),
            hash_password("test_password").expect("Failed to hash password"),
            UserRole::User,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("Test", "test@example.com"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);
        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.name, "Test");
        assert_eq!(found.role, UserRole::User);
        assert!(found.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_get_by_email_ignores_case() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_user("Mixed", "mixed@example.com"))
            .await
            .expect("Failed to create user");

        let found = repo
            .get_by_email("MIXED@Example.com")
            .await
            .expect("Failed to get user");
        assert!(found.is_some());
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_email_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&create_test_user("One", "dup@example.com"))
            .await
            .expect("Failed to create first user");
        let err = repo
            .create(&create_test_user("Two", "DUP@example.com"))
            .await
            .unwrap_err();

        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_update_user_details() {
        let (_pool, repo) = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("Before", "details@example.com"))
            .await
            .unwrap();

        user.name = "After".into();
        user.age = Some(31);
        user.details.city = "Lisbon".into();
        let updated = repo.update(&user).await.expect("Failed to update user");

        assert_eq!(updated.name, "After");
        assert_eq!(updated.age, Some(31));
        assert_eq!(updated.details.city, "Lisbon");
    }

    #[tokio::test]
    async fn test_list_by_role_and_delete() {
        let (_pool, repo) = setup_test_repo().await;
        let mut admin = create_test_user("Admin", "admin@example.com");
        admin.role = UserRole::Admin;
        repo.create(&admin).await.unwrap();
        let user = repo.create(&create_test_user("User", "user@example.com")).await.unwrap();

        let users = repo.list_by_role(UserRole::User).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "user@example.com");

        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_password() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo.create(&create_test_user("Pw", "pw@example.com")).await.unwrap();

        repo.update_password(user.id, "new-hash").await.unwrap();
        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.password_hash, "new-hash");
    }
}
