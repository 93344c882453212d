use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{error::RepoError, repo_types::Account};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Number of accounts stored under exactly this email.
    async fn count_by_email(&self, email: &str) -> Result<u64, RepoError>;

    /// Persist an account whose id and password hash are already set.
    async fn insert(&self, account: &Account) -> Result<(), RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Account, RepoError>;

    async fn list_all(&self) -> Result<Vec<Account>, RepoError>;
}

/// Postgres-backed accounts. Email uniqueness is enforced by the
/// `accounts_email_key` unique constraint.
#[derive(Clone)]
pub struct PgAccountRepository {
    db: PgPool,
}

impl PgAccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn count_by_email(&self, email: &str) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, account: &Account) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, email, password_hash)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => RepoError::Duplicate,
            _ => RepoError::Database(e),
        })?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, RepoError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Account>, RepoError> {
        let rows = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash
            FROM accounts
            ORDER BY email
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
