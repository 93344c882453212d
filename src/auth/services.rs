use std::{future::Future, sync::Arc, time::Duration};

use tokio::task::JoinError;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{
    error::{AuthError, RepoError},
    jwt::TokenIssuer,
    password::CredentialHasher,
    repo::AccountRepository,
    repo_types::Account,
};

/// Signup, login and listing over an [`AccountRepository`].
#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    hasher: CredentialHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            accounts,
            hasher,
            tokens,
        }
    }

    /// Registers a new account and returns its id.
    ///
    /// The count check gives a friendly conflict in the common case; the
    /// store's unique email constraint is what actually prevents duplicates
    /// when two signups race, and that rejection is reported as a conflict too.
    pub async fn signup(&self, email: &str, password: &str) -> Result<Uuid, AuthError> {
        if email.is_empty() {
            return Err(AuthError::Validation("email is required".into()));
        }

        let mut account = Account {
            id: Uuid::new_v4(),
            email: email.to_owned(),
            password_hash: password.to_owned(),
        };

        if self.accounts.count_by_email(&account.email).await? > 0 {
            return Err(AuthError::Conflict);
        }

        account.password_hash = self.hash_blocking(account.password_hash).await?;

        match self.accounts.insert(&account).await {
            Ok(()) => Ok(account.id),
            Err(RepoError::Duplicate) => Err(AuthError::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies credentials and returns a signed bearer token.
    ///
    /// Unknown email, store failure, wrong password and a corrupt stored hash
    /// all collapse into [`AuthError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let account = match self.accounts.find_by_email(email).await {
            Ok(account) => account,
            Err(RepoError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(error = %e, "account lookup failed during login");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let hasher = self.hasher.clone();
        let plain = password.to_owned();
        let hash = account.password_hash.clone();
        let joined = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash)).await;
        check_verification(&account, joined)?;

        self.tokens.issue(&account)
    }

    pub async fn list_all(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self.accounts.list_all().await?)
    }

    async fn hash_blocking(&self, plain: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }
}

/// Every way verification can fail is the same denial to the caller.
fn check_verification(
    account: &Account,
    joined: Result<Result<bool, AuthError>, JoinError>,
) -> Result<(), AuthError> {
    match joined {
        Ok(Ok(true)) => Ok(()),
        Ok(Ok(false)) => Err(AuthError::InvalidCredentials),
        Ok(Err(e)) => {
            warn!(error = %e, account_id = %account.id, "stored hash unusable");
            Err(AuthError::InvalidCredentials)
        }
        Err(e) => {
            warn!(error = %e, account_id = %account.id, "password verification task failed");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Runs `op` under `deadline`; the operation is dropped and
/// [`AuthError::Cancelled`] returned if it does not finish in time.
pub async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    tokio::time::timeout(deadline, op)
        .await
        .map_err(|_| AuthError::Cancelled)?
}
