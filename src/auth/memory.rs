use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::{error::RepoError, repo::AccountRepository, repo_types::Account};

/// In-process account store keyed by email.
///
/// Selected with `DATABASE_URL=memory://`. The insert checks and writes under
/// one write lock, so a duplicate email is rejected even when two signups race
/// past the count check.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: RwLock<BTreeMap<String, Account>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn count_by_email(&self, email: &str) -> Result<u64, RepoError> {
        let accounts = self.accounts.read().await;
        Ok(u64::from(accounts.contains_key(email)))
    }

    async fn insert(&self, account: &Account) -> Result<(), RepoError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.email) {
            return Err(RepoError::Duplicate);
        }
        accounts.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, RepoError> {
        self.accounts
            .read()
            .await
            .get(email)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Account>, RepoError> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }
}
