use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Account record in the store.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid, // assigned by the service before insert
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never returned to callers
}
