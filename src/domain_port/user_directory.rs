use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("username already registered")]
    AlreadyExists,
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
    #[error("user directory internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a user and assign its identity. Fails with `AlreadyExists`
    /// when the username is taken, even under a concurrent sign-up race.
    async fn create(&self, username: &str, password_hash: &str)
    -> Result<UserRecord, DirectoryError>;

    async fn find_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, DirectoryError>;

    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserRecord>, DirectoryError>;
}
