use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    /// The backing medium could not be reached. Transient.
    #[error("token store unavailable: {0}")]
    Unavailable(String),
    #[error("token store internal error: {0}")]
    Internal(String),
}

/// Per-identity set of refresh tokens that are still allowed to rotate.
///
/// Every operation is scoped to one identity. Implementations must give
/// read-after-write consistency per identity and must never retry on their
/// own.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a token into the identity's set.
    async fn add(&self, user_id: &UserId, token: &RefreshToken) -> Result<(), TokenStoreError>;

    /// Atomically remove a token. Returns `true` only for the call that
    /// actually removed it; an absent token is a successful `false`.
    async fn remove(&self, user_id: &UserId, token: &RefreshToken)
    -> Result<bool, TokenStoreError>;

    /// Clear the identity's set. Returns how many tokens were dropped.
    async fn remove_all(&self, user_id: &UserId) -> Result<usize, TokenStoreError>;

    /// Current set, empty when the identity has no live sessions.
    async fn list_all(&self, user_id: &UserId) -> Result<Vec<RefreshToken>, TokenStoreError>;
}
