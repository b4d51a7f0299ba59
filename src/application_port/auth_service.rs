use crate::domain_model::*;
use std::time::Duration;

/// Outcome taxonomy of the session lifecycle.
///
/// The first five variants are client errors and are safe to surface. The
/// rest carry the failing `step` for logs and must not leak to callers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    NotFound,
    #[error("user already exists")]
    AlreadyExists,
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("token store unavailable at {step}: {reason}")]
    StoreUnavailable { step: &'static str, reason: String },
    #[error("user directory unavailable at {step}: {reason}")]
    DirectoryUnavailable { step: &'static str, reason: String },
    #[error("internal error at {step}: {reason}")]
    Internal { step: &'static str, reason: String },
}

impl AuthError {
    pub fn internal(step: &'static str, reason: impl ToString) -> Self {
        AuthError::Internal {
            step,
            reason: reason.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::NotFound
                | AuthError::AlreadyExists
                | AuthError::InvalidOrExpiredToken
                | AuthError::InvalidInput(_)
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthError::StoreUnavailable { .. } | AuthError::DirectoryUnavailable { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SigninInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SigninResult {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("signing error: {0}")]
    Signing(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed claims: {0}")]
    MalformedClaims(String),
}

/// Signs and verifies self-contained credentials.
pub trait TokenCodec: Send + Sync {
    fn issue(
        &self,
        class: TokenClass,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<IssuedToken, CodecError>;

    fn verify(&self, class: TokenClass, token: &str) -> Result<TokenClaims, CodecError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError>;
    async fn signin(&self, request: SigninInput) -> Result<SigninResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn signout(&self, access_token: &str) -> Result<(), AuthError>;
    /// Resolve the identity behind an access token, for other services.
    async fn authenticate(&self, access_token: &str) -> Result<UserId, AuthError>;
}
