use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Upper bound for every single token store call.
    pub store_timeout: Duration,
    /// Upper bound for every single user directory call.
    pub directory_timeout: Duration,
    /// Length bounds count characters, not bytes.
    pub min_password_len: usize,
    pub max_password_len: usize,
    pub min_username_len: usize,
    pub max_username_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            store_timeout: Duration::from_secs(5),
            directory_timeout: Duration::from_secs(5),
            min_password_len: 8,
            max_password_len: 64,
            min_username_len: 4,
            max_username_len: 32,
        }
    }
}

/// Session manager: sign-up, sign-in, refresh rotation and sign-out.
///
/// Holds no lock of its own. All serialization of a user's refresh tokens is
/// left to the [`TokenStore`], whose atomic `remove` is the single gate that
/// makes a refresh token usable once.
pub struct RealAuthService {
    user_directory: Arc<dyn UserDirectory>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    token_store: Arc<dyn TokenStore>,
    cfg: SessionConfig,
}

impl RealAuthService {
    pub fn new(
        user_directory: Arc<dyn UserDirectory>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        token_store: Arc<dyn TokenStore>,
        cfg: SessionConfig,
    ) -> Self {
        Self {
            user_directory,
            credential_hasher,
            token_codec,
            token_store,
            cfg,
        }
    }

    fn validate_signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim().is_empty() {
            return Err(AuthError::InvalidInput("username is empty".to_string()));
        }
        let username_len = username.chars().count();
        if username_len < self.cfg.min_username_len {
            return Err(AuthError::InvalidInput("username too short".to_string()));
        }
        if username_len > self.cfg.max_username_len {
            return Err(AuthError::InvalidInput("username too long".to_string()));
        }
        let password_len = password.chars().count();
        if password_len < self.cfg.min_password_len {
            return Err(AuthError::InvalidInput("password too short".to_string()));
        }
        if password_len > self.cfg.max_password_len {
            return Err(AuthError::InvalidInput("password too long".to_string()));
        }
        Ok(())
    }

    async fn store_call<T, F>(&self, step: &'static str, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, TokenStoreError>>,
    {
        match tokio::time::timeout(self.cfg.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(TokenStoreError::Unavailable(reason))) => {
                Err(AuthError::StoreUnavailable { step, reason })
            }
            Ok(Err(TokenStoreError::Internal(reason))) => Err(AuthError::Internal { step, reason }),
            Err(_) => Err(AuthError::StoreUnavailable {
                step,
                reason: "deadline exceeded".to_string(),
            }),
        }
    }

    async fn directory_call<T, F>(&self, step: &'static str, call: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, DirectoryError>>,
    {
        match tokio::time::timeout(self.cfg.directory_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(DirectoryError::AlreadyExists)) => Err(AuthError::AlreadyExists),
            Ok(Err(DirectoryError::Unavailable(reason))) => {
                Err(AuthError::DirectoryUnavailable { step, reason })
            }
            Ok(Err(DirectoryError::Internal(reason))) => Err(AuthError::Internal { step, reason }),
            Err(_) => Err(AuthError::DirectoryUnavailable {
                step,
                reason: "deadline exceeded".to_string(),
            }),
        }
    }

    /// Verify a token presented by a client. Every verification failure
    /// reads the same to the caller.
    fn verify_presented(&self, class: TokenClass, token: &str) -> Result<TokenClaims, AuthError> {
        self.token_codec.verify(class, token).map_err(|e| match e {
            CodecError::Signing(reason) => AuthError::internal("verify", reason),
            other => {
                debug!(%class, error = %other, "rejecting presented token");
                AuthError::InvalidOrExpiredToken
            }
        })
    }

    fn issue_pair(&self, step: &'static str, user_id: &UserId) -> Result<TokenPair, AuthError> {
        let access = self
            .token_codec
            .issue(TokenClass::Access, user_id, self.cfg.access_ttl)
            .map_err(|e| AuthError::internal(step, e))?;
        let refresh = self
            .token_codec
            .issue(TokenClass::Refresh, user_id, self.cfg.refresh_ttl)
            .map_err(|e| AuthError::internal(step, e))?;

        Ok(TokenPair {
            access_token: AccessToken(access.token),
            refresh_token: RefreshToken(refresh.token),
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError> {
        let SignupInput { username, password } = request;

        self.validate_signup(&username, &password)?;

        let existing = self
            .directory_call(
                "signup.lookup",
                self.user_directory.find_by_username(&username),
            )
            .await?;
        if existing.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        // A concurrent sign-up for the same name still surfaces as
        // AlreadyExists through the directory's uniqueness check.
        let record = self
            .directory_call(
                "signup.create",
                self.user_directory.create(&username, &password_hash),
            )
            .await?;

        info!(user_id = %record.user_id, "user signed up");
        Ok(record.user_id)
    }

    async fn signin(&self, request: SigninInput) -> Result<SigninResult, AuthError> {
        let SigninInput { username, password } = request;

        let rec = self
            .directory_call(
                "signin.lookup",
                self.user_directory.find_by_username(&username),
            )
            .await?
            .ok_or(AuthError::NotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_pair("signin.issue", &rec.user_id)?;
        self.store_call(
            "signin.add",
            self.token_store.add(&rec.user_id, &tokens.refresh_token),
        )
        .await?;

        info!(user_id = %rec.user_id, "user signed in");
        Ok(SigninResult {
            user_id: rec.user_id,
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.verify_presented(TokenClass::Refresh, refresh_token)?;
        let user_id = claims.user_id;
        let presented = RefreshToken(refresh_token.to_string());

        // Rotation: remove first. Only the caller that actually removed the
        // token may mint a successor; a cancelled or failed step after this
        // point leaves the user signed out rather than holding two tokens.
        // A failed lookup reads to the caller as an invalid token.
        let removed = self
            .store_call("refresh.remove", self.token_store.remove(&user_id, &presented))
            .await
            .map_err(|e| {
                warn!(%user_id, error = %e, "refresh token lookup failed");
                AuthError::InvalidOrExpiredToken
            })?;
        if !removed {
            warn!(%user_id, "refresh token is not live, possible replay");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let user = self
            .directory_call("refresh.lookup", self.user_directory.find_by_id(&user_id))
            .await?;
        if user.is_none() {
            warn!(%user_id, "refresh token subject no longer exists");
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let tokens = self.issue_pair("refresh.issue", &user_id)?;
        self.store_call(
            "refresh.add",
            self.token_store.add(&user_id, &tokens.refresh_token),
        )
        .await?;

        debug!(%user_id, "refresh token rotated");
        Ok(tokens)
    }

    async fn signout(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.verify_presented(TokenClass::Access, access_token)?;
        let user_id = claims.user_id;

        let live = self
            .store_call("signout.list", self.token_store.list_all(&user_id))
            .await?;
        let removed = self
            .store_call("signout.remove_all", self.token_store.remove_all(&user_id))
            .await?;

        info!(%user_id, live = live.len(), removed, "user signed out");
        Ok(())
    }

    async fn authenticate(&self, access_token: &str) -> Result<UserId, AuthError> {
        let claims = self.verify_presented(TokenClass::Access, access_token)?;
        Ok(claims.user_id)
    }
}
