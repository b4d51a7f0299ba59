use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use unotes_auth::application_impl::*;
use unotes_auth::application_port::*;
use unotes_auth::domain_model::*;
use unotes_auth::domain_port::*;
use unotes_auth::infra_memory::*;

struct Harness {
    service: Arc<RealAuthService>,
    store: Arc<MemoryTokenStore>,
    directory: Arc<MemoryUserDirectory>,
    codec: Arc<JwtCodec>,
    clock: Arc<FixedClock>,
}

fn jwt_config() -> JwtConfig {
    JwtConfig {
        issuer: "unotes.auth".to_string(),
        audience: "unotes".to_string(),
        access_secret: b"access-secret".to_vec(),
        refresh_secret: b"refresh-secret".to_vec(),
    }
}

fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    ));
    let codec = Arc::new(JwtCodec::new(jwt_config(), clock.clone()));
    let store = Arc::new(MemoryTokenStore::new());
    let directory = Arc::new(MemoryUserDirectory::new());
    let service = Arc::new(RealAuthService::new(
        directory.clone(),
        Arc::new(Argon2PasswordHasher),
        codec.clone(),
        store.clone(),
        SessionConfig::default(),
    ));
    Harness {
        service,
        store,
        directory,
        codec,
        clock,
    }
}

fn creds(username: &str, password: &str) -> SigninInput {
    SigninInput {
        username: username.to_string(),
        password: password.to_string(),
    }
}

async fn signup(h: &Harness, username: &str, password: &str) -> UserId {
    h.service
        .signup(SignupInput {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn alice_signs_in_rotates_and_signs_out() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;

    let first = h.service.signin(creds("alice", "pw1234567")).await.unwrap();
    assert_eq!(first.user_id, alice);
    assert_eq!(
        h.store.list_all(&alice).await.unwrap(),
        vec![first.tokens.refresh_token.clone()]
    );
    assert_eq!(
        h.service
            .authenticate(first.tokens.access_token.as_str())
            .await
            .unwrap(),
        alice
    );

    let rotated = h
        .service
        .refresh(first.tokens.refresh_token.as_str())
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, first.tokens.refresh_token);
    assert_eq!(
        h.store.list_all(&alice).await.unwrap(),
        vec![rotated.refresh_token.clone()]
    );

    // The predecessor is spent.
    assert!(matches!(
        h.service.refresh(first.tokens.refresh_token.as_str()).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));

    h.service
        .signout(rotated.access_token.as_str())
        .await
        .unwrap();
    assert!(h.store.list_all(&alice).await.unwrap().is_empty());
    assert!(matches!(
        h.service.refresh(rotated.refresh_token.as_str()).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn signout_revokes_every_session_of_the_identity() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    let bob = signup(&h, "bobby", "pw7654321").await;

    let laptop = h.service.signin(creds("alice", "pw1234567")).await.unwrap();
    let phone = h.service.signin(creds("alice", "pw1234567")).await.unwrap();
    let bobs = h.service.signin(creds("bobby", "pw7654321")).await.unwrap();
    assert_eq!(h.store.list_all(&alice).await.unwrap().len(), 2);

    h.service
        .signout(laptop.tokens.access_token.as_str())
        .await
        .unwrap();

    for session in [&laptop, &phone] {
        assert!(matches!(
            h.service.refresh(session.tokens.refresh_token.as_str()).await,
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }
    assert_eq!(h.store.list_all(&bob).await.unwrap().len(), 1);
    h.service
        .refresh(bobs.tokens.refresh_token.as_str())
        .await
        .unwrap();
}

#[tokio::test]
async fn signout_without_live_sessions_succeeds() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    h.service
        .signout(session.tokens.access_token.as_str())
        .await
        .unwrap();
    h.service
        .signout(session.tokens.access_token.as_str())
        .await
        .unwrap();
    assert!(h.store.list_all(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_leaves_store_untouched() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    h.service.signin(creds("alice", "pw1234567")).await.unwrap();
    let before = h.store.list_all(&alice).await.unwrap();

    assert!(matches!(
        h.service.signin(creds("alice", "not-the-password")).await,
        Err(AuthError::InvalidCredentials)
    ));
    assert_eq!(h.store.list_all(&alice).await.unwrap(), before);
}

#[tokio::test]
async fn signin_of_unknown_user_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.service.signin(creds("nobody", "pw1234567")).await,
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn signup_rejects_taken_and_malformed_input() {
    let h = harness();
    signup(&h, "alice", "pw1234567").await;

    let taken = h
        .service
        .signup(SignupInput {
            username: "alice".to_string(),
            password: "other-password".to_string(),
        })
        .await;
    assert!(matches!(taken, Err(AuthError::AlreadyExists)));

    let long_password = "x".repeat(65);
    let long_username = "u".repeat(33);
    for (username, password) in [
        ("", "pw1234567"),
        ("    ", "pw1234567"),
        ("bob", "pw1234567"),
        (long_username.as_str(), "pw1234567"),
        ("carol", "short"),
        ("dave", long_password.as_str()),
    ] {
        let result = h
            .service
            .signup(SignupInput {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidInput(_))), "{username:?}");
    }
}

#[tokio::test]
async fn username_bounds_are_inclusive_and_count_characters() {
    let h = harness();
    let longest = "u".repeat(32);
    let widest = "é".repeat(32);
    for username in ["dave", longest.as_str(), widest.as_str()] {
        signup(&h, username, "pw1234567").await;
    }
    // 8 characters, 16 bytes.
    signup(&h, "erin", &"ü".repeat(8)).await;
}

#[tokio::test]
async fn concurrent_signups_for_one_name_create_one_user() {
    let h = harness();
    let mut set = JoinSet::new();
    for _ in 0..8 {
        let service = h.service.clone();
        set.spawn(async move {
            service
                .signup(SignupInput {
                    username: "alice".to_string(),
                    password: "pw1234567".to_string(),
                })
                .await
        });
    }

    let mut created = 0;
    while let Some(result) = set.join_next().await {
        match result.unwrap() {
            Ok(_) => created += 1,
            Err(AuthError::AlreadyExists) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn tokens_of_the_wrong_class_are_rejected() {
    let h = harness();
    signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    assert!(matches!(
        h.service.refresh(session.tokens.access_token.as_str()).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    assert!(matches!(
        h.service
            .authenticate(session.tokens.refresh_token.as_str())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    assert!(matches!(
        h.service
            .signout(session.tokens.refresh_token.as_str())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn forged_refresh_token_does_not_touch_the_store() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    let forger = JwtCodec::new(
        JwtConfig {
            refresh_secret: b"guessed-secret".to_vec(),
            ..jwt_config()
        },
        h.clock.clone(),
    );
    let forged = forger
        .issue(TokenClass::Refresh, &alice, Duration::from_secs(3600))
        .unwrap();

    assert!(matches!(
        h.service.refresh(&forged.token).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    assert_eq!(h.store.list_all(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn genuine_token_for_another_identity_is_not_live() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    signup(&h, "bobby", "pw7654321").await;
    h.service.signin(creds("bobby", "pw7654321")).await.unwrap();

    // Correctly signed but never handed out, so never added to alice's set.
    let minted = h
        .codec
        .issue(TokenClass::Refresh, &alice, Duration::from_secs(3600))
        .unwrap();
    assert!(matches!(
        h.service.refresh(&minted.token).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
}

#[tokio::test]
async fn expired_tokens_are_rejected_and_stay_revocable() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    h.clock.advance(chrono::Duration::minutes(15));
    assert!(matches!(
        h.service
            .authenticate(session.tokens.access_token.as_str())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    let rotated = h
        .service
        .refresh(session.tokens.refresh_token.as_str())
        .await
        .unwrap();

    h.clock.advance(chrono::Duration::days(7));
    assert!(matches!(
        h.service.refresh(rotated.refresh_token.as_str()).await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    // Nothing sweeps expired tokens; sign-out still clears them.
    assert_eq!(h.store.list_all(&alice).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_of_one_token_has_one_winner() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    let mut set = JoinSet::new();
    for _ in 0..16 {
        let service = h.service.clone();
        let token = session.tokens.refresh_token.clone();
        set.spawn(async move { service.refresh(token.as_str()).await });
    }

    let mut winners = Vec::new();
    while let Some(result) = set.join_next().await {
        match result.unwrap() {
            Ok(pair) => winners.push(pair),
            Err(AuthError::InvalidOrExpiredToken) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(
        h.store.list_all(&alice).await.unwrap(),
        vec![winners[0].refresh_token.clone()]
    );
}

#[tokio::test]
async fn refresh_for_a_removed_user_fails_and_spends_the_token() {
    let h = harness();
    let alice = signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    // Same store and codec, but a directory that no longer knows alice.
    let forgetful = RealAuthService::new(
        Arc::new(MemoryUserDirectory::new()),
        Arc::new(Argon2PasswordHasher),
        h.codec.clone(),
        h.store.clone(),
        SessionConfig::default(),
    );
    assert!(matches!(
        forgetful
            .refresh(session.tokens.refresh_token.as_str())
            .await,
        Err(AuthError::InvalidOrExpiredToken)
    ));
    assert!(h.store.list_all(&alice).await.unwrap().is_empty());
    assert!(h.directory.find_by_id(&alice).await.unwrap().is_some());
}

/// Store whose every call either hangs or reports the medium as down.
struct BrokenStore {
    hang: bool,
}

#[async_trait::async_trait]
impl TokenStore for BrokenStore {
    async fn add(&self, _: &UserId, _: &RefreshToken) -> Result<(), TokenStoreError> {
        self.fail().await
    }

    async fn remove(&self, _: &UserId, _: &RefreshToken) -> Result<bool, TokenStoreError> {
        self.fail().await
    }

    async fn remove_all(&self, _: &UserId) -> Result<usize, TokenStoreError> {
        self.fail().await
    }

    async fn list_all(&self, _: &UserId) -> Result<Vec<RefreshToken>, TokenStoreError> {
        self.fail().await
    }
}

impl BrokenStore {
    async fn fail<T>(&self) -> Result<T, TokenStoreError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Err(TokenStoreError::Unavailable("connection refused".to_string()))
    }
}

async fn with_broken_store(hang: bool) -> (RealAuthService, TokenPair) {
    let h = harness();
    signup(&h, "alice", "pw1234567").await;
    let session = h.service.signin(creds("alice", "pw1234567")).await.unwrap();

    let service = RealAuthService::new(
        h.directory.clone(),
        Arc::new(Argon2PasswordHasher),
        h.codec.clone(),
        Arc::new(BrokenStore { hang }),
        SessionConfig {
            store_timeout: Duration::from_millis(50),
            ..SessionConfig::default()
        },
    );
    (service, session.tokens)
}

#[tokio::test]
async fn unreachable_store_fails_refresh_as_an_invalid_token() {
    let (service, tokens) = with_broken_store(false).await;

    let err = service
        .refresh(tokens.refresh_token.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn hanging_store_fails_refresh_as_an_invalid_token() {
    let (service, tokens) = with_broken_store(true).await;

    let err = service
        .refresh(tokens.refresh_token.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn unreachable_store_is_reported_as_unavailable_on_signin() {
    let (service, _) = with_broken_store(false).await;

    let err = service.signin(creds("alice", "pw1234567")).await.unwrap_err();
    assert!(matches!(err, AuthError::StoreUnavailable { step: "signin.add", .. }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn hanging_store_hits_the_deadline() {
    let (service, tokens) = with_broken_store(true).await;

    let started = std::time::Instant::now();
    let err = service
        .signout(tokens.access_token.as_str())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::StoreUnavailable { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));

    // Access tokens do not depend on the store.
    service
        .authenticate(tokens.access_token.as_str())
        .await
        .unwrap();
}
