//! Walks one user through the whole session lifecycle against the backends
//! named in the settings file.
//!
//! $ cargo run --bin session_demo -- --settings=settings/dev.toml
//!
//! With `store.backend = "redis"` or `"mysql"` the services must be running
//! and, for MySQL, `sql/schema.sql` must have been applied.

use unotes_auth::application_port::*;
use unotes_auth::logger::*;
use unotes_auth::server::Server;
use unotes_auth::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "session_demo=debug,unotes_auth=debug".to_string(),
    })?;

    let settings = parse_settings(cli.settings.as_deref())?;
    let server = Server::try_new(&settings).await?;
    let auth = server.auth_service.clone();

    let username = format!("demo-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let password = "pw1234567".to_string();

    let user_id = auth
        .signup(SignupInput {
            username: username.clone(),
            password: password.clone(),
        })
        .await?;
    info!(%user_id, %username, "signed up");

    match auth
        .signin(SigninInput {
            username: username.clone(),
            password: "wrong-password".to_string(),
        })
        .await
    {
        Err(AuthError::InvalidCredentials) => info!("wrong password rejected"),
        other => warn!(?other, "unexpected sign-in outcome"),
    }

    let first = auth
        .signin(SigninInput {
            username: username.clone(),
            password: password.clone(),
        })
        .await?;
    info!(expires_at = %first.tokens.access_token_expires_at, "signed in");

    let rotated = auth.refresh(first.tokens.refresh_token.as_str()).await?;
    info!("refresh token rotated");

    match auth.refresh(first.tokens.refresh_token.as_str()).await {
        Err(AuthError::InvalidOrExpiredToken) => info!("replayed refresh token rejected"),
        other => warn!(?other, "replay was not rejected"),
    }

    let whoami = auth.authenticate(rotated.access_token.as_str()).await?;
    info!(%whoami, "access token authenticated");

    auth.signout(rotated.access_token.as_str()).await?;
    match auth.refresh(rotated.refresh_token.as_str()).await {
        Err(AuthError::InvalidOrExpiredToken) => info!("refresh after sign-out rejected"),
        other => warn!(?other, "refresh after sign-out was not rejected"),
    }

    server.shutdown().await;
    Ok(())
}
