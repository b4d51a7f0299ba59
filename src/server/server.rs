use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pools: Vec<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let mut pools: HashMap<String, Pool<MySql>> = HashMap::new();

        let token_store: Arc<dyn TokenStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryTokenStore::new()),
            "redis" => {
                let dsn = settings.store.redis_dsn.as_deref().unwrap_or_default();
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(
                    RedisTokenStore::new(redis_manager, settings.store.key_prefix.clone())
                        .with_key_ttl(settings.jwt.refresh_ttl()),
                )
            }
            "mysql" => {
                let dsn = settings.store.mysql_dsn.as_deref().unwrap_or_default();
                Arc::new(MySqlTokenStore::new(mysql_pool(&mut pools, dsn).await?))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let user_directory: Arc<dyn UserDirectory> = match settings.directory.backend.as_str() {
            "memory" => Arc::new(MemoryUserDirectory::new()),
            "mysql" => {
                let dsn = settings.directory.mysql_dsn.as_deref().unwrap_or_default();
                Arc::new(MySqlUserDirectory::new(mysql_pool(&mut pools, dsn).await?))
            }
            other => return Err(anyhow::anyhow!("Unknown directory backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtCodec::new(
            JwtConfig {
                issuer: settings.jwt.issuer.clone(),
                audience: settings.jwt.audience.clone(),
                access_secret: settings.jwt.access_secret.clone().into_bytes(),
                refresh_secret: settings.jwt.refresh_secret.clone().into_bytes(),
            },
            Arc::new(SystemClock),
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_directory,
            credential_hasher,
            token_codec,
            token_store,
            SessionConfig {
                access_ttl: settings.jwt.access_ttl(),
                refresh_ttl: settings.jwt.refresh_ttl(),
                store_timeout: settings.session.store_timeout(),
                directory_timeout: settings.session.directory_timeout(),
                ..SessionConfig::default()
            },
        ));

        info!(
            store = %settings.store.backend,
            directory = %settings.directory.backend,
            "server started"
        );

        Ok(Self {
            auth_service,
            pools: pools.into_values().collect(),
        })
    }

    /// Wrap an already built service, e.g. for tests of the HTTP layer.
    pub fn from_service(auth_service: Arc<dyn AuthService>) -> Self {
        Self {
            auth_service,
            pools: Vec::new(),
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        for pool in &self.pools {
            pool.close().await;
        }
    }
}

/// One pool per distinct DSN, shared when store and directory point at the
/// same database.
async fn mysql_pool(
    pools: &mut HashMap<String, Pool<MySql>>,
    dsn: &str,
) -> anyhow::Result<Pool<MySql>> {
    if let Some(pool) = pools.get(dsn) {
        return Ok(pool.clone());
    }
    let pool = Pool::<MySql>::connect(dsn).await?;
    pools.insert(dsn.to_string(), pool.clone());
    Ok(pool)
}
