use crate::logger::LogConfig;
use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub directory: Directory,
    pub http: Http,
    pub jwt: Jwt,
    pub log: Log,
    pub session: Session,
    pub store: Store,
}

#[derive(Debug, Deserialize)]
pub struct Directory {
    pub backend: String, // "memory" or "mysql"
    #[serde(default)]
    pub mysql_dsn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
}

#[derive(Deserialize)]
pub struct Jwt {
    pub issuer: String,
    pub audience: String,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for Jwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwt")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub store_timeout_ms: u64,
    pub directory_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "redis" or "mysql"
    #[serde(default)]
    pub redis_dsn: Option<String>,
    #[serde(default)]
    pub mysql_dsn: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "refresh_tokens".to_string()
}

impl Jwt {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

impl Session {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }
}

impl Settings {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log.filter.clone(),
        }
    }

    /// Reject configurations that would only fail later, at issuance time.
    pub fn validate(&self) -> Result<()> {
        self.log_config().env_filter()?;

        if self.jwt.access_secret.is_empty() {
            bail!("jwt.access_secret must not be empty");
        }
        if self.jwt.refresh_secret.is_empty() {
            bail!("jwt.refresh_secret must not be empty");
        }
        if self.jwt.access_ttl_secs == 0 {
            bail!("jwt.access_ttl_secs must be positive");
        }
        if self.jwt.refresh_ttl_secs == 0 {
            bail!("jwt.refresh_ttl_secs must be positive");
        }
        if self.session.store_timeout_ms == 0 || self.session.directory_timeout_ms == 0 {
            bail!("session timeouts must be positive");
        }

        match self.store.backend.as_str() {
            "memory" => {}
            "redis" if self.store.redis_dsn.is_some() => {}
            "mysql" if self.store.mysql_dsn.is_some() => {}
            "redis" | "mysql" => bail!("store.{}_dsn is required", self.store.backend),
            other => bail!("unknown store backend: {}", other),
        }
        match self.directory.backend.as_str() {
            "memory" => {}
            "mysql" if self.directory.mysql_dsn.is_some() => {}
            "mysql" => bail!("directory.mysql_dsn is required"),
            other => bail!("unknown directory backend: {}", other),
        }
        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http.cert_path and http.key_path must be set together");
        }

        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Load settings from a TOML file, overridden by `UNOTES__SECTION__KEY`
/// environment variables.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("UNOTES").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const DEV: &str = r#"
[directory]
backend = "memory"

[http]
address = "127.0.0.1:8080"

[jwt]
issuer = "unotes.auth"
audience = "unotes"
access_secret = "access"
refresh_secret = "refresh"
access_ttl_secs = 900
refresh_ttl_secs = 604800

[log]
filter = "info"

[session]
store_timeout_ms = 5000
directory_timeout_ms = 5000

[store]
backend = "memory"
"#;

    fn load(extra: &str) -> Settings {
        Config::builder()
            .add_source(config::File::from_str(DEV, FileFormat::Toml))
            .add_source(config::File::from_str(extra, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn dev_settings_are_valid() {
        let settings = load("");
        settings.validate().unwrap();
        assert_eq!(settings.store.key_prefix, "refresh_tokens");
        assert_eq!(settings.jwt.access_ttl(), Duration::from_secs(900));
    }

    #[test]
    fn empty_secret_is_fatal() {
        let settings = load("[jwt]\naccess_secret = \"\"");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn secrets_are_checked_whatever_else_is_configured() {
        // A leftover `[auth]` section is ignored and cannot skip validation.
        let settings = load("[auth]\nbackend = \"fake\"\n[jwt]\nrefresh_secret = \"\"");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_ttl_is_fatal() {
        let settings = load("[jwt]\nrefresh_ttl_secs = 0");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn malformed_log_filter_is_fatal() {
        let settings = load("[log]\nfilter = \"unotes_auth=loud\"");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn external_store_needs_a_dsn() {
        let settings = load("[store]\nbackend = \"redis\"");
        assert!(settings.validate().is_err());

        let settings = load("[store]\nbackend = \"redis\"\nredis_dsn = \"redis://127.0.0.1\"");
        settings.validate().unwrap();
    }

    #[test]
    fn secrets_are_not_printed() {
        let settings = load("");
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("\"access\""));
        assert!(printed.contains("<redacted>"));
    }
}
