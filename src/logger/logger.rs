use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Directive used until settings are loaded, unless `RUST_LOG` says otherwise.
const BOOTSTRAP_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
}

impl LogConfig {
    /// Parse the directive without installing it, so a bad `log.filter`
    /// fails settings validation instead of startup.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| anyhow!("invalid log filter {:?}: {}", self.filter, e))
    }
}

/// Process-wide subscriber. Only the filter layer is reloadable.
pub struct Logger {
    filter_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, filter_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self { filter_handle }
    }

    /// Swap in the configured filter. Returns the directive it replaced.
    pub fn reload_from_config(&self, config: &LogConfig) -> Result<Option<String>> {
        let filter = config.env_filter()?;
        let previous = self.current_filter();
        self.filter_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(previous)
    }

    pub fn current_filter(&self) -> Option<String> {
        self.filter_handle.with_current(|f| f.to_string()).ok()
    }
}
