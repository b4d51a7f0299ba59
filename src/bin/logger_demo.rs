use unotes_auth::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!(filter = ?logger.current_filter(), "bootstrap info log");

    let config = LogConfig {
        filter: "debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(filter = ?logger.current_filter(), "application debug log");
    info!("application info log");

    let bad = LogConfig {
        filter: "unotes_auth=loud".to_string(),
    };
    warn!(rejected = logger.reload_from_config(&bad).is_err(), "invalid filter");

    Ok(())
}
