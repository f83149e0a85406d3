use chatloop::config::LoggingConfig;

/// `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.level))
        .format_timestamp_millis()
        .try_init()?;
    Ok(())
}
