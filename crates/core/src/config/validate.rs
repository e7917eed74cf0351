use url::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Bot token is present
/// - Bot API URL is a valid http(s) URL
/// - Server port is not 0
/// - Worker count and timings are positive
/// - Size limits and TTLs are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.telegram.bot_token.trim().is_empty() {
        return Err(invalid("telegram.bot_token is required"));
    }

    let api_base = config.telegram.api_base();
    match Url::parse(&api_base) {
        Ok(url) if url.host_str().is_some() => {}
        _ => {
            return Err(invalid(format!(
                "telegram.api_url is not a valid URL: {}",
                config.telegram.api_url
            )))
        }
    }

    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.workers.count == 0 {
        return Err(invalid("workers.count must be at least 1"));
    }
    if config.workers.lane_timeout_ms == 0 {
        return Err(invalid("workers.lane_timeout_ms cannot be 0"));
    }

    if config.resources.thermal.enabled && config.resources.thermal.sample_interval_ms == 0 {
        return Err(invalid("resources.thermal.sample_interval_ms cannot be 0"));
    }

    if config.fetcher.max_file_size_mb == 0 {
        return Err(invalid("fetcher.max_file_size_mb cannot be 0"));
    }
    if config.fetcher.timeout_secs == 0 || config.fetcher.title_timeout_secs == 0 {
        return Err(invalid("fetcher timeouts cannot be 0"));
    }
    if config.fetcher.binary.as_os_str().is_empty() {
        return Err(invalid("fetcher.binary cannot be empty"));
    }

    if config.stores.pending_ttl_secs == 0 || config.stores.preference_ttl_days == 0 {
        return Err(invalid("store TTLs cannot be 0"));
    }
    if config.stores.sweep_interval_secs == 0 {
        return Err(invalid("stores.sweep_interval_secs cannot be 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
