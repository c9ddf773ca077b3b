use crate::config::types::{Config, OutputConfig, SearchConfig, SelectorConfig, SessionConfig, TimingConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_timing_config(&config.timing)?;
    validate_output_config(&config.output)?;
    validate_session_config(&config.session)?;
    validate_selector_config(&config.selectors)?;
    Ok(())
}

/// Validates route and window
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    validate_airport_code("origin", &config.origin)?;
    validate_airport_code("destination", &config.destination)?;

    if config.origin == config.destination {
        return Err(ConfigError::Validation(format!(
            "origin and destination must differ, both are '{}'",
            config.origin
        )));
    }

    if config.days < 1 {
        return Err(ConfigError::Validation(format!(
            "days must be >= 1, got {}",
            config.days
        )));
    }

    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' cannot carry path segments",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates delays and attempt bounds
fn validate_timing_config(config: &TimingConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    // A zero delay would turn a held file into a busy loop
    if config.write_retry_delay_ms < 1 {
        return Err(ConfigError::Validation(
            "write_retry_delay_ms must be >= 1ms".to_string(),
        ));
    }

    if config.max_write_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "max_write_attempts must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.is_empty() {
        return Err(ConfigError::Validation(
            "csv_path cannot be empty".to_string(),
        ));
    }

    if config.timestamp_format.is_empty() {
        return Err(ConfigError::Validation(
            "timestamp_format cannot be empty".to_string(),
        ));
    }

    // chrono reports bad specifiers only while formatting
    let probe = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ConfigError::Validation("timestamp probe out of range".to_string()))?;
    let mut rendered = String::new();
    if std::fmt::Write::write_fmt(
        &mut rendered,
        format_args!("{}", probe.format(&config.timestamp_format)),
    )
    .is_err()
    {
        return Err(ConfigError::Validation(format!(
            "timestamp_format '{}' is not a valid chrono format",
            config.timestamp_format
        )));
    }

    Ok(())
}

/// Validates HTTP session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates that every selector compiles
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (field, selector) in [
        ("results-container", &config.results_container),
        ("result-block", &config.result_block),
        ("airline", &config.airline),
        ("time", &config.time),
        ("day-offset", &config.day_offset),
        ("stops", &config.stops),
        ("offer", &config.offer),
        ("price", &config.price),
        ("cabin", &config.cabin),
    ] {
        validate_selector(field, selector)?;
    }

    if config.variant_offset < 1 {
        return Err(ConfigError::Validation(
            "variant_offset must be >= 1 (slot 0 is the base offer)".to_string(),
        ));
    }

    if config.price_placeholders.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "price_placeholders cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() || Selector::parse(selector).is_err() {
        return Err(ConfigError::InvalidSelector {
            field: field.to_string(),
            selector: selector.to_string(),
        });
    }
    Ok(())
}

/// Airport codes are three uppercase ASCII letters
fn validate_airport_code(field: &str, code: &str) -> Result<(), ConfigError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "{} must be a three-letter uppercase airport code, got '{}'",
            field, code
        )));
    }
    Ok(())
}
