//! Configuration validation.
//!
//! Serde handles syntax; this pass checks semantics (URLs parse, intervals
//! non-zero, service key present) and reports every problem, not just the
//! first.

use std::fmt;
use url::Url;

use crate::config::schema::CashierConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., "realtime.chat_url").
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &CashierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "realtime.notification_url", &config.realtime.notification_url, &["ws", "wss"]);
    check_url(&mut errors, "realtime.chat_url", &config.realtime.chat_url, &["ws", "wss"]);
    check_url(&mut errors, "api.base_url", &config.api.base_url, &["http", "https"]);
    check_url(&mut errors, "blockchain.rpc_url", &config.blockchain.rpc_url, &["http", "https"]);

    if config.realtime.service_key.trim().is_empty() {
        errors.push(ValidationError::new("realtime.service_key", "must not be empty"));
    }
    if config.realtime.reconnect_base_delay_ms == 0 {
        errors.push(ValidationError::new("realtime.reconnect_base_delay_ms", "must be greater than 0"));
    }
    if config.api.timeout_secs == 0 {
        errors.push(ValidationError::new("api.timeout_secs", "must be greater than 0"));
    }
    if config.withdraw.poll_interval_secs == 0 {
        errors.push(ValidationError::new("withdraw.poll_interval_secs", "must be greater than 0"));
    }
    if config.withdraw.max_poll_attempts == Some(0) {
        errors.push(ValidationError::new("withdraw.max_poll_attempts", "must be greater than 0 when set"));
    }

    for (i, explorer) in config.explorers.iter().enumerate() {
        let field = format!("explorers[{}].base_url", i);
        check_url(&mut errors, &field, &explorer.base_url, &["http", "https"]);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str, schemes: &[&str]) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}', expected one of {:?}", url.scheme(), schemes),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", value, e))),
    }
}
