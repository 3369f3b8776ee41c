//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the cashier.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the cashier.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CashierConfig {
    /// Realtime channel settings (endpoints, reconnection).
    pub realtime: RealtimeConfig,

    /// Cashier REST service settings.
    pub api: ApiConfig,

    /// Withdrawal flow timings.
    pub withdraw: WithdrawConfig,

    /// Blockchain integration settings.
    pub blockchain: BlockchainConfig,

    /// Block explorers by chain id.
    #[serde(default)]
    pub explorers: Vec<ExplorerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl CashierConfig {
    /// Explorer base URL for a chain, if one is configured.
    pub fn explorer_for(&self, chain_id: u64) -> Option<&ExplorerConfig> {
        self.explorers.iter().find(|e| e.chain_id == chain_id)
    }
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// WebSocket endpoint of the notification channel.
    pub notification_url: String,

    /// WebSocket endpoint of the chat channel.
    pub chat_url: String,

    /// Service key sent as `serviceKey` on both channels.
    pub service_key: String,

    /// Base delay for linear reconnection backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Automatic reconnect attempts before settling in `Disconnected`.
    pub max_reconnect_attempts: u32,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            notification_url: "ws://localhost:8090/notifications".to_string(),
            chat_url: "ws://localhost:8090/chat".to_string(),
            service_key: String::new(),
            reconnect_base_delay_ms: 2000,
            max_reconnect_attempts: 5,
        }
    }
}

/// Cashier REST service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the service (e.g., "https://api.example.com/v1").
    pub base_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Withdrawal flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WithdrawConfig {
    /// Status poll interval in seconds.
    pub poll_interval_secs: u64,

    /// Optional cap on status polls. `None` polls until a terminal status.
    pub max_poll_attempts: Option<u32>,

    /// Advisory countdown started on submission, in seconds.
    pub countdown_secs: u32,
}

impl Default for WithdrawConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            max_poll_attempts: None,
            countdown_secs: 90,
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// JSON-RPC endpoint URL used for `Withdraw_Web` submission.
    pub rpc_url: String,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 56 for BNB Chain).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 1,
            rpc_timeout_secs: 30,
        }
    }
}

/// Block explorer for one chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplorerConfig {
    pub chain_id: u64,

    /// Base URL; transaction links are `{base_url}/tx/{hash}`.
    pub base_url: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_timings() {
        let config = CashierConfig::default();
        assert_eq!(config.realtime.reconnect_base_delay_ms, 2000);
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.withdraw.poll_interval_secs, 3);
        assert_eq!(config.withdraw.countdown_secs, 90);
        assert!(config.withdraw.max_poll_attempts.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CashierConfig = toml::from_str(
            r#"
            [realtime]
            service_key = "abc"

            [[explorers]]
            chain_id = 56
            base_url = "https://bscscan.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.realtime.service_key, "abc");
        assert_eq!(config.realtime.max_reconnect_attempts, 5);
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.explorer_for(56).unwrap().base_url, "https://bscscan.com");
        assert!(config.explorer_for(1).is_none());
    }
}
