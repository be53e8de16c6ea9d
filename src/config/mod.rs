//! Configuration management
//!
//! Values are layered: built-in defaults, then `.env.local` / `.env` files,
//! then `OUTDIAL__<SECTION>__<KEY>` environment variables, e.g.
//! `OUTDIAL__DIALER__ENABLE_OUTBOUND_CALLS=true`.

use crate::application::OrchestratorSettings;
use crate::domain::shared::value_objects::PhoneNumber;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "OUTDIAL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub dialer: DialerConfig,
    pub trunk: TrunkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerConfig {
    /// Safety toggle; nothing is dialed unless this is true
    pub enable_outbound_calls: bool,
    pub trunk_id: String,
    pub default_transfer_number: String,
    pub auto_transfer_on_failure: bool,
    /// 0 disables the silence watchdog
    pub silence_transfer_seconds: u64,
    pub silence_check_interval_seconds: u64,
    pub dial_timeout_seconds: u64,
    pub transfer_timeout_seconds: u64,
    pub drain_timeout_seconds: u64,
    pub max_history: usize,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TrunkConfig {
    /// Used to build `sip:` transfer URIs
    pub sip_domain: Option<String>,
    /// Provider endpoint and credentials, reserved for a real provider
    /// adapter; the simulated trunk does not use them
    pub provider_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Simulated provider timings
    pub ring_delay_ms: u64,
    pub answer_delay_ms: u64,
}

// Credentials stay out of logs
impl fmt::Debug for TrunkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrunkConfig")
            .field("sip_domain", &self.sip_domain)
            .field("provider_url", &self.provider_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("ring_delay_ms", &self.ring_delay_ms)
            .field("answer_delay_ms", &self.answer_delay_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            dialer: DialerConfig {
                enable_outbound_calls: false,
                trunk_id: String::new(),
                default_transfer_number: String::new(),
                auto_transfer_on_failure: true,
                silence_transfer_seconds: 60,
                silence_check_interval_seconds: 5,
                dial_timeout_seconds: 30,
                transfer_timeout_seconds: 30,
                drain_timeout_seconds: 5,
                max_history: 1000,
            },
            trunk: TrunkConfig {
                sip_domain: None,
                provider_url: None,
                api_key: None,
                api_secret: None,
                ring_delay_ms: 500,
                answer_delay_ms: 2000,
            },
        }
    }
}

impl Config {
    /// Load configuration from dotenv files and the environment
    ///
    /// `.env.local` is read before `.env`; since neither overrides variables
    /// that are already set, the local file wins.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();

        Self::from_environment()
    }

    /// Build configuration from defaults and process environment only
    ///
    /// Values are kept as strings and coerced on deserialization, so a
    /// number like `+15551234567` keeps its leading `+`.
    pub fn from_environment() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dialer.trunk_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired("dialer.trunk_id"));
        }

        if self.dialer.default_transfer_number.trim().is_empty() {
            return Err(ConfigError::MissingRequired("dialer.default_transfer_number"));
        }

        PhoneNumber::parse(&self.dialer.default_transfer_number).map_err(|e| {
            ConfigError::Invalid {
                key: "dialer.default_transfer_number",
                message: e.to_string(),
            }
        })?;

        let timeouts = [
            ("dialer.dial_timeout_seconds", self.dialer.dial_timeout_seconds),
            ("dialer.transfer_timeout_seconds", self.dialer.transfer_timeout_seconds),
            ("dialer.drain_timeout_seconds", self.dialer.drain_timeout_seconds),
            (
                "dialer.silence_check_interval_seconds",
                self.dialer.silence_check_interval_seconds,
            ),
        ];
        for (key, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.dialer.max_history == 0 {
            return Err(ConfigError::Invalid {
                key: "dialer.max_history",
                message: "must keep at least one finished call".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                key: "server.port",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Orchestrator settings derived from the dialer section
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings, ConfigError> {
        self.validate()?;

        let default_transfer_number = PhoneNumber::parse(&self.dialer.default_transfer_number)
            .map_err(|e| ConfigError::Invalid {
                key: "dialer.default_transfer_number",
                message: e.to_string(),
            })?;

        let silence_threshold = match self.dialer.silence_transfer_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(OrchestratorSettings {
            enable_outbound_calls: self.dialer.enable_outbound_calls,
            trunk_id: self.dialer.trunk_id.clone(),
            default_transfer_number,
            auto_transfer_on_failure: self.dialer.auto_transfer_on_failure,
            silence_threshold,
            silence_check_interval: Duration::from_secs(self.dialer.silence_check_interval_seconds),
            dial_timeout: Duration::from_secs(self.dialer.dial_timeout_seconds),
            transfer_timeout: Duration::from_secs(self.dialer.transfer_timeout_seconds),
            drain_timeout: Duration::from_secs(self.dialer.drain_timeout_seconds),
            max_history: self.dialer.max_history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.dialer.trunk_id = "ST_abc123".to_string();
        config.dialer.default_transfer_number = "+15551234567".to_string();
        config
    }

    #[test]
    fn test_defaults_keep_dialing_disabled() {
        let config = Config::default();
        assert!(!config.dialer.enable_outbound_calls);
        assert!(config.dialer.auto_transfer_on_failure);
        assert_eq!(config.dialer.transfer_timeout_seconds, 30);
        assert_eq!(config.dialer.silence_transfer_seconds, 60);
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("OUTDIAL__DIALER__ENABLE_OUTBOUND_CALLS", "true");
        env::set_var("OUTDIAL__DIALER__TRUNK_ID", "ST_env");
        env::set_var("OUTDIAL__DIALER__DEFAULT_TRANSFER_NUMBER", "+15551234567");
        env::set_var("OUTDIAL__SERVER__PORT", "9090");

        let result = Config::from_environment();

        env::remove_var("OUTDIAL__DIALER__ENABLE_OUTBOUND_CALLS");
        env::remove_var("OUTDIAL__DIALER__TRUNK_ID");
        env::remove_var("OUTDIAL__DIALER__DEFAULT_TRANSFER_NUMBER");
        env::remove_var("OUTDIAL__SERVER__PORT");

        let config = result.expect("config should load");
        assert!(config.dialer.enable_outbound_calls);
        assert_eq!(config.dialer.trunk_id, "ST_env");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.dialer.dial_timeout_seconds, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_trunk_id() {
        let mut config = valid_config();
        config.dialer.trunk_id = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired("dialer.trunk_id"))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_default_number() {
        let mut config = valid_config();
        config.dialer.default_transfer_number = "5551234567".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "dialer.default_transfer_number", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = valid_config();
        config.dialer.transfer_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_history() {
        let mut config = valid_config();
        config.dialer.max_history = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "dialer.max_history", .. })
        ));
    }

    #[test]
    fn test_orchestrator_settings() {
        let mut config = valid_config();
        config.dialer.silence_transfer_seconds = 0;

        let settings = config.orchestrator_settings().unwrap();
        assert_eq!(settings.default_transfer_number.as_str(), "+15551234567");
        assert_eq!(settings.transfer_timeout, Duration::from_secs(30));
        assert!(settings.silence_threshold.is_none());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut config = valid_config();
        config.trunk.provider_url = Some("https://trunk.example.net".to_string());
        config.trunk.api_key = Some("key-1".to_string());
        config.trunk.api_secret = Some("s3cr3t".to_string());
        assert!(config.validate().is_ok());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("key-1"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }
}
