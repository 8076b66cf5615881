use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};
use url::Url;

use chain_monitor::{ChainConfig, MonitorConfig};
use global_utils::config_variant::ConfigVariant;

use crate::error::{ConfigError, Result};

const CONFIG_FOLDER_NAME: &str = "../../configuration";
const PRODUCTION_CONFIG_FOLDER_NAME: &str = "configuration_validator";
const CARGO_MANIFEST_DIR: &str = "CARGO_MANIFEST_DIR";
const DEFAULT_BASE_FILENAME: &str = "base";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(rename = "http_server_ip")]
    pub ip: String,
    #[serde(rename = "http_server_port")]
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ValidatorSection {
    pub party_id: u16,
    pub threshold: u16,
    pub total_parties: u16,
    #[serde(default = "ValidatorSection::default_key_id")]
    pub key_id: String,
}

impl ValidatorSection {
    fn default_key_id() -> String {
        "bridge-group".to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyStoreBackend {
    File,
    Kms,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct KeyStoreSection {
    pub backend: KeyStoreBackend,
    /// Directory of the encrypted share files (file backend).
    pub path: Option<PathBuf>,
    /// Base URL of the custody service (kms backend). Must be https unless
    /// it points at loopback.
    pub kms_url: Option<Url>,
    /// The custody service's compressed secp256k1 wrap key, hex. The share
    /// is sealed to this key before it is sent (kms backend).
    pub kms_public_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct PeerConfig {
    pub party_id: u16,
    pub endpoint: Url,
    /// Compressed secp256k1 identity key, hex.
    pub public_key: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct TransportSection {
    /// This validator's advertised endpoint.
    pub endpoint: Url,
    /// Identity secret key, hex. Usually injected via
    /// `CONFIG_TRANSPORT_IDENTITY_KEY`.
    pub identity_key: Option<String>,
    pub peers: Vec<PeerConfig>,
}

impl std::fmt::Debug for TransportSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSection")
            .field("endpoint", &self.endpoint)
            .field("identity_key", &self.identity_key.as_ref().map(|_| "<redacted>"))
            .field("peers", &self.peers)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutSection {
    #[serde(default = "TimeoutSection::default_round_timeout_ms")]
    pub round_timeout_ms: u64,
    #[serde(default = "TimeoutSection::default_signing_timeout_ms")]
    pub signing_timeout_ms: u64,
    #[serde(default = "TimeoutSection::default_heartbeat_window_ms")]
    pub heartbeat_window_ms: u64,
    #[serde(default = "TimeoutSection::default_heartbeat_period_ms")]
    pub heartbeat_period_ms: u64,
}

impl TimeoutSection {
    fn default_round_timeout_ms() -> u64 {
        60_000
    }
    fn default_signing_timeout_ms() -> u64 {
        30_000
    }
    fn default_heartbeat_window_ms() -> u64 {
        10_000
    }
    fn default_heartbeat_period_ms() -> u64 {
        5_000
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }
    pub fn signing_timeout(&self) -> Duration {
        Duration::from_millis(self.signing_timeout_ms)
    }
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.heartbeat_window_ms)
    }
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_period_ms)
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            round_timeout_ms: Self::default_round_timeout_ms(),
            signing_timeout_ms: Self::default_signing_timeout_ms(),
            heartbeat_window_ms: Self::default_heartbeat_window_ms(),
            heartbeat_period_ms: Self::default_heartbeat_period_ms(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(rename(deserialize = "application"))]
    pub server: AppConfig,
    #[serde(rename = "validator_config")]
    pub validator: ValidatorSection,
    #[serde(rename = "keystore_config")]
    pub keystore: KeyStoreSection,
    #[serde(rename = "transport_config")]
    pub transport: TransportSection,
    #[serde(rename = "chains")]
    pub chains: Vec<ChainConfig>,
    #[serde(rename = "timeout_config", default)]
    pub timeouts: TimeoutSection,
}

pub fn get_cargo_manifest_dir() -> String {
    std::env::var(CARGO_MANIFEST_DIR).unwrap_or_else(|_| ".".to_string())
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

impl ServerConfig {
    #[instrument(level = "debug", ret)]
    pub fn init_config(config_variant: ConfigVariant) -> Result<Self> {
        trace!("Initializing, {config_variant}...");
        let format_name = |folder_path: &str, config_folder_name: &str, filename: &str| -> String {
            format!("{folder_path}{config_folder_name}/{filename}.toml")
        };
        if config_variant != ConfigVariant::Production {
            let _ = dotenv::dotenv().ok();
        }
        let config = match &config_variant {
            ConfigVariant::Production | ConfigVariant::Local => {
                let (folder_path, config_folder_name) = match config_variant {
                    ConfigVariant::Production => ("/".to_string(), PRODUCTION_CONFIG_FOLDER_NAME),
                    _ => (format!("{}/", get_cargo_manifest_dir()), CONFIG_FOLDER_NAME),
                };
                let path_to_base = format_name(&folder_path, config_folder_name, DEFAULT_BASE_FILENAME);
                let path_to_variant = format_name(&folder_path, config_folder_name, &config_variant.to_string());
                debug!(path = %path_to_variant, config_path = %path_to_base);
                Config::builder()
                    .add_source(config::File::with_name(&path_to_base))
                    .add_source(config::File::with_name(&path_to_variant))
                    .add_source(Environment::with_prefix("config").separator("__").keep_prefix(false))
                    .build()?
                    .try_deserialize::<ServerConfig>()?
            }
            ConfigVariant::OnlyOneFilepath(filepath) => {
                debug!(onepath = %filepath);
                Config::builder()
                    .add_source(config::File::with_name(filepath))
                    .add_source(Environment::with_prefix("config").separator("__").keep_prefix(false))
                    .build()?
                    .try_deserialize::<ServerConfig>()?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the node must not start with.
    pub fn validate(&self) -> Result<()> {
        let v = &self.validator;
        if v.party_id == 0 || v.party_id > v.total_parties {
            return Err(ConfigError::Invalid(format!(
                "party_id {} outside [1, {}]",
                v.party_id, v.total_parties
            )));
        }
        if v.threshold < 2 || v.threshold > v.total_parties {
            return Err(ConfigError::Invalid(format!(
                "threshold {} outside [2, {}]",
                v.threshold, v.total_parties
            )));
        }
        match self.keystore.backend {
            KeyStoreBackend::File if self.keystore.path.is_none() => {
                return Err(ConfigError::Invalid("file keystore requires keystore_config.path".into()));
            }
            KeyStoreBackend::Kms => {
                let Some(url) = &self.keystore.kms_url else {
                    return Err(ConfigError::Invalid("kms keystore requires keystore_config.kms_url".into()));
                };
                if self.keystore.kms_public_key.is_none() {
                    return Err(ConfigError::Invalid(
                        "kms keystore requires keystore_config.kms_public_key".into(),
                    ));
                }
                if url.scheme() != "https" && !is_loopback_host(url) {
                    return Err(ConfigError::Invalid(format!(
                        "kms_url {url} must use https outside loopback"
                    )));
                }
            }
            _ => {}
        }
        for peer in &self.transport.peers {
            if peer.party_id == 0 || peer.party_id > v.total_parties {
                return Err(ConfigError::Invalid(format!(
                    "peer party_id {} outside [1, {}]",
                    peer.party_id, v.total_parties
                )));
            }
        }
        let mut chain_ids: Vec<u32> = self.chains.iter().map(|c| c.chain_id).collect();
        chain_ids.sort_unstable();
        chain_ids.dedup();
        if chain_ids.len() != self.chains.len() {
            return Err(ConfigError::Invalid("duplicate chain_id in chains".into()));
        }
        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            chains: self.chains.clone(),
            dedup_capacity: MonitorConfig::default_dedup_capacity(),
        }
    }
}
