use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Unified config (figment-deserialized from defaults / fahmon.toml / env / CLI)
// =============================================================================
//
//   fahmon.toml:     [connection]
//                    host = "192.168.1.20"
//
//   env var:         FAHMON_CONNECTION__HOST=192.168.1.20   (double underscore = nesting)
//
//   CLI flag:        fahmon --host 192.168.1.20

pub const DEFAULT_CONFIG_FILE: &str = "fahmon.toml";
pub const DEFAULT_PORT: u16 = 36330;

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub connection: ConnectionFileConfig,
    #[serde(default)]
    pub updates: UpdatesFileConfig,
    #[serde(default)]
    pub log: LogFileConfig,
}

/// Where the client's command socket lives (`[connection]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Sent as `auth <password>` before anything else when set.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// How often the client should push each stream, in seconds (`[updates]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatesFileConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_info_secs")]
    pub info_secs: u64,
    #[serde(default = "default_options_secs")]
    pub options_secs: u64,
    #[serde(default = "default_slots_secs")]
    pub slots_secs: u64,
    #[serde(default = "default_units_secs")]
    pub units_secs: u64,
}

impl Default for UpdatesFileConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            info_secs: default_info_secs(),
            options_secs: default_options_secs(),
            slots_secs: default_slots_secs(),
            units_secs: default_units_secs(),
        }
    }
}

/// Log accumulator tunables (`[log]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogFileConfig {
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout_secs() -> u64 {
    10
}
fn default_heartbeat_secs() -> u64 {
    5
}
fn default_info_secs() -> u64 {
    60
}
fn default_options_secs() -> u64 {
    5
}
fn default_slots_secs() -> u64 {
    1
}
fn default_units_secs() -> u64 {
    1
}
fn default_max_lines() -> usize {
    fah_client::log_sink::DEFAULT_MAX_LINES
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "ConnectionOverrides::is_empty")]
    pub connection: ConnectionOverrides,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ConnectionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectionOverrides {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.port.is_none() && self.password.is_none()
    }
}

/// Build a figment that layers: defaults → config file → FAHMON_* env vars → CLI.
///
/// A missing config file is not an error.
pub fn load_config(config_file: &Path, cli: &CliOverrides) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("FAHMON_").split("__"))
        .merge(Serialized::defaults(cli))
}

// =============================================================================
// Runtime config (derived from FileConfig)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    pub fn from_file(fc: &ConnectionFileConfig) -> Self {
        Self {
            host: fc.host.clone(),
            port: fc.port,
            password: fc.password.clone().filter(|p| !p.is_empty()),
            connect_timeout: Duration::from_secs(fc.connect_timeout_secs.max(1)),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub connection: ConnectionConfig,
    pub updates: UpdatesFileConfig,
    pub log_max_lines: usize,
}

impl MonitorConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            connection: ConnectionConfig::from_file(&fc.connection),
            updates: fc.updates.clone(),
            log_max_lines: fc.log.max_lines,
        }
    }
}
