//! Configuration for the tasksync client.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attributes)
//! 3. TOML config file (`~/.config/tasksync/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that doesn't exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::net::{NetConfig, ReconnectPolicy};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A URL setting is not usable.
    #[error("invalid {field} URL {value:?}: {reason}")]
    InvalidUrl {
        /// Setting name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    network: NetworkFileConfig,
    ui: UiFileConfig,
    storage: StorageFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    api_url: Option<String>,
    push_url: Option<String>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

/// `[network]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    channel_capacity: Option<usize>,
    reconnect_initial_ms: Option<u64>,
    reconnect_max_ms: Option<u64>,
    reconnect_max_attempts: Option<u32>,
}

/// `[ui]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    page_size: Option<usize>,
}

/// `[storage]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Server --
    /// Base URL of the REST API (also hosts `/auth/google`).
    pub api_url: String,
    /// WebSocket URL of the push channel.
    pub push_url: String,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Timeout for opening the push connection.
    pub connect_timeout: Duration,

    // -- Network --
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,
    /// Push reconnect backoff.
    pub reconnect: ReconnectPolicy,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Tasks per page on the all-tasks page.
    pub page_size: usize,

    // -- Storage --
    /// Session storage file; `None` uses the platform data dir.
    pub storage_path: Option<PathBuf>,
}

const DEFAULT_API_URL: &str = "http://localhost:5000";

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            push_url: derive_push_url(DEFAULT_API_URL),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            reconnect: ReconnectPolicy::default(),
            poll_timeout: Duration::from_millis(50),
            page_size: crate::tasks::view::DEFAULT_PAGE_SIZE,
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read
    /// or parsed, a default file exists but is malformed, or a URL is not
    /// `http(s)`/`ws(s)` as appropriate.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        config.validate()?;
        Ok(config)
    }

    /// Priority: CLI > file > default. The push URL, when not given,
    /// follows the API URL.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let api_url = cli
            .api_url
            .clone()
            .or_else(|| file.server.api_url.clone())
            .unwrap_or(defaults.api_url);
        let push_url = cli
            .push_url
            .clone()
            .or_else(|| file.server.push_url.clone())
            .unwrap_or_else(|| derive_push_url(&api_url));

        Self {
            api_url,
            push_url,
            request_timeout: file
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .network
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            reconnect: ReconnectPolicy {
                initial: file
                    .network
                    .reconnect_initial_ms
                    .map_or(defaults.reconnect.initial, Duration::from_millis),
                max: file
                    .network
                    .reconnect_max_ms
                    .map_or(defaults.reconnect.max, Duration::from_millis),
                max_attempts: file
                    .network
                    .reconnect_max_attempts
                    .or(defaults.reconnect.max_attempts),
            },
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            page_size: file.ui.page_size.unwrap_or(defaults.page_size).max(1),
            storage_path: cli.storage.clone().or_else(|| file.storage.path.clone()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_scheme("api", &self.api_url, &["http", "https"])?;
        check_scheme("push", &self.push_url, &["ws", "wss"])
    }

    /// Settings for the networking layer.
    #[must_use]
    pub const fn to_net_config(&self) -> NetConfig {
        NetConfig {
            channel_capacity: self.channel_capacity,
            reconnect: self.reconnect,
        }
    }
}

/// `http://host:port/base` → `ws://host:port/base/ws`.
fn derive_push_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let swapped = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{swapped}/ws")
}

fn check_scheme(field: &'static str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if allowed.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(invalid(format!("expected {}", allowed.join(" or "))))
    }
}

/// Subcommands; without one the TUI starts.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in. Without options, prints the browser login URL.
    Login {
        /// Success redirect URL copied from the browser (`...?token=...`).
        #[arg(long)]
        redirect: Option<String>,

        /// Bearer token to store directly.
        #[arg(long, env = "TASKSYNC_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Forget the stored token.
    Logout,
    /// Show the signed-in user.
    Whoami,
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal client for a collaborative to-do list")]
pub struct CliArgs {
    /// Base URL of the task API.
    #[arg(long, env = "TASKSYNC_API_URL", global = true)]
    pub api_url: Option<String>,

    /// WebSocket URL of the push channel (default: derived from the API URL).
    #[arg(long, env = "TASKSYNC_PUSH_URL", global = true)]
    pub push_url: Option<String>,

    /// Path to config file (default: `~/.config/tasksync/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the session storage file.
    #[arg(long, env = "TASKSYNC_STORAGE", global = true)]
    pub storage: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKSYNC_LOG", global = true)]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tasksync.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// An explicit path must exist. Without one, the default path is tried
/// and a missing file is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("tasksync").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
