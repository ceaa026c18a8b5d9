use std::env;
use std::time::Duration;

/// Which node API implementation to talk to.
///
/// Selected once at startup; `http` points at a real node, `fake` generates
/// blocks locally for development and testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeApiKind {
    Http,
    Fake,
}

/// Which node process manager to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeManagerKind {
    Docker,
    Noop,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime configuration loaded from environment variables (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub node_api: NodeApiKind,
    pub node_manager: NodeManagerKind,
    pub node_compose_filepath: Option<String>,
    pub node_api_host: String,
    pub node_api_port: u16,
    pub node_api_protocol: String,
    pub node_api_timeout: Duration,
    /// How long update streams sleep when a poll finds no new entities.
    pub poll_interval: Duration,
    /// Slots per historical batch request during backfill.
    pub backfill_batch_size: i64,
    /// How often the backfill worker re-checks an empty store.
    pub backfill_poll_interval: Duration,
    pub fake_start_slot: i64,
    pub fake_block_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let node_api = match env::var("NODE_API") {
            Ok(value) => match value.to_lowercase().as_str() {
                "http" => NodeApiKind::Http,
                "fake" => NodeApiKind::Fake,
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "Unknown NODE_API '{}'. Available options are: 'http', 'fake'.",
                        other
                    )))
                }
            },
            Err(_) => return Err(ConfigError::MissingVariable("NODE_API".to_string())),
        };

        let node_manager = match env::var("NODE_MANAGER")
            .unwrap_or_else(|_| "noop".to_string())
            .to_lowercase()
            .as_str()
        {
            "docker" => NodeManagerKind::Docker,
            "noop" => NodeManagerKind::Noop,
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Unknown NODE_MANAGER '{}'. Available options are: 'docker', 'noop'.",
                    other
                )))
            }
        };

        let node_compose_filepath = env::var("NODE_COMPOSE_FILEPATH").ok();
        if node_manager == NodeManagerKind::Docker && node_compose_filepath.is_none() {
            return Err(ConfigError::MissingVariable(
                "NODE_COMPOSE_FILEPATH (required when NODE_MANAGER=docker)".to_string(),
            ));
        }

        let node_api_protocol = env::var("NODE_API_PROTOCOL").unwrap_or_else(|_| "http".to_string());
        if node_api_protocol != "http" && node_api_protocol != "https" {
            return Err(ConfigError::InvalidValue(
                "NODE_API_PROTOCOL must be 'http' or 'https'".to_string(),
            ));
        }

        let backfill_batch_size = parse_env("BACKFILL_BATCH_SIZE", 50)?;
        if backfill_batch_size < 1 {
            return Err(ConfigError::InvalidValue(
                "BACKFILL_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "blockflow.db".to_string()),
            node_api,
            node_manager,
            node_compose_filepath,
            node_api_host: env::var("NODE_API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            node_api_port: parse_env("NODE_API_PORT", 18080)?,
            node_api_protocol,
            node_api_timeout: Duration::from_secs(parse_env("NODE_API_TIMEOUT_SECS", 60)?),
            poll_interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 1000)?),
            backfill_batch_size,
            backfill_poll_interval: Duration::from_secs(parse_env(
                "BACKFILL_POLL_INTERVAL_SECS",
                3,
            )?),
            fake_start_slot: parse_env("FAKE_START_SLOT", 5)?,
            fake_block_interval: Duration::from_millis(parse_env("FAKE_BLOCK_INTERVAL_MS", 3000)?),
        })
    }

    /// Base URL of the node's HTTP API.
    pub fn node_base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.node_api_protocol, self.node_api_host, self.node_api_port
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{} is not a valid value", name))),
        Err(_) => Ok(default),
    }
}
