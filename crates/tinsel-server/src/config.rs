//! Server configuration.
//!
//! Read once at startup from the process environment:
//!
//! | Variable                  | Default          |
//! |---------------------------|------------------|
//! | `TINSEL_LISTEN_ADDR`      | `127.0.0.1:7878` |
//! | `TINSEL_ADMIN_PASSPHRASE` | `1q2w3e4r`       |
//! | `TINSEL_REQUIRE_EVEN`     | `true`           |
//! | `TINSEL_REVEAL_BASE_URL`  | empty            |

use std::{
    fmt,
    net::{AddrParseError, SocketAddr},
};

use thiserror::Error;
use tinsel_core::{
    DrawPolicy, EventCoordinator, Service, env::Environment, gate::AdminGate, storage::Storage,
};

/// Listen address variable
pub const LISTEN_ADDR_VAR: &str = "TINSEL_LISTEN_ADDR";
/// Admin passphrase variable
pub const ADMIN_PASSPHRASE_VAR: &str = "TINSEL_ADMIN_PASSPHRASE";
/// Even-count draw rule variable
pub const REQUIRE_EVEN_VAR: &str = "TINSEL_REQUIRE_EVEN";
/// Base URL for reveal links variable
pub const REVEAL_BASE_URL_VAR: &str = "TINSEL_REVEAL_BASE_URL";

/// Errors from reading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Listen address does not parse
    #[error("TINSEL_LISTEN_ADDR: invalid address {value:?}: {source}")]
    InvalidListenAddr {
        /// Raw value
        value: String,
        /// Parse failure
        source: AddrParseError,
    },

    /// Boolean variable is not `true` or `false`
    #[error("{var}: expected true or false, got {value:?}")]
    InvalidBool {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },
}

/// Server configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to accept connections on
    pub listen_addr: SocketAddr,
    /// Shared admin passphrase (empty denies every admin request)
    pub admin_passphrase: String,
    /// Draw preconditions
    pub draw_policy: DrawPolicy,
    /// Public site URL reveal links point at. Empty renders bare query
    /// strings.
    pub reveal_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7878)),
            admin_passphrase: AdminGate::DEFAULT_PASSPHRASE.to_string(),
            draw_policy: DrawPolicy::default(),
            reveal_base_url: String::new(),
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through a lookup function, defaulting unset
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a set variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(LISTEN_ADDR_VAR) {
            config.listen_addr = value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidListenAddr { value, source })?;
        }
        if let Some(value) = lookup(ADMIN_PASSPHRASE_VAR) {
            config.admin_passphrase = value;
        }
        if let Some(value) = lookup(REQUIRE_EVEN_VAR) {
            let flag = match value.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            };
            config.draw_policy.require_even_count =
                flag.ok_or(ConfigError::InvalidBool { var: REQUIRE_EVEN_VAR, value })?;
        }
        if let Some(value) = lookup(REVEAL_BASE_URL_VAR) {
            config.reveal_base_url = value.trim().to_string();
        }

        Ok(config)
    }

    /// Build the request dispatcher this configuration describes
    pub fn build_service<E, S>(&self, env: E, storage: S) -> Service<E, S>
    where
        E: Environment,
        S: Storage,
    {
        Service::new(
            EventCoordinator::with_policy(env, self.draw_policy),
            storage,
            AdminGate::new(self.admin_passphrase.clone()),
        )
        .with_reveal_base(self.reveal_base_url.clone())
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("admin_passphrase", &"<redacted>")
            .field("draw_policy", &self.draw_policy)
            .field("reveal_base_url", &self.reveal_base_url)
            .finish()
    }
}
