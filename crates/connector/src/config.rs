//! Connector configuration.
//!
//! [`ConnectorConfig`] is immutable once built. [`ConnectorConfig::builder`]
//! seeds the builder from the process environment; explicit setters then
//! override those values and [`ConnectorConfigBuilder::build`] validates the
//! result.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `LUNODB_STARGATE_ADDRESS` | Replaces [`DEFAULT_STARGATE_ADDRESS`] |
//! | `LUNODB_INSECURE` | `true` selects a plaintext transport |

use std::time::Duration;

use protocol::{AuthMetadata, Endpoint, SecretToken, SourceId, TransportSecurity};
use tracing::Dispatch;

use crate::errors::ConfigError;

/// Stargate endpoint used when nothing else is configured.
pub const DEFAULT_STARGATE_ADDRESS: &str = "stargate.lunodb.io";

/// Upper bound on the wait between two session attempts.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

pub const ADDRESS_ENV: &str = "LUNODB_STARGATE_ADDRESS";
pub const INSECURE_ENV: &str = "LUNODB_INSECURE";

/// Validated connector settings.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    endpoint: Endpoint,
    source: SourceId,
    token: SecretToken,
    heartbeat: Duration,
    logger: Dispatch,
}

impl ConnectorConfig {
    /// Builder seeded from the process environment.
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Dispatcher every engine log event goes to.
    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    /// Metadata attached to every session.
    pub fn auth_metadata(&self) -> AuthMetadata {
        AuthMetadata::new(self.token.clone(), self.source)
    }
}

/// Builder for [`ConnectorConfig`].
#[derive(Debug, Clone)]
pub struct ConnectorConfigBuilder {
    address: String,
    security: TransportSecurity,
    source: Option<String>,
    token: SecretToken,
    heartbeat: Duration,
    logger: Dispatch,
}

impl ConnectorConfigBuilder {
    /// Builder seeded from `lookup` instead of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let address = lookup(ADDRESS_ENV)
            .filter(|address| !address.is_empty())
            .unwrap_or_else(|| DEFAULT_STARGATE_ADDRESS.to_string());
        let security = match lookup(INSECURE_ENV).as_deref() {
            Some("true") => TransportSecurity::Plaintext,
            _ => TransportSecurity::Tls,
        };

        Self {
            address,
            security,
            source: None,
            token: SecretToken::default(),
            heartbeat: DEFAULT_HEARTBEAT,
            logger: Dispatch::none(),
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// `true` selects a plaintext stream.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.security = if insecure {
            TransportSecurity::Plaintext
        } else {
            TransportSecurity::Tls
        };
        self
    }

    /// Decimal source id; validated by [`Self::build`]. Defaults to `0`.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = SecretToken::new(token);
        self
    }

    pub fn heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Sends engine logs to `logger`. Logs are discarded by default.
    pub fn logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = logger.into();
        self
    }

    pub fn build(self) -> Result<ConnectorConfig, ConfigError> {
        if self.address.is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.heartbeat.is_zero() {
            return Err(ConfigError::InvalidHeartbeat);
        }
        let source = match self.source {
            Some(value) => value
                .parse::<SourceId>()
                .map_err(|source| ConfigError::InvalidSource { value, source })?,
            None => SourceId::new(0),
        };

        Ok(ConnectorConfig {
            endpoint: Endpoint {
                address: self.address,
                security: self.security,
            },
            source,
            token: self.token,
            heartbeat: self.heartbeat,
            logger: self.logger,
        })
    }
}
