//! `lunodb-connector`: serves the demo weather connector.
//!
//! This binary is the composition root:
//!
//! 1. **Wire logging**: `tracing-subscriber` with an `EnvFilter` and a text
//!    or JSON formatter (see [`telemetry`]).
//! 2. **Read configuration** from the environment.
//! 3. **Construct infrastructure**: the TCP transport and the weather handler,
//!    injected into a [`connector::Connector`].
//! 4. **Serve** until Ctrl-C.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `LUNODB_SOURCE` | Registered source id (required) |
//! | `LUNODB_TOKEN` | Bearer token (required) |
//! | `LUNODB_CITY` | City reported by the weather table (default `Amsterdam`) |
//! | `LUNODB_STARGATE_ADDRESS` | Stargate endpoint |
//! | `LUNODB_INSECURE` | Must be `true`: the bundled TCP transport is plaintext only |
//! | `LUNODB_LOG_FORMAT` | `json` for JSON logs |
//! | `RUST_LOG` | Log filter (default `info`) |

mod telemetry;
mod weather;

use std::env;
use std::sync::Arc;

use anyhow::{ensure, Context};
use connector::{CancellationToken, Connector, ConnectorConfig, INSECURE_ENV};
use protocol::TransportSecurity;
use tracing::{error, info};
use transport::TcpTransport;

use crate::telemetry::LogFormat;
use crate::weather::{WeatherConnector, DEFAULT_CITY};

const SOURCE_ENV: &str = "LUNODB_SOURCE";
const TOKEN_ENV: &str = "LUNODB_TOKEN";
const CITY_ENV: &str = "LUNODB_CITY";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = telemetry::init(LogFormat::from_env())?;

    let source = env::var(SOURCE_ENV).with_context(|| format!("{SOURCE_ENV} must be set"))?;
    let token = env::var(TOKEN_ENV).with_context(|| format!("{TOKEN_ENV} must be set"))?;
    let city = env::var(CITY_ENV).unwrap_or_else(|_| DEFAULT_CITY.to_string());

    let config = ConnectorConfig::builder()
        .source(source)
        .token(token)
        .logger(logger)
        .build()
        .context("invalid connector configuration")?;
    check_plaintext(&config)?;
    info!(
        address = %config.endpoint().address,
        source = %config.source(),
        %city,
        "starting weather connector"
    );

    let connector = Connector::new(config, TcpTransport);
    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_interrupt(shutdown.clone()));

    connector
        .serve(shutdown, Arc::new(WeatherConnector::new(city)))
        .await
        .context("connector stopped")?;
    Ok(())
}

/// Fails early instead of letting the first dial fail with a transport error.
fn check_plaintext(config: &ConnectorConfig) -> anyhow::Result<()> {
    ensure!(
        config.endpoint().security == TransportSecurity::Plaintext,
        "{INSECURE_ENV}=true is required: the TCP transport has no TLS support"
    );
    Ok(())
}

async fn cancel_on_interrupt(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
        Err(err) => error!(error = %err, "failed to listen for interrupt"),
    }
}

#[cfg(test)]
mod tests {
    use connector::ConnectorConfigBuilder;

    use super::*;

    #[test]
    fn test_tls_endpoint_is_refused_up_front() {
        let tls = ConnectorConfigBuilder::from_lookup(|_| None)
            .build()
            .unwrap();
        let err = check_plaintext(&tls).unwrap_err();
        assert!(err.to_string().contains(INSECURE_ENV));

        let plaintext = ConnectorConfigBuilder::from_lookup(|name: &str| {
            (name == INSECURE_ENV).then(|| "true".to_string())
        })
        .build()
        .unwrap();
        assert!(check_plaintext(&plaintext).is_ok());
    }
}
