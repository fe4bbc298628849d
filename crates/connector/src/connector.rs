//! Connection supervisor.

use std::sync::Arc;

use protocol::{AuthMetadata, Channel, Handler, Transport};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

use crate::config::ConnectorConfig;
use crate::dispatch::Session;
use crate::errors::ConnectorError;
use crate::health::Health;

/// Keeps one session with Stargate open and serves its requests through a
/// [`Handler`].
///
/// ```no_run
/// # use std::sync::Arc;
/// # use connector::{CancellationToken, Connector, ConnectorConfig};
/// # async fn run(handler: Arc<dyn protocol::Handler>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConnectorConfig::builder().source("42").token("secret").build()?;
/// let connector = Connector::new(config, transport::TcpTransport);
/// connector.serve(CancellationToken::new(), handler).await?;
/// # Ok(())
/// # }
/// ```
pub struct Connector {
    config: ConnectorConfig,
    transport: Arc<dyn Transport>,
    health: Health,
}

impl Connector {
    pub fn new(config: ConnectorConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            health: Health::default(),
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Returns `true` while a session is open and being served.
    pub fn healthy(&self) -> bool {
        self.health.get()
    }

    /// Serves sessions until `shutdown` is cancelled.
    ///
    /// Every session end (clean or not) is followed by a new attempt after
    /// at most one heartbeat interval. The only error returned is a failure
    /// to build a channel for the configured endpoint; open and session
    /// failures are logged and retried without limit.
    pub async fn serve(
        &self,
        shutdown: CancellationToken,
        handler: Arc<dyn Handler>,
    ) -> Result<(), ConnectorError> {
        let logger = self.config.logger().clone();
        self.serve_loop(&shutdown, &handler)
            .with_subscriber(logger)
            .await
    }

    async fn serve_loop(
        &self,
        shutdown: &CancellationToken,
        handler: &Arc<dyn Handler>,
    ) -> Result<(), ConnectorError> {
        let endpoint = self.config.endpoint();
        let address = endpoint.address.as_str();
        let period = self.config.heartbeat();

        let channel =
            self.transport
                .connect(endpoint)
                .await
                .map_err(|source| ConnectorError::Dial {
                    address: address.to_string(),
                    source,
                })?;
        let metadata = self.config.auth_metadata();

        let mut heartbeat = interval(period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
        heartbeat.tick().await;

        loop {
            info!(address, "attempting to connect to Stargate");
            self.serve_session(channel.as_ref(), &metadata, shutdown, handler)
                .await;
            info!(address, heartbeat = ?period, "connection closed, attempting to reconnect");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, stopping connector");
                    return Ok(());
                }
                _ = heartbeat.tick() => info!(address, "attempting to reconnect to Stargate"),
            }
        }
    }

    async fn serve_session(
        &self,
        channel: &dyn Channel,
        metadata: &AuthMetadata,
        shutdown: &CancellationToken,
        handler: &Arc<dyn Handler>,
    ) {
        let opened = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            opened = channel.open(metadata) => opened,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "failed to connect to Stargate");
                return;
            }
        };

        info!("connected to Stargate");
        let _alive = self.health.enter();
        let session = Session::new(stream, handler.clone(), self.config.source());
        if let Err(err) = session.run(shutdown).await {
            error!(error = %err, "unexpected error in receive loop");
        }
    }
}
