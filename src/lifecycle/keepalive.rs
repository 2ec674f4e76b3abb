//! Periodic liveness checks.
//!
//! # Responsibilities
//! - Call `check_connect` on a timer
//! - Back off while every cycle ends closed
//! - Stop on the shutdown broadcast

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::KeepaliveConfig;
use crate::connector::{ConnectionHandler, Connector, ConnectorState};
use crate::net::transport::Dialer;
use crate::resilience::backoff::Backoff;

pub struct Keepalive<D: Dialer, H> {
    connector: Connector<D, H>,
    config: KeepaliveConfig,
    interval: Duration,
    backoff: Backoff,
}

impl<D, H> Keepalive<D, H>
where
    D: Dialer,
    H: ConnectionHandler<D::Transport>,
{
    pub fn new(connector: Connector<D, H>, config: KeepaliveConfig) -> Self {
        Self {
            connector,
            interval: Duration::from_secs(config.interval_secs),
            backoff: Backoff::from_config(&config),
            config,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Keepalive checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            backoff_max_ms = self.config.backoff_max_ms,
            "Keepalive starting"
        );

        let mut delay = self.interval;
        loop {
            tokio::select! {
                _ = time::sleep(delay) => {
                    delay = self.tick();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Keepalive received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one check and return the delay before the next.
    pub fn tick(&mut self) -> Duration {
        let state = self.connector.state();
        self.connector.check_connect();

        match state {
            ConnectorState::Connected => {
                self.backoff.reset();
                self.interval
            }
            ConnectorState::Connecting => self.interval,
            ConnectorState::Closed | ConnectorState::Failed => {
                let delay = self.backoff.next_delay();
                tracing::debug!(
                    failures = self.backoff.failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Connector closed, backing off"
                );
                delay
            }
        }
    }
}
