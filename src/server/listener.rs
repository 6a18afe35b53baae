use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionLimits};
use crate::sensor::{OneWireBus, TemperatureSensor};
use crate::server::stats::ConnectionStats;

/// Pause after a failed `accept` so fd exhaustion does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Everything the accept loop needs, built once at startup.
pub struct ServerContext<B, C> {
    listener: TcpListener,
    sensor: TemperatureSensor<B>,
    clock: C,
    limits: ConnectionLimits,
    stats: ConnectionStats,
}

impl<B: OneWireBus, C: Clock> ServerContext<B, C> {
    pub fn new(
        listener: TcpListener,
        sensor: TemperatureSensor<B>,
        clock: C,
        limits: ConnectionLimits,
    ) -> Self {
        Self {
            listener,
            sensor,
            clock,
            limits,
            stats: ConnectionStats::new(),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn sensor(&self) -> &TemperatureSensor<B> {
        &self.sensor
    }
}

/// Binds the listening socket with address reuse and the configured backlog.
pub async fn bind(cfg: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr = tokio::net::lookup_host(&cfg.listen_addr)
        .await
        .with_context(|| format!("Invalid listen address {}", cfg.listen_addr))?
        .next()
        .with_context(|| format!("{} did not resolve to an address", cfg.listen_addr))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket
        .bind(addr)
        .with_context(|| format!("Failed to bind {}", addr))?;

    Ok(socket.listen(cfg.backlog)?)
}

/// Serves connections one at a time until the process exits.
///
/// The next `accept` only happens once the current connection is closed.
/// Errors from a single connection are logged and never end the loop.
pub async fn run<B: OneWireBus, C: Clock>(ctx: &ServerContext<B, C>) -> anyhow::Result<()> {
    info!("Listening on {}", ctx.local_addr()?);

    loop {
        let (socket, peer) = match ctx.listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        ctx.stats.record_accepted();
        info!("Client connected from {}", peer);

        let result = Connection::new(socket, &ctx.sensor, &ctx.clock, ctx.limits)
            .run()
            .await;
        ctx.stats.record_closed(&result);

        match result {
            Ok(outcome) => tracing::debug!(%peer, ?outcome, "Connection closed"),
            Err(e) => tracing::error!("Connection error from {}: {}", peer, e),
        }
    }
}
