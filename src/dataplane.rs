use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use futures::future::join_all;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use udp_fanout::{Channel, EndpointRegistry, Forwarder};

use crate::config::Config;
use crate::control::{ControlEndpoint, ControlService};
use crate::source::SourceResolver;

/// Addresses a [`DataPlane`] binds.
#[derive(Debug, Clone, Copy)]
pub struct Bindings {
    pub control: SocketAddr,
    pub media: SocketAddr,
    pub feedback: SocketAddr,
}

impl From<&Config> for Bindings {
    fn from(config: &Config) -> Self {
        Self {
            control: config.control_addr(),
            media: config.media_addr(),
            feedback: config.feedback_addr(),
        }
    }
}

/// A fully bound relay: both forwarding channels plus the control listener.
pub struct DataPlane {
    control: ControlEndpoint,
    listener: TcpListener,
    media: Forwarder,
    feedback: Forwarder,
}

impl DataPlane {
    /// Bind every socket up front. Any failure here is fatal for the
    /// process; nothing is forwarded until all three are bound.
    pub async fn bind(bindings: Bindings, local_address: Option<IpAddr>) -> anyhow::Result<Self> {
        let registry = Arc::new(EndpointRegistry::new());
        let source = Arc::new(SourceResolver::new());

        let media = Forwarder::bind(Channel::Media, bindings.media, Arc::clone(&registry))
            .await
            .context("could not bind media channel")?;
        let feedback = Forwarder::bind(Channel::Feedback, bindings.feedback, Arc::clone(&registry))
            .await
            .context("could not bind feedback channel")?;

        let listener = TcpListener::bind(bindings.control)
            .await
            .with_context(|| format!("failed to listen on {}", bindings.control))?;

        Ok(Self {
            control: ControlEndpoint::new(registry, source, local_address),
            listener,
            media,
            feedback,
        })
    }

    pub fn control_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn media_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.media.local_addr()?)
    }

    pub fn feedback_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.feedback.local_addr()?)
    }

    /// Forward and serve control commands until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let control_addr = self.control_addr()?;

        let forwarders = [self.media, self.feedback]
            .map(|forwarder| tokio::spawn(forwarder.run(shutdown.clone())));

        info!(addr = %control_addr, "Listening for control plane messages");

        let served = tonic::transport::Server::builder()
            .add_service(ControlService::new(self.control).into_server())
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(self.listener),
                shutdown.clone().cancelled_owned(),
            )
            .await;

        // The server may also stop on its own; take the forwarders down with it.
        shutdown.cancel();

        for joined in join_all(forwarders).await {
            if let Err(e) = joined {
                error!(error = %e, "Forwarder task failed");
            }
        }

        served.context("control service failed")?;
        info!("Data plane stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
