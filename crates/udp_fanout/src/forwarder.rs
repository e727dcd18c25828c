use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FanoutError;
use crate::registry::EndpointRegistry;

/// Largest payload a single receive accepts.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Which half of an RTP session a forwarder carries. Only used to label
/// logs and stats; traffic is separated by the bound port alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// RTP, bound to the base port.
    Media,
    /// RTCP, bound to the base port + 1.
    Feedback,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Media => "rtp",
            Channel::Feedback => "rtcp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running counters for one forwarder.
#[derive(Debug, Default)]
pub struct ForwarderStats {
    received: AtomicU64,
    forwarded: AtomicU64,
    send_errors: AtomicU64,
    receive_errors: AtomicU64,
}

impl ForwarderStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ForwarderStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams read from the socket.
    pub received: u64,
    /// Successful per-destination sends.
    pub forwarded: u64,
    pub send_errors: u64,
    pub receive_errors: u64,
}

/// Receive-and-fan-out loop for one UDP channel.
///
/// Every datagram read from the bound socket is sent verbatim, over the same
/// socket, to each endpoint in the registry snapshot taken right after the
/// read.
pub struct Forwarder {
    channel: Channel,
    socket: UdpSocket,
    registry: Arc<EndpointRegistry>,
    stats: Arc<ForwarderStats>,
}

impl Forwarder {
    pub async fn bind(
        channel: Channel,
        addr: SocketAddr,
        registry: Arc<EndpointRegistry>,
    ) -> Result<Self, FanoutError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| FanoutError::Bind { addr, source })?;

        Ok(Self {
            channel,
            socket,
            registry,
            stats: Arc::new(ForwarderStats::default()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FanoutError> {
        self.socket.local_addr().map_err(FanoutError::LocalAddr)
    }

    /// Shared handle to this forwarder's counters; stays valid after `run`
    /// consumes the forwarder.
    pub fn stats(&self) -> Arc<ForwarderStats> {
        Arc::clone(&self.stats)
    }

    /// Run until `shutdown` is cancelled. Cancellation is only observed
    /// while waiting for the next datagram, so a fan-out that has started
    /// always completes.
    pub async fn run(self, shutdown: CancellationToken) -> StatsSnapshot {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        info!(
            channel = %self.channel,
            addr = ?self.socket.local_addr().ok(),
            "Forwarder started"
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, from)) => {
                    self.stats.received.fetch_add(1, Ordering::Relaxed);
                    self.fan_out(&buf[..len], from).await;
                }
                Err(e) => {
                    // Includes ICMP errors reported for earlier sends.
                    self.stats.receive_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(channel = %self.channel, error = %e, "Could not receive a packet");
                }
            }
        }

        let stats = self.stats.snapshot();
        info!(
            channel = %self.channel,
            received = stats.received,
            forwarded = stats.forwarded,
            send_errors = stats.send_errors,
            receive_errors = stats.receive_errors,
            "Forwarder stopped"
        );
        stats
    }

    async fn fan_out(&self, payload: &[u8], from: SocketAddr) {
        let targets = self.registry.snapshot();

        debug!(
            channel = %self.channel,
            from = %from,
            len = payload.len(),
            targets = targets.len(),
            "Forwarding datagram"
        );

        for endpoint in targets.iter() {
            match self.socket.send_to(payload, endpoint.addr()).await {
                Ok(_) => {
                    self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.send_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        channel = %self.channel,
                        endpoint = %endpoint,
                        error = %e,
                        "Could not forward packet"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(2);
    const QUIET: Duration = Duration::from_millis(200);

    async fn receiver() -> (UdpSocket, Endpoint) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Endpoint::new(socket.local_addr().unwrap());
        (socket, endpoint)
    }

    async fn start(
        registry: Arc<EndpointRegistry>,
    ) -> (
        SocketAddr,
        Arc<ForwarderStats>,
        CancellationToken,
        tokio::task::JoinHandle<StatsSnapshot>,
    ) {
        let forwarder = Forwarder::bind(Channel::Media, "127.0.0.1:0".parse().unwrap(), registry)
            .await
            .unwrap();
        let addr = forwarder.local_addr().unwrap();
        let stats = forwarder.stats();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(forwarder.run(shutdown.clone()));
        (addr, stats, shutdown, handle)
    }

    async fn recv(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(WAIT, socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for datagram")
            .unwrap();
        buf.truncate(len);
        buf
    }

    async fn assert_quiet(socket: &UdpSocket) {
        let mut buf = [0u8; 64];
        assert!(
            timeout(QUIET, socket.recv_from(&mut buf)).await.is_err(),
            "unexpected datagram"
        );
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let registry = Arc::new(EndpointRegistry::new());
        let first = Forwarder::bind(
            Channel::Media,
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&registry),
        )
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let second = Forwarder::bind(Channel::Feedback, taken, registry).await;
        assert!(matches!(second, Err(FanoutError::Bind { addr, .. }) if addr == taken));
    }

    #[tokio::test]
    async fn test_fan_out_to_snapshot_members_only() {
        let registry = Arc::new(EndpointRegistry::new());
        let (rx_a, ep_a) = receiver().await;
        let (rx_b, ep_b) = receiver().await;
        let (rx_late, ep_late) = receiver().await;
        registry.add(ep_a);
        registry.add(ep_b);

        let (addr, stats, shutdown, handle) = start(Arc::clone(&registry)).await;

        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let payload: Vec<u8> = (0..188u16).map(|i| i as u8).collect();
        source.send_to(&payload, addr).await.unwrap();

        assert_eq!(recv(&rx_a).await, payload);
        assert_eq!(recv(&rx_b).await, payload);

        registry.add(ep_late);
        assert_quiet(&rx_late).await;

        shutdown.cancel();
        let final_stats = timeout(WAIT, handle).await.unwrap().unwrap();
        assert_eq!(final_stats.received, 1);
        assert_eq!(final_stats.forwarded, 2);
        assert_eq!(stats.snapshot(), final_stats);
    }

    #[tokio::test]
    async fn test_removed_endpoint_receives_nothing() {
        let registry = Arc::new(EndpointRegistry::new());
        let (rx_a, ep_a) = receiver().await;
        let (rx_b, ep_b) = receiver().await;
        registry.add(ep_a);
        registry.add(ep_b);
        registry.remove(&ep_a);

        let (addr, _stats, shutdown, _handle) = start(Arc::clone(&registry)).await;

        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        source.send_to(b"rtcp", addr).await.unwrap();

        assert_eq!(recv(&rx_b).await, b"rtcp");
        assert_quiet(&rx_a).await;
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_failing_destination_does_not_block_others() {
        let registry = Arc::new(EndpointRegistry::new());
        // Limited broadcast without SO_BROADCAST is refused by the kernel,
        // so every send to it fails.
        registry.add(Endpoint::parse("255.255.255.255", 5004).unwrap());
        let (rx, ep) = receiver().await;
        registry.add(ep);

        let (addr, stats, shutdown, _handle) = start(Arc::clone(&registry)).await;

        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        source.send_to(b"first", addr).await.unwrap();
        assert_eq!(recv(&rx).await, b"first");

        source.send_to(b"second", addr).await.unwrap();
        assert_eq!(recv(&rx).await, b"second");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.forwarded, 2);
        assert_eq!(snapshot.send_errors, 2);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_parsed_endpoints_of_each_notation_receive() {
        let registry = Arc::new(EndpointRegistry::new());
        let (rx_plain, plain) = receiver().await;
        let (rx_mapped, mapped) = receiver().await;
        let plain = Endpoint::parse("127.0.0.1", u32::from(plain.addr().port())).unwrap();
        let mapped =
            Endpoint::parse("::ffff:127.0.0.1", u32::from(mapped.addr().port())).unwrap();
        assert!(registry.add(plain));
        assert!(registry.add(mapped));

        let (addr, stats, shutdown, _handle) = start(Arc::clone(&registry)).await;

        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        source.send_to(b"rtp", addr).await.unwrap();

        assert_eq!(recv(&rx_plain).await, b"rtp");
        assert_eq!(recv(&rx_mapped).await, b"rtp");
        assert_eq!(stats.snapshot().send_errors, 0);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_order_preserved_per_destination() {
        let registry = Arc::new(EndpointRegistry::new());
        let (rx, ep) = receiver().await;
        registry.add(ep);

        let (addr, _stats, shutdown, _handle) = start(Arc::clone(&registry)).await;

        let source = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for seq in 0u8..10 {
            source.send_to(&[seq; 12], addr).await.unwrap();
        }
        for seq in 0u8..10 {
            assert_eq!(recv(&rx).await, vec![seq; 12]);
        }
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_stops_idle_loop() {
        let registry = Arc::new(EndpointRegistry::new());
        let (_addr, _stats, shutdown, handle) = start(registry).await;

        shutdown.cancel();
        let stats = timeout(WAIT, handle).await.unwrap().unwrap();
        assert_eq!(stats, StatsSnapshot::default());
    }
}
