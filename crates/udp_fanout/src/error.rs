use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// Errors produced while turning wire address fields into an [`Endpoint`](crate::Endpoint).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AddressError {
    #[error("endpoint ip is empty")]
    EmptyIp,

    #[error("invalid endpoint ip '{0}'")]
    InvalidIp(String),

    /// Forwarders only send over IPv4.
    #[error("unsupported address family for endpoint ip {0}")]
    UnsupportedFamily(IpAddr),

    /// Port outside `1..=65535`.
    #[error("invalid endpoint port {0}")]
    InvalidPort(u32),
}

/// Errors that can occur while setting up a forwarder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FanoutError {
    /// The UDP socket for a channel could not be bound.
    #[error("failed to bind UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local socket address")]
    LocalAddr(#[source] std::io::Error),
}
