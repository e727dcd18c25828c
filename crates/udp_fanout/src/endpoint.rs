use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::AddressError;

/// A subscriber address that forwarded datagrams are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(SocketAddr);

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    /// Build an endpoint from the separate ip / port fields carried by
    /// control commands. Forwarders bind IPv4 sockets, so only IPv4
    /// literals are accepted; IPv4-mapped IPv6 literals are unwrapped to
    /// their IPv4 form. Host names are not resolved.
    pub fn parse(ip: &str, port: u32) -> Result<Self, AddressError> {
        if ip.is_empty() {
            return Err(AddressError::EmptyIp);
        }

        let parsed: IpAddr = ip
            .parse()
            .map_err(|_| AddressError::InvalidIp(ip.to_owned()))?;

        let IpAddr::V4(ip) = parsed.to_canonical() else {
            return Err(AddressError::UnsupportedFamily(parsed));
        };

        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(AddressError::InvalidPort(port))?;

        Ok(Self(SocketAddr::new(IpAddr::V4(ip), port)))
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
