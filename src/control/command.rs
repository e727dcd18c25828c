use std::fmt;

use crate::msm_dp_proto::{ProxyProtocol, StreamData, StreamOperation};

/// What a [`StreamCommand`] asks the data plane to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Announce the upstream source of the stream.
    Create,
    AddEndpoint,
    DeleteEndpoint,
    /// A wire value this build does not know about.
    Unknown(i32),
}

impl From<i32> for Operation {
    fn from(value: i32) -> Self {
        match StreamOperation::try_from(value) {
            Ok(StreamOperation::Create) => Operation::Create,
            Ok(StreamOperation::AddEndpoint) => Operation::AddEndpoint,
            Ok(StreamOperation::DeleteEndpoint) => Operation::DeleteEndpoint,
            Err(_) => Operation::Unknown(value),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("CREATE"),
            Operation::AddEndpoint => f.write_str("ADD_ENDPOINT"),
            Operation::DeleteEndpoint => f.write_str("DELETE_ENDPOINT"),
            Operation::Unknown(value) => write!(f, "UNKNOWN({value})"),
        }
    }
}

/// Transport tag carried by a command. Recorded for diagnostics only; it
/// does not select a forwarding channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
    Quic,
    Rtp,
    Unknown(i32),
}

impl From<i32> for Protocol {
    fn from(value: i32) -> Self {
        match ProxyProtocol::try_from(value) {
            Ok(ProxyProtocol::Tcp) => Protocol::Tcp,
            Ok(ProxyProtocol::Udp) => Protocol::Udp,
            Ok(ProxyProtocol::Quic) => Protocol::Quic,
            Ok(ProxyProtocol::Rtp) => Protocol::Rtp,
            Err(_) => Protocol::Unknown(value),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
            Protocol::Quic => f.write_str("QUIC"),
            Protocol::Rtp => f.write_str("RTP"),
            Protocol::Unknown(value) => write!(f, "UNKNOWN({value})"),
        }
    }
}

/// A decoded `StreamAddDel` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCommand {
    pub id: String,
    pub operation: Operation,
    pub protocol: Protocol,
    pub enable: bool,
    pub ip: String,
    pub port: u32,
}

impl StreamCommand {
    pub fn new(operation: Operation, ip: impl Into<String>, port: u32) -> Self {
        Self {
            id: String::new(),
            operation,
            protocol: Protocol::Rtp,
            enable: true,
            ip: ip.into(),
            port,
        }
    }

    pub fn create(ip: impl Into<String>) -> Self {
        Self::new(Operation::Create, ip, 0)
    }

    pub fn add_endpoint(ip: impl Into<String>, port: u32) -> Self {
        Self::new(Operation::AddEndpoint, ip, port)
    }

    pub fn delete_endpoint(ip: impl Into<String>, port: u32) -> Self {
        Self::new(Operation::DeleteEndpoint, ip, port)
    }
}

impl From<StreamData> for StreamCommand {
    fn from(data: StreamData) -> Self {
        // A missing endpoint decodes as an empty address, which the
        // endpoint operations then reject.
        let (ip, port) = data
            .endpoint
            .map(|endpoint| (endpoint.ip, endpoint.port))
            .unwrap_or_default();

        Self {
            id: data.id,
            operation: Operation::from(data.operation),
            protocol: Protocol::from(data.protocol),
            enable: data.enable,
            ip,
            port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msm_dp_proto::Endpoint as WireEndpoint;

    #[test]
    fn test_from_stream_data() {
        let data = StreamData {
            id: "stream-1".into(),
            operation: StreamOperation::AddEndpoint as i32,
            protocol: ProxyProtocol::Rtp as i32,
            endpoint: Some(WireEndpoint {
                ip: "10.0.0.9".into(),
                port: 5000,
            }),
            enable: true,
        };

        let cmd = StreamCommand::from(data);
        assert_eq!(cmd.id, "stream-1");
        assert_eq!(cmd.operation, Operation::AddEndpoint);
        assert_eq!(cmd.protocol, Protocol::Rtp);
        assert!(cmd.enable);
        assert_eq!(cmd.ip, "10.0.0.9");
        assert_eq!(cmd.port, 5000);
    }

    #[test]
    fn test_missing_endpoint_is_empty_address() {
        let data = StreamData {
            operation: StreamOperation::DeleteEndpoint as i32,
            ..Default::default()
        };

        let cmd = StreamCommand::from(data);
        assert_eq!(cmd.ip, "");
        assert_eq!(cmd.port, 0);
    }

    #[test]
    fn test_unknown_enum_values_are_kept() {
        let data = StreamData {
            operation: 42,
            protocol: 7,
            ..Default::default()
        };

        let cmd = StreamCommand::from(data);
        assert_eq!(cmd.operation, Operation::Unknown(42));
        assert_eq!(cmd.protocol, Protocol::Unknown(7));
        assert_eq!(cmd.operation.to_string(), "UNKNOWN(42)");
    }
}
