use thiserror::Error;
use udp_fanout::{AddressError, Endpoint};

/// Reasons a control command is reported as unsuccessful.
///
/// These never reach the caller beyond `success = false`; they exist for
/// operator logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    #[error("invalid endpoint address '{ip}:{port}': {source}")]
    InvalidAddress {
        ip: String,
        port: u32,
        #[source]
        source: AddressError,
    },

    #[error("endpoint {0} is not registered")]
    EndpointNotFound(Endpoint),

    #[error("unknown stream operation {0}")]
    UnknownOperation(i32),
}
