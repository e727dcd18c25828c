//! Fan-out of UDP datagrams from one bound socket to a dynamic set of
//! subscriber endpoints.
//!
//! The [`EndpointRegistry`] is the shared membership set. Every
//! [`Forwarder`] reads it through lock-free [`Snapshot`]s, so control-plane
//! mutations never stall the receive loop.

pub mod endpoint;
pub mod error;
pub mod forwarder;
pub mod registry;

pub use endpoint::Endpoint;
pub use error::{AddressError, FanoutError};
pub use forwarder::{Channel, Forwarder, ForwarderStats, MAX_DATAGRAM_SIZE, StatsSnapshot};
pub use registry::{EndpointRegistry, Snapshot};
