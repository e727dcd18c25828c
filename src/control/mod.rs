//! Control-plane command handling.
//!
//! [`ControlEndpoint`] applies membership and source commands to the shared
//! state; [`ControlService`] exposes it as the `MsmDataPlane` gRPC service.

mod command;
mod endpoint;
mod error;
mod service;

pub use command::{Operation, Protocol, StreamCommand};
pub use endpoint::{CommandOutcome, CommandResult, ControlEndpoint};
pub use error::CommandError;
pub use service::ControlService;
