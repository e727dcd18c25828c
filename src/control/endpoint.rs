use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, warn};
use udp_fanout::{Endpoint, EndpointRegistry};

use crate::control::command::{Operation, StreamCommand};
use crate::control::error::CommandError;
use crate::source::SourceResolver;

/// What a successful command changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    SourceSet { source: String },
    EndpointAdded(Endpoint),
    /// Duplicate add; the registry was left as is.
    AlreadyRegistered(Endpoint),
    EndpointRemoved(Endpoint),
}

pub type CommandResult = Result<CommandOutcome, CommandError>;

/// Applies control-plane commands to the endpoint registry and the source
/// resolver. A failing command only affects its own result.
#[derive(Debug, Clone)]
pub struct ControlEndpoint {
    registry: Arc<EndpointRegistry>,
    source: Arc<SourceResolver>,
    local_address: Option<IpAddr>,
}

impl ControlEndpoint {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        source: Arc<SourceResolver>,
        local_address: Option<IpAddr>,
    ) -> Self {
        Self {
            registry,
            source,
            local_address,
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn source(&self) -> &Arc<SourceResolver> {
        &self.source
    }

    pub fn handle(&self, cmd: &StreamCommand) -> CommandResult {
        info!(
            id = %cmd.id,
            operation = %cmd.operation,
            protocol = %cmd.protocol,
            enable = cmd.enable,
            ip = %cmd.ip,
            port = cmd.port,
            "Received stream command"
        );

        let result = match cmd.operation {
            Operation::Create => Ok(self.create(cmd)),
            Operation::AddEndpoint => self.add_endpoint(cmd),
            Operation::DeleteEndpoint => self.delete_endpoint(cmd),
            Operation::Unknown(value) => Err(CommandError::UnknownOperation(value)),
        };

        match &result {
            Ok(outcome) => debug!(
                id = %cmd.id,
                outcome = ?outcome,
                endpoints = %self.registry.snapshot(),
                "Stream command applied"
            ),
            Err(e) => warn!(
                id = %cmd.id,
                operation = %cmd.operation,
                error = %e,
                "Stream command failed"
            ),
        }

        result
    }

    fn create(&self, cmd: &StreamCommand) -> CommandOutcome {
        let previous = self.source.set_source(cmd.ip.clone());
        if let Some(previous) = previous.filter(|p| *p != cmd.ip) {
            info!(previous = %previous, source = %cmd.ip, "Replacing stream source");
        }
        info!(source = %cmd.ip, local = ?self.local_address, "Stream source set");

        CommandOutcome::SourceSet {
            source: cmd.ip.clone(),
        }
    }

    fn add_endpoint(&self, cmd: &StreamCommand) -> CommandResult {
        let endpoint = parse_endpoint(cmd)?;

        if self.registry.add(endpoint) {
            info!(endpoint = %endpoint, "Endpoint added");
            Ok(CommandOutcome::EndpointAdded(endpoint))
        } else {
            debug!(endpoint = %endpoint, "Endpoint already registered");
            Ok(CommandOutcome::AlreadyRegistered(endpoint))
        }
    }

    fn delete_endpoint(&self, cmd: &StreamCommand) -> CommandResult {
        let endpoint = parse_endpoint(cmd)?;

        if self.registry.remove(&endpoint) {
            info!(endpoint = %endpoint, "Endpoint deleted");
            Ok(CommandOutcome::EndpointRemoved(endpoint))
        } else {
            Err(CommandError::EndpointNotFound(endpoint))
        }
    }
}

fn parse_endpoint(cmd: &StreamCommand) -> Result<Endpoint, CommandError> {
    Endpoint::parse(&cmd.ip, cmd.port).map_err(|source| CommandError::InvalidAddress {
        ip: cmd.ip.clone(),
        port: cmd.port,
        source,
    })
}
