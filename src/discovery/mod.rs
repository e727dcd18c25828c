//! Learning the address this data plane is reachable at.
//!
//! The address is resolved once at startup and only used for bookkeeping;
//! forwarding works without it.

mod kubernetes;

use std::future::Future;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

pub use kubernetes::{KubernetesPods, Pod, PodList, PodMetadata, PodStatus, select_pod_ip};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("failed to read service account file {path}")]
    ReadServiceAccount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kubernetes API request failed")]
    Http(#[from] reqwest::Error),

    #[error("no running pod in namespace '{namespace}' matches '{pattern}'")]
    NoMatchingPod { namespace: String, pattern: String },
}

/// Source of the data plane's own address.
pub trait LocalAddressProvider {
    fn local_address(&self) -> impl Future<Output = Result<Option<IpAddr>, DiscoveryError>> + Send;
}

/// Does not look anything up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

impl LocalAddressProvider for NoDiscovery {
    async fn local_address(&self) -> Result<Option<IpAddr>, DiscoveryError> {
        Ok(None)
    }
}

/// An address fixed by configuration.
#[derive(Debug, Clone, Copy)]
pub struct StaticAddress(pub IpAddr);

impl LocalAddressProvider for StaticAddress {
    async fn local_address(&self) -> Result<Option<IpAddr>, DiscoveryError> {
        Ok(Some(self.0))
    }
}

/// Provider chosen by configuration.
#[derive(Debug)]
pub enum Discovery {
    None(NoDiscovery),
    Static(StaticAddress),
    Kubernetes(KubernetesPods),
}

impl LocalAddressProvider for Discovery {
    async fn local_address(&self) -> Result<Option<IpAddr>, DiscoveryError> {
        match self {
            Discovery::None(p) => p.local_address().await,
            Discovery::Static(p) => p.local_address().await,
            Discovery::Kubernetes(p) => p.local_address().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_and_none_providers() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();

        let provider = Discovery::Static(StaticAddress(ip));
        assert_eq!(provider.local_address().await.unwrap(), Some(ip));

        let provider = Discovery::None(NoDiscovery);
        assert_eq!(provider.local_address().await.unwrap(), None);
    }
}
