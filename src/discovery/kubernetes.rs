use std::net::IpAddr;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{DiscoveryError, LocalAddressProvider};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Finds the data plane's address by listing pods through the in-cluster
/// Kubernetes API and picking the one whose name contains a pattern.
#[derive(Debug)]
pub struct KubernetesPods {
    client: reqwest::Client,
    api_base: String,
    token: String,
    namespace: String,
    name_pattern: String,
}

impl KubernetesPods {
    /// Build a provider from the pod's service account and the
    /// `KUBERNETES_SERVICE_HOST` / `KUBERNETES_SERVICE_PORT` variables.
    pub async fn in_cluster(
        namespace: impl Into<String>,
        name_pattern: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| DiscoveryError::MissingEnv("KUBERNETES_SERVICE_HOST"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| DiscoveryError::MissingEnv("KUBERNETES_SERVICE_PORT"))?;

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = read_service_account(&dir.join("token")).await?;
        let ca = read_service_account(&dir.join("ca.crt")).await?;

        let client = reqwest::Client::builder()
            .add_root_certificate(reqwest::Certificate::from_pem(ca.as_bytes())?)
            .build()?;

        let api_base = if host.contains(':') {
            format!("https://[{host}]:{port}")
        } else {
            format!("https://{host}:{port}")
        };

        Ok(Self {
            client,
            api_base,
            token: token.trim().to_owned(),
            namespace: namespace.into(),
            name_pattern: name_pattern.into(),
        })
    }

    async fn list_pods(&self) -> Result<PodList, DiscoveryError> {
        let url = format!("{}/api/v1/namespaces/{}/pods", self.api_base, self.namespace);
        debug!(url = %url, "Listing pods");

        let pods = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<PodList>()
            .await?;
        Ok(pods)
    }
}

impl LocalAddressProvider for KubernetesPods {
    async fn local_address(&self) -> Result<Option<IpAddr>, DiscoveryError> {
        let pods = self.list_pods().await?;

        let ip = select_pod_ip(&pods, &self.name_pattern).ok_or_else(|| {
            DiscoveryError::NoMatchingPod {
                namespace: self.namespace.clone(),
                pattern: self.name_pattern.clone(),
            }
        })?;

        info!(
            namespace = %self.namespace,
            pattern = %self.name_pattern,
            ip = %ip,
            "Discovered local pod address"
        );
        Ok(Some(ip))
    }
}

async fn read_service_account(path: &Path) -> Result<String, DiscoveryError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DiscoveryError::ReadServiceAccount {
            path: path.to_path_buf(),
            source,
        })
}

/// Subset of a Kubernetes `PodList` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pub items: Vec<Pod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: PodMetadata,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStatus {
    #[serde(rename = "podIP", default)]
    pub pod_ip: Option<String>,
}

/// IP of the last listed pod whose name contains `pattern`. Pods without
/// an assigned (or parseable) IP are skipped.
pub fn select_pod_ip(pods: &PodList, pattern: &str) -> Option<IpAddr> {
    pods.items
        .iter()
        .filter(|pod| pod.metadata.name.contains(pattern))
        .filter_map(|pod| pod.status.pod_ip.as_deref()?.parse().ok())
        .next_back()
}
