use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};

use crate::discovery::{Discovery, KubernetesPods, NoDiscovery, StaticAddress};

/// Command-line and environment configuration of the data plane.
#[derive(Debug, Clone, Parser)]
#[command(name = "msm-dp")]
#[command(about = "Media streaming mesh data plane: RTP/RTCP fan-out relay", long_about = None)]
pub struct Config {
    /// Port the control-plane gRPC service listens on
    #[arg(long, env = "MSM_DP_PORT", default_value_t = 9000)]
    pub port: u16,

    /// RTP port; RTCP is relayed on the next port up
    #[arg(long, env = "MSM_DP_RTP_PORT", default_value_t = 8050)]
    pub rtp_port: u16,

    /// How to learn this data plane's own address
    #[arg(long, env = "MSM_DP_DISCOVERY", value_enum, default_value_t = DiscoveryMode::None)]
    pub discovery: DiscoveryMode,

    /// Local address used by `--discovery static`
    #[arg(long, env = "MSM_DP_LOCAL_IP")]
    pub local_ip: Option<IpAddr>,

    /// Namespace searched by `--discovery kubernetes`
    #[arg(long, env = "MSM_DP_POD_NAMESPACE", default_value = "default")]
    pub pod_namespace: String,

    /// Pod name substring matched by `--discovery kubernetes`
    #[arg(long, env = "MSM_DP_POD_NAME_PATTERN", default_value = "proxy")]
    pub pod_name_pattern: String,

    /// Log output format
    #[arg(long, env = "MSM_DP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryMode {
    None,
    Static,
    Kubernetes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9000,
            rtp_port: 8050,
            discovery: DiscoveryMode::None,
            local_ip: None,
            pod_namespace: "default".to_string(),
            pod_name_pattern: "proxy".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Reject combinations that cannot work before anything is bound.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rtp_port == u16::MAX {
            bail!("rtp port {} leaves no room for the RTCP port", self.rtp_port);
        }
        if self.discovery == DiscoveryMode::Static && self.local_ip.is_none() {
            bail!("--discovery static requires --local-ip");
        }
        Ok(())
    }

    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }

    pub fn media_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.rtp_port)
    }

    /// Companion RTCP address. Only meaningful after [`Config::validate`].
    pub fn feedback_addr(&self) -> SocketAddr {
        SocketAddr::new(
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            self.rtp_port.saturating_add(1),
        )
    }

    pub async fn discovery(&self) -> anyhow::Result<Discovery> {
        Ok(match self.discovery {
            DiscoveryMode::None => Discovery::None(NoDiscovery),
            DiscoveryMode::Static => {
                let ip = self
                    .local_ip
                    .context("--discovery static requires --local-ip")?;
                Discovery::Static(StaticAddress(ip))
            }
            DiscoveryMode::Kubernetes => Discovery::Kubernetes(
                KubernetesPods::in_cluster(&self.pod_namespace, &self.pod_name_pattern)
                    .await
                    .context("failed to set up kubernetes pod discovery")?,
            ),
        })
    }
}
