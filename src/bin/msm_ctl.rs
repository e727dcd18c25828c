use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use msm_dataplane::msm_dp_proto::msm_data_plane_client::MsmDataPlaneClient;
use msm_dataplane::msm_dp_proto::{Endpoint, ProxyProtocol, StreamData, StreamOperation};
use uuid::Uuid;

/// Send a single StreamAddDel command to a running data plane.
#[derive(Debug, Parser)]
#[command(name = "msm-ctl")]
struct Args {
    /// Data plane control address
    #[arg(long, env = "MSM_DP_SERVER", default_value = "http://127.0.0.1:9000")]
    server: String,

    #[arg(long, value_enum)]
    operation: OperationArg,

    /// Source ip for `create`, subscriber ip otherwise
    #[arg(long)]
    ip: String,

    #[arg(long, default_value_t = 0)]
    port: u32,

    #[arg(long, value_enum, default_value_t = ProtocolArg::Rtp)]
    protocol: ProtocolArg,

    /// Stream id; a random one is generated when omitted
    #[arg(long)]
    id: Option<String>,

    /// Send enable=false
    #[arg(long)]
    disable: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OperationArg {
    Create,
    Add,
    Delete,
}

impl From<OperationArg> for StreamOperation {
    fn from(op: OperationArg) -> Self {
        match op {
            OperationArg::Create => StreamOperation::Create,
            OperationArg::Add => StreamOperation::AddEndpoint,
            OperationArg::Delete => StreamOperation::DeleteEndpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProtocolArg {
    Tcp,
    Udp,
    Quic,
    Rtp,
}

impl From<ProtocolArg> for ProxyProtocol {
    fn from(protocol: ProtocolArg) -> Self {
        match protocol {
            ProtocolArg::Tcp => ProxyProtocol::Tcp,
            ProtocolArg::Udp => ProxyProtocol::Udp,
            ProtocolArg::Quic => ProxyProtocol::Quic,
            ProtocolArg::Rtp => ProxyProtocol::Rtp,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let id = args.id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut client = MsmDataPlaneClient::connect(args.server.clone())
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    let request = StreamData {
        id: id.clone(),
        operation: StreamOperation::from(args.operation) as i32,
        protocol: ProxyProtocol::from(args.protocol) as i32,
        endpoint: Some(Endpoint {
            ip: args.ip.clone(),
            port: args.port,
        }),
        enable: !args.disable,
    };

    let result = client.stream_add_del(request).await?.into_inner();

    println!(
        "[{id}] {:?} {}:{} -> success={}",
        args.operation, args.ip, args.port, result.success
    );

    if !result.success {
        bail!("data plane rejected the command");
    }
    Ok(())
}
