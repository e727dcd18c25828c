pub mod config;
pub mod control;
pub mod dataplane;
pub mod discovery;
pub mod source;
pub mod telemetry;

pub mod msm_dp_proto {
    include!(concat!(env!("OUT_DIR"), "/msm_dp.rs"));
}

pub use udp_fanout::{Channel, Endpoint, EndpointRegistry};
