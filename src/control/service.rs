use tonic::{Request, Response, Status};

use crate::control::command::StreamCommand;
use crate::control::endpoint::ControlEndpoint;
use crate::msm_dp_proto::msm_data_plane_server::{MsmDataPlane, MsmDataPlaneServer};
use crate::msm_dp_proto::{StreamData, StreamResult};

/// gRPC front of a [`ControlEndpoint`].
///
/// Every request gets an `Ok` response; command failures only show up as
/// `success = false`.
#[derive(Debug, Clone)]
pub struct ControlService {
    control: ControlEndpoint,
}

impl ControlService {
    pub fn new(control: ControlEndpoint) -> Self {
        Self { control }
    }

    pub fn into_server(self) -> MsmDataPlaneServer<Self> {
        MsmDataPlaneServer::new(self)
    }
}

#[tonic::async_trait]
impl MsmDataPlane for ControlService {
    async fn stream_add_del(
        &self,
        request: Request<StreamData>,
    ) -> Result<Response<StreamResult>, Status> {
        let remote = request.remote_addr();
        let cmd = StreamCommand::from(request.into_inner());

        tracing::debug!(remote = ?remote, id = %cmd.id, "StreamAddDel request");

        let success = self.control.handle(&cmd).is_ok();

        Ok(Response::new(StreamResult { success }))
    }
}
