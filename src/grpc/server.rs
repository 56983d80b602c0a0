use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::coordinator::Coordinator;
use crate::grpc::coordinator_service::CoordinatorServiceImpl;
use crate::proto::coordinator_service_server::CoordinatorServiceServer;

pub struct GrpcServer {
    addr: SocketAddr,
    coordinator: Coordinator,
}

impl GrpcServer {
    pub fn new(addr: SocketAddr, coordinator: Coordinator) -> Self {
        Self { addr, coordinator }
    }

    /// Serve on the configured address until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), tonic::transport::Error> {
        tracing::info!(addr = %self.addr, "Starting gRPC server");

        Server::builder()
            .add_service(CoordinatorServiceServer::new(CoordinatorServiceImpl::new(
                self.coordinator,
            )))
            .serve_with_shutdown(self.addr, shutdown.cancelled_owned())
            .await
    }

    /// Serve on an already-bound listener (used when the port is chosen by the OS).
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), tonic::transport::Error> {
        tracing::info!(addr = ?listener.local_addr().ok(), "Starting gRPC server");

        Server::builder()
            .add_service(CoordinatorServiceServer::new(CoordinatorServiceImpl::new(
                self.coordinator,
            )))
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                shutdown.cancelled_owned(),
            )
            .await
    }
}
