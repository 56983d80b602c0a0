pub mod coordinator_service;
pub mod server;

pub use coordinator_service::CoordinatorServiceImpl;
pub use server::GrpcServer;
