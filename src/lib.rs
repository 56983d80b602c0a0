pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod grpc;
pub mod monitor;
pub mod node;
pub mod ring;
pub mod shutdown;
pub mod worker;

// Re-export generated protobuf types
pub mod proto {
    tonic::include_proto!("coordinator");
}

pub use coordinator::Coordinator;
pub use error::{CoordinatorError, Result};
