use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("No empty slot left in the ring")]
    NoCapacity,

    #[error("Slot {0} is not bound to a worker")]
    UnknownSlot(u32),

    #[error("No eligible slot available to accept jobs")]
    NoEligibleSlot,

    #[error("Worker address must not be empty")]
    InvalidAddress,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("gRPC error: {0}")]
    GrpcError(#[from] tonic::Status),

    #[error("Transport error: {0}")]
    TransportError(#[from] tonic::transport::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoordinatorError> for tonic::Status {
    fn from(err: CoordinatorError) -> Self {
        let message = err.to_string();
        match err {
            CoordinatorError::NoCapacity => tonic::Status::resource_exhausted(message),
            CoordinatorError::UnknownSlot(_) => tonic::Status::not_found(message),
            CoordinatorError::NoEligibleSlot => tonic::Status::unavailable(message),
            CoordinatorError::InvalidAddress | CoordinatorError::InvalidConfig(_) => {
                tonic::Status::invalid_argument(message)
            }
            CoordinatorError::GrpcError(status) => status,
            CoordinatorError::TransportError(_) | CoordinatorError::Internal(_) => {
                tonic::Status::internal(message)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn ring_errors_map_to_status_codes() {
        assert_eq!(
            tonic::Status::from(CoordinatorError::NoCapacity).code(),
            Code::ResourceExhausted
        );
        assert_eq!(
            tonic::Status::from(CoordinatorError::UnknownSlot(3)).code(),
            Code::NotFound
        );
        assert_eq!(
            tonic::Status::from(CoordinatorError::NoEligibleSlot).code(),
            Code::Unavailable
        );
        assert_eq!(
            tonic::Status::from(CoordinatorError::InvalidAddress).code(),
            Code::InvalidArgument
        );
    }

    #[test]
    fn unknown_slot_message_names_the_slot() {
        let status = tonic::Status::from(CoordinatorError::UnknownSlot(7));
        assert!(status.message().contains('7'));
    }
}
