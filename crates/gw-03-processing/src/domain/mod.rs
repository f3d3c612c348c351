//! Domain layer for request tracking.

pub mod errors;
pub mod request;

pub use errors::ProcessingError;
pub use request::{
    LegKind, LegState, ProcessingLeg, ProcessingRequest, RequestId, RequestStatus,
};
