use thiserror::Error;

use super::{decode::PodDecodeError, encode::PodEncodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("No intersection between property choices")]
    NoIntersection,

    #[error("Object types differ: {a:#x} vs {b:#x}")]
    ObjectMismatch { a: u32, b: u32 },

    #[error("Decode error: {0}")]
    Decode(#[from] PodDecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] PodEncodeError),
}
