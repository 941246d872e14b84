use thiserror::Error;

use crate::pod::types::PodType;

use super::{decode::PodDecodeError, encode::PodEncodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    #[error("Type table not initialised for this client")]
    Uninitialised,

    #[error("Remap failed for {tag} pod at byte {offset}")]
    RemapFailed { tag: PodType, offset: usize },

    #[error("Decode error: {0}")]
    Decode(#[from] PodDecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] PodEncodeError),
}
