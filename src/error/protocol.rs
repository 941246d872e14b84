use thiserror::Error;

use super::{decode::PodDecodeError, encode::PodEncodeError, remap::RemapError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Unknown interface {interface:#x} version {version}")]
    UnknownInterface { interface: u32, version: u32 },

    #[error("Unknown opcode {opcode} for interface {interface:#x}")]
    UnknownOpcode { interface: u32, opcode: u8 },

    #[error("Invalid message payload: {0}")]
    InvalidPayload(String),

    #[error("Decode error: {0}")]
    Decode(#[from] PodDecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] PodEncodeError),

    #[error("Remap error: {0}")]
    Remap(#[from] RemapError),
}
