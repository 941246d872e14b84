use thiserror::Error;

use crate::pod::types::PodType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PodDecodeError {
    #[error("Malformed pod at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: PodType, found: PodType },

    #[error("Depth limit exceeded: {current} > {max}")]
    DepthLimit { current: usize, max: usize },
}

impl PodDecodeError {
    /// Позиция в буфере, если ошибка её несёт.
    pub fn offset(&self) -> Option<usize> {
        match self {
            PodDecodeError::Malformed { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
