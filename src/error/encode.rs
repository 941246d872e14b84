use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PodEncodeError {
    #[error("Buffer overflow: {required} bytes required")]
    Overflow { required: usize },

    #[error("Invalid builder shape: {0}")]
    Shape(String),
}
