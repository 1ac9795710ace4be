//! Error types for form finding

use thiserror::Error;

use crate::run::FrameId;

/// Main error type for evaluation and search operations
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Vertex {0} not found in mesh")]
    VertexNotFound(usize),

    #[error("Edge {0} not found in mesh")]
    EdgeNotFound(usize),

    #[error("Face {0} not found in mesh")]
    FaceNotFound(usize),

    #[error("Frame {0} not found in run")]
    FrameNotFound(FrameId),

    #[error("Chromosome has {actual} genes, shape expects {expected}")]
    ChromosomeLength { expected: usize, actual: usize },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Singular system - model may be unstable or have insufficient supports")]
    SingularMatrix,

    #[error("Model is unstable: {0}")]
    Unstable(String),

    #[error("P-Delta analysis did not converge after {0} iterations")]
    ConvergenceFailed(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Basis individual has not been evaluated")]
    MissingBasis,

    #[error("Basis frame {0} failed: {1}")]
    BasisFailed(FrameId, String),

    #[error("Worker pool failed: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for form finding operations
pub type FormResult<T> = Result<T, FormError>;
