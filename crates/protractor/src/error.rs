use strum::Display;
use thiserror::Error;

/// Pipeline stage that ran out of vertices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum VertexStage {
    Simplification,
    VertexFilter,
}

#[derive(Error, Debug)]
pub enum AngleError {
    #[error("No contours traced from the edge map")]
    EmptyContourSet,

    #[error("Only {count} vertices left after {stage}, at least 3 are required")]
    InsufficientVertices { stage: VertexStage, count: usize },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AngleError {
    /// Faults are unexpected failures; everything else is an ordinary "no angle in this frame".
    pub fn is_fault(&self) -> bool {
        !matches!(
            self,
            AngleError::EmptyContourSet | AngleError::InsufficientVertices { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AngleError>;
