use thiserror::Error;

/// Error types for skeleton loading and pose evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// The skeleton references more bones than an 8-bit vertex attribute can address
    #[error("Too many bones: {count} exceeds the limit of {limit}")]
    TooManyBones { count: usize, limit: usize },

    /// The raw joint list does not describe a single rooted tree
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A clip duration of zero, negative or non-finite length
    #[error("Invalid clip duration {duration} in clip '{clip}'")]
    InvalidDuration { clip: String, duration: f64 },

    /// Output buffer is not sized to the skeleton's bone count
    #[error("Bone transform buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Clip was built against a skeleton with a different joint count
    #[error("Clip '{clip}' has {actual} channels but the skeleton has {expected} joints")]
    ChannelCountMismatch {
        clip: String,
        expected: usize,
        actual: usize,
    },

    /// Requested reference bone is missing or carries no bone index
    #[error("Unknown reference bone: {0}")]
    UnknownReferenceBone(String),

    /// Bone index outside `0..bone_count`
    #[error("Bone index {index} out of range (bone count {count})")]
    BoneIndexOutOfRange { index: usize, count: usize },

    /// Spring parameters that cannot be integrated
    #[error("Invalid spring configuration: {0}")]
    InvalidSpringConfig(String),

    /// Lookup of a clip that is not registered
    #[error("Clip not found: {0}")]
    ClipNotFound(String),
}

/// Result type using AnimationError
pub type Result<T> = std::result::Result<T, AnimationError>;
