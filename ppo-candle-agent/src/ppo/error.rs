use thiserror::Error;

/// Precondition violations of the learner and its trajectory buffer.
#[derive(Debug, Error, PartialEq)]
pub enum PpoError {
    /// The trajectory buffer holds no transition.
    #[error("The trajectory buffer is empty")]
    EmptyBuffer,

    /// The last transition of the buffer has no next state to bootstrap from.
    #[error("The last transition has no next state")]
    MissingNextState,

    /// Transitions in the buffer do not share the same layout.
    #[error("Inconsistent transitions: {0}")]
    InconsistentSchema(String),

    /// A field required by a loss is not present in the batch.
    #[error("Missing field in batch: {0}")]
    MissingField(&'static str),

    /// Pushing into a buffer that reached its capacity.
    #[error("The trajectory buffer is full (capacity {0})")]
    BufferFull(usize),
}
