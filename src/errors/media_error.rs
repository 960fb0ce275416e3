use crate::core::provider::ProviderError;

/// Caller-facing error type for the media pipeline.
///
/// Individual provider failures never surface here directly: the dispatcher
/// absorbs them until the whole chain is exhausted, at which point the caller
/// receives one `AllProvidersFailed` naming every adapter tried and wrapping
/// the terminal cause.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Every adapter in the chain failed across all retry attempts.
    #[error("all providers failed (attempted: {attempted:?}): {last}")]
    AllProvidersFailed {
        /// Names of the adapters tried, in chain order.
        attempted: Vec<String>,
        /// The last provider error observed before giving up.
        #[source]
        last: ProviderError,
    },

    /// Audio chunks disagreed on container parameters; merging them would
    /// produce silently corrupt output, so the merge is rejected.
    #[error("inconsistent audio parameters: {0}")]
    Consistency(String),

    /// A backend could not be constructed from the supplied configuration.
    #[error("provider configuration failed: {0}")]
    Configuration(#[from] ProviderError),

    /// The reading plan carried no segment with synthesizable text.
    #[error("reading plan has no synthesizable segments")]
    EmptyPlan,

    /// The caller supplied input the pipeline cannot act on (empty chunk
    /// list, empty paragraph text, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for media pipeline operations.
pub type MediaResult<T> = Result<T, MediaError>;
