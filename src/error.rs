pub type SlidesmithResult<T> = Result<T, SlidesmithError>;

#[derive(thiserror::Error, Debug)]
pub enum SlidesmithError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("upstream error: {message}")]
    Upstream { message: String, retryable: bool },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidesmithError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn upstream(msg: impl Into<String>, retryable: bool) -> Self {
        Self::Upstream {
            message: msg.into(),
            retryable,
        }
    }

    /// Whether a retry policy may re-attempt the failed operation.
    ///
    /// Input/validation failures are permanent; only upstream failures marked
    /// retryable qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }
}
