//! Error taxonomy for dictionary building, alignment and persistence.
//! Lookup misses are not errors: absent ranks fall back to a penalty and
//! absent frequencies to zero.

pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    /// Invalid measure name or option value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed chunk, dictionary row or token table row.
    #[error("data error{}: {message}", line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Data { line: Option<usize>, message: String },

    /// Lifecycle or structural invariant broken by the caller or by the data.
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("dictionary was loaded without co-occurrence data")]
    MissingCounts,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlignError {
    pub(crate) fn data(message: impl Into<String>) -> Self {
        AlignError::Data { line: None, message: message.into() }
    }

    pub(crate) fn data_at(line: usize, message: impl Into<String>) -> Self {
        AlignError::Data { line: Some(line), message: message.into() }
    }
}
