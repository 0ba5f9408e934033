use thiserror::Error;

/// Fatal failures of a single inline conversion. No partial HTML is produced
/// once one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InlineError {
    #[error("stylesheet parse error at {line}:{column}: {message}")]
    Stylesheet {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("equation container has no inner svg graphic")]
    MissingEquationGraphic,
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

impl InlineError {
    pub(crate) fn stylesheet(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::Stylesheet {
            line,
            column,
            message: message.into(),
        }
    }
}
