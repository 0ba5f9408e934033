use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::render::RenderError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// The error message followed by each message in its source chain.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            let message = inner.to_string();
            if messages.last() != Some(&message) {
                messages.push(message);
            }
            current = inner.source();
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn messages_follow_the_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = AppError::from(InfraError::read(PathBuf::from("post.md"), io));
        assert_eq!(
            error.messages(),
            vec!["failed to read `post.md`: gone".to_string(), "gone".to_string()]
        );
    }

    #[test]
    fn render_errors_convert_transparently() {
        let error = AppError::from(RenderError::Theme {
            id: "nope".to_string(),
        });
        assert_eq!(error.to_string(), "unknown theme `nope`");
    }
}
