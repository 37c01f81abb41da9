//! Backend (package-management service) error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("package management service is not available")]
    Unavailable,

    #[error("request {request} rejected: {message}")]
    RequestFailed { request: String, message: String },

    #[error("invalid package identifier: {id}")]
    InvalidPackageId { id: String },

    #[error("backend event channel closed")]
    ChannelClosed,

    #[error("failed to write channel source {file}: {message}")]
    SourceWriteFailed { file: String, message: String },

    #[error("invalid host fixture: {message}")]
    InvalidFixture { message: String },
}

impl UserFacingError for BackendError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unavailable => Some("Start the package management service and retry."),
            Self::SourceWriteFailed { .. } => {
                Some("Ensure the repository source directory is writable.")
            }
            Self::InvalidFixture { .. } => Some("Fix the host fixture file and retry."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::RequestFailed { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Unavailable => "backend.unavailable",
            Self::RequestFailed { .. } => "backend.request_failed",
            Self::InvalidPackageId { .. } => "backend.invalid_package_id",
            Self::ChannelClosed => "backend.channel_closed",
            Self::SourceWriteFailed { .. } => "backend.source_write_failed",
            Self::InvalidFixture { .. } => "backend.invalid_fixture",
        };
        Some(code)
    }
}
