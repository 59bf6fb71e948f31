//! Error kinds surfaced by the mint workflow.
//!
//! Validation failures never reach the network. Upstream failures wrap
//! whatever one of the three external services reported.

use std::fmt;

use thiserror::Error;

pub const MIN_PROMPT_CHARS: usize = 3;
pub const MIN_NAME_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 5;
pub const MIN_RECIPIENT_CHARS: usize = 15;

/// Local input checks. Each variant carries its own user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("input must be minimum {} characters", MIN_PROMPT_CHARS)]
    PromptTooShort,
    #[error("name must be minimum {} characters", MIN_NAME_CHARS)]
    NameTooShort,
    #[error("description must be minimum {} characters", MIN_DESCRIPTION_CHARS)]
    DescriptionTooShort,
    #[error("recipient address must be minimum {} characters", MIN_RECIPIENT_CHARS)]
    RecipientTooShort,
}

/// External collaborator a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Inference,
    Storage,
    Minting,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Inference => "inference",
            Service::Storage => "storage",
            Service::Minting => "minting",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{service} service failed: {message}")]
    Upstream { service: Service, message: String },

    #[error("upload to storage failed; nothing was minted")]
    UploadFailed,

    /// The image arrived but could not be saved locally for preview.
    #[error("could not save preview: {message}")]
    Preview { message: String },

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl WorkflowError {
    pub fn upstream(service: Service, message: impl Into<String>) -> Self {
        WorkflowError::Upstream {
            service,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, WorkflowError::Validation(_))
    }

    /// Upload failures are a special case of an upstream failure.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            WorkflowError::Upstream { .. } | WorkflowError::UploadFailed
        )
    }
}
