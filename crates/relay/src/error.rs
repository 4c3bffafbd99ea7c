use std::error::Error as StdError;

/// Crate-wide result type for relay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed relay errors shared by the engine and the platform adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid relay input: {message}")]
    InvalidInput { message: String },

    /// The same source channel was mapped twice.
    #[error("source channel {source_channel_id} is mapped more than once")]
    DuplicateChannel { source_channel_id: String },

    /// Attachment bytes could not be retrieved from the source platform.
    #[error("failed to fetch attachment {attachment_id}: {message}")]
    AttachmentFetch {
        attachment_id: String,
        message: String,
    },

    /// The target platform refused or failed an attachment upload.
    #[error("failed to upload attachment {filename}: {message}")]
    AttachmentUpload { filename: String, message: String },

    /// The target platform answered with a non-success status.
    #[error("{operation} rejected ({status}): {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The target platform answered with success but an unusable body.
    #[error("{operation} returned a malformed response: {message}")]
    MalformedResponse {
        operation: &'static str,
        message: String,
    },

    /// Wrapped source error from an external dependency.
    #[error("relay operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Local filesystem failure (transient attachment storage).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn attachment_fetch(
        attachment_id: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::AttachmentFetch {
            attachment_id: attachment_id.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn attachment_upload(filename: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::AttachmentUpload {
            filename: filename.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn rejected(operation: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn malformed(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            operation,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status carried by a rejected target call, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
