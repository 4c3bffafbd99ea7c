use std::path::Path;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::{Result, event::AttachmentRef};

/// Opaque attachment id returned by the target platform's upload endpoint.
///
/// Only meaningful as input to a subsequent message create.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetAttachmentHandle(String);

impl TargetAttachmentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetAttachmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display override so a mirrored message shows the original author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Masquerade {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Body of a target create-message call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub content: String,
    pub attachments: Vec<TargetAttachmentHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masquerade: Option<Masquerade>,
}

/// Calls the relay makes against the target platform.
///
/// Every method is a suspension point; implementations own transport,
/// authentication and timeouts.
#[async_trait]
pub trait TargetPlatform: Send + Sync {
    /// Post a message and return the id the target assigned to it.
    async fn create_message(&self, channel_id: &str, message: &OutboundMessage) -> Result<String>;

    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Upload the file at `path` to the target blob store.
    async fn upload_attachment(&self, filename: &str, path: &Path)
    -> Result<TargetAttachmentHandle>;
}

/// Retrieves attachment bytes from the source platform.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Write the attachment's bytes to `dest`, replacing its contents.
    async fn fetch(&self, attachment: &AttachmentRef, dest: &Path) -> Result<()>;
}
