//! Re-hosts source attachments on the target platform.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    tempfile::NamedTempFile,
    tracing::{debug, warn},
};

use crate::{
    Result,
    event::AttachmentRef,
    platform::{AttachmentSource, TargetAttachmentHandle, TargetPlatform},
};

/// Downloads each attachment to a scratch file and uploads it to the target.
pub struct AttachmentPipeline {
    source: Arc<dyn AttachmentSource>,
    target: Arc<dyn TargetPlatform>,
    scratch_dir: PathBuf,
}

impl AttachmentPipeline {
    pub fn new(
        source: Arc<dyn AttachmentSource>,
        target: Arc<dyn TargetPlatform>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            target,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Relay attachments in order, returning handles for those that made it.
    ///
    /// A failed attachment is logged and skipped; it never aborts the rest.
    pub async fn relay_attachments(
        &self,
        attachments: &[AttachmentRef],
    ) -> Vec<TargetAttachmentHandle> {
        let mut handles = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            match self.relay_one(attachment).await {
                Ok(handle) => {
                    debug!(
                        attachment_id = %attachment.id,
                        handle = %handle,
                        "attachment relayed"
                    );
                    handles.push(handle);
                },
                Err(e) => {
                    warn!(
                        attachment_id = %attachment.id,
                        filename = %attachment.filename,
                        error = %e,
                        "skipping attachment"
                    );
                },
            }
        }
        handles
    }

    async fn relay_one(&self, attachment: &AttachmentRef) -> Result<TargetAttachmentHandle> {
        // Removed from disk when dropped, whichever way this function exits.
        let scratch = self.scratch_file(attachment)?;
        self.source.fetch(attachment, scratch.path()).await?;
        let handle = self
            .target
            .upload_attachment(&attachment.filename, scratch.path())
            .await?;
        if let Err(e) = scratch.close() {
            warn!(attachment_id = %attachment.id, error = %e, "failed to remove scratch file");
        }
        Ok(handle)
    }

    fn scratch_file(&self, attachment: &AttachmentRef) -> Result<NamedTempFile> {
        let prefix = format!("temp_{}_", sanitize(&attachment.id));
        let suffix = Path::new(&attachment.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", sanitize(ext)))
            .unwrap_or_default();
        Ok(tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?)
    }
}

/// Keep only characters that are safe in a file name on every platform.
fn sanitize(part: &str) -> String {
    part.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(64)
        .collect()
}
