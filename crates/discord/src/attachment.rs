//! Downloads Discord attachments from the CDN.

use std::path::Path;

use {
    async_trait::async_trait,
    futures::StreamExt,
    reqwest::Client,
    tokio::io::AsyncWriteExt,
    tracing::debug,
};

use stoatmirror_relay::{AttachmentRef, AttachmentSource, Error, Result};

/// Fetches attachment bytes over plain HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpAttachmentFetcher {
    http: Client,
}

impl HttpAttachmentFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AttachmentSource for HttpAttachmentFetcher {
    async fn fetch(&self, attachment: &AttachmentRef, dest: &Path) -> Result<()> {
        let resp = self
            .http
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| Error::attachment_fetch(&attachment.id, e))?;
        if !resp.status().is_success() {
            return Err(Error::attachment_fetch(
                &attachment.id,
                format!("HTTP {}", resp.status()),
            ));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::attachment_fetch(&attachment.id, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(
            attachment_id = %attachment.id,
            bytes = written,
            "attachment downloaded"
        );
        Ok(())
    }
}
