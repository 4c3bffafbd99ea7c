use std::{path::Path, time::Duration};

use {
    async_trait::async_trait,
    reqwest::{
        Client, Response,
        multipart::{Form, Part},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::debug,
};

use {
    stoatmirror_config::StoatConfig,
    stoatmirror_relay::{Error, OutboundMessage, Result, TargetAttachmentHandle, TargetPlatform},
};

/// Header carrying the bot token on every Stoat call.
pub const BOT_TOKEN_HEADER: &str = "x-bot-token";

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    #[serde(rename = "_id")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    id: Option<String>,
}

/// REST client for one Stoat instance.
#[derive(Clone)]
pub struct StoatClient {
    http: Client,
    api_url: String,
    autumn_url: String,
    token: Secret<String>,
}

impl std::fmt::Debug for StoatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoatClient")
            .field("api_url", &self.api_url)
            .field("autumn_url", &self.autumn_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StoatClient {
    /// Build a client from config, applying the request timeout to every call.
    pub fn from_config(config: &StoatConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::external("failed to build http client", e))?;
        Ok(Self::with_client(
            http,
            config.resolved_api_url(),
            config.resolved_autumn_url(),
            config.token.clone(),
        ))
    }

    pub fn with_client(
        http: Client,
        api_url: impl Into<String>,
        autumn_url: impl Into<String>,
        token: Secret<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            autumn_url: autumn_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn message_url(&self, channel_id: &str, message_id: Option<&str>) -> String {
        let mut url = format!(
            "{}/channels/{}/messages",
            self.api_url,
            urlencoding::encode(channel_id)
        );
        if let Some(message_id) = message_id {
            url.push('/');
            url.push_str(&urlencoding::encode(message_id));
        }
        url
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response> {
        let resp = request
            .header(BOT_TOKEN_HEADER, self.token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::external(operation, e))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(Error::rejected(operation, status, body))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        resp: Response,
    ) -> Result<T> {
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::external(operation, e))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::malformed(operation, e))
    }
}

#[async_trait]
impl TargetPlatform for StoatClient {
    async fn create_message(&self, channel_id: &str, message: &OutboundMessage) -> Result<String> {
        const OP: &str = "create message";
        let resp = self
            .send(OP, self.http.post(self.message_url(channel_id, None)).json(message))
            .await?;
        let created: CreatedMessage = Self::read_json(OP, resp).await?;
        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::malformed(OP, "no message id returned"))?;
        debug!(channel_id, message_id = %id, "stoat message created");
        Ok(id)
    }

    async fn edit_message(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        let body = serde_json::json!({ "content": content });
        self.send(
            "edit message",
            self.http
                .patch(self.message_url(channel_id, Some(message_id)))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.send(
            "delete message",
            self.http
                .delete(self.message_url(channel_id, Some(message_id))),
        )
        .await?;
        Ok(())
    }

    async fn upload_attachment(
        &self,
        filename: &str,
        path: &Path,
    ) -> Result<TargetAttachmentHandle> {
        const OP: &str = "upload attachment";
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::attachment_upload(filename, format!("scratch file unreadable: {e}")))?;
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| Error::external(OP, e))?;
        let form = Form::new().part("file", part);

        let resp = self
            .send(
                OP,
                self.http
                    .post(format!("{}/attachments", self.autumn_url))
                    .multipart(form),
            )
            .await?;
        let uploaded: UploadedFile = Self::read_json(OP, resp).await?;
        let id = uploaded
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::malformed(OP, "no file id returned"))?;
        debug!(filename, file_id = %id, "attachment uploaded to autumn");
        Ok(TargetAttachmentHandle::new(id))
    }
}
