use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

use crate::channel_mapping::ChannelPair;

/// Default request timeout for target platform calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default channel mapping file, relative to the working directory.
pub const DEFAULT_CHANNEL_MAPPING_FILE: &str = "channel_mapping.yaml";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub discord: DiscordConfig,
    pub stoat: StoatConfig,
    pub relay: RelayConfig,
    /// Inline channel pairs, merged with the mapping file.
    pub channels: Vec<ChannelPair>,
}

/// Source platform (Discord) credentials.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token used for the gateway connection.
    pub token: Secret<String>,
    /// User id of the relay bot. Learned from the gateway when unset.
    pub bot_id: Option<String>,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("bot_id", &self.bot_id)
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            bot_id: None,
        }
    }
}

/// Target platform (Stoat) endpoint and credentials.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoatConfig {
    /// Bot token sent as `x-bot-token` on every call.
    pub token: Secret<String>,
    /// Instance root, e.g. `https://stoat.example.com`.
    pub base_url: String,
    /// REST API root. Defaults to `{base_url}/api`.
    pub api_url: Option<String>,
    /// File server root. Defaults to `{base_url}/autumn`.
    pub autumn_url: Option<String>,
    pub request_timeout_secs: u64,
    /// Post mirrored messages under the source author's name and avatar.
    pub masquerade: bool,
}

impl StoatConfig {
    pub fn resolved_api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| format!("{}/api", self.base_url.trim_end_matches('/')))
    }

    pub fn resolved_autumn_url(&self) -> String {
        self.autumn_url
            .clone()
            .unwrap_or_else(|| format!("{}/autumn", self.base_url.trim_end_matches('/')))
    }

    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for StoatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoatConfig")
            .field("token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("api_url", &self.api_url)
            .field("autumn_url", &self.autumn_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("masquerade", &self.masquerade)
            .finish()
    }
}

impl Default for StoatConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            base_url: String::new(),
            api_url: None,
            autumn_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            masquerade: false,
        }
    }
}

/// Relay behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// YAML map of `source_channel_id: target_channel_id`.
    pub channel_mapping_file: PathBuf,
    /// Where attachments are staged between download and upload.
    /// Defaults to the system temp directory.
    pub temp_dir: Option<PathBuf>,
    /// Drop a message mapping even when the target delete call fails.
    pub forget_on_failed_delete: bool,
}

impl RelayConfig {
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_mapping_file: PathBuf::from(DEFAULT_CHANNEL_MAPPING_FILE),
            temp_dir: None,
            forget_on_failed_delete: false,
        }
    }
}

impl DiscordConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoints_from_base_url() {
        let cfg = StoatConfig {
            base_url: "https://stoat.example.com/".into(),
            ..StoatConfig::default()
        };
        assert_eq!(cfg.resolved_api_url(), "https://stoat.example.com/api");
        assert_eq!(cfg.resolved_autumn_url(), "https://stoat.example.com/autumn");
    }

    #[test]
    fn explicit_endpoints_win() {
        let cfg = StoatConfig {
            base_url: "https://stoat.example.com".into(),
            api_url: Some("https://api.example.com".into()),
            autumn_url: Some("https://files.example.com".into()),
            ..StoatConfig::default()
        };
        assert_eq!(cfg.resolved_api_url(), "https://api.example.com");
        assert_eq!(cfg.resolved_autumn_url(), "https://files.example.com");
    }

    #[test]
    fn debug_redacts_tokens() {
        let cfg = StoatConfig {
            token: Secret::new("super-secret".into()),
            ..StoatConfig::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("super-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn defaults() {
        let cfg = MirrorConfig::default();
        assert_eq!(cfg.stoat.request_timeout_secs, 30);
        assert!(!cfg.stoat.masquerade);
        assert!(!cfg.relay.forget_on_failed_delete);
        assert_eq!(
            cfg.relay.channel_mapping_file,
            PathBuf::from("channel_mapping.yaml")
        );
    }
}
