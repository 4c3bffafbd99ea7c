//! Configuration validation.
//!
//! Checks a loaded configuration and its channel pairs before the relay
//! starts, reporting every problem at once instead of failing on the first.

use std::{collections::HashSet, path::PathBuf};

use secrecy::ExposeSecret;

use crate::{channel_mapping::ChannelPair, schema::MirrorConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "invalid-url", "env-var", "duplicate-channel",
    /// "security", "channels"
    pub category: &'static str,
    /// Dotted path, e.g. "stoat.base_url"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.severity, self.category, self.path, self.message
        )
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate `config` together with the channel pairs it resolves to.
pub fn validate(
    config: &MirrorConfig,
    pairs: &[ChannelPair],
    config_path: Option<PathBuf>,
) -> ValidationResult {
    let mut result = ValidationResult {
        diagnostics: Vec::new(),
        config_path,
    };

    check_secret(&mut result, "discord.token", config.discord.token.expose_secret(), "DISCORD_TOKEN");
    check_secret(&mut result, "stoat.token", config.stoat.token.expose_secret(), "STOAT_BOT_TOKEN");

    match config.discord.bot_id.as_deref() {
        None => result.push(
            Severity::Info,
            "missing",
            "discord.bot_id",
            "not set; the relay learns its own id from the gateway",
        ),
        Some(id) if id.parse::<u64>().is_err() => result.push(
            Severity::Error,
            "missing",
            "discord.bot_id",
            format!("'{id}' is not a numeric user id"),
        ),
        Some(_) => {},
    }

    if config.stoat.base_url.trim().is_empty()
        && (config.stoat.api_url.is_none() || config.stoat.autumn_url.is_none())
    {
        result.push(
            Severity::Error,
            "missing",
            "stoat.base_url",
            "required (or set both stoat.api_url and stoat.autumn_url); env: STOAT_BASE_URL",
        );
    } else {
        check_url(&mut result, "stoat.api_url", &config.stoat.resolved_api_url());
        check_url(&mut result, "stoat.autumn_url", &config.stoat.resolved_autumn_url());
    }

    if config.stoat.request_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "missing",
            "stoat.request_timeout_secs",
            "must be greater than zero",
        );
    }

    if let Some(dir) = &config.relay.temp_dir
        && !dir.is_dir()
    {
        result.push(
            Severity::Warning,
            "missing",
            "relay.temp_dir",
            format!("{} does not exist; attachments will be skipped", dir.display()),
        );
    }

    if config.relay.forget_on_failed_delete {
        result.push(
            Severity::Info,
            "channels",
            "relay.forget_on_failed_delete",
            "failed target deletes drop the mapping and may orphan mirrored messages",
        );
    }

    let mut seen = HashSet::new();
    for pair in pairs {
        if !seen.insert(pair.source.as_str()) {
            result.push(
                Severity::Error,
                "duplicate-channel",
                "channels",
                format!("source channel {} is mapped more than once", pair.source),
            );
        }
    }
    if pairs.is_empty() {
        result.push(
            Severity::Warning,
            "channels",
            "channels",
            format!(
                "no channels mapped; add pairs to {} or [[channels]]",
                config.relay.channel_mapping_file.display()
            ),
        );
    }

    result
}

fn check_secret(result: &mut ValidationResult, path: &str, value: &str, env: &str) {
    if value.trim().is_empty() {
        result.push(
            Severity::Error,
            "missing",
            path,
            format!("required; env: {env}"),
        );
    } else if value.contains("${") {
        result.push(
            Severity::Error,
            "env-var",
            path,
            "contains an unresolved ${...} placeholder",
        );
    }
}

fn check_url(result: &mut ValidationResult, path: &str, value: &str) {
    if value.contains("${") {
        result.push(
            Severity::Error,
            "env-var",
            path,
            "contains an unresolved ${...} placeholder",
        );
        return;
    }
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "https" => {},
        Ok(url) if url.scheme() == "http" => result.push(
            Severity::Warning,
            "security",
            path,
            "plain http sends the bot token unencrypted",
        ),
        Ok(url) => result.push(
            Severity::Error,
            "invalid-url",
            path,
            format!("unsupported scheme '{}'", url.scheme()),
        ),
        Err(e) => result.push(
            Severity::Error,
            "invalid-url",
            path,
            format!("'{value}' is not a valid URL: {e}"),
        ),
    }
}
