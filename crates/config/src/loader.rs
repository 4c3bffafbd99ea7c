use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    secrecy::Secret,
    tracing::debug,
};

use crate::{env_subst::substitute_env, schema::MirrorConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stoatmirror.toml",
    "stoatmirror.yaml",
    "stoatmirror.yml",
    "stoatmirror.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MirrorConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("failed to parse {}", path.display()))
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./stoatmirror.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stoatmirror/stoatmirror.{toml,yaml,yml,json}` (user-global)
///
/// Without a file the config is built from defaults and environment alone.
/// A file that exists but does not parse is an error.
pub fn discover_and_load() -> anyhow::Result<(MirrorConfig, Option<PathBuf>)> {
    let path = find_config_file();
    let mut config = match &path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => {
            debug!("no config file found, using defaults and environment");
            MirrorConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok((config, path))
}

/// Overlay the environment variables the bridge has always honoured.
///
/// `DISCORD_TOKEN`, `DISCORD_BOT_ID`, `STOAT_BOT_TOKEN`, `STOAT_BASE_URL`.
pub fn apply_env_overrides(config: &mut MirrorConfig, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var("DISCORD_TOKEN") {
        config.discord.token = Secret::new(token);
    }
    if let Some(bot_id) = var("DISCORD_BOT_ID") {
        config.discord.bot_id = Some(bot_id);
    }
    if let Some(token) = var("STOAT_BOT_TOKEN") {
        config.stoat.token = Secret::new(token);
    }
    if let Some(base_url) = var("STOAT_BASE_URL") {
        config.stoat.base_url = base_url;
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/stoatmirror/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stoatmirror").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MirrorConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stoatmirror.toml");
        std::fs::write(
            &path,
            r#"
[discord]
token = "d-token"

[stoat]
token = "s-token"
base_url = "https://stoat.example.com"
masquerade = true

[relay]
channel_mapping_file = "mapping.yaml"

[[channels]]
source = 483867465613443082
target = "01KH742Q7T025TST0JZS5FWFGW"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "d-token");
        assert_eq!(cfg.stoat.base_url, "https://stoat.example.com");
        assert!(cfg.stoat.masquerade);
        assert_eq!(cfg.stoat.request_timeout_secs, 30);
        assert_eq!(cfg.relay.channel_mapping_file, PathBuf::from("mapping.yaml"));
        assert_eq!(cfg.channels.len(), 1);
        assert_eq!(cfg.channels[0].source, "483867465613443082");
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stoatmirror.yaml");
        std::fs::write(
            &path,
            "stoat:\n  base_url: https://s.example\n  request_timeout_secs: 5\n",
        )
        .unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.stoat.request_timeout_secs, 5);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stoatmirror.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = MirrorConfig::default();
        cfg.stoat.base_url = "https://old.example".into();
        apply_env_overrides(&mut cfg, |name| match name {
            "STOAT_BASE_URL" => Some("https://new.example".into()),
            "STOAT_BOT_TOKEN" => Some("s".into()),
            "DISCORD_TOKEN" => Some("d".into()),
            "DISCORD_BOT_ID" => Some("1471564072674791444".into()),
            _ => None,
        });
        assert_eq!(cfg.stoat.base_url, "https://new.example");
        assert_eq!(cfg.stoat.token.expose_secret(), "s");
        assert_eq!(cfg.discord.token.expose_secret(), "d");
        assert_eq!(cfg.discord.bot_id.as_deref(), Some("1471564072674791444"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = MirrorConfig::default();
        cfg.stoat.base_url = "https://keep.example".into();
        apply_env_overrides(&mut cfg, |_| Some("  ".into()));
        assert_eq!(cfg.stoat.base_url, "https://keep.example");
    }
}
