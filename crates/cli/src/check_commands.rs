use anyhow::Result;

use {
    stoatmirror_config::{Diagnostic, Severity, validate},
    stoatmirror_relay::ChannelMap,
};

use crate::Loaded;

const RESET: &str = "\x1b[0m";

fn colour(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\x1b[1;31m",
        Severity::Warning => "\x1b[1;33m",
        Severity::Info => "\x1b[1;36m",
    }
}

/// Diagnostics worth printing; info only with `--verbose`.
fn shown(diagnostics: &[Diagnostic], verbose: bool) -> impl Iterator<Item = &Diagnostic> {
    diagnostics
        .iter()
        .filter(move |d| verbose || d.severity != Severity::Info)
}

/// Print validation diagnostics. Fails when any of them is an error.
pub fn check(loaded: &Loaded, verbose: bool) -> Result<()> {
    let result = validate(&loaded.config, &loaded.pairs, loaded.path.clone());

    let pairs = loaded.pairs.len();
    match &result.config_path {
        Some(path) => eprintln!("{}: {pairs} channel(s)", path.display()),
        None => eprintln!("no config file, {pairs} channel(s) from defaults and environment"),
    }
    for d in shown(&result.diagnostics, verbose) {
        eprintln!("  {}{d}{RESET}", colour(d.severity));
    }

    let errors = result.count(Severity::Error);
    eprintln!(
        "{errors} error(s), {} warning(s)",
        result.count(Severity::Warning)
    );
    if errors > 0 {
        anyhow::bail!("configuration has {errors} error(s)");
    }
    Ok(())
}

pub fn channels(loaded: &Loaded) -> Result<()> {
    let map = ChannelMap::from_pairs(
        loaded
            .pairs
            .iter()
            .map(|pair| (pair.source.as_str(), pair.target.as_str())),
    )?;

    if map.is_empty() {
        eprintln!(
            "No channels mapped. Add pairs to {} or [[channels]].",
            loaded.config.relay.channel_mapping_file.display()
        );
        return Ok(());
    }

    for mapping in map.mappings() {
        println!("{} -> {}", mapping.source_channel_id, mapping.target_channel_id);
    }
    eprintln!("\n{} channel(s) mirrored", map.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        secrecy::Secret,
        stoatmirror_config::{ChannelPair, MirrorConfig},
    };

    fn loaded(config: MirrorConfig, pairs: Vec<ChannelPair>) -> Loaded {
        Loaded {
            config,
            pairs,
            path: None,
        }
    }

    fn valid_config() -> MirrorConfig {
        let mut config = MirrorConfig::default();
        config.discord.token = Secret::new("d".into());
        config.stoat.token = Secret::new("s".into());
        config.stoat.base_url = "https://stoat.example.com".into();
        config
    }

    #[test]
    fn check_passes_valid_config() {
        let loaded = loaded(valid_config(), vec![ChannelPair::new("1", "A")]);
        assert!(check(&loaded, true).is_ok());
    }

    #[test]
    fn check_fails_on_errors() {
        let loaded = loaded(MirrorConfig::default(), vec![ChannelPair::new("1", "A")]);
        let err = check(&loaded, false).unwrap_err();
        assert!(err.to_string().contains("error(s)"));
    }

    #[test]
    fn info_only_when_verbose() {
        // Missing bot_id is reported as info.
        let result = validate(&valid_config(), &[ChannelPair::new("1", "A")], None);
        assert_eq!(shown(&result.diagnostics, false).count(), 0);
        assert_eq!(shown(&result.diagnostics, true).count(), 1);
    }

    #[test]
    fn channels_rejects_duplicate_sources() {
        let loaded = loaded(valid_config(), vec![
            ChannelPair::new("1", "A"),
            ChannelPair::new("1", "B"),
        ]);
        assert!(channels(&loaded).is_err());
    }
}
