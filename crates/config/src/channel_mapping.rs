//! Source → target channel pairs.
//!
//! The mapping file is a flat YAML map:
//!
//! ```yaml
//! 483867465613443082: "01KH742Q7T025TST0JZS5FWFGW"  # memes
//! "999347555278258268": 01KH73MPGWC22X1B8327NGDJYN
//! ```
//!
//! Keys and values may be numbers or strings; both are read as ids.

use std::path::Path;

use {
    anyhow::Context,
    serde::{Deserialize, Deserializer},
    tracing::{debug, warn},
};

use crate::schema::MirrorConfig;

/// One mirrored channel as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelPair {
    #[serde(deserialize_with = "id_string")]
    pub source: String,
    #[serde(deserialize_with = "id_string")]
    pub target: String,
}

impl ChannelPair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Pairs from the configured mapping file followed by the inline `channels`.
pub fn collect_channel_pairs(config: &MirrorConfig) -> anyhow::Result<Vec<ChannelPair>> {
    let mut pairs = load_channel_mapping(&config.relay.channel_mapping_file)?;
    pairs.extend(config.channels.iter().cloned());
    Ok(pairs)
}

/// Read the mapping file. A missing file yields no pairs.
pub fn load_channel_mapping(path: &Path) -> anyhow::Result<Vec<ChannelPair>> {
    if !path.exists() {
        warn!(path = %path.display(), "channel mapping file not found, no channels from file");
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pairs = parse_channel_mapping(&raw)
        .with_context(|| format!("invalid channel mapping in {}", path.display()))?;
    debug!(path = %path.display(), count = pairs.len(), "loaded channel mapping");
    Ok(pairs)
}

/// Parse a flat YAML `source: target` map, keeping file order.
pub fn parse_channel_mapping(raw: &str) -> anyhow::Result<Vec<ChannelPair>> {
    let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
    let mapping = match value {
        serde_yaml::Value::Null => return Ok(Vec::new()),
        serde_yaml::Value::Mapping(mapping) => mapping,
        other => anyhow::bail!("expected a map of channel ids, got {}", kind(&other)),
    };

    mapping
        .into_iter()
        .map(|(source, target)| -> anyhow::Result<ChannelPair> {
            Ok(ChannelPair {
                source: scalar_id(&source)
                    .ok_or_else(|| anyhow::anyhow!("invalid source channel id: {source:?}"))?,
                target: scalar_id(&target)
                    .ok_or_else(|| anyhow::anyhow!("invalid target channel id: {target:?}"))?,
            })
        })
        .collect()
}

fn scalar_id(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a list",
        serde_yaml::Value::Mapping(_) => "a map",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_string_keys() {
        let raw = "483867465613443082: \"01KH742Q7T025TST0JZS5FWFGW\"  # memes\n\
                   \"999347555278258268\": 01KH73MPGWC22X1B8327NGDJYN\n";
        let pairs = parse_channel_mapping(raw).unwrap();
        assert_eq!(pairs, vec![
            ChannelPair::new("483867465613443082", "01KH742Q7T025TST0JZS5FWFGW"),
            ChannelPair::new("999347555278258268", "01KH73MPGWC22X1B8327NGDJYN"),
        ]);
    }

    #[test]
    fn empty_file_is_no_pairs() {
        assert!(parse_channel_mapping("").unwrap().is_empty());
        assert!(parse_channel_mapping("# nothing yet\n").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_map() {
        let err = parse_channel_mapping("- 1\n- 2\n").unwrap_err();
        assert!(err.to_string().contains("a list"));
    }

    #[test]
    fn rejects_empty_target() {
        assert!(parse_channel_mapping("1: \"\"\n").is_err());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = load_channel_mapping(&dir.path().join("nope.yaml")).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel_mapping.yaml");
        std::fs::write(&path, "1: A\n2: B\n").unwrap();
        let pairs = load_channel_mapping(&path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ChannelPair::new("2", "B"));
    }

    #[test]
    fn collects_file_then_inline_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel_mapping.yaml");
        std::fs::write(&path, "1: A\n").unwrap();
        let mut config = MirrorConfig::default();
        config.relay.channel_mapping_file = path;
        config.channels.push(ChannelPair::new("2", "B"));
        assert_eq!(collect_channel_pairs(&config).unwrap(), vec![
            ChannelPair::new("1", "A"),
            ChannelPair::new("2", "B"),
        ]);
    }

    #[test]
    fn inline_pair_accepts_numbers() {
        let pair: ChannelPair =
            serde_json::from_str(r#"{"source": 483867465613443082, "target": "X"}"#).unwrap();
        assert_eq!(pair, ChannelPair::new("483867465613443082", "X"));
    }
}
