use std::collections::HashMap;

use crate::{Error, Result};

/// One mirrored channel: where messages come from and where they land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub source_channel_id: String,
    pub target_channel_id: String,
}

/// Immutable source → target channel table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    entries: HashMap<String, String>,
}

impl ChannelMap {
    /// Build the table, rejecting a source channel that appears twice.
    pub fn from_pairs<I, S, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut entries = HashMap::new();
        for (source, target) in pairs {
            let source = source.into().trim().to_string();
            let target = target.into().trim().to_string();
            if source.is_empty() || target.is_empty() {
                return Err(Error::invalid_input("channel ids must not be empty"));
            }
            if entries.contains_key(&source) {
                return Err(Error::DuplicateChannel {
                    source_channel_id: source,
                });
            }
            entries.insert(source, target);
        }
        Ok(Self { entries })
    }

    /// Target channel for a mirrored source channel.
    pub fn target_for(&self, source_channel_id: &str) -> Option<&str> {
        self.entries.get(source_channel_id).map(String::as_str)
    }

    pub fn is_mirrored(&self, source_channel_id: &str) -> bool {
        self.entries.contains_key(source_channel_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All mappings, sorted by source channel id.
    pub fn mappings(&self) -> Vec<ChannelMapping> {
        let mut out: Vec<ChannelMapping> = self
            .entries
            .iter()
            .map(|(source, target)| ChannelMapping {
                source_channel_id: source.clone(),
                target_channel_id: target.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.source_channel_id.cmp(&b.source_channel_id));
        out
    }
}
