//! Configuration loading, validation, env substitution and channel mappings.
//!
//! Config files: `stoatmirror.toml`, `stoatmirror.yaml`, or `stoatmirror.json`
//! Searched in `./` then `~/.config/stoatmirror/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod channel_mapping;
pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    channel_mapping::{
        ChannelPair, collect_channel_pairs, load_channel_mapping, parse_channel_mapping,
    },
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{DiscordConfig, MirrorConfig, RelayConfig, StoatConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
