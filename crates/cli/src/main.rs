mod check_commands;
mod run_command;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    stoatmirror_config::{ChannelPair, MirrorConfig},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "stoatmirror",
    about = "Mirror Discord channels into Stoat",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/stoatmirror/).
    #[arg(long, global = true, env = "STOATMIRROR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror messages until interrupted (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the resolved source → target channel map.
    Channels,
}

/// Configuration as resolved for this invocation.
pub struct Loaded {
    pub config: MirrorConfig,
    pub pairs: Vec<ChannelPair>,
    pub path: Option<PathBuf>,
}

fn load(cli: &Cli) -> anyhow::Result<Loaded> {
    let (config, path) = match &cli.config {
        Some(path) => {
            let mut config = stoatmirror_config::load_config(path)?;
            stoatmirror_config::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
            (config, Some(path.clone()))
        },
        None => stoatmirror_config::discover_and_load()?,
    };
    let pairs = stoatmirror_config::collect_channel_pairs(&config)?;
    Ok(Loaded {
        config,
        pairs,
        path,
    })
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_telemetry(&cli);

    let loaded = load(&cli)?;
    match cli.command {
        None | Some(Commands::Run) => run_command::run(loaded).await,
        Some(Commands::Check { verbose }) => check_commands::check(&loaded, verbose),
        Some(Commands::Channels) => check_commands::channels(&loaded),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["stoatmirror"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stoatmirror",
            "check",
            "--verbose",
            "--json-logs",
            "--config",
            "/etc/stoatmirror.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Check { verbose: true })));
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/stoatmirror.toml")));
    }

    #[test]
    fn explicit_config_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.yaml");
        std::fs::write(
            &path,
            "stoat:\n  base_url: https://stoat.example.com\nrelay:\n  channel_mapping_file: /nonexistent/map.yaml\nchannels:\n  - source: 1\n    target: A\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "stoatmirror",
            "--config",
            path.to_str().unwrap(),
            "channels",
        ])
        .unwrap();

        let loaded = load(&cli).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.pairs, vec![ChannelPair::new("1", "A")]);
    }
}
