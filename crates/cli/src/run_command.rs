use std::{sync::Arc, time::Duration};

use {
    anyhow::Context,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    stoatmirror_config::{Severity, validate},
    stoatmirror_discord::{BotIdentity, HttpAttachmentFetcher},
    stoatmirror_relay::{
        AttachmentPipeline, AttachmentSource, ChannelMap, EventRouter, RelayEngine, RelayOptions,
        TargetPlatform,
    },
    stoatmirror_stoat::StoatClient,
};

use crate::Loaded;

pub async fn run(loaded: Loaded) -> anyhow::Result<()> {
    let result = validate(&loaded.config, &loaded.pairs, loaded.path.clone());
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => debug!(path = %d.path, "{}", d.message),
        }
    }
    if result.has_errors() {
        anyhow::bail!("invalid configuration; run `stoatmirror check` for details");
    }

    let config = loaded.config;
    let channels = Arc::new(ChannelMap::from_pairs(
        loaded
            .pairs
            .iter()
            .map(|pair| (pair.source.as_str(), pair.target.as_str())),
    )?);

    let stoat: Arc<dyn TargetPlatform> = Arc::new(StoatClient::from_config(&config.stoat)?);
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.stoat.request_timeout_secs))
        .build()
        .context("failed to build attachment download client")?;
    let source: Arc<dyn AttachmentSource> = Arc::new(HttpAttachmentFetcher::new(http));
    let scratch_dir = config.relay.resolved_temp_dir();
    let pipeline = AttachmentPipeline::new(source, Arc::clone(&stoat), scratch_dir.clone());

    let options = RelayOptions {
        masquerade: config.stoat.masquerade,
        forget_on_failed_delete: config.relay.forget_on_failed_delete,
    };
    let mirrored = channels.len();
    let engine = Arc::new(RelayEngine::new(channels, pipeline, stoat, options));
    let router = Arc::new(EventRouter::new(engine));

    let bot_id = config
        .discord
        .bot_id
        .as_deref()
        .map(str::parse::<u64>)
        .transpose()
        .context("discord.bot_id must be a numeric user id")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            on_signal.cancel();
        }
    });

    info!(
        channels = mirrored,
        api_url = %config.stoat.resolved_api_url(),
        scratch_dir = %scratch_dir.display(),
        masquerade = options.masquerade,
        "starting mirror"
    );
    stoatmirror_discord::run(&config.discord.token, BotIdentity::new(bot_id), router, cancel)
        .await?;
    info!("mirror stopped");
    Ok(())
}
