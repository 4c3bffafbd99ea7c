//! Discord side of the mirror: gateway events in, attachment bytes out.

pub mod attachment;
pub mod convert;
pub mod handler;
pub mod identity;

use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    serenity::Client,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use stoatmirror_relay::EventRouter;

pub use {
    attachment::HttpAttachmentFetcher,
    handler::MirrorHandler,
    identity::BotIdentity,
};

/// Connect to the gateway and feed events to `router` until `cancel` fires
/// or the connection ends.
pub async fn run(
    token: &Secret<String>,
    identity: BotIdentity,
    router: Arc<EventRouter>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let handler = MirrorHandler::new(router, Arc::new(identity));
    let mut client = Client::builder(token.expose_secret(), MirrorHandler::intents())
        .event_handler(handler)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        cancel.cancelled().await;
        info!("shutting down discord gateway");
        shard_manager.shutdown_all().await;
    });

    client.start().await?;
    Ok(())
}
