//! Create/edit/delete synchronization for mirrored messages.
//!
//! Per source message the engine walks `Unmirrored → Mirrored → Removed`.
//! A mapping entry exists exactly while the message is `Mirrored`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    attachments::AttachmentPipeline,
    channel_map::ChannelMap,
    event::{MessageDeleted, SourceMessage},
    format::Formatter,
    mapper::{MessageKey, MessageMapper},
    platform::{Masquerade, OutboundMessage, TargetPlatform},
};

/// Behaviour switches for the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayOptions {
    /// Show the source author's name and avatar on mirrored messages.
    pub masquerade: bool,
    /// Drop the mapping even when the target delete call fails.
    pub forget_on_failed_delete: bool,
}

/// What a handler did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A target message now mirrors the source message.
    Mirrored { target_message_id: String },
    /// The mirrored message was updated in place.
    Edited { target_message_id: String },
    /// The mirrored message was deleted and the mapping dropped.
    Removed { target_message_id: String },
    /// No mapping exists for the message; nothing was sent.
    NotMirrored,
    /// A create arrived for a message that is already mirrored.
    AlreadyMirrored { target_message_id: String },
    /// The source channel has no target; nothing was sent.
    UnmappedChannel,
    /// The target call failed; see logs.
    Failed,
}

/// Orchestrates formatting, attachments, target calls and the mapping table.
pub struct RelayEngine {
    channels: Arc<ChannelMap>,
    formatter: Formatter,
    attachments: AttachmentPipeline,
    target: Arc<dyn TargetPlatform>,
    mapper: MessageMapper,
    options: RelayOptions,
}

impl RelayEngine {
    pub fn new(
        channels: Arc<ChannelMap>,
        attachments: AttachmentPipeline,
        target: Arc<dyn TargetPlatform>,
        options: RelayOptions,
    ) -> Self {
        Self {
            formatter: Formatter::new(Arc::clone(&channels)),
            channels,
            attachments,
            target,
            mapper: MessageMapper::new(),
            options,
        }
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    pub fn mapper(&self) -> &MessageMapper {
        &self.mapper
    }

    /// Mirror a newly created source message.
    pub async fn handle_create(&self, message: &SourceMessage) -> RelayOutcome {
        let Some(target_channel) = self.channels.target_for(&message.channel_id) else {
            return RelayOutcome::UnmappedChannel;
        };
        let mut entry = self
            .mapper
            .lock(MessageKey::new(&message.channel_id, &message.message_id))
            .await;
        if let Some(existing) = entry.get() {
            warn!(
                channel_id = %message.channel_id,
                message_id = %message.message_id,
                target_message_id = %existing,
                "message already mirrored, ignoring duplicate create"
            );
            return RelayOutcome::AlreadyMirrored {
                target_message_id: existing.to_string(),
            };
        }

        let attachments = self
            .attachments
            .relay_attachments(&message.attachments)
            .await;
        if attachments.len() < message.attachments.len() {
            warn!(
                message_id = %message.message_id,
                relayed = attachments.len(),
                total = message.attachments.len(),
                "some attachments could not be relayed"
            );
        }

        let outbound = OutboundMessage {
            content: self.formatter.format(message),
            attachments,
            masquerade: self.masquerade_for(message),
        };

        match self.target.create_message(target_channel, &outbound).await {
            Ok(target_message_id) => {
                entry.put(target_message_id.clone());
                info!(
                    channel_id = %message.channel_id,
                    message_id = %message.message_id,
                    author = %message.author.username,
                    target_message_id = %target_message_id,
                    "message mirrored"
                );
                RelayOutcome::Mirrored { target_message_id }
            },
            Err(e) => {
                warn!(
                    channel_id = %message.channel_id,
                    message_id = %message.message_id,
                    error = %e,
                    "failed to mirror message"
                );
                RelayOutcome::Failed
            },
        }
    }

    /// Apply a source edit to its mirrored message. Attachments are not resent.
    pub async fn handle_edit(&self, message: &SourceMessage) -> RelayOutcome {
        let Some(target_channel) = self.channels.target_for(&message.channel_id) else {
            return RelayOutcome::UnmappedChannel;
        };
        let entry = self
            .mapper
            .lock(MessageKey::new(&message.channel_id, &message.message_id))
            .await;
        let Some(target_message_id) = entry.get() else {
            debug!(message_id = %message.message_id, "edit for unmirrored message, ignoring");
            return RelayOutcome::NotMirrored;
        };

        let content = self.formatter.format(message);
        match self
            .target
            .edit_message(target_channel, target_message_id, &content)
            .await
        {
            Ok(()) => {
                info!(
                    message_id = %message.message_id,
                    target_message_id = %target_message_id,
                    "mirrored message edited"
                );
                RelayOutcome::Edited {
                    target_message_id: target_message_id.to_string(),
                }
            },
            Err(e) => {
                warn!(
                    message_id = %message.message_id,
                    target_message_id = %target_message_id,
                    error = %e,
                    "failed to edit mirrored message"
                );
                RelayOutcome::Failed
            },
        }
    }

    /// Delete the mirrored message of a deleted source message.
    pub async fn handle_delete(&self, event: &MessageDeleted) -> RelayOutcome {
        let Some(target_channel) = self.channels.target_for(&event.channel_id) else {
            return RelayOutcome::UnmappedChannel;
        };
        let mut entry = self
            .mapper
            .lock(MessageKey::new(&event.channel_id, &event.message_id))
            .await;
        let Some(target_message_id) = entry.get().map(str::to_string) else {
            debug!(message_id = %event.message_id, "delete for unmirrored message, ignoring");
            return RelayOutcome::NotMirrored;
        };

        match self
            .target
            .delete_message(target_channel, &target_message_id)
            .await
        {
            Ok(()) => {
                entry.remove();
                info!(
                    message_id = %event.message_id,
                    target_message_id = %target_message_id,
                    "mirrored message deleted"
                );
                RelayOutcome::Removed { target_message_id }
            },
            Err(e) if self.options.forget_on_failed_delete => {
                entry.remove();
                warn!(
                    message_id = %event.message_id,
                    target_message_id = %target_message_id,
                    error = %e,
                    "failed to delete mirrored message, forgetting mapping anyway"
                );
                RelayOutcome::Failed
            },
            Err(e) => {
                warn!(
                    message_id = %event.message_id,
                    target_message_id = %target_message_id,
                    error = %e,
                    "failed to delete mirrored message, mapping kept and may be stale"
                );
                RelayOutcome::Failed
            },
        }
    }

    fn masquerade_for(&self, message: &SourceMessage) -> Option<Masquerade> {
        self.options.masquerade.then(|| Masquerade {
            name: message.author.shown_name().to_string(),
            avatar: message.author.avatar_url.clone(),
        })
    }
}
