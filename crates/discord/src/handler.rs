//! Discord event handler for serenity.
//!
//! Turns gateway message events into relay events. Every event is handed to
//! the router on its own task so a slow target call never stalls the gateway.

use std::{collections::HashMap, sync::Arc};

use {
    serenity::{
        all::{
            ChannelId, Context, EventHandler, GatewayIntents, GuildId, Message, MessageId,
            MessageUpdateEvent, Ready, RoleId,
        },
        async_trait,
    },
    tracing::{debug, info, warn},
};

use stoatmirror_relay::{
    EventRouter, MessageCreated, MessageDeleted, MessageEdited, SourceEvent, SourceMessage,
};

use crate::{convert, identity::BotIdentity};

/// Handler for Discord gateway events.
pub struct MirrorHandler {
    router: Arc<EventRouter>,
    identity: Arc<BotIdentity>,
}

impl MirrorHandler {
    pub fn new(router: Arc<EventRouter>, identity: Arc<BotIdentity>) -> Self {
        Self { router, identity }
    }

    /// Required gateway intents for the relay.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    fn to_source(&self, ctx: &Context, msg: &Message) -> SourceMessage {
        let is_self = self.identity.is_self_authored(
            msg.author.id.get(),
            msg.webhook_id.is_some(),
            msg.application_id.map(|id| id.get()),
        );
        convert::source_message(msg, is_self, &role_names(ctx, msg))
    }
}

/// One delete event per removed message, in the order Discord listed them.
pub fn deleted_events(channel_id: ChannelId, message_ids: &[MessageId]) -> Vec<SourceEvent> {
    let channel_id = channel_id.to_string();
    message_ids
        .iter()
        .map(|message_id| {
            SourceEvent::Deleted(MessageDeleted {
                channel_id: channel_id.clone(),
                message_id: message_id.to_string(),
            })
        })
        .collect()
}

/// Names of the roles `msg` mentions, from the guild cache.
fn role_names(ctx: &Context, msg: &Message) -> HashMap<RoleId, String> {
    if msg.mention_roles.is_empty() {
        return HashMap::new();
    }
    let Some(guild_id) = msg.guild_id else {
        return HashMap::new();
    };
    let Some(guild) = ctx.cache.guild(guild_id) else {
        debug!(%guild_id, "guild not cached, role mentions left raw");
        return HashMap::new();
    };
    msg.mention_roles
        .iter()
        .filter_map(|id| guild.roles.get(id).map(|role| (*id, role.name.clone())))
        .collect()
}

#[async_trait]
impl EventHandler for MirrorHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.identity
            .learn(ready.user.id.get(), ready.application.id.get());
        info!(
            bot_name = %ready.user.name,
            bot_id = ready.user.id.get(),
            guilds = ready.guilds.len(),
            mirrored_channels = self.router.engine().channels().len(),
            "discord bot ready"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let message = self.to_source(&ctx, &msg);
        self.router
            .spawn(SourceEvent::Created(MessageCreated { message }));
    }

    async fn message_update(
        &self,
        ctx: Context,
        _old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        // Skip the refetch for channels nobody mirrors.
        if !self.router.mirrors(&event.channel_id.to_string()) {
            return;
        }

        let msg = match new {
            Some(msg) => msg,
            None => match event.channel_id.message(&ctx, event.id).await {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(
                        channel_id = %event.channel_id,
                        message_id = %event.id,
                        error = %e,
                        "failed to fetch edited message"
                    );
                    return;
                },
            },
        };

        let message = self.to_source(&ctx, &msg);
        self.router
            .spawn(SourceEvent::Edited(MessageEdited { message }));
    }

    async fn message_delete(
        &self,
        _ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        for event in deleted_events(channel_id, &[deleted_message_id]) {
            self.router.spawn(event);
        }
    }

    async fn message_delete_bulk(
        &self,
        _ctx: Context,
        channel_id: ChannelId,
        multiple_deleted_messages_ids: Vec<MessageId>,
        _guild_id: Option<GuildId>,
    ) {
        debug!(
            %channel_id,
            count = multiple_deleted_messages_ids.len(),
            "bulk delete"
        );
        for event in deleted_events(channel_id, &multiple_deleted_messages_ids) {
            self.router.spawn(event);
        }
    }
}
