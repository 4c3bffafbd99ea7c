//! Relay core: mirrors source channel messages into target channels.
//!
//! Source adapters turn platform notifications into [`SourceEvent`]s and hand
//! them to the [`EventRouter`]; the [`RelayEngine`] formats them, re-hosts
//! attachments and keeps the source → target message identity in step.

pub mod attachments;
pub mod channel_map;
pub mod engine;
pub mod error;
pub mod event;
pub mod format;
pub mod mapper;
pub mod platform;
pub mod router;

pub use {
    attachments::AttachmentPipeline,
    channel_map::{ChannelMap, ChannelMapping},
    engine::{RelayEngine, RelayOptions, RelayOutcome},
    error::{Error, Result},
    event::{
        AttachmentRef, Author, MentionedRole, MentionedUser, MessageCreated, MessageDeleted,
        MessageEdited, SourceEvent, SourceMessage,
    },
    format::Formatter,
    mapper::{MappingGuard, MessageKey, MessageMapper},
    platform::{AttachmentSource, Masquerade, OutboundMessage, TargetAttachmentHandle, TargetPlatform},
    router::{Dispatch, EventRouter, IgnoreReason},
};
