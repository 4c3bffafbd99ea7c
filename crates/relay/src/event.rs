//! Source platform event records consumed by the relay.

use chrono::{DateTime, Utc};

/// Author of a source message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    /// Account username (always present).
    pub username: String,
    /// Global display name, when the user set one.
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Author {
    /// Name shown on the mirrored message.
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Handle used to fetch attachment bytes from the source platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: String,
    pub filename: String,
    /// Where the bytes can be retrieved (a CDN URL for Discord).
    pub url: String,
}

/// A user mentioned in a message, with the name to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionedUser {
    pub id: String,
    pub username: String,
}

/// A role mentioned in a message, with the name to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionedRole {
    pub id: String,
    pub name: String,
}

/// A message as seen on the source platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub channel_id: String,
    pub message_id: String,
    pub author: Author,
    /// Authored by this relay's own identity on the source platform.
    pub is_self: bool,
    pub content: String,
    pub attachments: Vec<AttachmentRef>,
    pub mentions: Vec<MentionedUser>,
    pub role_mentions: Vec<MentionedRole>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCreated {
    pub message: SourceMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEdited {
    pub message: SourceMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDeleted {
    pub channel_id: String,
    pub message_id: String,
}

/// Notification delivered by the source platform adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Created(MessageCreated),
    Edited(MessageEdited),
    Deleted(MessageDeleted),
}

impl SourceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "create",
            Self::Edited(_) => "edit",
            Self::Deleted(_) => "delete",
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            Self::Created(e) => &e.message.channel_id,
            Self::Edited(e) => &e.message.channel_id,
            Self::Deleted(e) => &e.channel_id,
        }
    }

    pub fn message_id(&self) -> &str {
        match self {
            Self::Created(e) => &e.message.message_id,
            Self::Edited(e) => &e.message.message_id,
            Self::Deleted(e) => &e.message_id,
        }
    }

    /// Deletes carry no author, so they are never self-authored.
    pub fn is_self(&self) -> bool {
        match self {
            Self::Created(e) => e.message.is_self,
            Self::Edited(e) => e.message.is_self,
            Self::Deleted(_) => false,
        }
    }
}
