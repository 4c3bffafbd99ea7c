//! serenity payloads to relay records.

use std::collections::HashMap;

use {
    chrono::{DateTime, Utc},
    serenity::all::{Attachment, Message, RoleId, User},
};

use stoatmirror_relay::{AttachmentRef, Author, MentionedRole, MentionedUser, SourceMessage};

pub fn author(user: &User) -> Author {
    Author {
        id: user.id.to_string(),
        username: user.name.clone(),
        display_name: user.global_name.clone(),
        avatar_url: user.avatar_url(),
    }
}

pub fn attachment(attachment: &Attachment) -> AttachmentRef {
    AttachmentRef {
        id: attachment.id.to_string(),
        filename: attachment.filename.clone(),
        url: attachment.url.clone(),
    }
}

/// Build the relay view of `msg`.
///
/// `role_names` resolves mentioned roles; roles missing from it are dropped
/// and stay as raw mention markup.
pub fn source_message(
    msg: &Message,
    is_self: bool,
    role_names: &HashMap<RoleId, String>,
) -> SourceMessage {
    SourceMessage {
        channel_id: msg.channel_id.to_string(),
        message_id: msg.id.to_string(),
        author: author(&msg.author),
        is_self,
        content: msg.content.clone(),
        attachments: msg.attachments.iter().map(attachment).collect(),
        mentions: msg
            .mentions
            .iter()
            .map(|user| MentionedUser {
                id: user.id.to_string(),
                username: user.name.clone(),
            })
            .collect(),
        role_mentions: resolve_roles(&msg.mention_roles, role_names),
        created_at: timestamp(msg.timestamp.unix_timestamp()),
    }
}

fn resolve_roles(ids: &[RoleId], names: &HashMap<RoleId, String>) -> Vec<MentionedRole> {
    ids.iter()
        .filter_map(|id| {
            names.get(id).map(|name| MentionedRole {
                id: id.to_string(),
                name: name.clone(),
            })
        })
        .collect()
}

/// Unix seconds to UTC, clamping anything unrepresentable to the epoch.
pub fn timestamp(unix_secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_secs, 0).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json};

    const AVATAR: &str = "8342729096ea3675442027381ff50dfe";

    fn user(
        id: &str,
        username: &str,
        global_name: Option<&str>,
        avatar: Option<&str>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "username": username,
            "discriminator": "0",
            "global_name": global_name,
            "avatar": avatar,
            "bot": false,
            "public_flags": 0,
        })
    }

    fn gateway_message() -> Message {
        serde_json::from_value(json!({
            "id": "1472000000000000100",
            "channel_id": "483867465613443082",
            "guild_id": "483867465613443000",
            "author": user("1471000000000000007", "alice", Some("Alice"), Some(AVATAR)),
            "content": "hey <@1471000000000000008> and <@&10>",
            "timestamp": "2023-11-14T22:13:20.000000+00:00",
            "edited_timestamp": null,
            "tts": false,
            "mention_everyone": false,
            "mentions": [user("1471000000000000008", "bob", None, None)],
            "mention_roles": ["10", "11"],
            "attachments": [{
                "id": "1472000000000000001",
                "filename": "cat.png",
                "size": 7,
                "url": "https://cdn.discordapp.com/attachments/1/2/cat.png",
                "proxy_url": "https://media.discordapp.net/attachments/1/2/cat.png",
                "content_type": "image/png",
                "height": 10,
                "width": 10,
            }],
            "embeds": [],
            "pinned": false,
            "type": 0,
        }))
        .unwrap()
    }

    #[test]
    fn converts_gateway_message() {
        let names = HashMap::from([(RoleId::new(10), "mods".to_string())]);
        let source = source_message(&gateway_message(), false, &names);

        assert_eq!(source.channel_id, "483867465613443082");
        assert_eq!(source.message_id, "1472000000000000100");
        assert!(!source.is_self);
        assert_eq!(source.content, "hey <@1471000000000000008> and <@&10>");
        assert_eq!(source.created_at.timestamp(), 1_700_000_000);

        assert_eq!(source.author.id, "1471000000000000007");
        assert_eq!(source.author.username, "alice");
        assert_eq!(source.author.shown_name(), "Alice");
        assert!(
            source
                .author
                .avatar_url
                .as_deref()
                .is_some_and(|url| url.contains(AVATAR))
        );

        assert_eq!(source.attachments, vec![AttachmentRef {
            id: "1472000000000000001".into(),
            filename: "cat.png".into(),
            url: "https://cdn.discordapp.com/attachments/1/2/cat.png".into(),
        }]);
        assert_eq!(source.mentions, vec![MentionedUser {
            id: "1471000000000000008".into(),
            username: "bob".into(),
        }]);
        assert_eq!(source.role_mentions, vec![MentionedRole {
            id: "10".into(),
            name: "mods".into(),
        }]);
    }

    #[test]
    fn self_flag_and_missing_roles() {
        let source = source_message(&gateway_message(), true, &HashMap::new());
        assert!(source.is_self);
        assert!(source.role_mentions.is_empty());
    }

    #[test]
    fn author_without_display_name_or_avatar() {
        let bob: User =
            serde_json::from_value(user("1471000000000000008", "bob", None, None)).unwrap();
        let converted = author(&bob);
        assert_eq!(converted.shown_name(), "bob");
        assert_eq!(converted.avatar_url, None);
    }

    #[test]
    fn timestamp_keeps_seconds() {
        assert_eq!(timestamp(1_700_000_000).timestamp(), 1_700_000_000);
        assert_eq!(timestamp(i64::MAX).timestamp(), 0);
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let names = HashMap::from([(RoleId::new(10), "mods".to_string())]);
        let roles = resolve_roles(&[RoleId::new(10), RoleId::new(11)], &names);
        assert_eq!(roles, vec![MentionedRole {
            id: "10".into(),
            name: "mods".into(),
        }]);
    }
}
