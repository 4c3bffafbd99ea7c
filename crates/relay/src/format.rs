//! Source message → target markup.
//!
//! Rendering is pure: the output depends only on the message and the channel
//! map, never on time, network or mutable state.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};

use crate::{channel_map::ChannelMap, event::SourceMessage};

pub const SOURCE_SPOILER: &str = "||";
pub const TARGET_SPOILER: &str = "!!";
pub const BROADCAST_MENTION: &str = "@everyone";
/// Inline-code rendering so the target does not page everyone.
pub const INERT_BROADCAST_MENTION: &str = "`@everyone`";
pub const CLOCK_GLYPH: &str = ":clock230:";

#[allow(clippy::expect_used)]
static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>").expect("valid user mention pattern"));
#[allow(clippy::expect_used)]
static ROLE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@&(\d+)>").expect("valid role mention pattern"));
#[allow(clippy::expect_used)]
static CHANNEL_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#(\d+)>").expect("valid channel mention pattern"));

/// Renders source messages for the target platform.
#[derive(Debug, Clone)]
pub struct Formatter {
    channels: Arc<ChannelMap>,
}

impl Formatter {
    pub fn new(channels: Arc<ChannelMap>) -> Self {
        Self { channels }
    }

    /// Full mirrored body: author line, quoted content, timestamp line.
    pub fn format(&self, message: &SourceMessage) -> String {
        format!(
            "**{}**\n> {}\n{CLOCK_GLYPH} <t:{}:f>",
            message.author.shown_name(),
            self.render_content(message),
            message.created_at.timestamp()
        )
    }

    /// Content with mentions resolved and target-specific escaping applied.
    pub fn render_content(&self, message: &SourceMessage) -> String {
        let content = USER_MENTION.replace_all(&message.content, |caps: &Captures<'_>| {
            message
                .mentions
                .iter()
                .find(|user| user.id == caps[1])
                .map_or_else(|| caps[0].to_string(), |user| format!("@{}", user.username))
        });
        let content = ROLE_MENTION.replace_all(&content, |caps: &Captures<'_>| {
            message
                .role_mentions
                .iter()
                .find(|role| role.id == caps[1])
                .map_or_else(|| caps[0].to_string(), |role| format!("@{}", role.name))
        });
        let content = CHANNEL_MENTION.replace_all(&content, |caps: &Captures<'_>| {
            self.channels
                .target_for(&caps[1])
                .map_or_else(|| caps[0].to_string(), |target| format!("<#{target}>"))
        });

        content
            .replace(SOURCE_SPOILER, TARGET_SPOILER)
            .replace(BROADCAST_MENTION, INERT_BROADCAST_MENTION)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::event::{Author, MentionedRole, MentionedUser},
        chrono::{DateTime, Utc},
        rstest::rstest,
    };

    fn formatter() -> Formatter {
        let map = ChannelMap::from_pairs([("444706130338381834", "01KH741AKKGVKKETWM56YMPQHN")])
            .unwrap();
        Formatter::new(Arc::new(map))
    }

    fn message(content: &str) -> SourceMessage {
        SourceMessage {
            channel_id: "444706130338381834".into(),
            message_id: "1".into(),
            author: Author {
                id: "7".into(),
                username: "alice".into(),
                display_name: Some("Alice".into()),
                avatar_url: None,
            },
            is_self: false,
            content: content.into(),
            attachments: vec![],
            mentions: vec![],
            role_mentions: vec![],
            created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn formats_author_quote_and_timestamp() {
        assert_eq!(
            formatter().format(&message("hello ||secret||")),
            "**Alice**\n> hello !!secret!!\n:clock230: <t:1700000000:f>"
        );
    }

    #[test]
    fn timestamp_is_truncated_to_seconds() {
        let mut msg = message("x");
        msg.created_at = DateTime::<Utc>::from_timestamp(1_700_000_000, 999_000_000).unwrap();
        assert!(formatter().format(&msg).ends_with("<t:1700000000:f>"));
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let f = formatter();
        let msg = message("@everyone look ||here||");
        assert_eq!(f.format(&msg), f.format(&msg.clone()));
    }

    #[rstest]
    #[case("||a|| and ||b||", "!!a!! and !!b!!")]
    #[case("@everyone wake up", "`@everyone` wake up")]
    #[case("@everyone @everyone", "`@everyone` `@everyone`")]
    #[case("plain", "plain")]
    #[case("", "")]
    fn content_transforms(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(formatter().render_content(&message(input)), expected);
    }

    #[test]
    fn resolves_user_and_role_mentions() {
        let mut msg = message("hi <@42> and <@!42>, ping <@&9> not <@&10>");
        msg.mentions = vec![MentionedUser {
            id: "42".into(),
            username: "bob".into(),
        }];
        msg.role_mentions = vec![MentionedRole {
            id: "9".into(),
            name: "mods".into(),
        }];
        assert_eq!(
            formatter().render_content(&msg),
            "hi @bob and @bob, ping @mods not <@&10>"
        );
    }

    #[test]
    fn rewrites_mirrored_channel_mentions_only() {
        let msg = message("see <#444706130338381834> and <#1>");
        assert_eq!(
            formatter().render_content(&msg),
            "see <#01KH741AKKGVKKETWM56YMPQHN> and <#1>"
        );
    }
}
