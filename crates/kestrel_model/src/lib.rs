/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host used for profile web links of accounts without a federated host.
pub const DEFAULT_WEB_HOST: &str = "twitter.com";

/// Identifies an account or remote user. Federated accounts carry the
/// instance host after `@`; equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    pub id: String,
    pub host: Option<String>,
}

impl UserKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: None,
        }
    }

    pub fn with_host(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: Some(host.into()),
        }
    }

    /// Parses the `Display` form back into a key. Never fails: a string
    /// without `@` is a bare id.
    pub fn parse(s: &str) -> Self {
        match s.rsplit_once('@') {
            Some((id, host)) if !host.is_empty() => Self::with_host(id, host),
            _ => Self::new(s),
        }
    }
}

impl std::str::FromStr for UserKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Some(host) => write!(f, "{}@{}", self.id, host),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Context and target bits of a filter rule.
///
/// Bits split into two independent regions: the scope region selects the
/// contexts a rule applies to, the target region selects which fields a
/// keyword rule compares against. A rule with a zero scope region applies
/// to every context.
pub mod filter_scope {
    pub const HOME: i64 = 0x1;
    pub const INTERACTIONS: i64 = 0x2;
    pub const MESSAGES: i64 = 0x4;
    pub const SEARCH_RESULTS: i64 = 0x8;
    pub const LIST_GROUP_TIMELINE: i64 = 0x10;
    pub const FAVORITES: i64 = 0x20;
    pub const USER_TIMELINE: i64 = 0x40;
    pub const PUBLIC_TIMELINE: i64 = 0x80;
    pub const ALL: i64 = 0xFFF;
    pub const MASK_SCOPE: i64 = 0x0000_0FFF;

    pub const TARGET_TEXT: i64 = 0x0010_0000;
    pub const TARGET_NAME: i64 = 0x0020_0000;
    pub const TARGET_DESCRIPTION: i64 = 0x0040_0000;
    pub const MASK_TARGET: i64 = 0x00F0_0000;
}

/// Per-row flags a status carries so sensitivity filtering is a bitmask
/// test instead of a join.
pub mod filter_flags {
    pub const QUOTE_NOT_AVAILABLE: i64 = 0x1;
    pub const POSSIBLY_SENSITIVE: i64 = 0x2;
}

/// Activity action codes as stored in the activities table.
pub mod activity_action {
    pub const MENTION: &str = "mention";
    pub const REPLY: &str = "reply";
    pub const QUOTE: &str = "quote";
    pub const FOLLOW: &str = "follow";
    pub const FAVORITE: &str = "favorite";
    pub const REPOST: &str = "repost";

    /// Actions a third-party client can observe for the mentions feed.
    pub const MENTION_ACTIONS: [&str; 3] = [MENTION, REPLY, QUOTE];
}

/// A timeline status row. The `filter_*` fields are denormalized match
/// targets written by the sync layer and read by the filter predicate
/// builder; write and read path must agree on their serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub account_key: UserKey,
    pub id: String,
    pub sort_id: i64,
    pub position_key: i64,
    pub timestamp: i64,
    pub is_gap: bool,
    pub filter_flags: i64,
    pub text_plain: String,
    pub user_name: String,
    pub user_screen_name: String,
    pub source: Option<String>,
    pub lang: Option<String>,
    pub repost_of_id: Option<String>,
    pub filter_users: Option<String>,
    pub filter_sources: Option<String>,
    pub filter_texts: Option<String>,
    pub filter_names: Option<String>,
    pub filter_descriptions: Option<String>,
    pub filter_links: Option<String>,
}

/// An activity (interaction) row. Activity rows are status-shaped: `id`
/// names the status the interaction concerns, so status deletion can
/// clear the matching activity rows too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub account_key: UserKey,
    pub id: String,
    pub timestamp: i64,
    pub action: String,
    pub repost_of_id: Option<String>,
    pub min_request_position: Option<String>,
    pub max_request_position: Option<String>,
    pub min_sort_position: i64,
    pub max_sort_position: i64,
    pub is_gap: bool,
    pub filter_flags: i64,
    /// JSON array of [`UserFollowState`], parsed best-effort.
    pub sources: Option<String>,
    pub filter_users: Option<String>,
    pub filter_sources: Option<String>,
    pub filter_texts: Option<String>,
    pub filter_names: Option<String>,
    pub filter_descriptions: Option<String>,
    pub filter_links: Option<String>,
}

/// A direct message row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub account_key: UserKey,
    pub message_id: String,
    pub conversation_id: String,
    pub local_timestamp: i64,
    pub is_outgoing: bool,
    pub text_plain: String,
}

/// A message conversation row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageConversation {
    pub account_key: UserKey,
    pub conversation_id: String,
    pub title: Option<String>,
    pub local_timestamp: i64,
}

/// Minimal user profile needed by the filter mutation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub key: UserKey,
    pub name: String,
    pub screen_name: String,
}

impl User {
    /// Public web link for this user's profile. Federated users link to
    /// their own instance, everyone else to the default host.
    pub fn web_link(&self) -> String {
        match &self.key.host {
            Some(host) => format!("https://{}/@{}", host, self.screen_name),
            None => format!("https://{}/{}", DEFAULT_WEB_HOST, self.screen_name),
        }
    }
}

/// Follow relation attached to an activity's `sources` JSON field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFollowState {
    #[serde(default)]
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Microblog,
    Mastodon,
}

/// Account metadata resolved through the account directory collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub key: UserKey,
    pub account_type: AccountType,
    /// Whether this account authenticates as a first-party client.
    pub official: bool,
}

/// A blocked-user filter rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterUserItem {
    pub user_key: UserKey,
    pub name: String,
    pub screen_name: String,
    pub scope: i64,
}

/// A keyword, source or link filter rule. `user_key` records which user
/// a derived rule was created for, so removal can be total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterBaseItem {
    pub value: String,
    pub user_key: Option<UserKey>,
    pub scope: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_roundtrip() {
        let bare = UserKey::new("12345");
        assert_eq!(bare.to_string(), "12345");
        assert_eq!(UserKey::parse("12345"), bare);

        let federated = UserKey::with_host("12345", "example.com");
        assert_eq!(federated.to_string(), "12345@example.com");
        assert_eq!(UserKey::parse("12345@example.com"), federated);
    }

    #[test]
    fn user_key_parse_keeps_last_at() {
        let key = UserKey::parse("user@name@example.com");
        assert_eq!(key.id, "user@name");
        assert_eq!(key.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn web_link_prefers_federated_host() {
        let local = User {
            key: UserKey::new("1"),
            name: "One".into(),
            screen_name: "one".into(),
        };
        assert_eq!(local.web_link(), "https://twitter.com/one");

        let remote = User {
            key: UserKey::with_host("2", "example.com"),
            name: "Two".into(),
            screen_name: "two".into(),
        };
        assert_eq!(remote.web_link(), "https://example.com/@two");
    }

    #[test]
    fn scope_regions_are_disjoint() {
        use filter_scope::*;
        assert_eq!(MASK_SCOPE & MASK_TARGET, 0);
        assert_eq!(ALL & MASK_SCOPE, ALL);
        assert_eq!(TARGET_TEXT & MASK_TARGET, TARGET_TEXT);
    }
}
