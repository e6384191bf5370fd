/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Resource locators and the locator-to-table router.
//!
//! Locators name timelines, caches, filter rule sets and a handful of
//! virtual control paths. The router maps them to [`TableId`]s through a
//! registry of exact and single-trailing-wildcard patterns built once at
//! construction; it is never mutated afterwards, so concurrent reads need
//! no synchronization.

use std::fmt;

pub const SCHEME: &str = "kestrel://";

/// Registered locator paths.
pub mod paths {
    pub const HOME_TIMELINE: &str = "statuses/home_timeline";
    pub const FAVORITES: &str = "statuses/favorites";
    pub const USER_TIMELINE: &str = "statuses/user_timeline";
    pub const LIST_TIMELINE: &str = "statuses/list_timeline";
    pub const SEARCH_TIMELINE: &str = "statuses/search_timeline";
    pub const PUBLIC_TIMELINE: &str = "statuses/public_timeline";

    pub const ACTIVITIES_ABOUT_ME: &str = "activities/about_me";

    pub const MESSAGES: &str = "messages";
    pub const MESSAGE_CONVERSATIONS: &str = "messages/conversations";

    pub const CACHED_STATUSES: &str = "cached_statuses";
    pub const CACHED_USERS: &str = "cached_users";
    pub const CACHED_HASHTAGS: &str = "cached_hashtags";

    pub const FILTERED_USERS: &str = "filters/users";
    pub const FILTERED_KEYWORDS: &str = "filters/keywords";
    pub const FILTERED_SOURCES: &str = "filters/sources";
    pub const FILTERED_LINKS: &str = "filters/links";

    pub const DATABASE_PREPARE: &str = "database_prepare";
    pub const NULL: &str = "null";
    pub const EMPTY: &str = "empty";
    pub const RAW_QUERY: &str = "raw_query";
    pub const SUGGESTIONS_AUTO_COMPLETE: &str = "suggestions/auto_complete";
    pub const SUGGESTIONS_SEARCH: &str = "suggestions/search";
}

/// An immutable, parsed resource locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceLocator {
    raw: String,
    segments: Vec<String>,
}

impl ResourceLocator {
    /// Accepts both `kestrel://statuses/home_timeline` and the bare path.
    pub fn parse(input: &str) -> Self {
        let path = input.strip_prefix(SCHEME).unwrap_or(input);
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            raw: input.to_string(),
            segments,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Identity of a physical or virtual table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableId {
    HomeTimeline,
    Favorites,
    UserTimeline,
    ListTimeline,
    SearchTimeline,
    PublicTimeline,
    ActivitiesAboutMe,
    Messages,
    MessageConversations,
    CachedStatuses,
    CachedUsers,
    CachedHashtags,
    FilteredUsers,
    FilteredKeywords,
    FilteredSources,
    FilteredLinks,
    VirtualDatabasePrepare,
    VirtualNull,
    VirtualEmpty,
    VirtualRawQuery,
    VirtualSuggestionsAutoComplete,
    VirtualSuggestionsSearch,
}

impl TableId {
    /// Physical table name, or `None` for virtual/control identities.
    pub fn table_name(self) -> Option<&'static str> {
        match self {
            TableId::HomeTimeline => Some("home_timeline"),
            TableId::Favorites => Some("favorites"),
            TableId::UserTimeline => Some("user_timeline"),
            TableId::ListTimeline => Some("list_timeline"),
            TableId::SearchTimeline => Some("search_timeline"),
            TableId::PublicTimeline => Some("public_timeline"),
            TableId::ActivitiesAboutMe => Some("activities_about_me"),
            TableId::Messages => Some("messages"),
            TableId::MessageConversations => Some("messages_conversations"),
            TableId::CachedStatuses => Some("cached_statuses"),
            TableId::CachedUsers => Some("cached_users"),
            TableId::CachedHashtags => Some("cached_hashtags"),
            TableId::FilteredUsers => Some("filtered_users"),
            TableId::FilteredKeywords => Some("filtered_keywords"),
            TableId::FilteredSources => Some("filtered_sources"),
            TableId::FilteredLinks => Some("filtered_links"),
            TableId::VirtualDatabasePrepare
            | TableId::VirtualNull
            | TableId::VirtualEmpty
            | TableId::VirtualRawQuery
            | TableId::VirtualSuggestionsAutoComplete
            | TableId::VirtualSuggestionsSearch => None,
        }
    }
}

/// Account-scoped status timelines, in probe order.
pub const STATUS_TABLES: [TableId; 6] = [
    TableId::HomeTimeline,
    TableId::Favorites,
    TableId::UserTimeline,
    TableId::ListTimeline,
    TableId::SearchTimeline,
    TableId::PublicTimeline,
];

pub const ACTIVITY_TABLES: [TableId; 1] = [TableId::ActivitiesAboutMe];

/// Shared caches, not account-scoped for retention purposes.
pub const CACHE_TABLES: [TableId; 3] = [
    TableId::CachedStatuses,
    TableId::CachedUsers,
    TableId::CachedHashtags,
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `#` — one numeric segment.
    Number,
    /// `*` — one opaque segment.
    Any,
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == segment,
            Segment::Number => {
                !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
            }
            Segment::Any => !segment.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
    exact: bool,
    id: TableId,
}

/// Static locator registry. Exact patterns always win over wildcard
/// patterns; unmatched locators resolve to `None`, which is not an error.
#[derive(Debug, Clone)]
pub struct TableRouter {
    patterns: Vec<Pattern>,
}

impl TableRouter {
    pub fn new() -> Self {
        let mut router = Self::empty();

        router.add(paths::HOME_TIMELINE, TableId::HomeTimeline);
        router.add(paths::PUBLIC_TIMELINE, TableId::PublicTimeline);

        router.add(paths::FAVORITES, TableId::Favorites);
        router.add(paths::USER_TIMELINE, TableId::UserTimeline);
        router.add(paths::LIST_TIMELINE, TableId::ListTimeline);
        router.add(paths::SEARCH_TIMELINE, TableId::SearchTimeline);

        // Suffixed forms address one timeline instance (a user id, a list
        // id, a search id); they share the backing table.
        router.add(&format!("{}/#", paths::FAVORITES), TableId::Favorites);
        router.add(&format!("{}/#", paths::USER_TIMELINE), TableId::UserTimeline);
        router.add(&format!("{}/#", paths::LIST_TIMELINE), TableId::ListTimeline);
        router.add(&format!("{}/#", paths::SEARCH_TIMELINE), TableId::SearchTimeline);

        router.add(paths::ACTIVITIES_ABOUT_ME, TableId::ActivitiesAboutMe);
        router.add(paths::MESSAGES, TableId::Messages);
        router.add(paths::MESSAGE_CONVERSATIONS, TableId::MessageConversations);

        router.add(paths::CACHED_STATUSES, TableId::CachedStatuses);
        router.add(paths::CACHED_USERS, TableId::CachedUsers);
        router.add(paths::CACHED_HASHTAGS, TableId::CachedHashtags);

        router.add(paths::FILTERED_USERS, TableId::FilteredUsers);
        router.add(paths::FILTERED_KEYWORDS, TableId::FilteredKeywords);
        router.add(paths::FILTERED_SOURCES, TableId::FilteredSources);
        router.add(paths::FILTERED_LINKS, TableId::FilteredLinks);

        router.add(paths::DATABASE_PREPARE, TableId::VirtualDatabasePrepare);
        router.add(paths::NULL, TableId::VirtualNull);
        router.add(paths::EMPTY, TableId::VirtualEmpty);
        router.add(&format!("{}/*", paths::RAW_QUERY), TableId::VirtualRawQuery);
        router.add(
            paths::SUGGESTIONS_AUTO_COMPLETE,
            TableId::VirtualSuggestionsAutoComplete,
        );
        router.add(paths::SUGGESTIONS_SEARCH, TableId::VirtualSuggestionsSearch);

        router
    }

    fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    fn add(&mut self, path: &str, id: TableId) {
        let segments: Vec<Segment> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "#" => Segment::Number,
                "*" => Segment::Any,
                lit => Segment::Literal(lit.to_string()),
            })
            .collect();
        let exact = segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)));
        self.patterns.push(Pattern { segments, exact, id });
    }

    pub fn resolve(&self, locator: &ResourceLocator) -> Option<TableId> {
        self.lookup(locator, true)
            .or_else(|| self.lookup(locator, false))
    }

    /// Table name behind a locator; `None` for unmatched and virtual ids.
    pub fn table_name(&self, locator: &ResourceLocator) -> Option<&'static str> {
        self.resolve(locator)?.table_name()
    }

    fn lookup(&self, locator: &ResourceLocator, exact: bool) -> Option<TableId> {
        let segments = locator.segments();
        self.patterns
            .iter()
            .filter(|p| p.exact == exact)
            .find(|p| {
                p.segments.len() == segments.len()
                    && p.segments
                        .iter()
                        .zip(segments)
                        .all(|(pattern, segment)| pattern.matches(segment))
            })
            .map(|p| p.id)
    }
}

impl Default for TableRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_paths_resolve_idempotently() {
        let router = TableRouter::new();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        assert_eq!(router.resolve(&home), Some(TableId::HomeTimeline));
        assert_eq!(router.resolve(&home), Some(TableId::HomeTimeline));
        assert_eq!(router.table_name(&home), Some("home_timeline"));
    }

    #[test]
    fn scheme_prefix_is_accepted() {
        let router = TableRouter::new();
        let loc = ResourceLocator::parse("kestrel://statuses/favorites");
        assert_eq!(router.resolve(&loc), Some(TableId::Favorites));
    }

    #[test]
    fn unregistered_paths_resolve_to_none() {
        let router = TableRouter::new();
        let loc = ResourceLocator::parse("statuses/unknown_timeline");
        assert_eq!(router.resolve(&loc), None);
    }

    #[test]
    fn numeric_wildcard_matches_any_suffix() {
        let router = TableRouter::new();
        for suffix in ["123", "456"] {
            let loc = ResourceLocator::parse(&format!("{}/{}", paths::USER_TIMELINE, suffix));
            assert_eq!(router.resolve(&loc), Some(TableId::UserTimeline));
        }
        // Non-numeric suffix does not match `#`.
        let loc = ResourceLocator::parse(&format!("{}/abc", paths::USER_TIMELINE));
        assert_eq!(router.resolve(&loc), None);
    }

    #[test]
    fn opaque_wildcard_matches_any_segment() {
        let router = TableRouter::new();
        let loc = ResourceLocator::parse("raw_query/select-something");
        assert_eq!(router.resolve(&loc), Some(TableId::VirtualRawQuery));
    }

    #[test]
    fn exact_registration_beats_wildcard() {
        let mut router = TableRouter::empty();
        router.add("base/#", TableId::UserTimeline);
        router.add("base/1", TableId::HomeTimeline);

        let exact = ResourceLocator::parse("base/1");
        let wild = ResourceLocator::parse("base/2");
        assert_eq!(router.resolve(&exact), Some(TableId::HomeTimeline));
        assert_eq!(router.resolve(&wild), Some(TableId::UserTimeline));
    }

    #[test]
    fn virtual_ids_have_no_table() {
        let router = TableRouter::new();
        let loc = ResourceLocator::parse(paths::DATABASE_PREPARE);
        assert_eq!(router.resolve(&loc), Some(TableId::VirtualDatabasePrepare));
        assert_eq!(router.table_name(&loc), None);
    }
}
