/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use kestrel_model::filter_flags;

/// Multiplier applied to the retention limit for shared cache tables,
/// which are not account-scoped.
pub const CACHE_RETENTION_MULTIPLIER: u32 = 20;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoreConfig {
    /// Rows kept per account and table by the retention sweeper.
    pub item_limit: Option<u32>,
    /// Hide statuses quoting a deleted or protected status.
    pub filter_unavailable_quotes: Option<bool>,
    /// Hide statuses the origin marked possibly sensitive.
    pub filter_possibly_sensitive: Option<bool>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            item_limit: Some(100),
            filter_unavailable_quotes: Some(false),
            filter_possibly_sensitive: Some(false),
        }
    }
}

impl StoreConfig {
    pub fn item_limit(&self) -> u32 {
        self.item_limit.unwrap_or(100).max(1)
    }

    pub fn cache_item_limit(&self) -> u32 {
        self.item_limit().saturating_mul(CACHE_RETENTION_MULTIPLIER)
    }

    /// Bitmask of status flags the current sensitivity toggles exclude.
    pub fn filter_flags(&self) -> i64 {
        let mut flags = 0;
        if self.filter_unavailable_quotes.unwrap_or(false) {
            flags |= filter_flags::QUOTE_NOT_AVAILABLE;
        }
        if self.filter_possibly_sensitive.unwrap_or(false) {
            flags |= filter_flags::POSSIBLY_SENSITIVE;
        }
        flags
    }
}
