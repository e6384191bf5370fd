/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use kestrel_model::{AccountDetails, Status, UserKey};

/// Errors surfaced by the cache-then-fetch read path. Remote failures
/// propagate to the caller untouched; retry policy belongs to the sync
/// layer, not this crate.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no account matching {0}")]
    NoAccount(UserKey),
    #[error("remote fetch failed: {0}")]
    Remote(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Network collaborator that resolves a single status not present in any
/// local table. Implementations block; callers schedule off the UI
/// thread.
pub trait StatusFetcher {
    fn fetch_status(
        &self,
        account: &AccountDetails,
        status_id: &str,
    ) -> Result<Status, FetchError>;
}
