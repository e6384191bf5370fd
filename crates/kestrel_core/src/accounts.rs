/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use kestrel_model::{AccountDetails, UserKey};

/// Account management collaborator. Credential storage and account
/// lifecycle live outside this crate; the core only reads metadata.
pub trait AccountDirectory {
    fn list_accounts(&self) -> Vec<UserKey>;

    /// Whether the account authenticates as a first-party client, which
    /// changes what the remote activity feed can return.
    fn is_official(&self, key: &UserKey) -> bool;

    fn account_details(&self, key: &UserKey) -> Option<AccountDetails>;
}

/// Directory backed by a fixed account list. Enough for embedders that
/// resolve accounts up front, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticAccountDirectory {
    accounts: Vec<AccountDetails>,
}

impl StaticAccountDirectory {
    pub fn new(accounts: Vec<AccountDetails>) -> Self {
        Self { accounts }
    }
}

impl AccountDirectory for StaticAccountDirectory {
    fn list_accounts(&self) -> Vec<UserKey> {
        self.accounts.iter().map(|a| a.key.clone()).collect()
    }

    fn is_official(&self, key: &UserKey) -> bool {
        self.accounts
            .iter()
            .any(|a| &a.key == key && a.official)
    }

    fn account_details(&self, key: &UserKey) -> Option<AccountDetails> {
        self.accounts.iter().find(|a| &a.key == key).cloned()
    }
}
