/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Shared fixtures for the store tests.

use crate::db::ClientDb;
use kestrel_model::{Activity, Status, UserKey};
use tempfile::TempDir;

/// Fresh store in a temp directory. Keep the `TempDir` alive for the
/// duration of the test or the database file disappears.
pub fn test_db() -> (TempDir, ClientDb) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = ClientDb::open(dir.path().join("kestrel.db")).expect("open test db");
    (dir, db)
}

/// Minimal status row; `sort_id` and `position_key` mirror the
/// timestamp, which is how most remote feeds behave.
pub fn status(account: &str, id: &str, timestamp: i64) -> Status {
    Status {
        account_key: UserKey::parse(account),
        id: id.to_string(),
        sort_id: timestamp,
        position_key: timestamp,
        timestamp,
        ..Status::default()
    }
}

pub fn activity(account: &str, action: &str, timestamp: i64) -> Activity {
    Activity {
        account_key: UserKey::parse(account),
        timestamp,
        action: action.to_string(),
        min_sort_position: timestamp,
        max_sort_position: timestamp,
        ..Activity::default()
    }
}
