/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Multi-account extremal-field aggregation.
//!
//! Incremental sync needs, per account, the value of one column taken
//! from the newest or oldest row of a table: the newest status id, the
//! oldest pagination position, and so on. One grouped query answers all
//! accounts at once; results scatter back positionally, so the output
//! always has the same length as the input and `None` slots stay `None`.
//!
//! The aggregate is placed in the SELECT list (`MAX(order) AS _extremal`)
//! so SQLite guarantees the bare `value` column comes from the extremal
//! row of each group.

use crate::accounts::AccountDirectory;
use crate::db::{self, ClientDb};
use crate::expr::{Expr, Select};
use crate::locator::{paths, ResourceLocator};
use anyhow::Result;
use kestrel_model::{activity_action, UserKey};
use rusqlite::params_from_iter;
use rusqlite::types::{FromSql, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Newest,
    Oldest,
}

impl Direction {
    fn aggregate(self) -> &'static str {
        match self {
            Direction::Newest => "MAX",
            Direction::Oldest => "MIN",
        }
    }
}

/// One grouped query per call: `(account_key, value, MAX|MIN(order))`
/// grouped by account, restricted to the present input keys. Returns a
/// map for positional scatter; duplicate input keys share the entry.
fn extremal_by_account<T: FromSql>(
    db: &ClientDb,
    table: &str,
    value_column: &str,
    order_column: &str,
    direction: Direction,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<HashMap<UserKey, T>> {
    let present: Vec<UserKey> = account_keys.iter().flatten().cloned().collect();
    if present.is_empty() {
        return Ok(HashMap::new());
    }

    let mut select = Select::new()
        .column("account_key")
        .column(value_column)
        .column(format!(
            "{}({}) AS _extremal",
            direction.aggregate(),
            order_column
        ))
        .from(table);
    if let Some(extra) = extra {
        select = select.filter(extra.clone());
    }
    let select = select
        .group_by("account_key")
        .having(Expr::in_args("account_key", db::key_values(&present)));

    let (sql, args) = select.render();
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(args))?;
    let mut found = HashMap::new();
    while let Some(row) = rows.next()? {
        let key = UserKey::parse(&row.get::<_, String>(0)?);
        let value: T = row.get(1)?;
        found.insert(key, value);
    }
    Ok(found)
}

/// String-valued variant; missing accounts and `None` slots yield `None`.
pub fn string_field_array(
    db: &ClientDb,
    table: &str,
    value_column: &str,
    order_column: &str,
    direction: Direction,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let found: HashMap<UserKey, Option<String>> = extremal_by_account(
        db,
        table,
        value_column,
        order_column,
        direction,
        extra,
        account_keys,
    )?;
    Ok(account_keys
        .iter()
        .map(|slot| {
            slot.as_ref()
                .and_then(|key| found.get(key).cloned().flatten())
        })
        .collect())
}

/// Integer-valued variant; missing accounts and `None` slots yield `0`.
pub fn long_field_array(
    db: &ClientDb,
    table: &str,
    value_column: &str,
    order_column: &str,
    direction: Direction,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let found: HashMap<UserKey, i64> = extremal_by_account(
        db,
        table,
        value_column,
        order_column,
        direction,
        extra,
        account_keys,
    )?;
    Ok(account_keys
        .iter()
        .map(|slot| {
            slot.as_ref()
                .and_then(|key| found.get(key).copied())
                .unwrap_or(0)
        })
        .collect())
}

pub fn newest_status_ids(
    db: &ClientDb,
    locator: &ResourceLocator,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let table = db.table_for(locator)?;
    string_field_array(db, table, "id", "position_key", Direction::Newest, None, account_keys)
}

pub fn oldest_status_ids(
    db: &ClientDb,
    locator: &ResourceLocator,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let table = db.table_for(locator)?;
    string_field_array(db, table, "id", "position_key", Direction::Oldest, None, account_keys)
}

pub fn newest_status_sort_ids(
    db: &ClientDb,
    locator: &ResourceLocator,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let table = db.table_for(locator)?;
    long_field_array(db, table, "sort_id", "position_key", Direction::Newest, None, account_keys)
}

pub fn oldest_status_sort_ids(
    db: &ClientDb,
    locator: &ResourceLocator,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let table = db.table_for(locator)?;
    long_field_array(db, table, "sort_id", "position_key", Direction::Oldest, None, account_keys)
}

fn activities_table(db: &ClientDb) -> Result<&'static str> {
    db.table_for(&ResourceLocator::parse(paths::ACTIVITIES_ABOUT_ME))
}

/// Pagination cursor of the newest activity per account. `extra`
/// restricts which activity rows count.
pub fn newest_activity_max_positions(
    db: &ClientDb,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let table = activities_table(db)?;
    string_field_array(
        db,
        table,
        "max_request_position",
        "timestamp",
        Direction::Newest,
        extra,
        account_keys,
    )
}

pub fn oldest_activity_max_positions(
    db: &ClientDb,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let table = activities_table(db)?;
    string_field_array(
        db,
        table,
        "max_request_position",
        "timestamp",
        Direction::Oldest,
        extra,
        account_keys,
    )
}

pub fn newest_activity_max_sort_positions(
    db: &ClientDb,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let table = activities_table(db)?;
    long_field_array(
        db,
        table,
        "max_sort_position",
        "timestamp",
        Direction::Newest,
        extra,
        account_keys,
    )
}

pub fn oldest_activity_max_sort_positions(
    db: &ClientDb,
    extra: Option<&Expr>,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let table = activities_table(db)?;
    long_field_array(
        db,
        table,
        "max_sort_position",
        "timestamp",
        Direction::Oldest,
        extra,
        account_keys,
    )
}

pub fn newest_message_ids(
    db: &ClientDb,
    account_keys: &[Option<UserKey>],
    outgoing: bool,
) -> Result<Vec<Option<String>>> {
    let extra = Expr::eq_arg("is_outgoing", outgoing);
    string_field_array(
        db,
        "messages",
        "message_id",
        "local_timestamp",
        Direction::Newest,
        Some(&extra),
        account_keys,
    )
}

pub fn oldest_message_ids(
    db: &ClientDb,
    account_keys: &[Option<UserKey>],
    outgoing: bool,
) -> Result<Vec<Option<String>>> {
    let extra = Expr::eq_arg("is_outgoing", outgoing);
    string_field_array(
        db,
        "messages",
        "message_id",
        "local_timestamp",
        Direction::Oldest,
        Some(&extra),
        account_keys,
    )
}

/// Splits slots into an official and a third-party view of the same
/// length; each present key appears in exactly one of the two.
fn partition_by_official(
    directory: &dyn AccountDirectory,
    account_keys: &[Option<UserKey>],
) -> (Vec<Option<UserKey>>, Vec<Option<UserKey>>) {
    let mut official = Vec::with_capacity(account_keys.len());
    let mut third_party = Vec::with_capacity(account_keys.len());
    for slot in account_keys {
        match slot {
            Some(key) if directory.is_official(key) => {
                official.push(Some(key.clone()));
                third_party.push(None);
            }
            Some(key) => {
                official.push(None);
                third_party.push(Some(key.clone()));
            }
            None => {
                official.push(None);
                third_party.push(None);
            }
        }
    }
    (official, third_party)
}

fn mention_actions_only() -> Expr {
    Expr::in_args(
        "action",
        activity_action::MENTION_ACTIONS
            .iter()
            .map(|a| Value::from(a.to_string()))
            .collect(),
    )
}

/// Refresh cursors for a mixed account set. Official accounts see the
/// full activity feed; third-party accounts only ever receive the
/// mention-class actions, so their cursor must ignore everything else
/// or refresh would skip past unseen mentions.
pub fn refresh_newest_activity_max_positions(
    db: &ClientDb,
    directory: &dyn AccountDirectory,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let (official, third_party) = partition_by_official(directory, account_keys);
    let full = newest_activity_max_positions(db, None, &official)?;
    let mentions = newest_activity_max_positions(db, Some(&mention_actions_only()), &third_party)?;
    Ok(merge_strings(full, mentions))
}

pub fn refresh_oldest_activity_max_positions(
    db: &ClientDb,
    directory: &dyn AccountDirectory,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<Option<String>>> {
    let (official, third_party) = partition_by_official(directory, account_keys);
    let full = oldest_activity_max_positions(db, None, &official)?;
    let mentions = oldest_activity_max_positions(db, Some(&mention_actions_only()), &third_party)?;
    Ok(merge_strings(full, mentions))
}

pub fn refresh_newest_activity_max_sort_positions(
    db: &ClientDb,
    directory: &dyn AccountDirectory,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let (official, third_party) = partition_by_official(directory, account_keys);
    let full = newest_activity_max_sort_positions(db, None, &official)?;
    let mentions =
        newest_activity_max_sort_positions(db, Some(&mention_actions_only()), &third_party)?;
    Ok(merge_longs(full, mentions))
}

pub fn refresh_oldest_activity_max_sort_positions(
    db: &ClientDb,
    directory: &dyn AccountDirectory,
    account_keys: &[Option<UserKey>],
) -> Result<Vec<i64>> {
    let (official, third_party) = partition_by_official(directory, account_keys);
    let full = oldest_activity_max_sort_positions(db, None, &official)?;
    let mentions =
        oldest_activity_max_sort_positions(db, Some(&mention_actions_only()), &third_party)?;
    Ok(merge_longs(full, mentions))
}

fn merge_strings(
    first: Vec<Option<String>>,
    second: Vec<Option<String>>,
) -> Vec<Option<String>> {
    first
        .into_iter()
        .zip(second)
        .map(|(a, b)| a.or(b))
        .collect()
}

// Note the differing blank policies: strings fall through on None,
// numbers on any non-positive value.
fn merge_longs(first: Vec<i64>, second: Vec<i64>) -> Vec<i64> {
    first
        .into_iter()
        .zip(second)
        .map(|(a, b)| if a > 0 { a } else { b })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::StaticAccountDirectory;
    use crate::testutil::{activity, status, test_db};
    use kestrel_model::{AccountDetails, AccountType, Activity};

    fn home() -> ResourceLocator {
        ResourceLocator::parse(paths::HOME_TIMELINE)
    }

    fn some_keys(ids: &[Option<&str>]) -> Vec<Option<UserKey>> {
        ids.iter().map(|id| id.map(UserKey::new)).collect()
    }

    fn activity_with_position(
        account: &str,
        action: &str,
        timestamp: i64,
        position: &str,
    ) -> Activity {
        let mut a = activity(account, action, timestamp);
        a.max_request_position = Some(position.to_string());
        a
    }

    #[test]
    fn scatter_preserves_positions_and_duplicates() {
        let (_dir, db) = test_db();
        for (id, ts) in [("a1", 10), ("a2", 20)] {
            db.insert_status(&home(), &status("a", id, ts)).unwrap();
        }
        db.insert_status(&home(), &status("b", "b1", 5)).unwrap();

        let keys = some_keys(&[Some("a"), None, Some("b"), Some("a")]);
        let newest = newest_status_ids(&db, &home(), &keys).unwrap();
        assert_eq!(
            newest,
            vec![
                Some("a2".to_string()),
                None,
                Some("b1".to_string()),
                Some("a2".to_string()),
            ]
        );

        let oldest = oldest_status_ids(&db, &home(), &keys).unwrap();
        assert_eq!(oldest[0], Some("a1".to_string()));
    }

    #[test]
    fn all_none_input_yields_all_none() {
        let (_dir, db) = test_db();
        let keys = some_keys(&[None, None]);
        assert_eq!(newest_status_ids(&db, &home(), &keys).unwrap(), vec![None, None]);
        assert_eq!(newest_status_sort_ids(&db, &home(), &keys).unwrap(), vec![0, 0]);
    }

    #[test]
    fn absent_account_defaults_to_zero_sort_id() {
        let (_dir, db) = test_db();
        db.insert_status(&home(), &status("a", "a1", 7)).unwrap();

        let keys = some_keys(&[Some("a"), Some("ghost")]);
        let sort_ids = newest_status_sort_ids(&db, &home(), &keys).unwrap();
        assert_eq!(sort_ids, vec![7, 0]);
    }

    #[test]
    fn message_ids_split_by_direction_flag() {
        let (_dir, db) = test_db();
        for (id, ts, outgoing) in [("in1", 10, false), ("out1", 20, true), ("in2", 30, false)] {
            db.insert_message(&kestrel_model::Message {
                account_key: UserKey::new("a"),
                message_id: id.to_string(),
                conversation_id: "c".to_string(),
                local_timestamp: ts,
                is_outgoing: outgoing,
                text_plain: String::new(),
            })
            .unwrap();
        }

        let keys = some_keys(&[Some("a")]);
        assert_eq!(
            newest_message_ids(&db, &keys, false).unwrap(),
            vec![Some("in2".to_string())]
        );
        assert_eq!(
            newest_message_ids(&db, &keys, true).unwrap(),
            vec![Some("out1".to_string())]
        );
        assert_eq!(
            oldest_message_ids(&db, &keys, false).unwrap(),
            vec![Some("in1".to_string())]
        );
    }

    #[test]
    fn refresh_restricts_third_party_to_mentions() {
        let (_dir, db) = test_db();
        // Both accounts hold a newer follow and an older mention.
        for account in ["off", "third"] {
            db.insert_activity(&activity_with_position(
                account,
                kestrel_model::activity_action::FOLLOW,
                20,
                "follow-pos",
            ))
            .unwrap();
            db.insert_activity(&activity_with_position(
                account,
                kestrel_model::activity_action::MENTION,
                10,
                "mention-pos",
            ))
            .unwrap();
        }

        let directory = StaticAccountDirectory::new(vec![
            AccountDetails {
                key: UserKey::new("off"),
                account_type: AccountType::Microblog,
                official: true,
            },
            AccountDetails {
                key: UserKey::new("third"),
                account_type: AccountType::Microblog,
                official: false,
            },
        ]);

        let keys = some_keys(&[Some("off"), Some("third")]);
        let positions = refresh_newest_activity_max_positions(&db, &directory, &keys).unwrap();
        assert_eq!(
            positions,
            vec![Some("follow-pos".to_string()), Some("mention-pos".to_string())]
        );
    }

    #[test]
    fn refresh_sort_positions_keep_slot_order() {
        let (_dir, db) = test_db();
        db.insert_activity(&activity("off", kestrel_model::activity_action::FOLLOW, 20))
            .unwrap();
        db.insert_activity(&activity("third", kestrel_model::activity_action::MENTION, 10))
            .unwrap();

        let directory = StaticAccountDirectory::new(vec![
            AccountDetails {
                key: UserKey::new("off"),
                account_type: AccountType::Microblog,
                official: true,
            },
            AccountDetails {
                key: UserKey::new("third"),
                account_type: AccountType::Microblog,
                official: false,
            },
        ]);

        let keys = some_keys(&[Some("third"), None, Some("off")]);
        let sorts =
            refresh_newest_activity_max_sort_positions(&db, &directory, &keys).unwrap();
        assert_eq!(sorts, vec![10, 0, 20]);
    }
}
