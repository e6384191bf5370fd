/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Content filtering: predicate construction and rule mutation.
//!
//! Rows carry denormalized match targets (`filter_users`, `filter_texts`,
//! ...) written at sync time; filtering joins them against the rule
//! tables inside an excluded-id subquery. The delimited-list helpers here
//! are the single source of truth for the serialization both paths use —
//! if they disagree, filtering silently stops matching.

use crate::config::StoreConfig;
use crate::db::ClientDb;
use crate::expr::{Expr, Select};
use anyhow::{Context, Result};
use kestrel_model::{filter_scope, FilterBaseItem, FilterUserItem, User, UserKey};
use rusqlite::params;

/// Delimiter for the denormalized list fields. Lists are written with a
/// leading and trailing delimiter (`"\nA\nB\n"`) so a whole-token match
/// can anchor on both sides.
pub const LIST_DELIMITER: char = '\n';

/// Serializes values for a delimited match field. An empty list yields
/// the empty string, which no anchored pattern matches.
pub fn join_delimited<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for value in values {
        if out.is_empty() {
            out.push(LIST_DELIMITER);
        }
        out.push_str(value);
        out.push(LIST_DELIMITER);
    }
    out
}

/// `data LIKE '%' || char(10) || rule || char(10) || '%'` — the rule
/// value must appear as a whole delimited token.
fn delimited_match(data_column: String, rule_column: &str) -> Expr {
    Expr::like_fragment(
        data_column,
        format!("'%' || char(10) || {rule_column} || char(10) || '%'"),
    )
}

/// Plain substring containment.
fn contains(data_column: String, rule_column: &str) -> Expr {
    Expr::like_fragment(data_column, format!("'%' || {rule_column} || '%'"))
}

/// A rule participates when its scope region is empty (applies
/// everywhere) or intersects the requesting context.
fn scope_matches(rule_table: &str, scopes: i64) -> Expr {
    Expr::or(vec![
        Expr::fragment(format!(
            "({rule_table}.scope & {}) = 0",
            filter_scope::MASK_SCOPE
        )),
        Expr::fragment(format!("({rule_table}.scope & {scopes}) != 0")),
    ])
}

fn target_bit_set(rule_table: &str, bit: i64) -> Expr {
    Expr::fragment(format!("({rule_table}.scope & {bit}) != 0"))
}

/// Builds the WHERE-clause conjunct that hides filtered content.
///
/// Four rule categories each contribute an excluded-id subquery joining
/// `table` against their rule table; the union of those ids is removed
/// from the result unless the row is a gap marker, which always
/// survives. `scopes` is the requesting context's scope bits; `extra` is
/// AND-combined when present.
pub fn build_status_filter_where_clause(
    config: &StoreConfig,
    table: &str,
    extra: Option<Expr>,
    scopes: i64,
) -> Expr {
    let users_where = Expr::and(vec![
        scope_matches("filtered_users", scopes),
        delimited_match(format!("{table}.filter_users"), "filtered_users.user_key"),
    ]);
    let sources_where = Expr::and(vec![
        scope_matches("filtered_sources", scopes),
        delimited_match(format!("{table}.filter_sources"), "filtered_sources.value"),
    ]);
    // Text is the default keyword target: a rule with no target bits set
    // matches text. Name and description need their explicit bit.
    let keywords_where = Expr::or(vec![
        Expr::and(vec![
            Expr::or(vec![
                Expr::fragment(format!(
                    "(filtered_keywords.scope & {}) = 0",
                    filter_scope::MASK_TARGET
                )),
                target_bit_set("filtered_keywords", filter_scope::TARGET_TEXT),
            ]),
            scope_matches("filtered_keywords", scopes),
            contains(format!("{table}.filter_texts"), "filtered_keywords.value"),
        ]),
        Expr::and(vec![
            target_bit_set("filtered_keywords", filter_scope::TARGET_NAME),
            scope_matches("filtered_keywords", scopes),
            delimited_match(format!("{table}.filter_names"), "filtered_keywords.value"),
        ]),
        Expr::and(vec![
            target_bit_set("filtered_keywords", filter_scope::TARGET_DESCRIPTION),
            scope_matches("filtered_keywords", scopes),
            contains(
                format!("{table}.filter_descriptions"),
                "filtered_keywords.value",
            ),
        ]),
    ]);
    let links_where = Expr::and(vec![
        scope_matches("filtered_links", scopes),
        contains(format!("{table}.filter_links"), "filtered_links.value"),
    ]);

    let excluded_ids = Select::new()
        .column(format!("{table}._id"))
        .from(table)
        .from("filtered_users")
        .filter(users_where)
        .union(
            Select::new()
                .column(format!("{table}._id"))
                .from(table)
                .from("filtered_sources")
                .filter(sources_where),
        )
        .union(
            Select::new()
                .column(format!("{table}._id"))
                .from(table)
                .from("filtered_keywords")
                .filter(keywords_where),
        )
        .union(
            Select::new()
                .column(format!("{table}._id"))
                .from(table)
                .from("filtered_links")
                .filter(links_where),
        );

    let flags = config.filter_flags();
    let filter_expression = Expr::or(vec![
        Expr::and(vec![
            Expr::fragment(format!("({table}.filter_flags & {flags}) = 0")),
            Expr::not_in_select(format!("{table}._id"), excluded_ids),
        ]),
        Expr::fragment(format!("{table}.is_gap = 1")),
    ]);
    match extra {
        Some(extra) => Expr::and(vec![filter_expression, extra]),
        None => filter_expression,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    Keyword,
    Source,
    Link,
}

impl RuleCategory {
    pub fn table(self) -> &'static str {
        match self {
            RuleCategory::Keyword => "filtered_keywords",
            RuleCategory::Source => "filtered_sources",
            RuleCategory::Link => "filtered_links",
        }
    }
}

pub fn insert_user_rule(db: &ClientDb, item: &FilterUserItem) -> Result<()> {
    let conn = db.conn()?;
    conn.execute(
        "INSERT INTO filtered_users (user_key, name, screen_name, scope) \
         VALUES (?1, ?2, ?3, ?4)",
        params![
            item.user_key.to_string(),
            item.name,
            item.screen_name,
            item.scope
        ],
    )?;
    Ok(())
}

pub fn insert_rule(db: &ClientDb, category: RuleCategory, item: &FilterBaseItem) -> Result<()> {
    let conn = db.conn()?;
    conn.execute(
        &format!(
            "INSERT INTO {} (value, user_key, scope) VALUES (?1, ?2, ?3)",
            category.table()
        ),
        params![
            item.value,
            item.user_key.as_ref().map(ToString::to_string),
            item.scope
        ],
    )?;
    Ok(())
}

/// Blocks `users`. With `filter_anywhere`, each user also gets a derived
/// keyword rule (their mention) and a derived link rule (their profile
/// link without scheme), so mentions and shares are caught too. Each
/// category is one transaction; categories already committed stay
/// committed if a later one fails.
pub fn add_to_filter(db: &ClientDb, users: &[User], filter_anywhere: bool) -> Result<()> {
    let mut conn = db.conn()?;

    {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO filtered_users (user_key, name, screen_name, scope) \
                 VALUES (?1, ?2, ?3, 0)",
            )?;
            for user in users {
                stmt.execute(params![user.key.to_string(), user.name, user.screen_name])?;
            }
        }
        tx.commit().context("insert blocked user rules")?;
    }

    if !filter_anywhere {
        return Ok(());
    }

    {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO filtered_keywords (value, user_key, scope) VALUES (?1, ?2, 0)",
            )?;
            for user in users {
                let mention = format!("@{}", user.screen_name);
                stmt.execute(params![mention, user.key.to_string()])?;
            }
        }
        tx.commit().context("insert derived keyword rules")?;
    }

    {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO filtered_links (value, user_key, scope) VALUES (?1, ?2, 0)",
            )?;
            for user in users {
                let link = user.web_link();
                let without_scheme = link
                    .split_once("://")
                    .map(|(_, rest)| rest)
                    .unwrap_or(&link);
                stmt.execute(params![without_scheme, user.key.to_string()])?;
            }
        }
        tx.commit().context("insert derived link rules")?;
    }

    Ok(())
}

/// Removes every rule owned by `users` across all three categories,
/// whether added directly or derived.
pub fn remove_from_filter(db: &ClientDb, users: &[User]) -> Result<()> {
    let keys = crate::db::key_values(&users.iter().map(|u| u.key.clone()).collect::<Vec<_>>());
    let conn = db.conn()?;
    for table in ["filtered_users", "filtered_keywords", "filtered_links"] {
        let (sql, args) = Expr::in_args("user_key", keys.clone()).render();
        conn.execute(
            &format!("DELETE FROM {table} WHERE {sql}"),
            rusqlite::params_from_iter(args),
        )?;
    }
    Ok(())
}

pub fn is_filtering_user(db: &ClientDb, key: &UserKey) -> Result<bool> {
    let count = db.query_count(
        "filtered_users",
        &Expr::eq_arg("user_key", key.to_string()),
    )?;
    Ok(count > 0)
}
