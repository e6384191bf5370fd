/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! SQLite-backed client store.
//!
//! `ClientDb` keeps only the database path and opens a connection per
//! call; the schema is created idempotently on open. All timeline tables
//! share one column set so the filter predicate builder and the watermark
//! aggregator work uniformly across them.

use crate::accounts::AccountDirectory;
use crate::config::StoreConfig;
use crate::expr::Expr;
use crate::fetch::{FetchError, StatusFetcher};
use crate::filter;
use crate::locator::{paths, ResourceLocator, TableId, TableRouter, ACTIVITY_TABLES, STATUS_TABLES};
use anyhow::{Context, Result};
use kestrel_model::{
    activity_action, Activity, Message, MessageConversation, Status, UserFollowState, UserKey,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Tables probed by `find_status_in_database`, cache last.
const SEARCHABLE_STATUS_TABLES: [TableId; 7] = [
    TableId::HomeTimeline,
    TableId::Favorites,
    TableId::UserTimeline,
    TableId::ListTimeline,
    TableId::SearchTimeline,
    TableId::PublicTimeline,
    TableId::CachedStatuses,
];

const STATUS_COLUMNS: &str = "account_key, id, sort_id, position_key, timestamp, is_gap, \
     filter_flags, text_plain, user_name, user_screen_name, source, lang, repost_of_id, \
     filter_users, filter_sources, filter_texts, filter_names, filter_descriptions, filter_links";

#[derive(Clone)]
pub struct ClientDb {
    path: PathBuf,
    router: Arc<TableRouter>,
    sweep_lock: Arc<Mutex<()>>,
}

impl ClientDb {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .with_context(|| format!("open db: {}", path.display()))?;
        ensure_schema(&conn)?;
        Ok(Self {
            path,
            router: Arc::new(TableRouter::new()),
            sweep_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn router(&self) -> &TableRouter {
        &self.router
    }

    pub(crate) fn conn(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("open db: {}", self.path.display()))
    }

    pub(crate) fn sweep_lock(&self) -> &Mutex<()> {
        &self.sweep_lock
    }

    /// Physical table behind a locator. Callers that reach this point
    /// require one; an unresolvable locator here is a caller bug.
    pub(crate) fn table_for(&self, locator: &ResourceLocator) -> Result<&'static str> {
        self.router
            .table_name(locator)
            .with_context(|| format!("no physical table for locator {locator}"))
    }

    /// Re-runs the idempotent schema bootstrap and checks the connection.
    pub fn prepare_database(&self) -> Result<()> {
        let conn = self.conn()?;
        ensure_schema(&conn)?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    pub fn insert_status(&self, locator: &ResourceLocator, status: &Status) -> Result<()> {
        let table = self.table_for(locator)?;
        let conn = self.conn()?;
        insert_status_row(&conn, table, status)
    }

    pub fn insert_activity(&self, activity: &Activity) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activities_about_me (account_key, id, timestamp, action, \
             repost_of_id, min_request_position, max_request_position, min_sort_position, \
             max_sort_position, is_gap, filter_flags, sources, filter_users, filter_sources, \
             filter_texts, filter_names, filter_descriptions, filter_links) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18)",
            params![
                activity.account_key.to_string(),
                activity.id,
                activity.timestamp,
                activity.action,
                activity.repost_of_id,
                activity.min_request_position,
                activity.max_request_position,
                activity.min_sort_position,
                activity.max_sort_position,
                activity.is_gap,
                activity.filter_flags,
                activity.sources,
                activity.filter_users,
                activity.filter_sources,
                activity.filter_texts,
                activity.filter_names,
                activity.filter_descriptions,
                activity.filter_links,
            ],
        )?;
        Ok(())
    }

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (account_key, message_id, conversation_id, local_timestamp, \
             is_outgoing, text_plain) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.account_key.to_string(),
                message.message_id,
                message.conversation_id,
                message.local_timestamp,
                message.is_outgoing,
                message.text_plain,
            ],
        )?;
        Ok(())
    }

    pub fn insert_conversation(&self, conversation: &MessageConversation) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages_conversations (account_key, conversation_id, title, \
             local_timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation.account_key.to_string(),
                conversation.conversation_id,
                conversation.title,
                conversation.local_timestamp,
            ],
        )?;
        Ok(())
    }

    /// Rows a single account holds under a locator.
    pub fn count(&self, locator: &ResourceLocator, account_key: &UserKey) -> Result<u64> {
        let table = self.table_for(locator)?;
        self.query_count(
            table,
            &Expr::eq_arg("account_key", account_key.to_string()),
        )
    }

    /// Status rows past a threshold for a set of accounts, with content
    /// filtering applied.
    #[allow(clippy::too_many_arguments)]
    pub fn statuses_count(
        &self,
        locator: &ResourceLocator,
        config: &StoreConfig,
        extra: Option<Expr>,
        compare_column: &str,
        compare: i64,
        greater_than: bool,
        account_keys: &[UserKey],
        scopes: i64,
    ) -> Result<u64> {
        let table = self.table_for(locator)?;
        let mut parts = vec![
            Expr::in_args("account_key", key_values(account_keys)),
            if greater_than {
                Expr::gt_arg(compare_column, compare)
            } else {
                Expr::lt_arg(compare_column, compare)
            },
            filter::build_status_filter_where_clause(config, table, None, scopes),
        ];
        if let Some(extra) = extra {
            parts.push(extra);
        }
        self.query_count(table, &Expr::and(parts))
    }

    /// Activity rows since a threshold. With `following_only` the count
    /// walks rows and keeps those whose `sources` field records at least
    /// one followed user; malformed rows are skipped, not fatal.
    #[allow(clippy::too_many_arguments)]
    pub fn activities_count(
        &self,
        locator: &ResourceLocator,
        config: &StoreConfig,
        extra: Option<Expr>,
        since_column: &str,
        since: i64,
        following_only: bool,
        account_keys: &[UserKey],
        scopes: i64,
    ) -> Result<u64> {
        let table = self.table_for(locator)?;
        let mut parts = vec![
            Expr::in_args("account_key", key_values(account_keys)),
            Expr::gt_arg(since_column, since),
            filter::build_status_filter_where_clause(config, table, None, scopes),
        ];
        if let Some(extra) = extra {
            parts.push(extra);
        }
        let expr = Expr::and(parts);
        if !following_only {
            return self.query_count(table, &expr);
        }

        let (sql, args) = expr.render();
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT sources FROM {table} WHERE {sql}"))?;
        let mut rows = stmt.query(params_from_iter(args))?;
        let mut total = 0u64;
        while let Some(row) = rows.next()? {
            let raw: Option<String> = row.get(0)?;
            let Some(raw) = raw else { continue };
            if raw.is_empty() {
                continue;
            }
            match serde_json::from_str::<Vec<UserFollowState>>(&raw) {
                Ok(states) => {
                    if states.iter().any(|s| s.is_following) {
                        total += 1;
                    }
                }
                Err(err) => {
                    debug!(%err, "skipping activity with malformed sources field");
                }
            }
        }
        Ok(total)
    }

    /// Interactions-feed count; `mentions_only` restricts to the
    /// mention-class activity actions.
    #[allow(clippy::too_many_arguments)]
    pub fn interactions_count(
        &self,
        config: &StoreConfig,
        account_keys: &[UserKey],
        since_column: &str,
        since: i64,
        scopes: i64,
        mentions_only: bool,
        following_only: bool,
    ) -> Result<u64> {
        let extra = mentions_only.then(|| {
            Expr::in_args(
                "action",
                activity_action::MENTION_ACTIONS
                    .iter()
                    .map(|a| Value::from(a.to_string()))
                    .collect(),
            )
        });
        let locator = ResourceLocator::parse(paths::ACTIVITIES_ABOUT_ME);
        self.activities_count(
            &locator,
            config,
            extra,
            since_column,
            since,
            following_only,
            account_keys,
            scopes,
        )
    }

    /// Probes every status table (cache last) for `(account, id)`.
    pub fn find_status_in_database(
        &self,
        account_key: &UserKey,
        status_id: &str,
    ) -> Result<Option<Status>> {
        let conn = self.conn()?;
        for id in SEARCHABLE_STATUS_TABLES {
            let Some(table) = id.table_name() else { continue };
            let sql = format!(
                "SELECT {STATUS_COLUMNS} FROM {table} \
                 WHERE account_key = ?1 AND id = ?2 LIMIT 1"
            );
            let found = conn
                .query_row(&sql, params![account_key.to_string(), status_id], status_from_row)
                .optional()?;
            if let Some(status) = found {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Cache-then-fetch read path: a locally stored status wins without
    /// touching the network; on a miss the fetched status replaces any
    /// stale cache row before being returned.
    pub fn find_status(
        &self,
        directory: &dyn AccountDirectory,
        fetcher: &dyn StatusFetcher,
        account_key: &UserKey,
        status_id: &str,
    ) -> Result<Status, FetchError> {
        if let Some(cached) = self.find_status_in_database(account_key, status_id)? {
            return Ok(cached);
        }
        let details = directory
            .account_details(account_key)
            .ok_or_else(|| FetchError::NoAccount(account_key.clone()))?;
        let status = fetcher.fetch_status(&details, status_id)?;
        self.replace_cached_status(&status)?;
        Ok(status)
    }

    fn replace_cached_status(&self, status: &Status) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM cached_statuses WHERE account_key = ?1 AND id = ?2",
            params![status.account_key.to_string(), status.id],
        )?;
        insert_status_row(&conn, "cached_statuses", status)
    }

    /// Removes a status (and reposts of it) from every status and
    /// activity table. Federated account keys scope the delete to their
    /// host.
    pub fn delete_status(&self, account_key: &UserKey, status_id: &str) -> Result<u64> {
        let base = Expr::or(vec![
            Expr::eq_arg("id", status_id.to_string()),
            Expr::eq_arg("repost_of_id", status_id.to_string()),
        ]);
        let expr = match &account_key.host {
            Some(host) => Expr::and(vec![
                Expr::like_arg("account_key", format!("%@{host}")),
                base,
            ]),
            None => base,
        };
        let (sql, args) = expr.render();
        let conn = self.conn()?;
        let mut total = 0u64;
        for id in SEARCHABLE_STATUS_TABLES.iter().chain(ACTIVITY_TABLES.iter()) {
            let Some(table) = id.table_name() else { continue };
            total += conn.execute(
                &format!("DELETE FROM {table} WHERE {sql}"),
                params_from_iter(args.clone()),
            )? as u64;
        }
        Ok(total)
    }

    pub fn find_message_conversation(
        &self,
        account_key: &UserKey,
        conversation_id: &str,
    ) -> Result<Option<MessageConversation>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                "SELECT account_key, conversation_id, title, local_timestamp \
                 FROM messages_conversations \
                 WHERE account_key = ?1 AND conversation_id = ?2 LIMIT 1",
                params![account_key.to_string(), conversation_id],
                |row| {
                    Ok(MessageConversation {
                        account_key: UserKey::parse(&row.get::<_, String>(0)?),
                        conversation_id: row.get(1)?,
                        title: row.get(2)?,
                        local_timestamp: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    pub(crate) fn query_count(&self, table: &str, expr: &Expr) -> Result<u64> {
        let (sql, args) = expr.render();
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE {sql}"),
            params_from_iter(args),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

pub(crate) fn key_values(keys: &[UserKey]) -> Vec<Value> {
    keys.iter().map(|k| Value::from(k.to_string())).collect()
}

fn insert_status_row(conn: &Connection, table: &str, status: &Status) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {table} ({STATUS_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            status.account_key.to_string(),
            status.id,
            status.sort_id,
            status.position_key,
            status.timestamp,
            status.is_gap,
            status.filter_flags,
            status.text_plain,
            status.user_name,
            status.user_screen_name,
            status.source,
            status.lang,
            status.repost_of_id,
            status.filter_users,
            status.filter_sources,
            status.filter_texts,
            status.filter_names,
            status.filter_descriptions,
            status.filter_links,
        ],
    )?;
    Ok(())
}

fn status_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Status> {
    Ok(Status {
        account_key: UserKey::parse(&row.get::<_, String>(0)?),
        id: row.get(1)?,
        sort_id: row.get(2)?,
        position_key: row.get(3)?,
        timestamp: row.get(4)?,
        is_gap: row.get(5)?,
        filter_flags: row.get(6)?,
        text_plain: row.get(7)?,
        user_name: row.get(8)?,
        user_screen_name: row.get(9)?,
        source: row.get(10)?,
        lang: row.get(11)?,
        repost_of_id: row.get(12)?,
        filter_users: row.get(13)?,
        filter_sources: row.get(14)?,
        filter_texts: row.get(15)?,
        filter_names: row.get(16)?,
        filter_descriptions: row.get(17)?,
        filter_links: row.get(18)?,
    })
}

fn status_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
           _id INTEGER PRIMARY KEY AUTOINCREMENT,
           account_key TEXT NOT NULL,
           id TEXT NOT NULL,
           sort_id INTEGER NOT NULL DEFAULT 0,
           position_key INTEGER NOT NULL DEFAULT 0,
           timestamp INTEGER NOT NULL DEFAULT 0,
           is_gap INTEGER NOT NULL DEFAULT 0,
           filter_flags INTEGER NOT NULL DEFAULT 0,
           text_plain TEXT NOT NULL DEFAULT '',
           user_name TEXT NOT NULL DEFAULT '',
           user_screen_name TEXT NOT NULL DEFAULT '',
           source TEXT NULL,
           lang TEXT NULL,
           repost_of_id TEXT NULL,
           filter_users TEXT NULL,
           filter_sources TEXT NULL,
           filter_texts TEXT NULL,
           filter_names TEXT NULL,
           filter_descriptions TEXT NULL,
           filter_links TEXT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_{table}_account_ts
           ON {table}(account_key, timestamp DESC);
         CREATE INDEX IF NOT EXISTS idx_{table}_account_id
           ON {table}(account_key, id);\n"
    )
}

fn ensure_schema(conn: &Connection) -> Result<()> {
    let mut sql = String::from("PRAGMA journal_mode=WAL;\n");
    for id in STATUS_TABLES {
        if let Some(table) = id.table_name() {
            sql.push_str(&status_table_sql(table));
        }
    }
    sql.push_str(&status_table_sql("cached_statuses"));
    sql.push_str(
        r#"
        CREATE TABLE IF NOT EXISTS activities_about_me (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          account_key TEXT NOT NULL,
          id TEXT NOT NULL DEFAULT '',
          timestamp INTEGER NOT NULL DEFAULT 0,
          action TEXT NOT NULL DEFAULT '',
          repost_of_id TEXT NULL,
          min_request_position TEXT NULL,
          max_request_position TEXT NULL,
          min_sort_position INTEGER NOT NULL DEFAULT 0,
          max_sort_position INTEGER NOT NULL DEFAULT 0,
          is_gap INTEGER NOT NULL DEFAULT 0,
          filter_flags INTEGER NOT NULL DEFAULT 0,
          sources TEXT NULL,
          filter_users TEXT NULL,
          filter_sources TEXT NULL,
          filter_texts TEXT NULL,
          filter_names TEXT NULL,
          filter_descriptions TEXT NULL,
          filter_links TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_activities_account_ts
          ON activities_about_me(account_key, timestamp DESC);

        CREATE TABLE IF NOT EXISTS messages (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          account_key TEXT NOT NULL,
          message_id TEXT NOT NULL,
          conversation_id TEXT NOT NULL,
          local_timestamp INTEGER NOT NULL DEFAULT 0,
          is_outgoing INTEGER NOT NULL DEFAULT 0,
          text_plain TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_messages_account_ts
          ON messages(account_key, local_timestamp DESC);

        CREATE TABLE IF NOT EXISTS messages_conversations (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          account_key TEXT NOT NULL,
          conversation_id TEXT NOT NULL,
          title TEXT NULL,
          local_timestamp INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS cached_users (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_key TEXT NOT NULL,
          name TEXT NOT NULL DEFAULT '',
          screen_name TEXT NOT NULL DEFAULT '',
          description TEXT NULL
        );

        CREATE TABLE IF NOT EXISTS cached_hashtags (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS filtered_users (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_key TEXT NOT NULL,
          name TEXT NOT NULL DEFAULT '',
          screen_name TEXT NOT NULL DEFAULT '',
          scope INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS filtered_keywords (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          value TEXT NOT NULL,
          user_key TEXT NULL,
          scope INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS filtered_sources (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          value TEXT NOT NULL,
          user_key TEXT NULL,
          scope INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS filtered_links (
          _id INTEGER PRIMARY KEY AUTOINCREMENT,
          value TEXT NOT NULL,
          user_key TEXT NULL,
          scope INTEGER NOT NULL DEFAULT 0
        );
        "#,
    );
    conn.execute_batch(&sql)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::StaticAccountDirectory;
    use crate::testutil::{status, test_db};
    use kestrel_model::{filter_scope, AccountDetails, AccountType};
    use std::cell::Cell;

    struct CountingFetcher {
        calls: Cell<u32>,
        status: Status,
    }

    impl StatusFetcher for CountingFetcher {
        fn fetch_status(
            &self,
            _account: &AccountDetails,
            _status_id: &str,
        ) -> Result<Status, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.status.clone())
        }
    }

    fn directory_for(key: &UserKey) -> StaticAccountDirectory {
        StaticAccountDirectory::new(vec![AccountDetails {
            key: key.clone(),
            account_type: AccountType::Microblog,
            official: false,
        }])
    }

    #[test]
    fn count_is_account_scoped() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        db.insert_status(&home, &status("a", "1", 10)).unwrap();
        db.insert_status(&home, &status("a", "2", 11)).unwrap();
        db.insert_status(&home, &status("b", "3", 12)).unwrap();

        assert_eq!(db.count(&home, &UserKey::new("a")).unwrap(), 2);
        assert_eq!(db.count(&home, &UserKey::new("b")).unwrap(), 1);
        assert_eq!(db.count(&home, &UserKey::new("c")).unwrap(), 0);
    }

    #[test]
    fn count_rejects_virtual_locator() {
        let (_dir, db) = test_db();
        let loc = ResourceLocator::parse(paths::NULL);
        assert!(db.count(&loc, &UserKey::new("a")).is_err());
    }

    #[test]
    fn statuses_count_applies_threshold() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        for (id, ts) in [("1", 5), ("2", 10), ("3", 15)] {
            db.insert_status(&home, &status("a", id, ts)).unwrap();
        }
        let config = StoreConfig::default();
        let keys = vec![UserKey::new("a")];
        let newer = db
            .statuses_count(&home, &config, None, "timestamp", 7, true, &keys, filter_scope::HOME)
            .unwrap();
        assert_eq!(newer, 2);
        let older = db
            .statuses_count(&home, &config, None, "timestamp", 7, false, &keys, filter_scope::HOME)
            .unwrap();
        assert_eq!(older, 1);
    }

    #[test]
    fn find_status_prefers_cached_row() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        let account = UserKey::new("a");
        db.insert_status(&home, &status("a", "42", 10)).unwrap();

        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            status: status("a", "42", 10),
        };
        let found = db
            .find_status(&directory_for(&account), &fetcher, &account, "42")
            .unwrap();
        assert_eq!(found.id, "42");
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn find_status_fetches_once_then_hits_cache() {
        let (_dir, db) = test_db();
        let account = UserKey::new("a");
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            status: status("a", "42", 10),
        };
        let directory = directory_for(&account);

        let first = db.find_status(&directory, &fetcher, &account, "42").unwrap();
        assert_eq!(first.id, "42");
        assert_eq!(fetcher.calls.get(), 1);

        let second = db.find_status(&directory, &fetcher, &account, "42").unwrap();
        assert_eq!(second.id, "42");
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn find_status_without_account_is_typed_error() {
        let (_dir, db) = test_db();
        let fetcher = CountingFetcher {
            calls: Cell::new(0),
            status: Status::default(),
        };
        let directory = StaticAccountDirectory::default();
        let err = db
            .find_status(&directory, &fetcher, &UserKey::new("ghost"), "1")
            .unwrap_err();
        assert!(matches!(err, FetchError::NoAccount(_)));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn delete_status_removes_reposts_too() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        db.insert_status(&home, &status("a", "1", 10)).unwrap();
        let mut repost = status("a", "2", 11);
        repost.repost_of_id = Some("1".to_string());
        db.insert_status(&home, &repost).unwrap();
        db.insert_status(&home, &status("a", "3", 12)).unwrap();

        let deleted = db.delete_status(&UserKey::new("a"), "1").unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.count(&home, &UserKey::new("a")).unwrap(), 1);
    }

    #[test]
    fn delete_status_scopes_by_host_for_federated_keys() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        db.insert_status(&home, &status("a@one.example", "1", 10)).unwrap();
        db.insert_status(&home, &status("a@two.example", "1", 10)).unwrap();

        let deleted = db
            .delete_status(&UserKey::with_host("a", "one.example"), "1")
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.count(&home, &UserKey::parse("a@two.example")).unwrap(), 1);
    }

    #[test]
    fn delete_status_clears_matching_activity_rows() {
        let (_dir, db) = test_db();
        let home = ResourceLocator::parse(paths::HOME_TIMELINE);
        db.insert_status(&home, &status("a", "1", 10)).unwrap();

        let mut about = crate::testutil::activity("a", activity_action::FAVORITE, 10);
        about.id = "1".to_string();
        db.insert_activity(&about).unwrap();

        let mut repost = crate::testutil::activity("a", activity_action::REPOST, 11);
        repost.id = "2".to_string();
        repost.repost_of_id = Some("1".to_string());
        db.insert_activity(&repost).unwrap();

        let mut unrelated = crate::testutil::activity("a", activity_action::MENTION, 12);
        unrelated.id = "9".to_string();
        db.insert_activity(&unrelated).unwrap();

        let deleted = db.delete_status(&UserKey::new("a"), "1").unwrap();
        assert_eq!(deleted, 3);

        let activities = ResourceLocator::parse(paths::ACTIVITIES_ABOUT_ME);
        assert_eq!(db.count(&activities, &UserKey::new("a")).unwrap(), 1);
    }

    #[test]
    fn activities_count_following_only_skips_malformed_sources() {
        let (_dir, db) = test_db();
        let mut following = crate::testutil::activity("a", activity_action::MENTION, 10);
        following.sources = Some(r#"[{"is_following":true}]"#.to_string());
        db.insert_activity(&following).unwrap();

        let mut stranger = crate::testutil::activity("a", activity_action::MENTION, 11);
        stranger.sources = Some(r#"[{"is_following":false}]"#.to_string());
        db.insert_activity(&stranger).unwrap();

        let mut corrupt = crate::testutil::activity("a", activity_action::MENTION, 12);
        corrupt.sources = Some("not json".to_string());
        db.insert_activity(&corrupt).unwrap();

        let config = StoreConfig::default();
        let keys = vec![UserKey::new("a")];
        let total = db
            .interactions_count(
                &config,
                &keys,
                "timestamp",
                0,
                filter_scope::INTERACTIONS,
                false,
                true,
            )
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn interactions_count_mentions_only_filters_actions() {
        let (_dir, db) = test_db();
        db.insert_activity(&crate::testutil::activity("a", activity_action::MENTION, 10))
            .unwrap();
        db.insert_activity(&crate::testutil::activity("a", activity_action::FOLLOW, 11))
            .unwrap();

        let config = StoreConfig::default();
        let keys = vec![UserKey::new("a")];
        let mentions = db
            .interactions_count(
                &config,
                &keys,
                "timestamp",
                0,
                filter_scope::INTERACTIONS,
                true,
                false,
            )
            .unwrap();
        assert_eq!(mentions, 1);
        let all = db
            .interactions_count(
                &config,
                &keys,
                "timestamp",
                0,
                filter_scope::INTERACTIONS,
                false,
                false,
            )
            .unwrap();
        assert_eq!(all, 2);
    }

    #[test]
    fn conversation_lookup_matches_exact_pair() {
        let (_dir, db) = test_db();
        db.insert_conversation(&MessageConversation {
            account_key: UserKey::new("a"),
            conversation_id: "c1".to_string(),
            title: Some("hello".to_string()),
            local_timestamp: 5,
        })
        .unwrap();

        let found = db
            .find_message_conversation(&UserKey::new("a"), "c1")
            .unwrap()
            .expect("conversation present");
        assert_eq!(found.title.as_deref(), Some("hello"));
        assert!(db
            .find_message_conversation(&UserKey::new("b"), "c1")
            .unwrap()
            .is_none());
    }
}
