/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Retention sweeper. Trims every account-scoped timeline table to the
//! configured row limit and the shared cache tables to a multiplied
//! limit. Tables are swept independently, so a failure mid-sweep leaves
//! already-trimmed tables trimmed; rerunning is always safe.

use crate::accounts::AccountDirectory;
use crate::config::StoreConfig;
use crate::db::ClientDb;
use crate::expr::{Expr, Select};
use crate::locator::{ACTIVITY_TABLES, CACHE_TABLES, STATUS_TABLES};
use anyhow::Result;
use kestrel_model::UserKey;
use rusqlite::params_from_iter;
use std::sync::PoisonError;
use tracing::{debug, info};

pub struct Sweeper<'a> {
    db: &'a ClientDb,
    directory: &'a dyn AccountDirectory,
}

impl<'a> Sweeper<'a> {
    pub fn new(db: &'a ClientDb, directory: &'a dyn AccountDirectory) -> Self {
        Self { db, directory }
    }

    /// Runs one sweep; concurrent callers serialize on the store's sweep
    /// lock. Returns the number of rows deleted.
    pub fn sweep(&self, config: &StoreConfig) -> Result<u64> {
        let _guard = self
            .db
            .sweep_lock()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let accounts = self.directory.list_accounts();
        let limit = u64::from(config.item_limit());
        let cache_limit = u64::from(config.cache_item_limit());
        let mut total = 0u64;

        for id in STATUS_TABLES {
            let Some(table) = id.table_name() else { continue };
            total += self.trim_scoped(table, "position_key DESC", limit, &accounts)?;
        }
        for id in ACTIVITY_TABLES {
            let Some(table) = id.table_name() else { continue };
            total += self.trim_scoped(table, "timestamp DESC", limit, &accounts)?;
        }
        for id in CACHE_TABLES {
            let Some(table) = id.table_name() else { continue };
            total += self.trim_unscoped(table, cache_limit)?;
        }

        info!(deleted = total, "retention sweep finished");
        Ok(total)
    }

    /// Keeps, per account, the top `limit` rows by `order`; the outer
    /// delete is re-scoped by account so one account's window never
    /// consumes another's rows.
    fn trim_scoped(
        &self,
        table: &str,
        order: &str,
        limit: u64,
        accounts: &[UserKey],
    ) -> Result<u64> {
        let conn = self.db.conn()?;
        let mut deleted = 0u64;
        for account in accounts {
            let keep = Select::new()
                .column("_id")
                .from(table)
                .filter(Expr::eq_arg("account_key", account.to_string()))
                .order_by(order)
                .limit(limit);
            let expr = Expr::and(vec![
                Expr::not_in_select("_id", keep),
                Expr::eq_arg("account_key", account.to_string()),
            ]);
            let (sql, args) = expr.render();
            deleted += conn.execute(
                &format!("DELETE FROM {table} WHERE {sql}"),
                params_from_iter(args),
            )? as u64;
        }
        debug!(table, deleted, "trimmed account-scoped table");
        Ok(deleted)
    }

    fn trim_unscoped(&self, table: &str, limit: u64) -> Result<u64> {
        let keep = Select::new()
            .column("_id")
            .from(table)
            .order_by("_id DESC")
            .limit(limit);
        let (sql, args) = Expr::not_in_select("_id", keep).render();
        let conn = self.db.conn()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {table} WHERE {sql}"),
            params_from_iter(args),
        )? as u64;
        debug!(table, deleted, "trimmed cache table");
        Ok(deleted)
    }
}
