/*
 * SPDX-FileCopyrightText: 2026 Kestrel Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod accounts;
pub mod config;
pub mod db;
pub mod expr;
pub mod fetch;
pub mod filter;
pub mod locator;
pub mod retention;
pub mod watermark;

#[cfg(test)]
mod testutil;

pub use accounts::{AccountDirectory, StaticAccountDirectory};
pub use config::StoreConfig;
pub use db::ClientDb;
pub use fetch::{FetchError, StatusFetcher};
pub use locator::ResourceLocator;
pub use retention::Sweeper;
