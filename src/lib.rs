//! Personal finance ledger with incrementally maintained daily totals.
//!
//! Every transaction mutation atomically updates a per-day aggregate
//! document, so range totals are answered by folding a handful of daily
//! summaries instead of scanning the transaction history.

pub mod cli;
pub mod db;
pub mod error;
pub mod export;
pub mod fmt;
pub mod ledger;
pub mod memstore;
pub mod models;
pub mod reports;
pub mod settings;
pub mod store;
