//! Wallet balances and double-entry transfers between them.
//!
//! The [`application::transfer::TransferEngine`] is the heart of the crate:
//! it validates a transfer, writes the outgoing and incoming ledger entries and
//! updates both balances as one unit, under per-account locks. Storage sits
//! behind the [`domain::ports`] traits with in-memory and (feature
//! `storage-rocksdb`) RocksDB backends.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
