//! Domain model: accounts, ledger entries and the storage ports the
//! application layer depends on.

pub mod account;
pub mod payment;
pub mod ports;
