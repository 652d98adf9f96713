//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_ledger_store;

pub use in_memory_ledger_store::{InMemoryLedgerStore, LedgerSnapshot};
