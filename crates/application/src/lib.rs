//! Application services and ports.

#![forbid(unsafe_code)]

mod ledger_ports;
mod permission_index;
mod permission_service;

pub use ledger_ports::{LedgerStore, ScanGuard, StateEntry, StateQueryIterator};
pub use permission_index::{IndexScan, PermissionIndex, permission_key_from_index};
pub use permission_service::{PermissionGrantInput, PermissionService, ReindexReport};
