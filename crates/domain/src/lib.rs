//! Consent record schema, key derivation and composite key encoding.

#![forbid(unsafe_code)]

mod composite_key;
mod permission;

pub use composite_key::{
    COMPOSITE_KEY_SEPARATOR, CompositeKey, INDEX_SENTINEL, PATIENT_PERMISSION_INDEX,
    PERMISSION_INDEX,
};
pub use permission::{Permission, PermissionKey, UpdatePolicy};
