//! Consent permission use-cases over the ledger store.

use std::sync::Arc;

use medconsent_core::AppResult;
use medconsent_domain::{Permission, PermissionKey, UpdatePolicy};

use crate::ledger_ports::LedgerStore;
use crate::permission_index::PermissionIndex;

mod crud;
mod listing;
mod maintenance;


pub use maintenance::ReindexReport;

/// Input payload for creating or replacing a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGrantInput {
    /// Doctor receiving the permission.
    pub doctor_id: String,
    /// Category of medical data covered.
    pub data_category: String,
    /// Patient granting the permission.
    pub patient_id: String,
    /// Granted right, free-form.
    pub right: String,
    /// Start of the validity window.
    pub from: String,
    /// End of the validity window.
    pub to: String,
}

impl PermissionGrantInput {
    fn key(&self) -> AppResult<PermissionKey> {
        PermissionKey::new(
            self.doctor_id.as_str(),
            self.data_category.as_str(),
            self.patient_id.as_str(),
        )
    }

    fn to_permission(&self, key: &PermissionKey) -> Permission {
        Permission::new(
            key,
            self.right.as_str(),
            self.from.as_str(),
            self.to.as_str(),
        )
    }
}

/// Application service for consent permissions.
///
/// Every method is the body of one ledger transaction and keeps no state
/// between calls.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn LedgerStore>,
    index: PermissionIndex,
    update_policy: UpdatePolicy,
}

impl PermissionService {
    /// Creates a permission service over a ledger store.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            index: PermissionIndex::new(Arc::clone(&store)),
            store,
            update_policy: UpdatePolicy::default(),
        }
    }

    /// Returns the service with a different update policy.
    #[must_use]
    pub fn with_update_policy(mut self, update_policy: UpdatePolicy) -> Self {
        self.update_policy = update_policy;
        self
    }

    /// Returns the active update policy.
    #[must_use]
    pub fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    async fn load(&self, key: &PermissionKey) -> AppResult<Option<Permission>> {
        self.store
            .get_state(key.permission_id().as_str())
            .await?
            .map(|bytes| Permission::from_json_bytes(&bytes))
            .transpose()
    }

    async fn store_record(&self, permission: &Permission) -> AppResult<()> {
        self.store
            .put_state(permission.permission_id(), permission.to_json_bytes()?)
            .await
    }
}
