use std::sync::Arc;

use medconsent_core::{AppError, AppResult};
use medconsent_domain::{
    CompositeKey, INDEX_SENTINEL, PATIENT_PERMISSION_INDEX, PERMISSION_INDEX, PermissionKey,
};
use tracing::debug;

use crate::ledger_ports::{LedgerStore, ScanGuard};

/// Maintains the doctor-first and patient-first permission indexes.
///
/// Index entries are composite keys holding a one-byte sentinel; the
/// identifying triple lives entirely in the key components.
#[derive(Clone)]
pub struct PermissionIndex {
    store: Arc<dyn LedgerStore>,
}

impl PermissionIndex {
    /// Creates an index manager over a ledger store.
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Writes both index entries for a permission.
    pub async fn create_index(&self, key: &PermissionKey) -> AppResult<()> {
        self.put_entry(PERMISSION_INDEX, &key.doctor_index_components())
            .await?;
        self.put_patient_entry(key).await
    }

    /// Writes only the patient-first entry for a permission.
    pub async fn put_patient_entry(&self, key: &PermissionKey) -> AppResult<()> {
        self.put_entry(PATIENT_PERMISSION_INDEX, &key.patient_index_components())
            .await
    }

    /// Removes both index entries for a permission.
    pub async fn remove_index(&self, key: &PermissionKey) -> AppResult<()> {
        let doctor_key = self
            .store
            .create_composite_key(PERMISSION_INDEX, &key.doctor_index_components())?;
        self.store.del_state(doctor_key.as_str()).await?;

        let patient_key = self
            .store
            .create_composite_key(PATIENT_PERMISSION_INDEX, &key.patient_index_components())?;
        self.store.del_state(patient_key.as_str()).await
    }

    /// Opens a scan over every index entry matching the leading components.
    pub async fn scan_by_prefix(
        &self,
        namespace: &str,
        components: &[&str],
    ) -> AppResult<IndexScan> {
        debug!(namespace, prefix = ?components, "opening permission index scan");
        let iterator = self
            .store
            .get_state_by_partial_composite_key(namespace, components)
            .await?;

        Ok(IndexScan {
            store: Arc::clone(&self.store),
            guard: ScanGuard::new(iterator),
        })
    }

    /// Opens a scan over the permissions granted to a doctor.
    pub async fn scan_doctor(&self, doctor_id: &str) -> AppResult<IndexScan> {
        self.scan_by_prefix(PERMISSION_INDEX, &[doctor_id]).await
    }

    /// Opens a scan over the permissions granted by a patient.
    pub async fn scan_patient(&self, patient_id: &str) -> AppResult<IndexScan> {
        self.scan_by_prefix(PATIENT_PERMISSION_INDEX, &[patient_id])
            .await
    }

    async fn put_entry(&self, namespace: &str, components: &[&str]) -> AppResult<()> {
        let index_key = self.store.create_composite_key(namespace, components)?;
        self.store
            .put_state(index_key.as_str(), INDEX_SENTINEL.to_vec())
            .await
    }
}

/// Lazy, single-pass sequence of matched index keys.
pub struct IndexScan {
    store: Arc<dyn LedgerStore>,
    guard: ScanGuard,
}

impl IndexScan {
    /// Returns the next matched index key, decomposed.
    pub async fn next_key(&mut self) -> AppResult<Option<CompositeKey>> {
        match self.guard.next_entry().await? {
            Some(entry) => self.store.split_composite_key(entry.key.as_str()).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the identifying triple of the next matched entry.
    pub async fn next_permission_key(&mut self) -> AppResult<Option<PermissionKey>> {
        match self.next_key().await? {
            Some(index_key) => permission_key_from_index(&index_key).map(Some),
            None => Ok(None),
        }
    }

    /// Closes the underlying range query.
    pub fn close(self) -> AppResult<()> {
        self.guard.close()
    }
}

/// Recovers the identifying triple from a decomposed index key.
pub fn permission_key_from_index(index_key: &CompositeKey) -> AppResult<PermissionKey> {
    if index_key.components().len() != 3 {
        return Err(AppError::Validation(format!(
            "index key in namespace '{}' must have 3 components, found {}",
            index_key.namespace(),
            index_key.components().len()
        )));
    }

    match index_key.namespace() {
        PERMISSION_INDEX => PermissionKey::new(
            index_key.component(0)?,
            index_key.component(1)?,
            index_key.component(2)?,
        ),
        PATIENT_PERMISSION_INDEX => PermissionKey::new(
            index_key.component(2)?,
            index_key.component(1)?,
            index_key.component(0)?,
        ),
        other => Err(AppError::Validation(format!(
            "'{other}' is not a permission index namespace"
        ))),
    }
}
