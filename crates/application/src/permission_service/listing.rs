use super::*;

use tracing::debug;

use crate::permission_index::IndexScan;

impl PermissionService {
    /// Lists every permission granted to a doctor, in index key order.
    pub async fn list_doctor_permissions(&self, doctor_id: &str) -> AppResult<Vec<Permission>> {
        let scan = self.index.scan_doctor(doctor_id).await?;
        let permissions = self.collect_permissions(scan).await?;

        debug!(
            doctor_id,
            count = permissions.len(),
            "listed doctor permissions"
        );

        Ok(permissions)
    }

    /// Lists every permission granted by a patient, in index key order.
    pub async fn list_patient_permissions(&self, patient_id: &str) -> AppResult<Vec<Permission>> {
        let scan = self.index.scan_patient(patient_id).await?;
        let permissions = self.collect_permissions(scan).await?;

        debug!(
            patient_id,
            count = permissions.len(),
            "listed patient permissions"
        );

        Ok(permissions)
    }

    /// Drains a scan, fetching the primary record behind every entry.
    ///
    /// Entries whose primary record is gone are skipped. An early return
    /// drops the scan, which closes the range query.
    async fn collect_permissions(&self, mut scan: IndexScan) -> AppResult<Vec<Permission>> {
        let mut permissions = Vec::new();

        while let Some(key) = scan.next_permission_key().await? {
            match self.load(&key).await? {
                Some(permission) => permissions.push(permission),
                None => debug!(
                    permission_id = %key.permission_id(),
                    "skipping index entry without primary record"
                ),
            }
        }

        scan.close()?;
        Ok(permissions)
    }
}
