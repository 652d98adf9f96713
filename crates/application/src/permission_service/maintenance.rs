use super::*;

use medconsent_domain::{PATIENT_PERMISSION_INDEX, PERMISSION_INDEX};
use serde_json::json;
use tracing::{info, warn};

/// Outcome of an index maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    /// Doctor index entries whose patient entry was (re)written.
    pub indexed: usize,
    /// Index entries removed because their record no longer exists.
    pub pruned: usize,
}

impl ReindexReport {
    /// Returns the report as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({ "indexed": self.indexed, "pruned": self.pruned })
    }
}

impl PermissionService {
    /// Rebuilds the patient index from the doctor index and prunes entries
    /// of either index whose primary record has been deleted.
    pub async fn reindex_permissions(&self) -> AppResult<ReindexReport> {
        let mut report = ReindexReport::default();

        for key in self.indexed_keys(PERMISSION_INDEX).await? {
            if self.permission_exists_for_key(&key).await? {
                self.index.put_patient_entry(&key).await?;
                report.indexed += 1;
            } else {
                warn!(
                    permission_id = %key.permission_id(),
                    "pruning index entries without primary record"
                );
                self.index.remove_index(&key).await?;
                report.pruned += 1;
            }
        }

        for key in self.indexed_keys(PATIENT_PERMISSION_INDEX).await? {
            if !self.permission_exists_for_key(&key).await? {
                warn!(
                    permission_id = %key.permission_id(),
                    "pruning patient index entry without primary record"
                );
                self.index.remove_index(&key).await?;
                report.pruned += 1;
            }
        }

        info!(
            indexed = report.indexed,
            pruned = report.pruned,
            "permission indexes rebuilt"
        );

        Ok(report)
    }

    /// Collects every triple indexed under a namespace, closing the scan
    /// before the caller mutates the index.
    async fn indexed_keys(&self, namespace: &str) -> AppResult<Vec<PermissionKey>> {
        let mut scan = self.index.scan_by_prefix(namespace, &[]).await?;
        let mut keys = Vec::new();
        while let Some(key) = scan.next_permission_key().await? {
            keys.push(key);
        }
        scan.close()?;

        Ok(keys)
    }
}
