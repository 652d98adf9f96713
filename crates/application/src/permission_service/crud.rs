use super::*;

use medconsent_core::AppError;
use tracing::info;

impl PermissionService {
    /// Creates a permission and its index entries.
    ///
    /// Fails with a conflict when a record already exists under the derived
    /// permission id.
    pub async fn create_permission(&self, input: PermissionGrantInput) -> AppResult<()> {
        let key = input.key()?;

        if self.permission_exists_for_key(&key).await? {
            return Err(AppError::Conflict(format!(
                "permission '{}' for doctor '{}' already exists, use update instead",
                key.permission_id(),
                key.doctor_id()
            )));
        }

        let permission = input.to_permission(&key);
        self.store_record(&permission).await?;
        self.index.create_index(&key).await?;

        info!(
            permission_id = %permission.permission_id(),
            doctor_id = %key.doctor_id(),
            patient_id = %key.patient_id(),
            data_category = %key.data_category(),
            "permission created"
        );

        Ok(())
    }

    /// Replaces an existing permission record.
    ///
    /// Index entries are untouched since the identifying triple cannot change.
    pub async fn update_permission(&self, input: PermissionGrantInput) -> AppResult<()> {
        let key = input.key()?;
        self.load_owned(&key).await?;

        let permission = self.update_policy.apply(input.to_permission(&key));
        self.store_record(&permission).await?;

        info!(
            permission_id = %permission.permission_id(),
            update_policy = self.update_policy.as_str(),
            "permission updated"
        );

        Ok(())
    }

    /// Deletes a permission record together with its index entries.
    pub async fn delete_permission(
        &self,
        doctor_id: &str,
        data_category: &str,
        patient_id: &str,
    ) -> AppResult<()> {
        let key = PermissionKey::new(doctor_id, data_category, patient_id)?;
        self.load_owned(&key).await?;

        self.store.del_state(key.permission_id().as_str()).await?;
        self.index.remove_index(&key).await?;

        info!(permission_id = %key.permission_id(), "permission deleted");

        Ok(())
    }

    /// Reads one permission.
    ///
    /// A missing record yields the zero-valued permission rather than an error.
    pub async fn read_permission(
        &self,
        doctor_id: &str,
        data_category: &str,
        patient_id: &str,
    ) -> AppResult<Permission> {
        let key = PermissionKey::new(doctor_id, data_category, patient_id)?;
        Ok(self.find_permission(&key).await?.unwrap_or_default())
    }

    /// Returns the permission stored for a key, if any.
    pub async fn find_permission(&self, key: &PermissionKey) -> AppResult<Option<Permission>> {
        self.load(key).await
    }

    /// Returns whether a permission record exists for the triple.
    pub async fn permission_exists(
        &self,
        doctor_id: &str,
        data_category: &str,
        patient_id: &str,
    ) -> AppResult<bool> {
        let key = PermissionKey::new(doctor_id, data_category, patient_id)?;
        self.permission_exists_for_key(&key).await
    }

    /// Returns whether a record is stored under a derived permission id.
    pub async fn permission_id_exists(&self, permission_id: &str) -> AppResult<bool> {
        if permission_id.trim().is_empty() {
            return Err(AppError::Validation(
                "permissionId must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(self.store.get_state(permission_id).await?.is_some())
    }

    /// Replaces the validity window of an existing permission.
    ///
    /// Every other stored field is written back unchanged.
    pub async fn change_permission_period(
        &self,
        doctor_id: &str,
        data_category: &str,
        patient_id: &str,
        from: &str,
        to: &str,
    ) -> AppResult<()> {
        let key = PermissionKey::new(doctor_id, data_category, patient_id)?;
        let permission = self.load_owned(&key).await?.with_period(from, to);
        self.store
            .put_state(key.permission_id().as_str(), permission.to_json_bytes()?)
            .await?;

        info!(
            permission_id = %key.permission_id(),
            from,
            to,
            "permission period changed"
        );

        Ok(())
    }

    /// Loads the record for a key, failing unless it was written for that
    /// exact triple.
    async fn load_owned(&self, key: &PermissionKey) -> AppResult<Permission> {
        let permission = self
            .load(key)
            .await?
            .ok_or_else(|| missing_permission(key))?;

        if !permission.belongs_to(key) {
            return Err(AppError::Conflict(format!(
                "permission '{}' belongs to doctor '{}' and data category '{}'",
                key.permission_id(),
                permission.doctor_id(),
                permission.data_category()
            )));
        }

        Ok(permission)
    }

    pub(super) async fn permission_exists_for_key(&self, key: &PermissionKey) -> AppResult<bool> {
        Ok(self
            .store
            .get_state(key.permission_id().as_str())
            .await?
            .is_some())
    }
}

fn missing_permission(key: &PermissionKey) -> AppError {
    AppError::NotFound(format!(
        "permission '{}' for doctor '{}' does not exist",
        key.permission_id(),
        key.doctor_id()
    ))
}
