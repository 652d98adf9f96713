use std::str::FromStr;

use medconsent_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::composite_key::{
    COMPOSITE_KEY_SEPARATOR, CompositeKey, PATIENT_PERMISSION_INDEX, PERMISSION_INDEX,
};

/// Identifying triple of a consent grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionKey {
    doctor_id: NonEmptyString,
    data_category: NonEmptyString,
    patient_id: NonEmptyString,
}

impl PermissionKey {
    /// Creates a key from the grantee, the data category and the grantor.
    pub fn new(
        doctor_id: impl Into<String>,
        data_category: impl Into<String>,
        patient_id: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            doctor_id: identifier("doctorId", doctor_id)?,
            data_category: identifier("dataCategory", data_category)?,
            patient_id: identifier("patientId", patient_id)?,
        })
    }

    /// Returns the doctor the permission is granted to.
    #[must_use]
    pub fn doctor_id(&self) -> &str {
        self.doctor_id.as_str()
    }

    /// Returns the data category the permission covers.
    #[must_use]
    pub fn data_category(&self) -> &str {
        self.data_category.as_str()
    }

    /// Returns the patient granting the permission.
    #[must_use]
    pub fn patient_id(&self) -> &str {
        self.patient_id.as_str()
    }

    /// Returns the primary state key of the permission record.
    ///
    /// The parts are concatenated without a delimiter, so distinct triples
    /// such as `("D1", "labs", "P1")` and `("D1l", "abs", "P1")` share a key.
    #[must_use]
    pub fn permission_id(&self) -> String {
        let mut permission_id = String::with_capacity(
            self.doctor_id().len() + self.data_category().len() + self.patient_id().len(),
        );
        permission_id.push_str(self.doctor_id());
        permission_id.push_str(self.data_category());
        permission_id.push_str(self.patient_id());
        permission_id
    }

    /// Returns the components of the doctor-first index entry.
    #[must_use]
    pub fn doctor_index_components(&self) -> [&str; 3] {
        [self.doctor_id(), self.data_category(), self.patient_id()]
    }

    /// Returns the components of the patient-first index entry.
    #[must_use]
    pub fn patient_index_components(&self) -> [&str; 3] {
        [self.patient_id(), self.data_category(), self.doctor_id()]
    }

    /// Returns the doctor-first index key for this permission.
    pub fn doctor_index_key(&self) -> AppResult<CompositeKey> {
        CompositeKey::new(PERMISSION_INDEX, self.doctor_index_components())
    }

    /// Returns the patient-first index key for this permission.
    pub fn patient_index_key(&self) -> AppResult<CompositeKey> {
        CompositeKey::new(PATIENT_PERMISSION_INDEX, self.patient_index_components())
    }
}

fn identifier(field: &str, value: impl Into<String>) -> AppResult<NonEmptyString> {
    let value = NonEmptyString::new(value)
        .map_err(|_| AppError::Validation(format!("{field} must not be empty or whitespace")))?;
    if value.as_str().contains(COMPOSITE_KEY_SEPARATOR) {
        return Err(AppError::Validation(format!(
            "{field} must not contain U+0000"
        )));
    }

    Ok(value)
}

/// Consent granted by a patient to a doctor over one category of data.
///
/// Serialized with the camelCase field names stored on the ledger. Missing
/// fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Permission {
    permission_id: String,
    data_category: String,
    patient_id: String,
    doctor_id: String,
    right: String,
    from: String,
    to: String,
}

impl Permission {
    /// Creates a permission record for the key with its right and validity window.
    #[must_use]
    pub fn new(
        key: &PermissionKey,
        right: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            permission_id: key.permission_id(),
            data_category: key.data_category().to_owned(),
            patient_id: key.patient_id().to_owned(),
            doctor_id: key.doctor_id().to_owned(),
            right: right.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Decodes a record from its stored JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes).map_err(|error| {
            AppError::Serialization(format!("failed to decode permission record: {error}"))
        })
    }

    /// Encodes the record as stored JSON bytes.
    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|error| {
            AppError::Serialization(format!("failed to encode permission record: {error}"))
        })
    }

    /// Returns the derived primary key.
    #[must_use]
    pub fn permission_id(&self) -> &str {
        self.permission_id.as_str()
    }

    /// Returns the data category.
    #[must_use]
    pub fn data_category(&self) -> &str {
        self.data_category.as_str()
    }

    /// Returns the granting patient; empty for records written without one.
    #[must_use]
    pub fn patient_id(&self) -> &str {
        self.patient_id.as_str()
    }

    /// Returns the grantee doctor.
    #[must_use]
    pub fn doctor_id(&self) -> &str {
        self.doctor_id.as_str()
    }

    /// Returns the granted right.
    #[must_use]
    pub fn right(&self) -> &str {
        self.right.as_str()
    }

    /// Returns the start of the validity window.
    #[must_use]
    pub fn valid_from(&self) -> &str {
        self.from.as_str()
    }

    /// Returns the end of the validity window.
    #[must_use]
    pub fn valid_to(&self) -> &str {
        self.to.as_str()
    }

    /// Returns whether this is the zero-valued record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns the record with a replaced validity window.
    #[must_use]
    pub fn with_period(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = from.into();
        self.to = to.into();
        self
    }

    /// Returns whether the stored record was written for this key.
    ///
    /// Colliding triples share a primary key, so the record's own attributes
    /// decide ownership. An empty `patientId` matches any patient.
    #[must_use]
    pub fn belongs_to(&self, key: &PermissionKey) -> bool {
        self.doctor_id == key.doctor_id()
            && self.data_category == key.data_category()
            && (self.patient_id.is_empty() || self.patient_id == key.patient_id())
    }

    /// Returns the record without its patient reference.
    #[must_use]
    pub fn without_patient(mut self) -> Self {
        self.patient_id.clear();
        self
    }
}

/// How an update rebuilds the stored record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// The replacement record keeps every attribute of the triple.
    #[default]
    PreservePatient,
    /// The replacement record leaves `patientId` empty, as older deployments did.
    LegacyOmitPatient,
}

impl UpdatePolicy {
    /// Returns a stable configuration value for this policy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreservePatient => "preserve_patient",
            Self::LegacyOmitPatient => "legacy_omit_patient",
        }
    }

    /// Applies the policy to a freshly built replacement record.
    #[must_use]
    pub fn apply(&self, permission: Permission) -> Permission {
        match self {
            Self::PreservePatient => permission,
            Self::LegacyOmitPatient => permission.without_patient(),
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "preserve_patient" => Ok(Self::PreservePatient),
            "legacy_omit_patient" => Ok(Self::LegacyOmitPatient),
            _ => Err(AppError::Validation(format!(
                "unknown update policy '{value}'"
            ))),
        }
    }
}
