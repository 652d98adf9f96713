use medconsent_core::{AppError, AppResult};

/// Separator placed before the namespace and after every key component.
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{0}';

/// Namespace of the doctor-first permission index.
pub const PERMISSION_INDEX: &str = "permissionId";

/// Namespace of the patient-first permission index.
pub const PATIENT_PERMISSION_INDEX: &str = "patientPermissionId";

/// Value stored under every index key; the key carries all the information.
pub const INDEX_SENTINEL: &[u8] = &[0x00];

/// Structured ledger key made of a namespace and ordered components.
///
/// Encodes as `\0namespace\0component\0component\0...`, the layout used by
/// ledger state databases so that any leading run of components addresses a
/// contiguous key range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    namespace: String,
    components: Vec<String>,
}

impl CompositeKey {
    /// Creates a validated composite key.
    pub fn new<I, S>(namespace: impl Into<String>, components: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(AppError::Validation(
                "composite key namespace must not be empty".to_owned(),
            ));
        }
        ensure_no_separator("namespace", namespace.as_str())?;

        let components = components
            .into_iter()
            .map(Into::into)
            .collect::<Vec<String>>();
        for component in &components {
            ensure_no_separator("component", component.as_str())?;
        }

        Ok(Self {
            namespace,
            components,
        })
    }

    /// Parses an encoded key back into namespace and components.
    pub fn parse(encoded: &str) -> AppResult<Self> {
        let Some(body) = encoded.strip_prefix(COMPOSITE_KEY_SEPARATOR) else {
            return Err(AppError::Validation(format!(
                "key '{}' is not a composite key",
                encoded.escape_debug()
            )));
        };
        let Some(body) = body.strip_suffix(COMPOSITE_KEY_SEPARATOR) else {
            return Err(AppError::Validation(format!(
                "composite key '{}' is not terminated",
                encoded.escape_debug()
            )));
        };

        let mut parts = body.split(COMPOSITE_KEY_SEPARATOR);
        let namespace = parts.next().unwrap_or_default();

        Self::new(namespace, parts)
    }

    /// Returns the namespace label.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Returns the ordered components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        self.components.as_slice()
    }

    /// Returns the component at the given position.
    pub fn component(&self, position: usize) -> AppResult<&str> {
        self.components
            .get(position)
            .map(String::as_str)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "composite key in namespace '{}' has {} components, position {} requested",
                    self.namespace,
                    self.components.len(),
                    position
                ))
            })
    }

    /// Consumes the key and returns namespace and components.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.namespace, self.components)
    }

    /// Returns the encoded ledger key.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut encoded = String::with_capacity(
            2 + self.namespace.len()
                + self
                    .components
                    .iter()
                    .map(|component| component.len() + 1)
                    .sum::<usize>(),
        );
        encoded.push(COMPOSITE_KEY_SEPARATOR);
        encoded.push_str(self.namespace.as_str());
        encoded.push(COMPOSITE_KEY_SEPARATOR);
        for component in &self.components {
            encoded.push_str(component.as_str());
            encoded.push(COMPOSITE_KEY_SEPARATOR);
        }

        encoded
    }
}

fn ensure_no_separator(role: &str, value: &str) -> AppResult<()> {
    if value.contains(COMPOSITE_KEY_SEPARATOR) {
        return Err(AppError::Validation(format!(
            "composite key {role} '{}' must not contain U+0000",
            value.escape_debug()
        )));
    }

    Ok(())
}
