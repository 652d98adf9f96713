use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use medconsent_core::AppError;
use medconsent_domain::UpdatePolicy;

#[derive(Debug, Clone)]
pub struct ChaincodeConfig {
    pub ledger_path: PathBuf,
    pub update_policy: UpdatePolicy,
}

impl ChaincodeConfig {
    pub fn load() -> Result<Self, AppError> {
        let ledger_path = env::var("MEDCONSENT_LEDGER_PATH")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "ledger.json".to_owned());

        let update_policy = env::var("MEDCONSENT_UPDATE_POLICY")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                UpdatePolicy::from_str(value.trim()).map_err(|error| {
                    AppError::Validation(format!("invalid MEDCONSENT_UPDATE_POLICY: {error}"))
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            ledger_path: PathBuf::from(ledger_path),
            update_policy,
        })
    }
}
