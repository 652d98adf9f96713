//! Consent ledger chaincode entry point.
//!
//! Runs one named transaction against the ledger snapshot and persists the
//! resulting world state only when the transaction succeeds.

#![forbid(unsafe_code)]

mod chaincode_config;
mod dispatch;

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use medconsent_application::PermissionService;
use medconsent_core::AppError;
use medconsent_infrastructure::InMemoryLedgerStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::chaincode_config::ChaincodeConfig;
use crate::dispatch::{Transaction, dispatch};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ChaincodeConfig::load()?;
    let mut cli_args = env::args().skip(1);
    let transaction = cli_args
        .next()
        .ok_or_else(|| {
            AppError::Validation(
                "usage: medconsent-chaincode <Transaction> [arguments...]".to_owned(),
            )
        })
        .and_then(|name| Transaction::from_str(name.as_str()))?;
    let args: Vec<String> = cli_args.collect();

    let store = Arc::new(InMemoryLedgerStore::load_from_file(&config.ledger_path).await?);
    let service = PermissionService::new(store.clone()).with_update_policy(config.update_policy);

    info!(
        transaction = transaction.as_str(),
        ledger_path = %config.ledger_path.display(),
        update_policy = config.update_policy.as_str(),
        "invoking transaction"
    );

    let output = match dispatch(&service, transaction, &args).await {
        Ok(output) => output,
        Err(error) => {
            warn!(
                transaction = transaction.as_str(),
                error = %error,
                "transaction failed, world state not persisted"
            );
            return Err(error);
        }
    };

    if transaction.is_mutating() {
        store.save_to_file(&config.ledger_path).await?;
    }

    if let Some(payload) = output.render()? {
        println!("{payload}");
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
