use std::str::FromStr;

use medconsent_application::{PermissionGrantInput, PermissionService, ReindexReport};
use medconsent_core::{AppError, AppResult};
use medconsent_domain::Permission;

/// Named transactions exposed to ledger clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    CreatePermission,
    UpdatePermission,
    DeletePermission,
    ReadSpecificPermission,
    ChangePermissionPeriod,
    ListDoctorPermissions,
    ListPatientPermissions,
    PermissionExist,
    ReindexPermissions,
}

impl Transaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatePermission => "CreatePermission",
            Self::UpdatePermission => "UpdatePermission",
            Self::DeletePermission => "DeletePermission",
            Self::ReadSpecificPermission => "ReadSpecificPermission",
            Self::ChangePermissionPeriod => "ChangePermissionPeriod",
            Self::ListDoctorPermissions => "ListDoctorPermissions",
            Self::ListPatientPermissions => "ListPatientPermissions",
            Self::PermissionExist => "PermissionExist",
            Self::ReindexPermissions => "ReindexPermissions",
        }
    }

    /// Accepted positional argument lists, by name.
    pub fn signatures(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::CreatePermission | Self::UpdatePermission => &[&[
                "doctorId",
                "dataCategory",
                "patientId",
                "right",
                "from",
                "to",
            ]],
            Self::DeletePermission | Self::ReadSpecificPermission => {
                &[&["doctorId", "dataCategory", "patientId"]]
            }
            Self::PermissionExist => &[
                &["permissionId"],
                &["doctorId", "dataCategory", "patientId"],
            ],
            Self::ChangePermissionPeriod => {
                &[&["doctorId", "dataCategory", "patientId", "from", "to"]]
            }
            Self::ListDoctorPermissions => &[&["doctorId"]],
            Self::ListPatientPermissions => &[&["patientId"]],
            Self::ReindexPermissions => &[&[]],
        }
    }

    /// Returns whether the transaction writes to the world state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::CreatePermission
                | Self::UpdatePermission
                | Self::DeletePermission
                | Self::ChangePermissionPeriod
                | Self::ReindexPermissions
        )
    }
}

impl FromStr for Transaction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CreatePermission" => Ok(Self::CreatePermission),
            "UpdatePermission" => Ok(Self::UpdatePermission),
            "DeletePermission" => Ok(Self::DeletePermission),
            "ReadSpecificPermission" => Ok(Self::ReadSpecificPermission),
            "ChangePermissionPeriod" => Ok(Self::ChangePermissionPeriod),
            "ListDoctorPermissions" => Ok(Self::ListDoctorPermissions),
            "ListPatientPermissions" => Ok(Self::ListPatientPermissions),
            "PermissionExist" => Ok(Self::PermissionExist),
            "ReindexPermissions" => Ok(Self::ReindexPermissions),
            _ => Err(AppError::Validation(format!(
                "unknown transaction '{value}'"
            ))),
        }
    }
}

/// Result of one dispatched transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutput {
    Empty,
    Record(Permission),
    Records(Vec<Permission>),
    Bool(bool),
    Reindex(ReindexReport),
}

impl TransactionOutput {
    /// Renders the payload returned to the client; `None` for no payload.
    pub fn render(&self) -> AppResult<Option<String>> {
        let rendered = match self {
            Self::Empty => return Ok(None),
            Self::Record(permission) => serde_json::to_string(permission)?,
            Self::Records(permissions) => serde_json::to_string(permissions)?,
            Self::Bool(value) => value.to_string(),
            Self::Reindex(report) => report.to_json().to_string(),
        };

        Ok(Some(rendered))
    }
}

pub async fn dispatch(
    service: &PermissionService,
    transaction: Transaction,
    args: &[String],
) -> AppResult<TransactionOutput> {
    let signatures = transaction.signatures();
    if !signatures
        .iter()
        .any(|parameters| parameters.len() == args.len())
    {
        let expected = signatures
            .iter()
            .map(|parameters| format!("({})", parameters.join(", ")))
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(AppError::Validation(format!(
            "{} expects {expected}, received {} arguments",
            transaction.as_str(),
            args.len()
        )));
    }

    let arg = |position: usize| args[position].as_str();

    match transaction {
        Transaction::CreatePermission => service
            .create_permission(grant_input(args))
            .await
            .map(|()| TransactionOutput::Empty),
        Transaction::UpdatePermission => service
            .update_permission(grant_input(args))
            .await
            .map(|()| TransactionOutput::Empty),
        Transaction::DeletePermission => service
            .delete_permission(arg(0), arg(1), arg(2))
            .await
            .map(|()| TransactionOutput::Empty),
        Transaction::ReadSpecificPermission => service
            .read_permission(arg(0), arg(1), arg(2))
            .await
            .map(TransactionOutput::Record),
        Transaction::ChangePermissionPeriod => service
            .change_permission_period(arg(0), arg(1), arg(2), arg(3), arg(4))
            .await
            .map(|()| TransactionOutput::Empty),
        Transaction::ListDoctorPermissions => service
            .list_doctor_permissions(arg(0))
            .await
            .map(TransactionOutput::Records),
        Transaction::ListPatientPermissions => service
            .list_patient_permissions(arg(0))
            .await
            .map(TransactionOutput::Records),
        Transaction::PermissionExist if args.len() == 1 => service
            .permission_id_exists(arg(0))
            .await
            .map(TransactionOutput::Bool),
        Transaction::PermissionExist => service
            .permission_exists(arg(0), arg(1), arg(2))
            .await
            .map(TransactionOutput::Bool),
        Transaction::ReindexPermissions => service
            .reindex_permissions()
            .await
            .map(TransactionOutput::Reindex),
    }
}

fn grant_input(args: &[String]) -> PermissionGrantInput {
    PermissionGrantInput {
        doctor_id: args[0].clone(),
        data_category: args[1].clone(),
        patient_id: args[2].clone(),
        right: args[3].clone(),
        from: args[4].clone(),
        to: args[5].clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use medconsent_application::PermissionService;
    use medconsent_core::AppError;
    use medconsent_infrastructure::InMemoryLedgerStore;

    use super::{Transaction, TransactionOutput, dispatch};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn service() -> PermissionService {
        PermissionService::new(Arc::new(InMemoryLedgerStore::new()))
    }

    #[test]
    fn transaction_names_roundtrip() {
        for name in [
            "CreatePermission",
            "UpdatePermission",
            "DeletePermission",
            "ReadSpecificPermission",
            "ChangePermissionPeriod",
            "ListDoctorPermissions",
            "ListPatientPermissions",
            "PermissionExist",
            "ReindexPermissions",
        ] {
            let parsed = Transaction::from_str(name);
            assert_eq!(
                parsed.map(|transaction| transaction.as_str()).ok(),
                Some(name)
            );
        }
        assert!(Transaction::from_str("DropEverything").is_err());
    }

    #[tokio::test]
    async fn wrong_argument_count_is_rejected() {
        let service = service();

        let output = dispatch(
            &service,
            Transaction::CreatePermission,
            &args(&["D1", "labs"]),
        )
        .await;
        assert!(matches!(output, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn dispatches_create_list_and_exists() {
        let service = service();

        let created = dispatch(
            &service,
            Transaction::CreatePermission,
            &args(&["D1", "labs", "P1", "read", "2024-01-01", "2024-12-31"]),
        )
        .await;
        assert_eq!(created.ok(), Some(TransactionOutput::Empty));

        let exists = dispatch(
            &service,
            Transaction::PermissionExist,
            &args(&["D1", "labs", "P1"]),
        )
        .await;
        assert_eq!(exists.ok(), Some(TransactionOutput::Bool(true)));

        let listed = dispatch(
            &service,
            Transaction::ListDoctorPermissions,
            &args(&["D1"]),
        )
        .await
        .unwrap_or(TransactionOutput::Empty);
        assert_eq!(
            listed.render().unwrap_or_default(),
            Some(
                r#"[{"permissionId":"D1labsP1","dataCategory":"labs","patientId":"P1","doctorId":"D1","right":"read","from":"2024-01-01","to":"2024-12-31"}]"#
                    .to_owned()
            )
        );
    }

    #[tokio::test]
    async fn permission_exist_accepts_id_or_triple() {
        let service = service();
        let created = dispatch(
            &service,
            Transaction::CreatePermission,
            &args(&["D1", "labs", "P1", "read", "2024-01-01", "2024-12-31"]),
        )
        .await;
        assert!(created.is_ok());

        let by_id = dispatch(&service, Transaction::PermissionExist, &args(&["D1labsP1"])).await;
        assert_eq!(by_id.ok(), Some(TransactionOutput::Bool(true)));

        let by_triple = dispatch(
            &service,
            Transaction::PermissionExist,
            &args(&["D1", "labs", "P1"]),
        )
        .await;
        assert_eq!(by_triple.ok(), Some(TransactionOutput::Bool(true)));

        let unknown = dispatch(&service, Transaction::PermissionExist, &args(&["D2labsP1"])).await;
        assert_eq!(unknown.ok(), Some(TransactionOutput::Bool(false)));

        let two_args = dispatch(&service, Transaction::PermissionExist, &args(&["D1", "labs"])).await;
        assert!(matches!(two_args, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_listing_renders_as_empty_array() {
        let service = service();

        let listed = dispatch(
            &service,
            Transaction::ListPatientPermissions,
            &args(&["P1"]),
        )
        .await
        .unwrap_or(TransactionOutput::Empty);
        assert_eq!(listed.render().unwrap_or_default(), Some("[]".to_owned()));
    }

    #[tokio::test]
    async fn reindex_reports_counts() {
        let service = service();

        let output = dispatch(&service, Transaction::ReindexPermissions, &[])
            .await
            .unwrap_or(TransactionOutput::Empty);
        assert_eq!(
            output.render().unwrap_or_default(),
            Some(r#"{"indexed":0,"pruned":0}"#.to_owned())
        );
    }

    #[test]
    fn only_writes_are_mutating() {
        assert!(Transaction::ChangePermissionPeriod.is_mutating());
        assert!(!Transaction::ListDoctorPermissions.is_mutating());
        assert!(!Transaction::ReadSpecificPermission.is_mutating());
    }
}
