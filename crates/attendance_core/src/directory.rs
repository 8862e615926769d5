//! crates/attendance_core/src/directory.rs
//!
//! Onboarding and lookup of employees.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{Employee, NewEmployee, Role, DEFAULT_TOTAL_LEAVES, DEFAULT_TOTAL_PERMISSIONS};
use crate::error::{CoreError, CoreResult};
use crate::ports::{PortError, RecordStore};

/// The profile an authenticated newcomer fills in.
#[derive(Debug, Clone, Validate)]
pub struct Onboarding {
    #[validate(length(min = 1, message = "An identity provider id is required"))]
    pub external_auth_id: String,
    #[validate(length(min = 3, max = 32, message = "Employee ID must be at least 3 characters"))]
    pub employee_code: String,
    #[validate(length(min = 2, max = 120, message = "Full name must be at least 2 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Clone)]
pub struct EmployeeDirectory {
    store: Arc<dyn RecordStore>,
}

impl EmployeeDirectory {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Registers a new employee with the default entitlements.
    pub async fn onboard(&self, onboarding: Onboarding, now: DateTime<Utc>) -> CoreResult<Employee> {
        let onboarding = Onboarding {
            employee_code: onboarding.employee_code.trim().to_string(),
            full_name: onboarding.full_name.trim().to_string(),
            ..onboarding
        };
        onboarding.validate()?;

        if self
            .store
            .find_employee_by_code(&onboarding.employee_code)
            .await?
            .is_some()
        {
            return Err(CoreError::EmployeeCodeTaken(onboarding.employee_code));
        }

        let code = onboarding.employee_code.clone();
        let created = self
            .store
            .insert_employee(NewEmployee {
                external_auth_id: onboarding.external_auth_id,
                employee_code: onboarding.employee_code,
                full_name: onboarding.full_name,
                email: onboarding.email,
                phone_number: onboarding.phone_number,
                role: Role::Employee,
                total_leaves: DEFAULT_TOTAL_LEAVES,
                total_permissions: DEFAULT_TOTAL_PERMISSIONS,
                created_at: now,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with another onboarding of the same code.
                PortError::Conflict(_) => CoreError::EmployeeCodeTaken(code),
                other => other.into(),
            })?;

        info!(employee_id = %created.id, employee_code = %created.employee_code, "Employee onboarded");
        Ok(created)
    }

    /// Resolves the human-readable employee code typed at the login screen.
    pub async fn login_by_code(&self, employee_code: &str) -> CoreResult<Employee> {
        let code = employee_code.trim();
        self.store
            .find_employee_by_code(code)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(code.to_string()))
    }

    pub async fn get(&self, employee_id: Uuid) -> CoreResult<Employee> {
        self.store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(employee_id.to_string()))
    }

    pub async fn list_all(&self) -> CoreResult<Vec<Employee>> {
        Ok(self.store.list_employees().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::at;
    use rust_decimal::Decimal;

    fn onboarding(auth: &str, code: &str, name: &str) -> Onboarding {
        Onboarding {
            external_auth_id: auth.to_string(),
            employee_code: code.to_string(),
            full_name: name.to_string(),
            email: Some(format!("{}@example.com", auth)),
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn onboarding_grants_default_balances() {
        let directory = EmployeeDirectory::new(Arc::new(MemoryStore::new()));
        let employee = directory
            .onboard(onboarding("uid-1", " EMP001 ", "Asha Raman"), at(2024, 6, 1, 8, 0))
            .await
            .unwrap();

        assert_eq!(employee.employee_code, "EMP001");
        assert_eq!(employee.role, Role::Employee);
        assert_eq!(employee.total_leaves, Decimal::from(20));
        assert_eq!(employee.total_permissions, Decimal::from(12));
        assert_eq!(employee.used_leaves, Decimal::ZERO);
        assert_eq!(employee.remaining_permissions(), Decimal::from(12));

        let found = directory.login_by_code("EMP001").await.unwrap();
        assert_eq!(found.id, employee.id);
        assert_eq!(directory.get(employee.id).await.unwrap().full_name, "Asha Raman");
    }

    #[tokio::test]
    async fn duplicate_codes_are_refused() {
        let directory = EmployeeDirectory::new(Arc::new(MemoryStore::new()));
        directory
            .onboard(onboarding("uid-1", "EMP001", "Asha Raman"), at(2024, 6, 1, 8, 0))
            .await
            .unwrap();

        let result = directory
            .onboard(onboarding("uid-2", "EMP001", "Ravi Kumar"), at(2024, 6, 1, 8, 5))
            .await;
        assert!(matches!(result, Err(CoreError::EmployeeCodeTaken(code)) if code == "EMP001"));
        assert_eq!(directory.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn short_codes_and_names_fail_validation() {
        let directory = EmployeeDirectory::new(Arc::new(MemoryStore::new()));
        let result = directory
            .onboard(onboarding("uid-1", "E1", "A"), at(2024, 6, 1, 8, 0))
            .await;
        match result {
            Err(CoreError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("employee_code"));
                assert!(fields.contains_key("full_name"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(matches!(
            directory.login_by_code("nobody").await,
            Err(CoreError::EmployeeNotFound(_))
        ));
    }
}
