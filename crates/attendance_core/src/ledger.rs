//! crates/attendance_core/src/ledger.rs
//!
//! Leave and permission requests: submission, review, and the balance ledger.
//!
//! A review is two store steps. `complete_review` flips the request out of
//! `pending` exactly once and, for approvals, leaves `balance_applied = false`.
//! `apply_leave_balance` then adds the duration to the owner's used balance and
//! sets the flag in one atomic step, guarded by the entitlement, so concurrent
//! approvals can never push `used` past `total`. A refused charge puts the
//! request back to `pending`. If the second step is lost, the request stays
//! approved and `reconcile_balances` applies it later.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::{
    BalanceCharge, LeaveRequest, LeaveType, NewLeaveRequest, RequestStatus, ReviewDecision,
    ReviewOutcome,
};
use crate::error::{CoreError, CoreResult};
use crate::ports::RecordStore;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_DURATION: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// A leave or permission request as typed into the form.
#[derive(Debug, Clone, Validate)]
pub struct LeaveSubmission {
    #[validate(custom(function = "validate_leave_type"))]
    pub kind: String,
    #[validate(length(min = 1, message = "Start date is required"))]
    pub start_date: String,
    #[validate(length(min = 1, message = "End date is required"))]
    pub end_date: String,
    /// Days for leave, hours for permission.
    #[validate(custom(function = "validate_duration"))]
    pub duration: Decimal,
    #[validate(length(min = 10, message = "Reason must be at least 10 characters"))]
    pub reason: String,
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn validate_leave_type(kind: &str) -> Result<(), ValidationError> {
    kind.parse::<LeaveType>()
        .map(|_| ())
        .map_err(|_| field_error("leave_type", "Type must be leave or permission"))
}

fn validate_duration(duration: &Decimal) -> Result<(), ValidationError> {
    if *duration < MIN_DURATION {
        return Err(field_error("duration", "Duration must be at least 0.5"));
    }
    Ok(())
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

impl LeaveSubmission {
    /// Runs the field rules, then parses the dates and checks their order.
    fn checked(&self) -> Result<(LeaveType, NaiveDate, NaiveDate), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        let start = parse_day(&self.start_date);
        let end = parse_day(&self.end_date);
        if !self.start_date.is_empty() && start.is_none() {
            errors.add("start_date", field_error("date", "Start date must be YYYY-MM-DD"));
        }
        if !self.end_date.is_empty() && end.is_none() {
            errors.add("end_date", field_error("date", "End date must be YYYY-MM-DD"));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                errors.add(
                    "end_date",
                    field_error("date_order", "End date must not be before start date"),
                );
            }
        }

        match (self.kind.parse::<LeaveType>().ok(), start, end) {
            (Some(kind), Some(start), Some(end)) if errors.errors().is_empty() => {
                Ok((kind, start, end))
            }
            _ => Err(errors),
        }
    }
}

#[derive(Clone)]
pub struct LeaveLedger {
    store: Arc<dyn RecordStore>,
}

impl LeaveLedger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The employee's requests, most recently submitted first.
    pub async fn list_for_employee(&self, employee_id: Uuid) -> CoreResult<Vec<LeaveRequest>> {
        Ok(self.store.leave_requests_for(employee_id).await?)
    }

    pub async fn list_pending(&self) -> CoreResult<Vec<LeaveRequest>> {
        Ok(self.store.pending_leave_requests().await?)
    }

    /// Files a new request in `pending`. Balances are checked at review time only.
    pub async fn submit(
        &self,
        employee_id: Uuid,
        submission: LeaveSubmission,
        now: DateTime<Utc>,
    ) -> CoreResult<LeaveRequest> {
        let (kind, start_date, end_date) = submission.checked()?;

        let employee = self
            .store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(employee_id.to_string()))?;

        let request = self
            .store
            .insert_leave_request(NewLeaveRequest {
                employee_id: employee.id,
                employee_name: employee.full_name,
                kind,
                start_date,
                end_date,
                duration: submission.duration,
                reason: submission.reason,
                submitted_at: now,
            })
            .await?;

        info!(
            request_id = %request.id,
            employee_id = %employee_id,
            kind = %kind,
            duration = %request.duration,
            "Leave request submitted"
        );
        Ok(request)
    }

    /// Approves or rejects a pending request. Approval also charges the owner's
    /// balance; it is refused when the balance would exceed the entitlement.
    pub async fn review(
        &self,
        request_id: Uuid,
        decision: ReviewDecision,
        reviewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<LeaveRequest> {
        let request = self
            .store
            .get_leave_request(request_id)
            .await?
            .ok_or(CoreError::RequestNotFound(request_id))?;

        if request.status != RequestStatus::Pending {
            return Err(CoreError::AlreadyReviewed(request_id));
        }

        if decision == ReviewDecision::Approved {
            let owner = self
                .store
                .get_employee(request.employee_id)
                .await?
                .ok_or_else(|| CoreError::EmployeeNotFound(request.employee_id.to_string()))?;
            let remaining = owner.remaining(request.kind);
            if request.duration > remaining {
                return Err(CoreError::InsufficientBalance {
                    kind: request.kind,
                    remaining,
                    requested: request.duration,
                });
            }
        }

        let mut reviewed = self
            .store
            .complete_review(ReviewOutcome {
                request_id,
                status: decision.into(),
                reviewed_at: now,
                reviewed_by: reviewer_id,
            })
            .await?
            .ok_or(CoreError::AlreadyReviewed(request_id))?;

        info!(
            request_id = %request_id,
            status = reviewed.status.as_str(),
            reviewer_id = %reviewer_id,
            "Leave request reviewed"
        );

        if reviewed.status == RequestStatus::Approved {
            match self.store.apply_leave_balance(request_id).await {
                Ok(BalanceCharge::Applied) => reviewed.balance_applied = true,
                Ok(BalanceCharge::Skipped) => {}
                Ok(BalanceCharge::Refused { remaining }) => {
                    warn!(
                        request_id = %request_id,
                        remaining = %remaining,
                        "Approval refused by the balance guard; request is pending again"
                    );
                    return Err(CoreError::InsufficientBalance {
                        kind: reviewed.kind,
                        remaining,
                        requested: reviewed.duration,
                    });
                }
                Err(e) => warn!(
                    request_id = %request_id,
                    error = %e,
                    "Balance update deferred to reconciliation"
                ),
            }
        }

        Ok(reviewed)
    }

    /// Applies the balance update of every approved request that is still missing
    /// one. Returns how many were applied by this sweep.
    pub async fn reconcile_balances(&self) -> CoreResult<usize> {
        let outstanding = self.store.unapplied_approvals().await?;
        let mut applied = 0;
        for request in outstanding {
            match self.store.apply_leave_balance(request.id).await {
                Ok(BalanceCharge::Applied) => applied += 1,
                Ok(BalanceCharge::Skipped) => {}
                Ok(BalanceCharge::Refused { remaining }) => warn!(
                    request_id = %request.id,
                    remaining = %remaining,
                    "Approved request exceeds the entitlement; returned to pending"
                ),
                Err(e) => warn!(request_id = %request.id, error = %e, "Balance reconciliation failed"),
            }
        }
        if applied > 0 {
            info!(applied, "Reconciled approved leave balances");
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::{admin, at, employee, YieldingStore};
    use rust_decimal_macros::dec;

    fn ledger() -> (Arc<MemoryStore>, LeaveLedger) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), LeaveLedger::new(store))
    }

    fn submission(kind: &str, start: &str, end: &str, duration: Decimal, reason: &str) -> LeaveSubmission {
        LeaveSubmission {
            kind: kind.to_string(),
            start_date: start.to_string(),
            end_date: end.to_string(),
            duration,
            reason: reason.to_string(),
        }
    }

    fn family_event() -> LeaveSubmission {
        submission("leave", "2024-07-01", "2024-07-03", dec!(3), "Family event travel")
    }

    #[tokio::test]
    async fn submit_creates_a_pending_request() {
        let (store, ledger) = ledger();
        let e1 = employee("E1", "Asha Raman");
        store.put_employee(e1.clone()).unwrap();

        let request = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.kind, LeaveType::Leave);
        assert_eq!(request.duration, dec!(3));
        assert_eq!(request.employee_name, "Asha Raman");
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert!(request.reviewed_at.is_none());

        let listed = ledger.list_pending().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn approval_charges_the_balance_once() {
        let (store, ledger) = ledger();
        let e1 = employee("E1", "Asha Raman");
        let boss = admin("A1", "Meera Iyer");
        store.put_employee(e1.clone()).unwrap();
        store.put_employee(boss.clone()).unwrap();

        let request = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        let reviewed = ledger
            .review(request.id, ReviewDecision::Approved, boss.id, at(2024, 6, 21, 9, 0))
            .await
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Approved);
        assert_eq!(reviewed.reviewed_at, Some(at(2024, 6, 21, 9, 0)));
        assert_eq!(reviewed.reviewed_by, Some(boss.id));
        assert!(reviewed.balance_applied);

        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(3));
        assert_eq!(owner.used_permissions, dec!(0));

        let again = ledger
            .review(request.id, ReviewDecision::Rejected, boss.id, at(2024, 6, 21, 9, 5))
            .await;
        assert!(matches!(again, Err(CoreError::AlreadyReviewed(id)) if id == request.id));
        let again = ledger
            .review(request.id, ReviewDecision::Approved, boss.id, at(2024, 6, 21, 9, 6))
            .await;
        assert!(matches!(again, Err(CoreError::AlreadyReviewed(_))));

        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(3));
        assert_eq!(
            store.get_leave_request(request.id).await.unwrap().unwrap().status,
            RequestStatus::Approved
        );
    }

    #[tokio::test]
    async fn permissions_draw_from_their_own_balance_and_rejections_charge_nothing() {
        let (store, ledger) = ledger();
        let e1 = employee("E1", "Asha Raman");
        store.put_employee(e1.clone()).unwrap();
        let reviewer = Uuid::new_v4();

        let permission = ledger
            .submit(
                e1.id,
                submission("permission", "2024-07-05", "2024-07-05", dec!(1.5), "Dentist appointment"),
                at(2024, 7, 1, 8, 0),
            )
            .await
            .unwrap();
        let leave = ledger
            .submit(e1.id, family_event(), at(2024, 7, 1, 8, 5))
            .await
            .unwrap();

        ledger
            .review(permission.id, ReviewDecision::Approved, reviewer, at(2024, 7, 2, 8, 0))
            .await
            .unwrap();
        let rejected = ledger
            .review(leave.id, ReviewDecision::Rejected, reviewer, at(2024, 7, 2, 8, 1))
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);

        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_permissions, dec!(1.5));
        assert_eq!(owner.used_leaves, dec!(0));
        assert!(ledger.list_pending().await.unwrap().is_empty());

        let history = ledger.list_for_employee(e1.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, leave.id);
    }

    #[tokio::test]
    async fn approval_beyond_the_entitlement_is_refused() {
        let (store, ledger) = ledger();
        let mut e1 = employee("E1", "Asha Raman");
        e1.used_leaves = dec!(18.5);
        store.put_employee(e1.clone()).unwrap();

        let request = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        let result = ledger
            .review(request.id, ReviewDecision::Approved, Uuid::new_v4(), at(2024, 6, 21, 9, 0))
            .await;
        match result {
            Err(CoreError::InsufficientBalance {
                kind,
                remaining,
                requested,
            }) => {
                assert_eq!(kind, LeaveType::Leave);
                assert_eq!(remaining, dec!(1.5));
                assert_eq!(requested, dec!(3));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }

        let unchanged = store.get_leave_request(request.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, RequestStatus::Pending);
        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(18.5));
    }

    #[tokio::test]
    async fn reconciliation_applies_an_approval_whose_balance_write_was_lost() {
        let (store, ledger) = ledger();
        let e1 = employee("E1", "Asha Raman");
        store.put_employee(e1.clone()).unwrap();

        let request = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        // Stage the state a crash between the two writes leaves behind.
        store
            .complete_review(ReviewOutcome {
                request_id: request.id,
                status: RequestStatus::Approved,
                reviewed_at: at(2024, 6, 21, 9, 0),
                reviewed_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        assert_eq!(store.unapplied_approvals().await.unwrap().len(), 1);

        assert_eq!(ledger.reconcile_balances().await.unwrap(), 1);
        assert_eq!(ledger.reconcile_balances().await.unwrap(), 0);

        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(3));
        assert!(store.get_leave_request(request.id).await.unwrap().unwrap().balance_applied);
    }

    #[tokio::test]
    async fn concurrent_approvals_cannot_overdraw_the_entitlement() {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(YieldingStore::new(memory.clone()));
        let ledger = LeaveLedger::new(store.clone());
        let mut e1 = employee("E1", "Asha Raman");
        e1.used_leaves = dec!(16);
        memory.put_employee(e1.clone()).unwrap();

        let first = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        let second = ledger
            .submit(
                e1.id,
                submission("leave", "2024-08-05", "2024-08-07", dec!(3), "Cousin's wedding out of town"),
                at(2024, 6, 20, 10, 5),
            )
            .await
            .unwrap();

        let reviewer = Uuid::new_v4();
        let (a, b) = tokio::join!(
            ledger.review(first.id, ReviewDecision::Approved, reviewer, at(2024, 6, 21, 9, 0)),
            ledger.review(second.id, ReviewDecision::Approved, reviewer, at(2024, 6, 21, 9, 0)),
        );

        // Both reviews passed the balance read and reached the guarded write.
        assert_eq!(store.conditional_writes(), 2);
        let (approved, refused) = match (a, b) {
            (Ok(approved), Err(refused)) | (Err(refused), Ok(approved)) => (approved, refused),
            other => panic!("expected one approval and one refusal, got {:?}", other),
        };
        assert_eq!(approved.status, RequestStatus::Approved);
        assert!(approved.balance_applied);
        match refused {
            CoreError::InsufficientBalance {
                kind,
                remaining,
                requested,
            } => {
                assert_eq!(kind, LeaveType::Leave);
                assert_eq!(remaining, dec!(1));
                assert_eq!(requested, dec!(3));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }

        let owner = memory.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(19));
        assert!(owner.used_leaves <= owner.total_leaves);

        let pending = ledger.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_ne!(pending[0].id, approved.id);
        assert!(pending[0].reviewed_at.is_none());
        assert!(pending[0].reviewed_by.is_none());
    }

    #[tokio::test]
    async fn reconciliation_returns_an_overdrawing_approval_to_pending() {
        let (store, ledger) = ledger();
        let mut e1 = employee("E1", "Asha Raman");
        e1.used_leaves = dec!(18.5);
        store.put_employee(e1.clone()).unwrap();

        let request = ledger
            .submit(e1.id, family_event(), at(2024, 6, 20, 10, 0))
            .await
            .unwrap();
        store
            .complete_review(ReviewOutcome {
                request_id: request.id,
                status: RequestStatus::Approved,
                reviewed_at: at(2024, 6, 21, 9, 0),
                reviewed_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        assert_eq!(ledger.reconcile_balances().await.unwrap(), 0);
        assert!(store.unapplied_approvals().await.unwrap().is_empty());

        let reverted = store.get_leave_request(request.id).await.unwrap().unwrap();
        assert_eq!(reverted.status, RequestStatus::Pending);
        assert!(!reverted.balance_applied);
        let owner = store.get_employee(e1.id).await.unwrap().unwrap();
        assert_eq!(owner.used_leaves, dec!(18.5));
    }

    #[tokio::test]
    async fn submit_reports_field_level_validation_errors() {
        let (store, ledger) = ledger();
        let e1 = employee("E1", "Asha Raman");
        store.put_employee(e1.clone()).unwrap();
        let now = at(2024, 6, 20, 10, 0);

        let short = submission("leave", "2024-07-01", "2024-07-03", dec!(3), "short");
        match ledger.submit(e1.id, short, now).await {
            Err(CoreError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("reason"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let bad = submission("vacation", "07/01/2024", "2024-06-30", dec!(0.25), "Family event travel");
        match ledger.submit(e1.id, bad, now).await {
            Err(CoreError::Validation(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("kind"));
                assert!(fields.contains_key("start_date"));
                assert!(fields.contains_key("duration"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let reversed = submission("leave", "2024-07-03", "2024-07-01", dec!(3), "Family event travel");
        match ledger.submit(e1.id, reversed, now).await {
            Err(CoreError::Validation(errors)) => {
                assert!(errors.field_errors().contains_key("end_date"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(ledger.list_for_employee(e1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_employee_and_request_are_not_found() {
        let (_store, ledger) = ledger();
        let result = ledger
            .submit(Uuid::new_v4(), family_event(), at(2024, 6, 20, 10, 0))
            .await;
        assert!(matches!(result, Err(CoreError::EmployeeNotFound(_))));

        let missing = Uuid::new_v4();
        let result = ledger
            .review(missing, ReviewDecision::Approved, Uuid::new_v4(), at(2024, 6, 20, 10, 0))
            .await;
        assert!(matches!(result, Err(CoreError::RequestNotFound(id)) if id == missing));
    }
}
