//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RecordStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Conditional writes are single statements (`ON CONFLICT DO NOTHING`,
//! `UPDATE ... WHERE status = ...`), so the database decides the winner of a race.

use async_trait::async_trait;
use attendance_core::domain::{
    AttendanceRecord, BalanceCharge, ChatMessage, ChatParty, CheckOut, Employee, LeaveRequest,
    LeaveType, NewChatMessage, NewCheckIn, NewEmployee, NewLeaveRequest, ReviewOutcome,
};
use attendance_core::ports::{PortError, PortResult, RecordStore};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RecordStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates driver failures into the port's error vocabulary.
fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn corrupt(column: &str, detail: String) -> PortError {
    PortError::Unexpected(format!("Corrupt value in column {}: {}", column, detail))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct EmployeeRecord {
    id: Uuid,
    external_auth_id: String,
    employee_code: String,
    full_name: String,
    email: Option<String>,
    phone_number: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    total_leaves: Decimal,
    used_leaves: Decimal,
    total_permissions: Decimal,
    used_permissions: Decimal,
}
impl EmployeeRecord {
    fn to_domain(self) -> PortResult<Employee> {
        Ok(Employee {
            id: self.id,
            external_auth_id: self.external_auth_id,
            employee_code: self.employee_code,
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            role: self.role.parse().map_err(|e| corrupt("role", e))?,
            created_at: self.created_at,
            total_leaves: self.total_leaves,
            used_leaves: self.used_leaves,
            total_permissions: self.total_permissions,
            used_permissions: self.used_permissions,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: Uuid,
    employee_id: Uuid,
    employee_name: String,
    work_date: NaiveDate,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    check_in_photo_url: Option<String>,
    check_out_photo_url: Option<String>,
    check_in_key: Option<String>,
    check_out_key: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}
impl AttendanceRow {
    fn to_domain(self) -> PortResult<AttendanceRecord> {
        Ok(AttendanceRecord {
            id: self.id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            date: self.work_date,
            check_in: self.check_in,
            check_out: self.check_out,
            check_in_photo_url: self.check_in_photo_url,
            check_out_photo_url: self.check_out_photo_url,
            check_in_key: self.check_in_key,
            check_out_key: self.check_out_key,
            status: self.status.parse().map_err(|e| corrupt("status", e))?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct LeaveRequestRecord {
    id: Uuid,
    employee_id: Uuid,
    employee_name: String,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration: Decimal,
    reason: String,
    status: String,
    submitted_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<Uuid>,
    balance_applied: bool,
}
impl LeaveRequestRecord {
    fn to_domain(self) -> PortResult<LeaveRequest> {
        Ok(LeaveRequest {
            id: self.id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            kind: self.kind.parse().map_err(|e| corrupt("kind", e))?,
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
            reason: self.reason,
            status: self.status.parse().map_err(|e| corrupt("status", e))?,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
            balance_applied: self.balance_applied,
        })
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    sender_id: String,
    sender_name: String,
    sender_role: String,
    receiver_id: String,
    text: String,
    sent_at: DateTime<Utc>,
    is_read: bool,
}
impl ChatMessageRecord {
    fn to_domain(self) -> PortResult<ChatMessage> {
        Ok(ChatMessage {
            id: self.id,
            sender: self.sender_id.parse().map_err(|e| corrupt("sender_id", e))?,
            sender_name: self.sender_name,
            sender_role: self.sender_role.parse().map_err(|e| corrupt("sender_role", e))?,
            receiver: self.receiver_id.parse().map_err(|e| corrupt("receiver_id", e))?,
            text: self.text,
            sent_at: self.sent_at,
            read: self.is_read,
        })
    }
}

/// What `apply_leave_balance` needs from the request it just flagged.
#[derive(FromRow)]
struct AppliedRequest {
    employee_id: Uuid,
    kind: String,
    duration: Decimal,
}

fn all_to_domain<R, T>(rows: Vec<R>, f: fn(R) -> PortResult<T>) -> PortResult<Vec<T>> {
    rows.into_iter().map(f).collect()
}

//=========================================================================================
// `RecordStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecordStore for DbAdapter {
    // --- Employees ---

    async fn insert_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        let record = sqlx::query_as::<_, EmployeeRecord>(
            "INSERT INTO employees \
             (id, external_auth_id, employee_code, full_name, email, phone_number, role, created_at, total_leaves, total_permissions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&employee.external_auth_id)
        .bind(&employee.employee_code)
        .bind(&employee.full_name)
        .bind(&employee.email)
        .bind(&employee.phone_number)
        .bind(employee.role.as_str())
        .bind(employee.created_at)
        .bind(employee.total_leaves)
        .bind(employee.total_permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        record.to_domain()
    }

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>> {
        sqlx::query_as::<_, EmployeeRecord>("SELECT * FROM employees WHERE id = $1")
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(port_error)?
            .map(EmployeeRecord::to_domain)
            .transpose()
    }

    async fn find_employee_by_code(&self, employee_code: &str) -> PortResult<Option<Employee>> {
        sqlx::query_as::<_, EmployeeRecord>("SELECT * FROM employees WHERE employee_code = $1")
            .bind(employee_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(port_error)?
            .map(EmployeeRecord::to_domain)
            .transpose()
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRecord>(
            "SELECT * FROM employees ORDER BY employee_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, EmployeeRecord::to_domain)
    }

    // --- Attendance ---

    async fn find_attendance(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_records WHERE employee_id = $1 AND work_date = $2",
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(AttendanceRow::to_domain)
        .transpose()
    }

    async fn recent_attendance(
        &self,
        employee_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_records WHERE employee_id = $1 \
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(employee_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, AttendanceRow::to_domain)
    }

    async fn attendance_on(&self, date: NaiveDate) -> PortResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_records WHERE work_date = $1 ORDER BY check_in",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, AttendanceRow::to_domain)
    }

    async fn attendance_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT * FROM attendance_records \
             WHERE employee_id = $1 AND work_date BETWEEN $2 AND $3 ORDER BY work_date",
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, AttendanceRow::to_domain)
    }

    async fn insert_check_in(&self, check_in: NewCheckIn) -> PortResult<AttendanceRecord> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            "INSERT INTO attendance_records \
             (id, employee_id, employee_name, work_date, check_in, check_in_photo_url, check_in_key, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'checked-in', $5) \
             ON CONFLICT (employee_id, work_date) DO NOTHING RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(check_in.employee_id)
        .bind(&check_in.employee_name)
        .bind(check_in.date)
        .bind(check_in.at)
        .bind(&check_in.photo_url)
        .bind(&check_in.request_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?;

        match row {
            Some(row) => row.to_domain(),
            None => Err(PortError::Conflict(format!(
                "attendance for {} on {} already exists",
                check_in.employee_id, check_in.date
            ))),
        }
    }

    async fn record_check_out(&self, check_out: CheckOut) -> PortResult<Option<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(
            "UPDATE attendance_records \
             SET status = 'checked-out', check_out = $2, check_out_photo_url = $3, check_out_key = $4 \
             WHERE id = $1 AND status = 'checked-in' RETURNING *",
        )
        .bind(check_out.record_id)
        .bind(check_out.at)
        .bind(&check_out.photo_url)
        .bind(&check_out.request_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(AttendanceRow::to_domain)
        .transpose()
    }

    // --- Leave requests ---

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> PortResult<LeaveRequest> {
        let record = sqlx::query_as::<_, LeaveRequestRecord>(
            "INSERT INTO leave_requests \
             (id, employee_id, employee_name, kind, start_date, end_date, duration, reason, status, submitted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(request.employee_id)
        .bind(&request.employee_name)
        .bind(request.kind.as_str())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.duration)
        .bind(&request.reason)
        .bind(request.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        record.to_domain()
    }

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequestRecord>("SELECT * FROM leave_requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(port_error)?
            .map(LeaveRequestRecord::to_domain)
            .transpose()
    }

    async fn leave_requests_for(&self, employee_id: Uuid) -> PortResult<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRecord>(
            "SELECT * FROM leave_requests WHERE employee_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, LeaveRequestRecord::to_domain)
    }

    async fn pending_leave_requests(&self) -> PortResult<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRecord>(
            "SELECT * FROM leave_requests WHERE status = 'pending' ORDER BY submitted_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, LeaveRequestRecord::to_domain)
    }

    async fn complete_review(&self, outcome: ReviewOutcome) -> PortResult<Option<LeaveRequest>> {
        sqlx::query_as::<_, LeaveRequestRecord>(
            "UPDATE leave_requests \
             SET status = $2, reviewed_at = $3, reviewed_by = $4, balance_applied = ($2 <> 'approved') \
             WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(outcome.request_id)
        .bind(outcome.status.as_str())
        .bind(outcome.reviewed_at)
        .bind(outcome.reviewed_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(port_error)?
        .map(LeaveRequestRecord::to_domain)
        .transpose()
    }

    async fn apply_leave_balance(&self, request_id: Uuid) -> PortResult<BalanceCharge> {
        let mut tx = self.pool.begin().await.map_err(port_error)?;

        let flagged = sqlx::query_as::<_, AppliedRequest>(
            "UPDATE leave_requests SET balance_applied = TRUE \
             WHERE id = $1 AND status = 'approved' AND NOT balance_applied \
             RETURNING employee_id, kind, duration",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(port_error)?;

        let Some(applied) = flagged else {
            // Dropping the transaction rolls it back; nothing was written.
            return Ok(BalanceCharge::Skipped);
        };

        let kind: LeaveType = applied.kind.parse().map_err(|e| corrupt("kind", e))?;
        let (charge, remaining) = match kind {
            LeaveType::Leave => (
                "UPDATE employees SET used_leaves = used_leaves + $2 \
                 WHERE id = $1 AND used_leaves + $2 <= total_leaves RETURNING id",
                "SELECT total_leaves - used_leaves FROM employees WHERE id = $1",
            ),
            LeaveType::Permission => (
                "UPDATE employees SET used_permissions = used_permissions + $2 \
                 WHERE id = $1 AND used_permissions + $2 <= total_permissions RETURNING id",
                "SELECT total_permissions - used_permissions FROM employees WHERE id = $1",
            ),
        };
        // The row lock taken by this UPDATE serializes concurrent charges, and the
        // guard is re-evaluated against the committed balance.
        let charged = sqlx::query_scalar::<_, Uuid>(charge)
            .bind(applied.employee_id)
            .bind(applied.duration)
            .fetch_optional(&mut *tx)
            .await
            .map_err(port_error)?;

        if charged.is_none() {
            let remaining = sqlx::query_scalar::<_, Decimal>(remaining)
                .bind(applied.employee_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(port_error)?;
            let Some(remaining) = remaining else {
                warn!(request_id = %request_id, employee_id = %applied.employee_id, "Approved request points at a missing employee");
                return Err(PortError::NotFound(format!(
                    "Employee {} not found",
                    applied.employee_id
                )));
            };

            sqlx::query(
                "UPDATE leave_requests \
                 SET status = 'pending', reviewed_at = NULL, reviewed_by = NULL, balance_applied = FALSE \
                 WHERE id = $1",
            )
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;
            tx.commit().await.map_err(port_error)?;
            return Ok(BalanceCharge::Refused { remaining });
        }

        tx.commit().await.map_err(port_error)?;
        Ok(BalanceCharge::Applied)
    }

    async fn unapplied_approvals(&self) -> PortResult<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRecord>(
            "SELECT * FROM leave_requests WHERE status = 'approved' AND NOT balance_applied \
             ORDER BY reviewed_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, LeaveRequestRecord::to_domain)
    }

    // --- Chat ---

    async fn insert_chat_message(&self, message: NewChatMessage) -> PortResult<ChatMessage> {
        let record = sqlx::query_as::<_, ChatMessageRecord>(
            "INSERT INTO chat_messages \
             (id, sender_id, sender_name, sender_role, receiver_id, text, sent_at, is_read) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(message.sender.to_string())
        .bind(&message.sender_name)
        .bind(message.sender_role.as_str())
        .bind(message.receiver.to_string())
        .bind(&message.text)
        .bind(message.sent_at)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)?;
        record.to_domain()
    }

    async fn conversation(&self, employee_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT * FROM chat_messages \
             WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1) \
             ORDER BY sent_at",
        )
        .bind(ChatParty::Employee(employee_id).to_string())
        .bind(ChatParty::ADMIN_DESK_ID)
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)?;
        all_to_domain(rows, ChatMessageRecord::to_domain)
    }

    async fn mark_read(&self, receiver: ChatParty, sender: ChatParty) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_read = TRUE \
             WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read",
        )
        .bind(receiver.to_string())
        .bind(sender.to_string())
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        Ok(result.rows_affected())
    }
}
