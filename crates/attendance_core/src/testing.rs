//! Fixtures shared by the unit tests in this crate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::yield_now;
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, BalanceCharge, ChatMessage, ChatParty, CheckOut, Employee, LeaveRequest,
    NewChatMessage, NewCheckIn, NewEmployee, NewLeaveRequest, ReviewOutcome, Role,
    DEFAULT_TOTAL_LEAVES, DEFAULT_TOTAL_PERMISSIONS,
};
use crate::memory::MemoryStore;
use crate::ports::{MailService, OutgoingMail, PortError, PortResult, RecordStore};

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

pub fn employee(code: &str, name: &str) -> Employee {
    Employee {
        id: Uuid::new_v4(),
        external_auth_id: format!("auth-{}", code),
        employee_code: code.to_string(),
        full_name: name.to_string(),
        email: None,
        phone_number: None,
        role: Role::Employee,
        created_at: at(2024, 1, 1, 0, 0),
        total_leaves: DEFAULT_TOTAL_LEAVES,
        used_leaves: Decimal::ZERO,
        total_permissions: DEFAULT_TOTAL_PERMISSIONS,
        used_permissions: Decimal::ZERO,
    }
}

pub fn admin(code: &str, name: &str) -> Employee {
    Employee {
        role: Role::Superadmin,
        ..employee(code, name)
    }
}

/// Captures every mail instead of sending it. Can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailService for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> PortResult<()> {
        if self.fail {
            return Err(PortError::Unavailable("relay refused connection".to_string()));
        }
        self.sent.lock().unwrap().push(mail);
        Ok(())
    }
}

/// A `MemoryStore` that yields to the scheduler before every call, so futures
/// joined on one task interleave between their reads and their writes.
pub struct YieldingStore {
    pub inner: Arc<MemoryStore>,
    conditional_writes: AtomicUsize,
}

impl YieldingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            conditional_writes: AtomicUsize::new(0),
        }
    }

    /// How many check-in, check-out and balance writes were attempted.
    pub fn conditional_writes(&self) -> usize {
        self.conditional_writes.load(Ordering::SeqCst)
    }

    async fn conditional_write(&self) {
        self.conditional_writes.fetch_add(1, Ordering::SeqCst);
        yield_now().await;
    }
}

#[async_trait]
impl RecordStore for YieldingStore {
    async fn insert_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        yield_now().await;
        self.inner.insert_employee(employee).await
    }

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>> {
        yield_now().await;
        self.inner.get_employee(employee_id).await
    }

    async fn find_employee_by_code(&self, employee_code: &str) -> PortResult<Option<Employee>> {
        yield_now().await;
        self.inner.find_employee_by_code(employee_code).await
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        yield_now().await;
        self.inner.list_employees().await
    }

    async fn find_attendance(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<AttendanceRecord>> {
        yield_now().await;
        self.inner.find_attendance(employee_id, date).await
    }

    async fn recent_attendance(
        &self,
        employee_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AttendanceRecord>> {
        yield_now().await;
        self.inner.recent_attendance(employee_id, limit).await
    }

    async fn attendance_on(&self, date: NaiveDate) -> PortResult<Vec<AttendanceRecord>> {
        yield_now().await;
        self.inner.attendance_on(date).await
    }

    async fn attendance_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<AttendanceRecord>> {
        yield_now().await;
        self.inner.attendance_between(employee_id, from, to).await
    }

    async fn insert_check_in(&self, check_in: NewCheckIn) -> PortResult<AttendanceRecord> {
        self.conditional_write().await;
        self.inner.insert_check_in(check_in).await
    }

    async fn record_check_out(&self, check_out: CheckOut) -> PortResult<Option<AttendanceRecord>> {
        self.conditional_write().await;
        self.inner.record_check_out(check_out).await
    }

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> PortResult<LeaveRequest> {
        yield_now().await;
        self.inner.insert_leave_request(request).await
    }

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<Option<LeaveRequest>> {
        yield_now().await;
        self.inner.get_leave_request(request_id).await
    }

    async fn leave_requests_for(&self, employee_id: Uuid) -> PortResult<Vec<LeaveRequest>> {
        yield_now().await;
        self.inner.leave_requests_for(employee_id).await
    }

    async fn pending_leave_requests(&self) -> PortResult<Vec<LeaveRequest>> {
        yield_now().await;
        self.inner.pending_leave_requests().await
    }

    async fn complete_review(&self, outcome: ReviewOutcome) -> PortResult<Option<LeaveRequest>> {
        yield_now().await;
        self.inner.complete_review(outcome).await
    }

    async fn apply_leave_balance(&self, request_id: Uuid) -> PortResult<BalanceCharge> {
        self.conditional_write().await;
        self.inner.apply_leave_balance(request_id).await
    }

    async fn unapplied_approvals(&self) -> PortResult<Vec<LeaveRequest>> {
        yield_now().await;
        self.inner.unapplied_approvals().await
    }

    async fn insert_chat_message(&self, message: NewChatMessage) -> PortResult<ChatMessage> {
        yield_now().await;
        self.inner.insert_chat_message(message).await
    }

    async fn conversation(&self, employee_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        yield_now().await;
        self.inner.conversation(employee_id).await
    }

    async fn mark_read(&self, receiver: ChatParty, sender: ChatParty) -> PortResult<u64> {
        yield_now().await;
        self.inner.mark_read(receiver, sender).await
    }
}
