//! crates/attendance_core/src/memory.rs
//!
//! An in-process implementation of the `RecordStore` port.
//!
//! It keeps every collection behind one mutex, so each call is atomic in the same
//! way a single-document write is atomic in the real store, and it enforces the
//! same uniqueness rules as the database schema. Used by tests and by the
//! service when no database is configured.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, AttendanceStatus, BalanceCharge, ChatMessage, ChatParty, CheckOut, Employee,
    LeaveRequest, LeaveType, NewChatMessage, NewCheckIn, NewEmployee, NewLeaveRequest,
    RequestStatus, ReviewOutcome,
};
use crate::ports::{PortError, PortResult, RecordStore};

#[derive(Default)]
struct Tables {
    employees: HashMap<Uuid, Employee>,
    attendance: Vec<AttendanceRecord>,
    leave_requests: Vec<LeaveRequest>,
    chat_messages: Vec<ChatMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }

    /// Seeds an employee with a fixed role and balance, bypassing onboarding.
    pub fn put_employee(&self, employee: Employee) -> PortResult<()> {
        self.lock()?.employees.insert(employee.id, employee);
        Ok(())
    }

    /// Writes an attendance record as-is. Intended for building report fixtures.
    pub fn put_attendance(&self, record: AttendanceRecord) -> PortResult<()> {
        let mut tables = self.lock()?;
        if tables
            .attendance
            .iter()
            .any(|r| r.employee_id == record.employee_id && r.date == record.date)
        {
            return Err(PortError::Conflict(format!(
                "attendance for {} on {} already exists",
                record.employee_id, record.date
            )));
        }
        tables.attendance.push(record);
        Ok(())
    }
}

fn in_conversation(message: &ChatMessage, employee: ChatParty) -> bool {
    (message.sender == employee && message.receiver == ChatParty::AdminDesk)
        || (message.sender == ChatParty::AdminDesk && message.receiver == employee)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_employee(&self, employee: NewEmployee) -> PortResult<Employee> {
        let mut tables = self.lock()?;
        if tables.employees.values().any(|e| {
            e.employee_code == employee.employee_code
                || e.external_auth_id == employee.external_auth_id
        }) {
            return Err(PortError::Conflict(format!(
                "employee code {} or auth id already registered",
                employee.employee_code
            )));
        }
        let created = Employee {
            id: Uuid::new_v4(),
            external_auth_id: employee.external_auth_id,
            employee_code: employee.employee_code,
            full_name: employee.full_name,
            email: employee.email,
            phone_number: employee.phone_number,
            role: employee.role,
            created_at: employee.created_at,
            total_leaves: employee.total_leaves,
            used_leaves: Decimal::ZERO,
            total_permissions: employee.total_permissions,
            used_permissions: Decimal::ZERO,
        };
        tables.employees.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_employee(&self, employee_id: Uuid) -> PortResult<Option<Employee>> {
        Ok(self.lock()?.employees.get(&employee_id).cloned())
    }

    async fn find_employee_by_code(&self, employee_code: &str) -> PortResult<Option<Employee>> {
        Ok(self
            .lock()?
            .employees
            .values()
            .find(|e| e.employee_code == employee_code)
            .cloned())
    }

    async fn list_employees(&self) -> PortResult<Vec<Employee>> {
        let mut employees: Vec<Employee> = self.lock()?.employees.values().cloned().collect();
        employees.sort_by(|a, b| a.employee_code.cmp(&b.employee_code));
        Ok(employees)
    }

    async fn find_attendance(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<AttendanceRecord>> {
        Ok(self
            .lock()?
            .attendance
            .iter()
            .find(|r| r.employee_id == employee_id && r.date == date)
            .cloned())
    }

    async fn recent_attendance(
        &self,
        employee_id: Uuid,
        limit: usize,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .lock()?
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    async fn attendance_on(&self, date: NaiveDate) -> PortResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .lock()?
            .attendance
            .iter()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.check_in.cmp(&b.check_in));
        Ok(records)
    }

    async fn attendance_between(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .lock()?
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && from <= r.date && r.date <= to)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(records)
    }

    async fn insert_check_in(&self, check_in: NewCheckIn) -> PortResult<AttendanceRecord> {
        let mut tables = self.lock()?;
        if tables
            .attendance
            .iter()
            .any(|r| r.employee_id == check_in.employee_id && r.date == check_in.date)
        {
            return Err(PortError::Conflict(format!(
                "attendance for {} on {} already exists",
                check_in.employee_id, check_in.date
            )));
        }
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: check_in.employee_id,
            employee_name: check_in.employee_name,
            date: check_in.date,
            check_in: Some(check_in.at),
            check_out: None,
            check_in_photo_url: Some(check_in.photo_url),
            check_out_photo_url: None,
            check_in_key: check_in.request_key,
            check_out_key: None,
            status: AttendanceStatus::CheckedIn,
            created_at: check_in.at,
        };
        tables.attendance.push(record.clone());
        Ok(record)
    }

    async fn record_check_out(&self, check_out: CheckOut) -> PortResult<Option<AttendanceRecord>> {
        let mut tables = self.lock()?;
        let Some(record) = tables
            .attendance
            .iter_mut()
            .find(|r| r.id == check_out.record_id && r.status == AttendanceStatus::CheckedIn)
        else {
            return Ok(None);
        };
        record.status = AttendanceStatus::CheckedOut;
        record.check_out = Some(check_out.at);
        record.check_out_photo_url = Some(check_out.photo_url);
        record.check_out_key = check_out.request_key;
        Ok(Some(record.clone()))
    }

    async fn insert_leave_request(&self, request: NewLeaveRequest) -> PortResult<LeaveRequest> {
        let created = LeaveRequest {
            id: Uuid::new_v4(),
            employee_id: request.employee_id,
            employee_name: request.employee_name,
            kind: request.kind,
            start_date: request.start_date,
            end_date: request.end_date,
            duration: request.duration,
            reason: request.reason,
            status: RequestStatus::Pending,
            submitted_at: request.submitted_at,
            reviewed_at: None,
            reviewed_by: None,
            balance_applied: false,
        };
        self.lock()?.leave_requests.push(created.clone());
        Ok(created)
    }

    async fn get_leave_request(&self, request_id: Uuid) -> PortResult<Option<LeaveRequest>> {
        Ok(self
            .lock()?
            .leave_requests
            .iter()
            .find(|r| r.id == request_id)
            .cloned())
    }

    async fn leave_requests_for(&self, employee_id: Uuid) -> PortResult<Vec<LeaveRequest>> {
        let mut requests: Vec<LeaveRequest> = self
            .lock()?
            .leave_requests
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(requests)
    }

    async fn pending_leave_requests(&self) -> PortResult<Vec<LeaveRequest>> {
        Ok(self
            .lock()?
            .leave_requests
            .iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn complete_review(&self, outcome: ReviewOutcome) -> PortResult<Option<LeaveRequest>> {
        let mut tables = self.lock()?;
        let Some(request) = tables
            .leave_requests
            .iter_mut()
            .find(|r| r.id == outcome.request_id && r.status == RequestStatus::Pending)
        else {
            return Ok(None);
        };
        request.status = outcome.status;
        request.reviewed_at = Some(outcome.reviewed_at);
        request.reviewed_by = Some(outcome.reviewed_by);
        request.balance_applied = outcome.status != RequestStatus::Approved;
        Ok(Some(request.clone()))
    }

    async fn apply_leave_balance(&self, request_id: Uuid) -> PortResult<BalanceCharge> {
        let mut tables = self.lock()?;
        let Tables {
            employees,
            leave_requests,
            ..
        } = &mut *tables;
        let Some(request) = leave_requests.iter_mut().find(|r| {
            r.id == request_id && r.status == RequestStatus::Approved && !r.balance_applied
        }) else {
            return Ok(BalanceCharge::Skipped);
        };
        let employee = employees.get_mut(&request.employee_id).ok_or_else(|| {
            PortError::NotFound(format!("Employee {} not found", request.employee_id))
        })?;
        let (used, total) = match request.kind {
            LeaveType::Leave => (&mut employee.used_leaves, employee.total_leaves),
            LeaveType::Permission => (&mut employee.used_permissions, employee.total_permissions),
        };
        if *used + request.duration > total {
            request.status = RequestStatus::Pending;
            request.reviewed_at = None;
            request.reviewed_by = None;
            return Ok(BalanceCharge::Refused {
                remaining: total - *used,
            });
        }
        *used += request.duration;
        request.balance_applied = true;
        Ok(BalanceCharge::Applied)
    }

    async fn unapplied_approvals(&self) -> PortResult<Vec<LeaveRequest>> {
        Ok(self
            .lock()?
            .leave_requests
            .iter()
            .filter(|r| r.status == RequestStatus::Approved && !r.balance_applied)
            .cloned()
            .collect())
    }

    async fn insert_chat_message(&self, message: NewChatMessage) -> PortResult<ChatMessage> {
        let created = ChatMessage {
            id: Uuid::new_v4(),
            sender: message.sender,
            sender_name: message.sender_name,
            sender_role: message.sender_role,
            receiver: message.receiver,
            text: message.text,
            sent_at: message.sent_at,
            read: false,
        };
        self.lock()?.chat_messages.push(created.clone());
        Ok(created)
    }

    async fn conversation(&self, employee_id: Uuid) -> PortResult<Vec<ChatMessage>> {
        let party = ChatParty::Employee(employee_id);
        let mut messages: Vec<ChatMessage> = self
            .lock()?
            .chat_messages
            .iter()
            .filter(|m| in_conversation(m, party))
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at));
        Ok(messages)
    }

    async fn mark_read(&self, receiver: ChatParty, sender: ChatParty) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let mut count = 0;
        for message in tables
            .chat_messages
            .iter_mut()
            .filter(|m| m.receiver == receiver && m.sender == sender && !m.read)
        {
            message.read = true;
            count += 1;
        }
        Ok(count)
    }
}
