//! crates/attendance_core/src/attendance.rs
//!
//! The daily check-in/check-out state machine.
//!
//! Per employee and business day a record moves `none -> checked-in -> checked-out`
//! and never backwards. The guards live in the store's conditional writes, so two
//! racing calls cannot both create a record or both check out; this module
//! turns the store's refusals into the matching business errors.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::calendar::BusinessCalendar;
use crate::domain::{AttendanceRecord, AttendanceStatus, CheckOut, Employee, MarkKind, NewCheckIn};
use crate::error::{CoreError, CoreResult};
use crate::ports::{PortError, RecordStore};

/// Default page size for the recent-attendance view.
pub const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;

/// A check-in or check-out as requested by the client.
#[derive(Debug, Clone, Validate)]
pub struct MarkAttendance {
    pub kind: MarkKind,
    /// Reference returned by the object store for the verification photo.
    #[validate(length(min = 1, message = "A verification photo is required"))]
    pub photo_url: String,
    /// Optional client retry key. Repeating an event with the same key returns
    /// the stored record instead of a conflict.
    #[validate(length(min = 1, max = 128, message = "Request key must be 1-128 characters"))]
    pub request_key: Option<String>,
}

#[derive(Clone)]
pub struct AttendanceEngine {
    store: Arc<dyn RecordStore>,
    calendar: BusinessCalendar,
}

impl AttendanceEngine {
    pub fn new(store: Arc<dyn RecordStore>, calendar: BusinessCalendar) -> Self {
        Self { store, calendar }
    }

    /// The caller's record for the business day containing `now`, if any.
    pub async fn today(
        &self,
        employee_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<AttendanceRecord>> {
        let today = self.calendar.today(now);
        Ok(self.store.find_attendance(employee_id, today).await?)
    }

    /// Up to `limit` records for the employee, newest first.
    pub async fn recent(
        &self,
        employee_id: Uuid,
        limit: Option<usize>,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        Ok(self.store.recent_attendance(employee_id, limit).await?)
    }

    /// Every record for the business day containing `now`.
    pub async fn all_today(&self, now: DateTime<Utc>) -> CoreResult<Vec<AttendanceRecord>> {
        let today = self.calendar.today(now);
        Ok(self.store.attendance_on(today).await?)
    }

    /// Applies a check-in or check-out for the business day containing `now`.
    pub async fn mark(
        &self,
        employee_id: Uuid,
        request: MarkAttendance,
        now: DateTime<Utc>,
    ) -> CoreResult<AttendanceRecord> {
        request.validate()?;

        let employee = self
            .store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| CoreError::EmployeeNotFound(employee_id.to_string()))?;

        let record = match request.kind {
            MarkKind::CheckIn => self.check_in(&employee, request, now).await?,
            MarkKind::CheckOut => self.check_out(&employee, request, now).await?,
        };
        info!(
            employee_id = %employee.id,
            date = %record.date,
            status = %record.status,
            "Attendance marked"
        );
        Ok(record)
    }

    async fn check_in(
        &self,
        employee: &Employee,
        request: MarkAttendance,
        now: DateTime<Utc>,
    ) -> CoreResult<AttendanceRecord> {
        let today = self.calendar.today(now);
        if let Some(existing) = self.store.find_attendance(employee.id, today).await? {
            return replayed(&existing, MarkKind::CheckIn, request.request_key.as_deref())
                .ok_or(CoreError::AlreadyCheckedIn);
        }

        let key = request.request_key.clone();
        let insert = self
            .store
            .insert_check_in(NewCheckIn {
                employee_id: employee.id,
                employee_name: employee.full_name.clone(),
                date: today,
                at: now,
                photo_url: request.photo_url,
                request_key: request.request_key,
            })
            .await;

        match insert {
            Ok(record) => Ok(record),
            // Another call created the day's record between our read and write.
            Err(PortError::Conflict(_)) => {
                warn!(employee_id = %employee.id, date = %today, "Concurrent check-in refused");
                let winner = self.store.find_attendance(employee.id, today).await?;
                winner
                    .and_then(|r| replayed(&r, MarkKind::CheckIn, key.as_deref()))
                    .ok_or(CoreError::AlreadyCheckedIn)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check_out(
        &self,
        employee: &Employee,
        request: MarkAttendance,
        now: DateTime<Utc>,
    ) -> CoreResult<AttendanceRecord> {
        let today = self.calendar.today(now);
        let existing = self
            .store
            .find_attendance(employee.id, today)
            .await?
            .ok_or(CoreError::NoCheckInFound)?;

        if existing.status != AttendanceStatus::CheckedIn {
            return replayed(&existing, MarkKind::CheckOut, request.request_key.as_deref())
                .ok_or(CoreError::AlreadyCheckedOut);
        }

        let key = request.request_key.clone();
        let updated = self
            .store
            .record_check_out(CheckOut {
                record_id: existing.id,
                at: now,
                photo_url: request.photo_url,
                request_key: request.request_key,
            })
            .await?;

        match updated {
            Some(record) => Ok(record),
            None => {
                warn!(employee_id = %employee.id, date = %today, "Concurrent check-out refused");
                let winner = self.store.find_attendance(employee.id, today).await?;
                winner
                    .and_then(|r| replayed(&r, MarkKind::CheckOut, key.as_deref()))
                    .ok_or(CoreError::AlreadyCheckedOut)
            }
        }
    }
}

/// Returns the stored record when it already holds this exact event under the
/// same retry key.
fn replayed(record: &AttendanceRecord, kind: MarkKind, key: Option<&str>) -> Option<AttendanceRecord> {
    let stored = match kind {
        MarkKind::CheckIn => record.check_in_key.as_deref(),
        MarkKind::CheckOut => record.check_out_key.as_deref(),
    };
    match (stored, key) {
        (Some(stored), Some(key)) if stored == key => Some(record.clone()),
        _ => None,
    }
}
