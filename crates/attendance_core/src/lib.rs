pub mod attendance;
pub mod calendar;
pub mod chat;
pub mod directory;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod ports;
pub mod reports;

#[cfg(test)]
mod testing;

pub use attendance::{AttendanceEngine, MarkAttendance};
pub use calendar::{BusinessCalendar, MonthPeriod};
pub use chat::ChatDesk;
pub use directory::{EmployeeDirectory, Onboarding};
pub use domain::{
    AttendanceRecord, AttendanceStatus, ChatMessage, ChatParty, Employee, LeaveRequest, LeaveType,
    MarkKind, RequestStatus, ReviewDecision, Role,
};
pub use error::{CoreError, CoreResult};
pub use ledger::{LeaveLedger, LeaveSubmission};
pub use memory::MemoryStore;
pub use ports::{MailAttachment, MailService, OutgoingMail, PortError, PortResult, RecordStore};
pub use reports::{DailySummary, MonthlyReport, Reporter};
