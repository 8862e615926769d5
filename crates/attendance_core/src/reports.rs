//! crates/attendance_core/src/reports.rs
//!
//! Read-aggregate-notify pipelines behind the daily and monthly report jobs.
//! They only read from the store; nothing here feeds back into attendance or
//! the leave ledger.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::calendar::{BusinessCalendar, MonthPeriod};
use crate::domain::{AttendanceRecord, AttendanceStatus, Employee};
use crate::error::{CoreError, CoreResult};
use crate::ports::{MailAttachment, MailService, OutgoingMail, PortError, RecordStore};

/// How many employees' attendance is fetched at once for the monthly report.
const REPORT_CONCURRENCY: usize = 4;

const MONTHLY_HEADERS: [&str; 7] = [
    "Employee Name",
    "Employee ID",
    "Working Days",
    "Leaves Taken",
    "Permissions Used",
    "Total Leaves",
    "Total Permissions",
];

//=========================================================================================
// Daily summary
//=========================================================================================

#[derive(Debug, Clone)]
pub struct DailyRow {
    pub employee_name: String,
    /// Empty when the employee has since left the directory.
    pub employee_code: String,
    pub check_in: Option<DateTime<FixedOffset>>,
    pub check_out: Option<DateTime<FixedOffset>>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub rows: Vec<DailyRow>,
}

impl DailySummary {
    pub fn subject(&self) -> String {
        format!("Daily Attendance Report - {}", self.date.format("%b %-d, %Y"))
    }

    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<h2>Daily Attendance Summary - {}</h2>\n\
             <table border=\"1\" cellpadding=\"8\" cellspacing=\"0\" style=\"border-collapse: collapse;\">\n\
             <thead><tr style=\"background-color: #B39DDB; color: white;\">\
             <th>Employee Name</th><th>Employee ID</th><th>Check-in</th><th>Check-out</th><th>Status</th>\
             </tr></thead>\n<tbody>\n",
            self.date.format("%B %-d, %Y")
        );
        for row in &self.rows {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&row.employee_name),
                escape_html(&row.employee_code),
                clock(row.check_in),
                clock(row.check_out),
                row.status,
            ));
        }
        html.push_str(&format!(
            "</tbody>\n</table>\n<p style=\"margin-top: 20px;\">Total Present: {}</p>\n",
            self.rows.len()
        ));
        html
    }
}

fn clock(time: Option<DateTime<FixedOffset>>) -> String {
    time.map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

//=========================================================================================
// Monthly report
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRow {
    pub employee_name: String,
    pub employee_code: String,
    pub working_days: usize,
    pub leaves_taken: Decimal,
    pub permissions_used: Decimal,
    pub total_leaves: Decimal,
    pub total_permissions: Decimal,
}

impl MonthlyRow {
    fn new(employee: &Employee, records: &[AttendanceRecord]) -> Self {
        Self {
            employee_name: employee.full_name.clone(),
            employee_code: employee.employee_code.clone(),
            working_days: working_days(records),
            leaves_taken: employee.used_leaves,
            permissions_used: employee.used_permissions,
            total_leaves: employee.total_leaves,
            total_permissions: employee.total_permissions,
        }
    }
}

/// A day counts as worked only once it has been checked out.
pub fn working_days(records: &[AttendanceRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.status == AttendanceStatus::CheckedOut)
        .count()
}

#[derive(Debug, Clone)]
pub struct MonthlyReport {
    pub period: MonthPeriod,
    pub rows: Vec<MonthlyRow>,
}

impl MonthlyReport {
    pub fn subject(&self) -> String {
        format!("Monthly Attendance Report - {}", self.period.label())
    }

    pub fn attachment_name(&self) -> String {
        format!("Monthly_Report_{}.csv", self.period.key())
    }

    pub fn to_html(&self) -> String {
        format!(
            "<h2>Monthly Attendance Report</h2>\n\
             <p>Please find attached the monthly attendance report for {}.</p>\n\
             <p>Summary:</p>\n<ul>\n<li>Total Employees: {}</li>\n<li>Report Period: {} - {}</li>\n</ul>\n",
            self.period.label(),
            self.rows.len(),
            self.period.first_day.format("%b %-d"),
            self.period.last_day.format("%b %-d, %Y"),
        )
    }

    /// One header row, then one row per employee.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(MONTHLY_HEADERS)?;
        for row in &self.rows {
            writer.write_record([
                row.employee_name.clone(),
                row.employee_code.clone(),
                row.working_days.to_string(),
                row.leaves_taken.normalize().to_string(),
                row.permissions_used.normalize().to_string(),
                row.total_leaves.normalize().to_string(),
                row.total_permissions.normalize().to_string(),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

//=========================================================================================
// Reporter
//=========================================================================================

#[derive(Clone)]
pub struct Reporter {
    store: Arc<dyn RecordStore>,
    mailer: Arc<dyn MailService>,
    calendar: BusinessCalendar,
    recipient: String,
}

impl Reporter {
    pub fn new(
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn MailService>,
        calendar: BusinessCalendar,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            calendar,
            recipient: recipient.into(),
        }
    }

    /// Attendance for the business day containing `now`, in check-in order.
    pub async fn daily_summary(&self, now: DateTime<Utc>) -> CoreResult<DailySummary> {
        let date = self.calendar.today(now);
        let records = self.store.attendance_on(date).await?;
        let codes: HashMap<Uuid, String> = self
            .store
            .list_employees()
            .await?
            .into_iter()
            .map(|e| (e.id, e.employee_code))
            .collect();

        let rows = records
            .into_iter()
            .map(|r| DailyRow {
                employee_code: codes.get(&r.employee_id).cloned().unwrap_or_default(),
                employee_name: r.employee_name,
                check_in: r.check_in.map(|t| self.calendar.local(t)),
                check_out: r.check_out.map(|t| self.calendar.local(t)),
                status: r.status,
            })
            .collect();
        Ok(DailySummary { date, rows })
    }

    /// Per-employee totals for the calendar month before the one containing `now`.
    pub async fn monthly_report(&self, now: DateTime<Utc>) -> CoreResult<MonthlyReport> {
        let period = MonthPeriod::previous(self.calendar.today(now));
        let employees = self.store.list_employees().await?;
        let store = &self.store;

        let rows = stream::iter(employees)
            .map(|employee| async move {
                let records = store
                    .attendance_between(employee.id, period.first_day, period.last_day)
                    .await?;
                Ok::<_, PortError>(MonthlyRow::new(&employee, &records))
            })
            .buffered(REPORT_CONCURRENCY)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(MonthlyReport { period, rows })
    }

    pub async fn send_daily(&self, now: DateTime<Utc>) -> CoreResult<DailySummary> {
        let summary = self.daily_summary(now).await?;
        self.mailer
            .send(OutgoingMail {
                to: self.recipient.clone(),
                subject: summary.subject(),
                html_body: summary.to_html(),
                attachment: None,
            })
            .await
            .map_err(CoreError::Mail)?;
        info!(date = %summary.date, present = summary.rows.len(), "Daily attendance report sent");
        Ok(summary)
    }

    pub async fn send_monthly(&self, now: DateTime<Utc>) -> CoreResult<MonthlyReport> {
        let report = self.monthly_report(now).await?;
        let attachment = MailAttachment {
            filename: report.attachment_name(),
            content_type: "text/csv".to_string(),
            content: report.to_csv()?,
        };
        self.mailer
            .send(OutgoingMail {
                to: self.recipient.clone(),
                subject: report.subject(),
                html_body: report.to_html(),
                attachment: Some(attachment),
            })
            .await
            .map_err(CoreError::Mail)?;
        info!(
            period = %report.period.key(),
            employees = report.rows.len(),
            "Monthly attendance report sent"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::{at, employee, RecordingMailer};
    use rust_decimal_macros::dec;

    fn record(e: &Employee, date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        let check_in = date.and_hms_opt(9, 0, 0).unwrap().and_utc();
        let check_out = date.and_hms_opt(17, 30, 0).unwrap().and_utc();
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: e.id,
            employee_name: e.full_name.clone(),
            date,
            check_in: Some(check_in),
            check_out: (status == AttendanceStatus::CheckedOut).then_some(check_out),
            check_in_photo_url: Some("in.jpg".to_string()),
            check_out_photo_url: None,
            check_in_key: None,
            check_out_key: None,
            status,
            created_at: check_in,
        }
    }

    fn june(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn monthly_report_counts_only_checked_out_days_of_the_previous_month() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let mut e1 = employee("EMP001", "Asha Raman");
        e1.used_leaves = dec!(3);
        e1.used_permissions = dec!(1.5);
        let e2 = employee("EMP002", "Ravi Kumar");
        store.put_employee(e1.clone()).unwrap();
        store.put_employee(e2.clone()).unwrap();

        for d in 1..=20 {
            store.put_attendance(record(&e1, june(d), AttendanceStatus::CheckedOut)).unwrap();
        }
        for d in 21..=23 {
            store.put_attendance(record(&e1, june(d), AttendanceStatus::CheckedIn)).unwrap();
        }
        // Outside the reported month.
        store
            .put_attendance(record(&e1, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), AttendanceStatus::CheckedOut))
            .unwrap();

        let reporter = Reporter::new(store, mailer.clone(), BusinessCalendar::utc(), "admin@example.com");
        let report = reporter.send_monthly(at(2024, 7, 1, 9, 0)).await.unwrap();

        assert_eq!(report.period.first_day, june(1));
        assert_eq!(report.period.last_day, june(30));
        let row = report
            .rows
            .iter()
            .find(|r| r.employee_code == "EMP001")
            .unwrap();
        assert_eq!(row.working_days, 20);
        assert_eq!(row.leaves_taken, dec!(3));
        assert_eq!(row.total_permissions, dec!(12));
        let idle = report.rows.iter().find(|r| r.employee_code == "EMP002").unwrap();
        assert_eq!(idle.working_days, 0);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@example.com");
        assert_eq!(sent[0].subject, "Monthly Attendance Report - June 2024");
        assert!(sent[0].html_body.contains("Total Employees: 2"));
        assert!(sent[0].html_body.contains("Jun 1 - Jun 30, 2024"));

        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "Monthly_Report_2024-06.csv");
        let csv = String::from_utf8(attachment.content.clone()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Employee Name,Employee ID,Working Days,Leaves Taken,Permissions Used,Total Leaves,Total Permissions")
        );
        assert!(csv.contains("Asha Raman,EMP001,20,3,1.5,20,12"));
    }

    #[tokio::test]
    async fn daily_summary_lists_todays_records_in_the_business_offset() {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let e1 = employee("EMP001", "Asha <Ops> Raman");
        let e2 = employee("EMP002", "Ravi Kumar");
        store.put_employee(e1.clone()).unwrap();
        store.put_employee(e2.clone()).unwrap();
        store.put_attendance(record(&e1, june(3), AttendanceStatus::CheckedOut)).unwrap();
        store.put_attendance(record(&e2, june(3), AttendanceStatus::CheckedIn)).unwrap();
        store.put_attendance(record(&e2, june(2), AttendanceStatus::CheckedOut)).unwrap();

        let calendar = BusinessCalendar::from_offset_minutes(330).unwrap();
        let reporter = Reporter::new(store, mailer.clone(), calendar, "admin@example.com");
        let summary = reporter.send_daily(at(2024, 6, 3, 12, 30)).await.unwrap();

        assert_eq!(summary.date, june(3));
        assert_eq!(summary.rows.len(), 2);

        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Daily Attendance Report - Jun 3, 2024");
        let html = &sent[0].html_body;
        assert!(html.contains("Asha &lt;Ops&gt; Raman"));
        assert!(html.contains("EMP002"));
        // 09:00 UTC is 2:30 PM at +05:30.
        assert!(html.contains("2:30 PM"));
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains("Total Present: 2"));
        assert!(sent[0].attachment.is_none());
    }

    #[tokio::test]
    async fn mail_failures_surface_as_mail_errors() {
        let store = Arc::new(MemoryStore::new());
        let reporter = Reporter::new(
            store,
            Arc::new(RecordingMailer::failing()),
            BusinessCalendar::utc(),
            "admin@example.com",
        );
        let result = reporter.send_daily(at(2024, 6, 3, 18, 0)).await;
        assert!(matches!(result, Err(CoreError::Mail(_))));
    }
}
