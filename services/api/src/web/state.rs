//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request session context.

use crate::config::Config;
use attendance_core::{
    AttendanceEngine, ChatDesk, Employee, EmployeeDirectory, LeaveLedger, MailService,
    RecordStore, Reporter,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<Config>,
    pub directory: EmployeeDirectory,
    pub attendance: AttendanceEngine,
    pub ledger: LeaveLedger,
    pub chat: ChatDesk,
    pub reporter: Reporter,
}

impl AppState {
    /// Wires every core service to the same store and mailer.
    pub fn new(
        store: Arc<dyn RecordStore>,
        mailer: Arc<dyn MailService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            directory: EmployeeDirectory::new(store.clone()),
            attendance: AttendanceEngine::new(store.clone(), config.calendar),
            ledger: LeaveLedger::new(store.clone()),
            chat: ChatDesk::new(store.clone()),
            reporter: Reporter::new(
                store.clone(),
                mailer,
                config.calendar,
                config.admin_email.clone(),
            ),
            store,
            config,
        }
    }
}

//=========================================================================================
// SessionContext (Specific to One Request)
//=========================================================================================

/// The caller of a protected route, resolved by the auth middleware and
/// handed to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub employee: Employee,
}
