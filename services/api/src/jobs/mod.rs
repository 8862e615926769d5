pub mod schedule;
pub mod scheduler;

pub use scheduler::JobScheduler;
