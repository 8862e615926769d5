pub mod admin;
pub mod attendance;
pub mod chat;
pub mod employees;
pub mod leaves;
pub mod middleware;
pub mod rest;
pub mod routes;
pub mod state;

// Re-export the router builder to make it easily accessible
// to the binary and the integration tests.
pub use routes::app;
pub use state::{AppState, SessionContext};
