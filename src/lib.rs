pub mod access;
mod app;
pub mod cache;
pub mod catalog;
pub mod checkout;
mod cli;
pub mod client;
pub mod endpoints;
mod formatters;
pub mod notifications;
mod redact;
pub mod settings;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use client::{ApiClient, ApiError, ApiRequest, HttpTransport, Transport};
pub use state::{AppState, Session, SessionStore};

pub fn run() -> std::process::ExitCode {
    app::run()
}
