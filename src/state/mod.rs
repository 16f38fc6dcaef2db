mod app_state;
mod session;

pub use app_state::{AppState, StartupError};
pub use session::{Session, SessionStore};
