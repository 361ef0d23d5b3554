//! Data layer module
//!
//! In-memory stores, constructed at startup and injected through
//! `AppState`. State is process-local and lost on restart.

mod users;

pub use users::{UserRecord, UserStore};
