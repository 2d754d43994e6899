//! The attendance core: day locking, checkpoint reconciliation rules, the
//! optimistic session, and the per-key write debouncer.

pub mod debounce;
pub mod error;
pub mod lock;
pub mod rules;
pub mod session;

pub use error::AttendanceError;
