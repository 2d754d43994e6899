//! Attendance service for a children's summer camp.
//!
//! The core is a small state machine: a day-lock rule, per-checkpoint
//! reconciliation rules (daily status, KC before/after-care, a dependent
//! early-pickup toggle), an optimistic session with per-key debounced
//! writes, and the record store they persist through. The HTTP layer in
//! [`api`] exposes the same operations to the attendance views.

pub mod api;
pub mod attendance;
pub mod config;
pub mod db;
pub mod docs;
pub mod model;
pub mod routes;
pub mod schedule;
pub mod store;
pub mod utils;
