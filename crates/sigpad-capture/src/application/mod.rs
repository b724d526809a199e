//! Application layer for the capture binary.
//!
//! Use cases depend only on the bridge/render trait seams and the
//! `sigpad-core` domain; all infrastructure implementations are injected at
//! construction time, keeping both use cases fully unit-testable.

pub mod capture_controller;
pub mod session_manager;

pub use capture_controller::{CaptureController, CaptureError};
pub use session_manager::{ConnectionState, RetryPolicy, Session, SessionError, SessionManager};
