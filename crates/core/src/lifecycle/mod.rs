//! Case state machine.

pub mod guards;
mod service;

pub use guards::{cancellation_fee, ensure_upload_allowed, missing_required_files};
pub(crate) use service::{advance, status_event};
pub use service::{CaseLifecycle, TransitionOutcome, TransitionRequest, RELEASE_NOTE};
