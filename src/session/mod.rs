//! Session lifecycle and the utterance ledger
//!
//! This module provides:
//! - The `Session` entity and its DRAFT -> IN_PROGRESS -> COMPLETED /
//!   CANCELLED state machine
//! - The `SessionService` that persists lifecycle transitions
//! - The `UtteranceLedger`, the ordered append-only record of a session's
//!   speech segments

pub mod entity;
pub mod ledger;
pub mod service;

pub use entity::{DraftUtterance, Session, SessionStatus, Speaker, Utterance};
pub use ledger::UtteranceLedger;
pub use service::{CreateSession, SessionService, UpdateSessionInfo};
