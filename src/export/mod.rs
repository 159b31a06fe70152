//! Session export
//!
//! Turns a session's ledger and stored audio segments into a
//! self-contained archive directory.

pub mod pipeline;

pub use pipeline::{ExportPipeline, ExportSummary};
