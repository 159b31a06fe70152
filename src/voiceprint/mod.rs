//! Voiceprint enrollment and speaker identification
//!
//! This module provides:
//! - The `VoiceprintProvider` capability implemented by concrete VPR vendors
//! - The `VoiceprintRegistry` that owns rollback-safe enrollment and
//!   threshold-filtered identification

pub mod provider;
pub mod registry;

pub use provider::{SpeakerMatch, VoiceprintProvider};
pub use registry::{Enrollment, VoiceprintRegistry};
