use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle status of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Attributed speaker of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Clinician,
    Patient,
}

/// One clinician-patient conversation session.
///
/// Status is only mutated through the transition methods below; every
/// transition validates the current state and refreshes `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Owning clinician identity
    pub clinician_id: String,
    pub patient_name: Option<String>,
    pub clinic_number: Option<String>,
    pub medical_record_number: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once, on the transition into IN_PROGRESS
    pub started_at: Option<DateTime<Utc>>,
    /// Set once, on the transition into a terminal state
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(clinician_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            clinician_id: clinician_id.into(),
            patient_name: None,
            clinic_number: None,
            medical_record_number: None,
            diagnosis: None,
            notes: None,
            status: SessionStatus::Draft,
            created_at: now,
            updated_at: now,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// DRAFT -> IN_PROGRESS. Sets `started_at`.
    pub fn start(&mut self) -> Result<()> {
        if self.status != SessionStatus::Draft {
            return Err(Error::invalid_state(format!(
                "cannot start session {} in status {:?}",
                self.id, self.status
            )));
        }
        self.status = SessionStatus::InProgress;
        self.started_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    /// IN_PROGRESS -> COMPLETED. Sets `ended_at`.
    pub fn complete(&mut self) -> Result<()> {
        self.finish(SessionStatus::Completed)
    }

    /// IN_PROGRESS -> CANCELLED. Sets `ended_at`.
    pub fn cancel(&mut self) -> Result<()> {
        self.finish(SessionStatus::Cancelled)
    }

    fn finish(&mut self, terminal: SessionStatus) -> Result<()> {
        if self.status != SessionStatus::InProgress {
            return Err(Error::invalid_state(format!(
                "cannot move session {} from {:?} to {:?}",
                self.id, self.status, terminal
            )));
        }
        self.status = terminal;
        self.ended_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One attributed, timed speech segment within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub session_id: String,
    /// 1-based, gap-free within the session
    pub sequence: u64,
    pub speaker: Speaker,
    pub text: String,
    /// Transcription confidence in [0, 1], when the provider reports one
    pub confidence: Option<f32>,
    /// Offsets in milliseconds relative to session start
    pub start_ms: u64,
    pub end_ms: u64,
    /// When the utterance was captured
    pub timestamp: DateTime<Utc>,
    /// Blob reference of the utterance's audio segment, when captured
    pub audio_ref: Option<String>,
}

impl Utterance {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// A finalized utterance awaiting its sequence number.
#[derive(Debug, Clone)]
pub struct DraftUtterance {
    pub speaker: Speaker,
    pub text: String,
    pub confidence: Option<f32>,
    pub start_ms: u64,
    pub end_ms: u64,
    pub audio_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_draft_without_timestamps() {
        let session = Session::new("clinician-1");
        assert_eq!(session.status, SessionStatus::Draft);
        assert!(session.started_at.is_none());
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_start_sets_started_at() {
        let mut session = Session::new("clinician-1");
        session.start().unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        assert!(session.started_at.is_some());
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut session = Session::new("clinician-1");
        session.start().unwrap();
        let err = session.start().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(session.status, SessionStatus::InProgress);
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut session = Session::new("clinician-1");
        let err = session.complete().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(session.status, SessionStatus::Draft);
        assert!(session.ended_at.is_none());
    }

    #[test]
    fn test_complete_twice_fails() {
        let mut session = Session::new("clinician-1");
        session.start().unwrap();
        session.complete().unwrap();
        let first_end = session.ended_at;

        let err = session.complete().unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert_eq!(session.ended_at, first_end);
    }

    #[test]
    fn test_cancel_from_in_progress() {
        let mut session = Session::new("clinician-1");
        session.start().unwrap();
        session.cancel().unwrap();
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_utterance_duration() {
        let utterance = Utterance {
            session_id: "session-x".to_string(),
            sequence: 1,
            speaker: Speaker::Clinician,
            text: "您好".to_string(),
            confidence: Some(0.95),
            start_ms: 0,
            end_ms: 2000,
            timestamp: Utc::now(),
            audio_ref: None,
        };
        assert_eq!(utterance.duration_ms(), 2000);
    }
}
