use std::sync::Arc;

use tracing::info;

use super::entity::{Session, Utterance};
use crate::error::{Error, Result};
use crate::repos::{SessionRepository, UtteranceRepository};

/// Fields for creating a new session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub clinician_id: String,
    pub patient_name: Option<String>,
    pub clinic_number: Option<String>,
    pub medical_record_number: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

impl CreateSession {
    pub fn new(clinician_id: impl Into<String>) -> Self {
        Self {
            clinician_id: clinician_id.into(),
            patient_name: None,
            clinic_number: None,
            medical_record_number: None,
            diagnosis: None,
            notes: None,
        }
    }
}

/// Partial update of a session's clinical information. Only provided
/// fields change.
#[derive(Debug, Clone, Default)]
pub struct UpdateSessionInfo {
    pub patient_name: Option<String>,
    pub clinic_number: Option<String>,
    pub medical_record_number: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

/// Session lifecycle service.
///
/// All status changes go through the entity's transition methods and are
/// persisted as one atomic entity write; a failed write leaves the stored
/// session unchanged.
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    utterances: Arc<dyn UtteranceRepository>,
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        utterances: Arc<dyn UtteranceRepository>,
    ) -> Self {
        Self {
            sessions,
            utterances,
        }
    }

    /// Create a new session in DRAFT.
    pub async fn create(&self, request: CreateSession) -> Result<Session> {
        let mut session = Session::new(request.clinician_id);
        session.patient_name = request.patient_name;
        session.clinic_number = request.clinic_number;
        session.medical_record_number = request.medical_record_number;
        session.diagnosis = request.diagnosis;
        session.notes = request.notes;

        self.sessions.create(session.clone()).await?;

        info!(
            "Created session {} for clinician {}",
            session.id, session.clinician_id
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .read(session_id)
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))
    }

    /// Sessions owned by a clinician, most recent first.
    pub async fn list(&self, clinician_id: &str) -> Result<Vec<Session>> {
        self.sessions.list_by_clinician(clinician_id).await
    }

    /// DRAFT -> IN_PROGRESS. The only operation permitted to precede
    /// starting a recording controller for this session.
    pub async fn start(&self, session_id: &str) -> Result<Session> {
        let mut session = self.get(session_id).await?;
        session.start()?;
        self.sessions.update(session.clone()).await?;

        info!("Started session {}", session_id);
        Ok(session)
    }

    /// IN_PROGRESS -> COMPLETED.
    pub async fn complete(&self, session_id: &str) -> Result<Session> {
        let mut session = self.get(session_id).await?;
        session.complete()?;
        self.sessions.update(session.clone()).await?;

        info!("Completed session {}", session_id);
        Ok(session)
    }

    /// IN_PROGRESS -> CANCELLED.
    pub async fn cancel(&self, session_id: &str) -> Result<Session> {
        let mut session = self.get(session_id).await?;
        session.cancel()?;
        self.sessions.update(session.clone()).await?;

        info!("Cancelled session {}", session_id);
        Ok(session)
    }

    /// Update clinical information. Permitted in any non-terminal state.
    pub async fn update_info(&self, session_id: &str, info: UpdateSessionInfo) -> Result<Session> {
        let mut session = self.get(session_id).await?;

        if session.is_finished() {
            return Err(Error::invalid_state(format!(
                "cannot update info of session {} in status {:?}",
                session_id, session.status
            )));
        }

        if let Some(patient_name) = info.patient_name {
            session.patient_name = Some(patient_name);
        }
        if let Some(clinic_number) = info.clinic_number {
            session.clinic_number = Some(clinic_number);
        }
        if let Some(medical_record_number) = info.medical_record_number {
            session.medical_record_number = Some(medical_record_number);
        }
        if let Some(diagnosis) = info.diagnosis {
            session.diagnosis = Some(diagnosis);
        }
        if let Some(notes) = info.notes {
            session.notes = Some(notes);
        }

        session.touch();
        self.sessions.update(session.clone()).await?;

        info!("Updated info for session {}", session_id);
        Ok(session)
    }

    /// Utterances of a session, ordered by sequence.
    pub async fn utterances(&self, session_id: &str) -> Result<Vec<Utterance>> {
        self.utterances.list(session_id).await
    }
}
