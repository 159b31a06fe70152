//! Persistence repositories
//!
//! CRUD for Session, Utterance and Enrollment records behind trait
//! interfaces with atomic per-entity writes. The in-memory implementations
//! back tests and ephemeral deployments; a durable engine plugs in behind
//! the same traits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::session::{Session, Utterance};
use crate::voiceprint::Enrollment;

#[async_trait::async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: Session) -> Result<()>;

    async fn read(&self, session_id: &str) -> Result<Option<Session>>;

    /// Replace the stored session in one atomic write.
    async fn update(&self, session: Session) -> Result<()>;

    /// Sessions owned by a clinician, most recently created first.
    async fn list_by_clinician(&self, clinician_id: &str) -> Result<Vec<Session>>;
}

#[async_trait::async_trait]
pub trait UtteranceRepository: Send + Sync {
    /// Persist one utterance. Fails loudly on a duplicate sequence number;
    /// sequence assignment is the ledger's job.
    async fn create(&self, utterance: Utterance) -> Result<()>;

    /// Utterances of a session ordered by sequence.
    async fn list(&self, session_id: &str) -> Result<Vec<Utterance>>;

    /// Highest assigned sequence number for a session, 0 when none.
    async fn last_sequence(&self, session_id: &str) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert or replace the enrollment for (speaker, provider).
    async fn upsert(&self, enrollment: Enrollment) -> Result<()>;

    async fn read_by_speaker(&self, speaker_id: &str) -> Result<Option<Enrollment>>;
}

/// In-memory session repository.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(Error::persistence(format!(
                "session {} already exists",
                session.id
            )));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn read(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(Error::not_found("session", session.id));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn list_by_clinician(&self, clinician_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut owned: Vec<Session> = sessions
            .values()
            .filter(|s| s.clinician_id == clinician_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}

/// In-memory utterance repository, keyed by session.
#[derive(Default)]
pub struct InMemoryUtteranceRepository {
    utterances: Arc<RwLock<HashMap<String, Vec<Utterance>>>>,
}

impl InMemoryUtteranceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UtteranceRepository for InMemoryUtteranceRepository {
    async fn create(&self, utterance: Utterance) -> Result<()> {
        let mut utterances = self.utterances.write().await;
        let entries = utterances.entry(utterance.session_id.clone()).or_default();
        if entries.iter().any(|u| u.sequence == utterance.sequence) {
            return Err(Error::persistence(format!(
                "duplicate sequence {} for session {}",
                utterance.sequence, utterance.session_id
            )));
        }
        entries.push(utterance);
        Ok(())
    }

    async fn list(&self, session_id: &str) -> Result<Vec<Utterance>> {
        let utterances = self.utterances.read().await;
        let mut entries = utterances.get(session_id).cloned().unwrap_or_default();
        entries.sort_by_key(|u| u.sequence);
        Ok(entries)
    }

    async fn last_sequence(&self, session_id: &str) -> Result<u64> {
        let utterances = self.utterances.read().await;
        Ok(utterances
            .get(session_id)
            .map(|entries| entries.iter().map(|u| u.sequence).max().unwrap_or(0))
            .unwrap_or(0))
    }
}

/// In-memory enrollment repository.
#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    // keyed by (speaker_id, provider)
    enrollments: Arc<RwLock<HashMap<(String, String), Enrollment>>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn upsert(&self, enrollment: Enrollment) -> Result<()> {
        let key = (enrollment.speaker_id.clone(), enrollment.provider.clone());
        self.enrollments.write().await.insert(key, enrollment);
        Ok(())
    }

    async fn read_by_speaker(&self, speaker_id: &str) -> Result<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .find(|e| e.speaker_id == speaker_id)
            .cloned())
    }
}
