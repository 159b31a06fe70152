use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use super::entity::{DraftUtterance, Utterance};
use crate::error::Result;
use crate::repos::UtteranceRepository;

/// Ordered, append-only record of a session's utterances.
///
/// Sequence assignment is serialized per session: the next number is read
/// and the utterance persisted under one per-session lock, so concurrent
/// appenders can never share a sequence. Counters are scoped to each
/// session, never process-wide.
pub struct UtteranceLedger {
    utterances: Arc<dyn UtteranceRepository>,
    append_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UtteranceLedger {
    pub fn new(utterances: Arc<dyn UtteranceRepository>) -> Self {
        Self {
            utterances,
            append_locks: Mutex::new(HashMap::new()),
        }
    }

    fn append_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.append_locks.lock().expect("append lock map poisoned");
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Append a finalized utterance, assigning the next sequence number.
    pub async fn append(&self, session_id: &str, draft: DraftUtterance) -> Result<Utterance> {
        // A reversed time range is a programming error upstream.
        assert!(
            draft.end_ms >= draft.start_ms,
            "utterance end offset {} precedes start offset {}",
            draft.end_ms,
            draft.start_ms
        );

        let lock = self.append_lock(session_id);
        let _guard = lock.lock().await;

        let sequence = self.utterances.last_sequence(session_id).await? + 1;

        let utterance = Utterance {
            session_id: session_id.to_string(),
            sequence,
            speaker: draft.speaker,
            text: draft.text,
            confidence: draft.confidence,
            start_ms: draft.start_ms,
            end_ms: draft.end_ms,
            timestamp: Utc::now(),
            audio_ref: draft.audio_ref,
        };

        self.utterances.create(utterance.clone()).await?;

        debug!(
            "Appended utterance {} (seq={}, speaker={:?})",
            session_id, sequence, utterance.speaker
        );
        Ok(utterance)
    }

    /// All utterances of a session, ordered by sequence.
    pub async fn list(&self, session_id: &str) -> Result<Vec<Utterance>> {
        self.utterances.list(session_id).await
    }
}
