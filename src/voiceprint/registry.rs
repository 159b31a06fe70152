use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::provider::{SpeakerMatch, VoiceprintProvider};
use crate::error::{Error, Result};
use crate::repos::EnrollmentRepository;
use crate::storage::BlobStore;

/// A speaker's registered voiceprint with a recognition provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub speaker_id: String,
    /// Provider-assigned voiceprint id
    pub voiceprint_id: String,
    pub group_id: String,
    pub provider: String,
    pub endpoint: String,
    /// Blob reference of the enrollment audio sample
    pub audio_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Registry of speaker voiceprint enrollments.
///
/// Registration order is upload, then remote enroll, then local persist.
/// A failed remote enroll removes the uploaded sample; a failed local
/// persist after a successful remote enroll is logged for reconciliation
/// since the remote side cannot be un-enrolled transactionally.
pub struct VoiceprintRegistry {
    enrollments: Arc<dyn EnrollmentRepository>,
    store: Arc<dyn BlobStore>,
    provider: Arc<dyn VoiceprintProvider>,
    /// Matches below this confidence are treated as no-match
    threshold: f32,
    registration_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl VoiceprintRegistry {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        store: Arc<dyn BlobStore>,
        provider: Arc<dyn VoiceprintProvider>,
        threshold: f32,
    ) -> Self {
        Self {
            enrollments,
            store,
            provider,
            threshold,
            registration_locks: Mutex::new(HashMap::new()),
        }
    }

    fn registration_lock(&self, speaker_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .registration_locks
            .lock()
            .expect("registration lock map poisoned");
        Arc::clone(locks.entry(speaker_id.to_string()).or_default())
    }

    /// Register a speaker's voiceprint. Serialized per speaker id.
    pub async fn register(
        &self,
        speaker_id: &str,
        audio: &[u8],
        sample_rate: u32,
        enrollment_text: &str,
        group_id: &str,
    ) -> Result<Enrollment> {
        let lock = self.registration_lock(speaker_id);
        let _guard = lock.lock().await;

        info!("Registering voiceprint for speaker {}", speaker_id);

        // Upload first: a storage failure aborts with nothing remote yet.
        let audio_ref = self.store.put(audio).await?;
        info!("Enrollment audio uploaded as {}", audio_ref);

        let voiceprint_id = match self
            .provider
            .enroll(audio, sample_rate, enrollment_text, group_id)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Compensate: remove the uploaded sample, best effort.
                if let Err(del) = self.store.delete(&audio_ref).await {
                    warn!(
                        "Failed to remove enrollment audio {} after provider failure: {}",
                        audio_ref, del
                    );
                }
                return Err(Error::enrollment(format!(
                    "provider enrollment failed for speaker {speaker_id}: {e}"
                )));
            }
        };

        let enrollment = Enrollment {
            speaker_id: speaker_id.to_string(),
            voiceprint_id: voiceprint_id.clone(),
            group_id: group_id.to_string(),
            provider: self.provider.name().to_string(),
            endpoint: self.provider.endpoint().to_string(),
            audio_ref,
            created_at: Utc::now(),
        };

        if let Err(e) = self.enrollments.upsert(enrollment.clone()).await {
            // The remote registration cannot be rolled back transactionally;
            // keep a reconciliation record and report failure.
            warn!(
                "Orphaned remote voiceprint {} for speaker {}: local persistence failed: {}",
                voiceprint_id, speaker_id, e
            );
            return Err(Error::enrollment(format!(
                "local persistence failed after remote enrollment of speaker {speaker_id}: {e}"
            )));
        }

        info!(
            "Voiceprint {} registered for speaker {}",
            voiceprint_id, speaker_id
        );
        Ok(enrollment)
    }

    pub async fn has_enrollment(&self, speaker_id: &str) -> Result<bool> {
        Ok(self
            .enrollments
            .read_by_speaker(speaker_id)
            .await?
            .is_some())
    }

    pub async fn get_enrollment(&self, speaker_id: &str) -> Result<Option<Enrollment>> {
        self.enrollments.read_by_speaker(speaker_id).await
    }

    /// Identify the best-matching enrolled speaker for an audio sample.
    ///
    /// Returns `None` when the provider reports no match or the match falls
    /// below the configured confidence threshold.
    pub async fn identify(
        &self,
        audio: &[u8],
        sample_rate: u32,
        group_id: &str,
    ) -> Result<Option<SpeakerMatch>> {
        let candidate = self.provider.identify(audio, sample_rate, group_id).await?;

        Ok(candidate.filter(|m| {
            if m.confidence < self.threshold {
                info!(
                    "Identification below threshold for speaker {}: {:.3} < {:.3}",
                    m.speaker_id, m.confidence, self.threshold
                );
                false
            } else {
                true
            }
        }))
    }
}
