use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::repos::SessionRepository;
use crate::session::{Session, SessionStatus, Speaker, Utterance, UtteranceLedger};
use crate::storage::BlobStore;

/// Statistics for a completed export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub session_id: String,
    pub export_path: PathBuf,
    pub utterance_count: usize,
    pub audio_count: usize,
}

/// The structured conversation record written as `conversation.json`.
#[derive(Debug, Serialize)]
struct ConversationRecord<'a> {
    session_id: &'a str,
    clinician_id: &'a str,
    patient_name: &'a Option<String>,
    clinic_number: &'a Option<String>,
    medical_record_number: &'a Option<String>,
    diagnosis: &'a Option<String>,
    notes: &'a Option<String>,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    utterances: Vec<UtteranceRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct UtteranceRecord<'a> {
    sequence: u64,
    speaker: Speaker,
    text: &'a str,
    confidence: Option<f32>,
    start_ms: u64,
    end_ms: u64,
    duration_ms: u64,
    timestamp: DateTime<Utc>,
}

/// Materializes a session's ledger and audio artifacts into a
/// self-contained archive directory.
///
/// Layout:
/// ```text
/// {destination_root}/{session_id}/
///     conversation.json
///     audio/
///         utterance-001.wav
///         utterance-002.wav
///         ...
/// ```
pub struct ExportPipeline {
    sessions: Arc<dyn SessionRepository>,
    ledger: Arc<UtteranceLedger>,
    store: Arc<dyn BlobStore>,
}

impl ExportPipeline {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        ledger: Arc<UtteranceLedger>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            sessions,
            ledger,
            store,
        }
    }

    /// Export a session under `destination_root`.
    ///
    /// Fails with `ExportConflict` if the session directory already exists.
    /// Any later failure removes the partially written directory, so a
    /// visible export directory is always complete.
    pub async fn export(
        &self,
        session_id: &str,
        destination_root: &Path,
        include_audio: bool,
    ) -> Result<ExportSummary> {
        info!(
            "Exporting session {} to {}",
            session_id,
            destination_root.display()
        );

        let session = self
            .sessions
            .read(session_id)
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))?;

        // Bounded single read; very large sessions are a known scaling
        // limit of this export path.
        let utterances = self.ledger.list(session_id).await?;

        fs::create_dir_all(destination_root)?;

        let session_dir = destination_root.join(session_id);
        match fs::create_dir(&session_dir) {
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::ExportConflict {
                    path: session_dir.display().to_string(),
                });
            }
            other => other?,
        }

        match self
            .write_artifacts(&session, &utterances, &session_dir, include_audio)
            .await
        {
            Ok(audio_count) => {
                info!(
                    "Export complete for session {}: {} utterances, {} audio files",
                    session_id,
                    utterances.len(),
                    audio_count
                );
                Ok(ExportSummary {
                    session_id: session_id.to_string(),
                    export_path: session_dir,
                    utterance_count: utterances.len(),
                    audio_count,
                })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&session_dir) {
                    warn!(
                        "Failed to clean up partial export at {}: {}",
                        session_dir.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn write_artifacts(
        &self,
        session: &Session,
        utterances: &[Utterance],
        session_dir: &Path,
        include_audio: bool,
    ) -> Result<usize> {
        let record = ConversationRecord {
            session_id: &session.id,
            clinician_id: &session.clinician_id,
            patient_name: &session.patient_name,
            clinic_number: &session.clinic_number,
            medical_record_number: &session.medical_record_number,
            diagnosis: &session.diagnosis,
            notes: &session.notes,
            status: session.status,
            created_at: session.created_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
            utterances: utterances
                .iter()
                .map(|u| UtteranceRecord {
                    sequence: u.sequence,
                    speaker: u.speaker,
                    text: &u.text,
                    confidence: u.confidence,
                    start_ms: u.start_ms,
                    end_ms: u.end_ms,
                    duration_ms: u.duration_ms(),
                    timestamp: u.timestamp,
                })
                .collect(),
        };

        let json = serde_json::to_vec_pretty(&record)
            .map_err(|e| Error::persistence(format!("Failed to encode conversation: {e}")))?;
        fs::write(session_dir.join("conversation.json"), json)?;

        let mut audio_count = 0;
        if include_audio {
            let audio_dir = session_dir.join("audio");
            fs::create_dir(&audio_dir)?;

            for utterance in utterances {
                let Some(reference) = &utterance.audio_ref else {
                    continue;
                };
                let bytes = self.store.get(reference).await?;
                // Names derive from the sequence number so re-exports are
                // reproducible.
                let filename = format!("utterance-{:03}.wav", utterance.sequence);
                fs::write(audio_dir.join(filename), bytes)?;
                audio_count += 1;
            }
        }

        Ok(audio_count)
    }

    /// Export a session to a USB mount point.
    ///
    /// The mount point must be a writable directory; the destination is a
    /// timestamped directory beneath it, audio included.
    pub async fn export_to_usb(
        &self,
        session_id: &str,
        mount_point: &Path,
    ) -> Result<ExportSummary> {
        if !mount_point.is_dir() {
            return Err(Error::storage(format!(
                "USB mount point not accessible: {}",
                mount_point.display()
            )));
        }

        let export_base = mount_point.join("medscribe-exports");
        fs::create_dir_all(&export_base).map_err(|e| {
            Error::storage(format!(
                "USB mount point not writable: {}: {e}",
                mount_point.display()
            ))
        })?;

        let destination = export_base.join(Utc::now().format("%Y%m%d-%H%M%S").to_string());

        info!(
            "Exporting session {} to USB at {}",
            session_id,
            destination.display()
        );
        self.export(session_id, &destination, true).await
    }
}
