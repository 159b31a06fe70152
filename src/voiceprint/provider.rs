use crate::error::Result;

/// Best-matching enrolled speaker for an audio sample.
#[derive(Debug, Clone)]
pub struct SpeakerMatch {
    pub speaker_id: String,
    /// Raw provider confidence in [0, 1]
    pub confidence: f32,
}

/// Voiceprint recognition capability
///
/// Implemented by concrete VPR vendors. `identify` returns the provider's
/// best match without thresholding; the registry applies the configured
/// confidence threshold.
#[async_trait::async_trait]
pub trait VoiceprintProvider: Send + Sync {
    /// Enroll a voiceprint, returning the provider-assigned voiceprint id.
    async fn enroll(
        &self,
        audio: &[u8],
        sample_rate: u32,
        enrollment_text: &str,
        group_id: &str,
    ) -> Result<String>;

    /// Identify the best-matching enrolled speaker in a group, if any.
    async fn identify(
        &self,
        audio: &[u8],
        sample_rate: u32,
        group_id: &str,
    ) -> Result<Option<SpeakerMatch>>;

    /// Provider name, recorded on enrollments (e.g. "xfyun")
    fn name(&self) -> &str;

    /// Provider endpoint reference, recorded on enrollments
    fn endpoint(&self) -> &str;
}
