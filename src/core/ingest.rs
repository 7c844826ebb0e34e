//! Interview ingestion pipeline.
//!
//! Composes the external collaborators in order: validate the submission,
//! upload the raw audio to the object store, hand the same bytes to the
//! transcription provider, submit and poll the job, then persist the
//! interview document. Control flows strictly downward; only the submitted
//! job tolerates failure, degrading to an empty transcript so the interview
//! is still recorded.
//!
//! Either upload failing aborts before any document is written. A record
//! failure does not roll back the already-uploaded audio or the submitted
//! transcription job; orphaned external resources are accepted.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::adapters::{FileStore, InterviewStore, JobStatus, SpeechApi};
use crate::domain::{Interview, InterviewDraft};

/// A validated ingestion request
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub project_id: String,
    pub title: String,
}

/// What the pipeline produced
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The persisted interview record
    pub interview: Interview,

    /// Set when transcription failed and the empty transcript was used
    pub transcription_error: Option<String>,
}

/// Why a transcription attempt did not yield text
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The provider reported the job as failed
    #[error("transcription failed: {0}")]
    Job(String),

    /// The poll loop hit its deadline before the job went terminal
    #[error("transcription timed out after {0:?}")]
    DeadlineExceeded(Duration),

    /// The caller cancelled while the job was in flight
    #[error("transcription cancelled")]
    Cancelled,

    /// Submission or a poll round-trip failed
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// The ingestion pipeline over its three collaborators
pub struct IngestPipeline<'a> {
    files: &'a dyn FileStore,
    speech: &'a dyn SpeechApi,
    records: &'a dyn InterviewStore,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl<'a> IngestPipeline<'a> {
    /// Build a pipeline with the configured poll settings
    pub fn new(
        files: &'a dyn FileStore,
        speech: &'a dyn SpeechApi,
        records: &'a dyn InterviewStore,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            files,
            speech,
            records,
            poll_interval,
            poll_timeout,
        }
    }

    /// Ingest an audio file from disk.
    ///
    /// Validation failures surface before any network call is made.
    #[instrument(skip(self, cancel), fields(project = %request.project_id, title = %request.title))]
    pub async fn ingest_file(
        &self,
        request: &IngestRequest,
        audio_path: &Path,
        cancel: CancellationToken,
    ) -> Result<IngestOutcome> {
        if request.title.trim().is_empty() {
            anyhow::bail!("An interview title is required");
        }

        let bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read audio file: {}", audio_path.display()))?;

        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let content_type = audio_content_type(audio_path);

        self.ingest_bytes(request, &file_name, bytes, content_type, cancel)
            .await
    }

    /// Ingest raw audio bytes (the file already read or received elsewhere)
    pub async fn ingest_bytes(
        &self,
        request: &IngestRequest,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cancel: CancellationToken,
    ) -> Result<IngestOutcome> {
        if request.title.trim().is_empty() {
            anyhow::bail!("An interview title is required");
        }
        if bytes.is_empty() {
            anyhow::bail!("Audio file is empty");
        }

        // Object store upload. Failure here aborts the pipeline before any
        // document is written.
        let audio_file_id = self
            .files
            .create_file(file_name, bytes.clone(), content_type)
            .await
            .context("Audio upload failed")?;

        info!(%audio_file_id, "Audio stored");

        // The same bytes go to the transcription provider's own storage.
        // A failure to land them there aborts like the object-store upload.
        let audio_url = self
            .speech
            .upload_audio(bytes, content_type)
            .await
            .context("Audio upload to transcription provider failed")?;

        // From submission on, failures are tolerated: the interview is
        // still recorded, just with an empty transcript.
        let (transcript, transcription_error) = match self.transcribe(&audio_url, &cancel).await {
            Ok(text) => (text, None),
            Err(e) => {
                warn!(error = %e, "Transcription failed, recording interview without text");
                (String::new(), Some(e.to_string()))
            }
        };

        // Interview record. No idempotency key: a retried submission
        // creates a duplicate record.
        let draft = InterviewDraft::new(
            request.project_id.clone(),
            request.title.clone(),
            audio_file_id,
            transcript,
        );

        let interview = self
            .records
            .create_interview(&draft)
            .await
            .context("Saving interview failed")?;

        info!(interview_id = %interview.id, "Interview recorded");

        Ok(IngestOutcome {
            interview,
            transcription_error,
        })
    }

    /// Submit a job for an uploaded audio URL and poll until terminal.
    async fn transcribe(
        &self,
        audio_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TranscriptionError> {
        let job_id = self.speech.submit_transcription(audio_url).await?;

        info!(%job_id, "Transcription job submitted");

        self.poll_job(&job_id, cancel).await
    }

    /// Poll a job at a fixed interval until it completes, errors, hits the
    /// deadline, or the caller cancels.
    async fn poll_job(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TranscriptionError> {
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            if cancel.is_cancelled() {
                return Err(TranscriptionError::Cancelled);
            }

            match self.speech.transcription_status(job_id).await? {
                JobStatus::Completed { text } => return Ok(text),
                JobStatus::Error { message } => return Err(TranscriptionError::Job(message)),
                JobStatus::Queued | JobStatus::Processing => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(TranscriptionError::DeadlineExceeded(self.poll_timeout));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(TranscriptionError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Delete an interview's audio and its document together.
///
/// This is the project-page flow: no dangling record remains. The file is
/// removed first; if the document delete then fails, the record is left
/// with a dangling reference (no rollback).
pub async fn delete_interview(
    files: &dyn FileStore,
    records: &dyn InterviewStore,
    interview_id: &str,
) -> Result<()> {
    let interview = records.get_interview(interview_id).await?;

    files
        .delete_file(&interview.audio_file_id)
        .await
        .context("Failed to delete audio file")?;

    records
        .delete_interview(interview_id)
        .await
        .context("Failed to delete interview record")?;

    info!(%interview_id, "Interview and audio deleted");
    Ok(())
}

/// Delete only an interview's stored audio, leaving the document behind.
///
/// This is the legacy flow: the record keeps its now-dangling
/// `audio_file_id`. Kept as a distinct operation rather than unified with
/// [`delete_interview`].
pub async fn prune_interview_audio(
    files: &dyn FileStore,
    records: &dyn InterviewStore,
    interview_id: &str,
) -> Result<()> {
    let interview = records.get_interview(interview_id).await?;

    files
        .delete_file(&interview.audio_file_id)
        .await
        .context("Failed to delete audio file")?;

    warn!(%interview_id, audio_file_id = %interview.audio_file_id,
        "Audio pruned; interview record keeps a dangling reference");
    Ok(())
}

/// Guess a MIME type from the file extension, with a generic audio fallback
pub fn audio_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_audio_content_type() {
        assert_eq!(audio_content_type(&PathBuf::from("a.wav")), "audio/wav");
        assert_eq!(audio_content_type(&PathBuf::from("a.MP3")), "audio/mpeg");
        assert_eq!(audio_content_type(&PathBuf::from("a.m4a")), "audio/mp4");
        assert_eq!(
            audio_content_type(&PathBuf::from("mystery")),
            "application/octet-stream"
        );
    }
}
