//! Adapter interfaces for the hosted services.
//!
//! Each external collaborator sits behind a small trait so the pipeline and
//! analysis flows can be exercised against scripted fakes: the object store,
//! the speech-to-text provider, the LLM chat-completion provider, and the
//! web-search provider.

pub mod appwrite;
pub mod assemblyai;
pub mod groq;
pub mod tavily;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Interview, InterviewDraft};

// Re-export the concrete clients
pub use appwrite::AppwriteClient;
pub use assemblyai::AssemblyAiClient;
pub use groq::GroqClient;
pub use tavily::TavilyClient;

/// Object storage for raw audio files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store raw bytes under a fresh identifier; returns the stored-file id
    async fn create_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String>;

    /// Viewable URL for a stored file
    fn file_view_url(&self, file_id: &str) -> String;

    /// Delete a stored file
    async fn delete_file(&self, file_id: &str) -> Result<()>;
}

/// Interview documents in the hosted database.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn create_interview(&self, draft: &InterviewDraft) -> Result<Interview>;

    /// Interviews for one project, newest first
    async fn list_interviews(&self, project_id: &str) -> Result<Vec<Interview>>;

    async fn get_interview(&self, interview_id: &str) -> Result<Interview>;

    async fn delete_interview(&self, interview_id: &str) -> Result<()>;
}

/// State of an asynchronous transcription job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed { text: String },
    Error { message: String },
}

impl JobStatus {
    /// True for `completed` and `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

/// Speech-to-text provider with an upload/submit/poll contract.
#[async_trait]
pub trait SpeechApi: Send + Sync {
    /// Upload raw audio bytes; returns the provider-internal audio URL
    async fn upload_audio(&self, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Submit a transcription job for an uploaded audio URL; returns the job id
    async fn submit_transcription(&self, audio_url: &str) -> Result<String>;

    /// Fetch the current status of a job
    async fn transcription_status(&self, job_id: &str) -> Result<JobStatus>;
}

/// LLM chat-completion provider.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Run a single-turn completion; returns the raw response text
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Raw fields from a web-search response.
#[derive(Debug, Clone, Default)]
pub struct SearchAnswer {
    /// Synthesized answer, when the provider produced one
    pub answer: Option<String>,

    /// Content of the top search result
    pub top_result: Option<String>,
}

/// Web-search/context provider.
#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchAnswer>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed {
            text: String::new()
        }
        .is_terminal());
        assert!(JobStatus::Error {
            message: "unsupported_format".to_string()
        }
        .is_terminal());
    }
}
