//! AssemblyAI-compatible transcription client.
//!
//! The provider works in three steps: upload the raw audio bytes to the
//! ingest endpoint (the bytes land in the provider's own storage, separate
//! from the object store), submit a transcription job referencing the
//! returned URL, then poll the job until it reports a terminal status.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{JobStatus, SpeechApi};

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";
const SPEECH_MODEL: &str = "universal";

/// Client for the hosted transcription provider
pub struct AssemblyAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AssemblyAiClient {
    /// Create a client with the default endpoint
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint
    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SpeechApi for AssemblyAiClient {
    async fn upload_audio(&self, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/upload"))
            .header("authorization", &self.api_key)
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to upload audio to transcription provider")?
            .error_for_status()
            .context("Transcription provider rejected the audio upload")?;

        let upload: UploadResponse = response
            .json()
            .await
            .context("Failed to parse upload response")?;

        Ok(upload.upload_url)
    }

    async fn submit_transcription(&self, audio_url: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/transcript"))
            .header("authorization", &self.api_key)
            .json(&serde_json::json!({
                "audio_url": audio_url,
                "speech_model": SPEECH_MODEL,
            }))
            .send()
            .await
            .context("Failed to submit transcription job")?
            .error_for_status()
            .context("Transcription provider rejected the job submission")?;

        let transcript: TranscriptResponse = response
            .json()
            .await
            .context("Failed to parse transcription job response")?;

        Ok(transcript.id)
    }

    async fn transcription_status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.url(&format!("/transcript/{}", job_id)))
            .header("authorization", &self.api_key)
            .send()
            .await
            .context("Failed to poll transcription job")?
            .error_for_status()
            .context("Transcription provider rejected the status poll")?;

        let transcript: TranscriptResponse = response
            .json()
            .await
            .context("Failed to parse transcription status")?;

        Ok(map_status(transcript))
    }
}

/// Map the provider's status string onto the job state machine.
///
/// Unknown statuses are treated as still in flight so the poll loop keeps
/// going until its deadline rather than failing on a new provider state.
fn map_status(transcript: TranscriptResponse) -> JobStatus {
    match transcript.status.as_str() {
        "queued" => JobStatus::Queued,
        "completed" => JobStatus::Completed {
            text: transcript.text.unwrap_or_default(),
        },
        "error" => JobStatus::Error {
            message: transcript
                .error
                .unwrap_or_else(|| "unknown transcription error".to_string()),
        },
        _ => JobStatus::Processing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, text: Option<&str>, error: Option<&str>) -> TranscriptResponse {
        TranscriptResponse {
            id: "job-1".to_string(),
            status: status.to_string(),
            text: text.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status(response("queued", None, None)), JobStatus::Queued);
        assert_eq!(
            map_status(response("processing", None, None)),
            JobStatus::Processing
        );
        assert_eq!(
            map_status(response("completed", Some("hello"), None)),
            JobStatus::Completed {
                text: "hello".to_string()
            }
        );
        assert_eq!(
            map_status(response("error", None, Some("unsupported_format"))),
            JobStatus::Error {
                message: "unsupported_format".to_string()
            }
        );
    }

    #[test]
    fn test_silent_audio_completes_with_empty_text() {
        // A completed job may legitimately carry no text (silence)
        let status = map_status(response("completed", None, None));
        assert_eq!(
            status,
            JobStatus::Completed {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_unknown_status_stays_in_flight() {
        let status = map_status(response("throttled", None, None));
        assert_eq!(status, JobStatus::Processing);
    }

    #[test]
    fn test_url_building() {
        let client = AssemblyAiClient::with_base_url("key".to_string(), "https://stt.local/v2/");
        assert_eq!(
            client.url("/transcript/abc"),
            "https://stt.local/v2/transcript/abc"
        );
    }
}
