//! Projects and interviews as stored in the hosted database.
//!
//! Both are plain documents: the project/interview relation is a string
//! equality join on `project_id`, not an enforced foreign key. Deleting a
//! project does not cascade to its interviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A research project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Opaque identifier issued by the hosted database
    pub id: String,

    /// Display name (mutable, user-editable)
    pub name: String,
}

/// An interview document.
///
/// `audio_file_id` references the object store and may dangle if the stored
/// file is deleted without deleting this record (see the legacy prune flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    /// Opaque identifier issued by the hosted database
    pub id: String,

    /// Owning project (string-equality join)
    pub project_id: String,

    /// User-supplied title
    pub title: String,

    /// Transcript text; empty when transcription failed or produced nothing
    pub transcript: String,

    /// Free-form keyword string, persisted empty at creation
    pub keywords: String,

    /// Client-generated submission timestamp (not server time)
    pub date_time: DateTime<Utc>,

    /// Stored-file identifier in the object store
    pub audio_file_id: String,
}

impl Interview {
    /// True when the transcript carries any text.
    pub fn has_transcript(&self) -> bool {
        !self.transcript.trim().is_empty()
    }
}

/// Fields for a not-yet-persisted interview document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDraft {
    pub project_id: String,
    pub title: String,
    pub transcript: String,
    pub keywords: String,
    pub date_time: DateTime<Utc>,
    pub audio_file_id: String,
}

impl InterviewDraft {
    /// Draft an interview for the given project, stamped with the client clock.
    pub fn new(
        project_id: impl Into<String>,
        title: impl Into<String>,
        audio_file_id: impl Into<String>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            transcript: transcript.into(),
            keywords: String::new(),
            date_time: Utc::now(),
            audio_file_id: audio_file_id.into(),
        }
    }
}
