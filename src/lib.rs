//! fieldstudy - organize qualitative interview research projects
//!
//! A command-line companion for interview studies: upload audio and obtain
//! transcripts from a hosted speech API, derive themes and keywords with a
//! hosted LLM, fetch background context from a hosted search API, keep
//! per-project notes, and export everything as a JSON bundle. Persistence,
//! identity, and file storage are delegated to a hosted backend; nothing is
//! stored locally except the analysis caches, notes, and the session.
//!
//! # Architecture
//!
//! The one non-trivial flow is interview ingestion, which chains the
//! external collaborators in order: object-store upload, transcription
//! (upload, submit, poll), then interview record creation. Transcription
//! failures degrade to an empty transcript instead of aborting; an upload
//! failure aborts before anything is recorded.
//!
//! # Modules
//!
//! - `adapters`: HTTP clients for the hosted services, behind small traits
//! - `core`: the ingestion pipeline, analyses with caching, and export
//! - `domain`: data structures (Project, Interview, analysis results)
//! - `store`: local JSON state (analysis caches, notes, session)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Sign in and create a project
//! fieldstudy login researcher@example.org
//! fieldstudy project create "Coastal Livelihoods"
//!
//! # Ingest an interview recording
//! fieldstudy interview ingest <project-id> --file visit1.wav --title "Field Visit 1"
//!
//! # Analyze and export
//! fieldstudy analyze themes <project-id>
//! fieldstudy export <project-id> --output coastal.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::{AppwriteClient, AssemblyAiClient, GroqClient, JobStatus, TavilyClient};
pub use core::{AnalysisError, ExportBundle, IngestOutcome, IngestPipeline, IngestRequest};
pub use domain::{ContextEntry, Interview, InterviewDraft, KeywordGroup, Project, Theme};
pub use store::{AnalysisCache, CacheKind, Notebook, SessionStore, Snapshot};
