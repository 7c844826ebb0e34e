//! Orchestration logic: the ingestion pipeline, transcript analysis with
//! its per-project cache, and project export.

pub mod analysis;
pub mod export;
pub mod ingest;

// Re-export commonly used types
pub use analysis::AnalysisError;
pub use export::ExportBundle;
pub use ingest::{IngestOutcome, IngestPipeline, IngestRequest, TranscriptionError};
