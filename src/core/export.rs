//! Project export as a single JSON bundle.
//!
//! The bundle gathers everything known about a project (metadata,
//! interview summaries, themes, keywords, context, and notes) into one
//! document for backup or downstream analysis. Field names follow the
//! camelCase convention of the hosted documents. No schema versioning.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use crate::domain::{ContextEntry, Interview, KeywordGroup, Project, Theme};

/// The exported document
#[derive(Debug, Clone, Serialize)]
pub struct ExportBundle {
    pub project: ExportProject,
    pub interviews: Vec<ExportInterview>,
    pub insights: Vec<Theme>,
    pub keywords: Vec<KeywordGroup>,
    pub context: Vec<ContextEntry>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInterview {
    pub id: String,
    pub title: String,
    pub transcript: String,
    pub keywords: String,
    pub date_time: DateTime<Utc>,
    pub audio_file_id: String,
}

impl From<&Interview> for ExportInterview {
    fn from(interview: &Interview) -> Self {
        Self {
            id: interview.id.clone(),
            title: interview.title.clone(),
            transcript: interview.transcript.clone(),
            keywords: interview.keywords.clone(),
            date_time: interview.date_time,
            audio_file_id: interview.audio_file_id.clone(),
        }
    }
}

/// Assemble the bundle from the project's pieces
pub fn assemble(
    project: &Project,
    interviews: &[Interview],
    insights: Vec<Theme>,
    keywords: Vec<KeywordGroup>,
    context: Vec<ContextEntry>,
    notes: String,
) -> ExportBundle {
    ExportBundle {
        project: ExportProject {
            id: project.id.clone(),
            name: project.name.clone(),
        },
        interviews: interviews.iter().map(Into::into).collect(),
        insights,
        keywords,
        context,
        notes,
    }
}

/// Write the bundle as pretty JSON; `.json` is appended when missing.
///
/// Returns the path actually written.
pub async fn write_bundle(bundle: &ExportBundle, output: &Path) -> Result<PathBuf> {
    let path = if output.extension().is_some() {
        output.to_path_buf()
    } else {
        output.with_extension("json")
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let content = serde_json::to_string_pretty(bundle)?;
    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write export: {}", path.display()))?;

    Ok(path)
}
