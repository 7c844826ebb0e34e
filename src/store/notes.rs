//! Per-project research notes with an append-only history.
//!
//! Each note lives in its own file (`notes-{project}.json`) holding the
//! current content, its save timestamp, and the full history of saves.
//! Saving appends to the history; undo restores the previous entry and pops
//! the last one. History is append-only otherwise; there is no pruning.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::cache::write_json;

/// One saved state of a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEntry {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The persisted note for one project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    /// Current content
    pub content: String,

    /// When the current content was saved
    pub timestamp: Option<DateTime<Utc>>,

    /// Every save, oldest first (the last entry is the current content)
    #[serde(default)]
    pub history: Vec<NoteEntry>,
}

/// Result of an undo attempt
#[derive(Debug, Clone)]
pub enum UndoOutcome {
    /// The previous entry was restored
    Restored(Note),

    /// Fewer than two history entries: nothing to restore
    NothingToUndo,
}

/// File-backed note storage
pub struct Notebook {
    dir: PathBuf,
}

impl Notebook {
    /// Create a notebook rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open the notebook in the configured location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::config()?.notes_dir()))
    }

    fn note_path(&self, project_id: &str) -> PathBuf {
        self.dir.join(format!("notes-{}.json", project_id))
    }

    /// Load the note for a project, or None when none was saved yet
    pub async fn load(&self, project_id: &str) -> Result<Option<Note>> {
        let path = self.note_path(project_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read note: {}", path.display()))?;

        let note = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse note: {}", path.display()))?;

        Ok(Some(note))
    }

    /// Save new content, appending it to the history
    pub async fn save(&self, project_id: &str, content: &str) -> Result<Note> {
        let mut note = self.load(project_id).await?.unwrap_or_default();

        let timestamp = Utc::now();
        note.history.push(NoteEntry {
            content: content.to_string(),
            timestamp,
        });
        note.content = content.to_string();
        note.timestamp = Some(timestamp);

        write_json(&self.note_path(project_id), &note).await?;
        Ok(note)
    }

    /// Restore the previous history entry and drop the latest one.
    ///
    /// A no-op when the history holds fewer than two entries.
    pub async fn undo(&self, project_id: &str) -> Result<UndoOutcome> {
        let mut note = self.load(project_id).await?.unwrap_or_default();

        if note.history.len() < 2 {
            return Ok(UndoOutcome::NothingToUndo);
        }

        let previous = note.history[note.history.len() - 2].clone();
        note.history.pop();
        note.content = previous.content;
        note.timestamp = Some(previous.timestamp);

        write_json(&self.note_path(project_id), &note).await?;
        Ok(UndoOutcome::Restored(note))
    }

    /// Delete the note file entirely; returns whether anything was removed
    pub async fn delete(&self, project_id: &str) -> Result<bool> {
        let path = self.note_path(project_id);

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove note: {}", path.display()))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_notebook() -> (Notebook, TempDir) {
        let temp = TempDir::new().unwrap();
        (Notebook::new(temp.path()), temp)
    }

    #[tokio::test]
    async fn test_save_appends_history() {
        let (notebook, _temp) = test_notebook();

        notebook.save("p-1", "first draft").await.unwrap();
        let note = notebook.save("p-1", "second draft").await.unwrap();

        assert_eq!(note.content, "second draft");
        assert_eq!(note.history.len(), 2);
        assert_eq!(note.history[0].content, "first draft");
        assert_eq!(note.history[1].content, "second draft");
    }

    #[tokio::test]
    async fn test_undo_restores_previous_entry() {
        let (notebook, _temp) = test_notebook();

        notebook.save("p-1", "first").await.unwrap();
        let saved = notebook.save("p-1", "second").await.unwrap();
        let first_timestamp = saved.history[0].timestamp;

        let outcome = notebook.undo("p-1").await.unwrap();
        let note = match outcome {
            UndoOutcome::Restored(note) => note,
            UndoOutcome::NothingToUndo => panic!("expected undo to restore"),
        };

        assert_eq!(note.content, "first");
        assert_eq!(note.timestamp, Some(first_timestamp));
        assert_eq!(note.history.len(), 1);

        // The restored state is persisted
        let loaded = notebook.load("p-1").await.unwrap().unwrap();
        assert_eq!(loaded.content, "first");
    }

    #[tokio::test]
    async fn test_undo_noop_with_short_history() {
        let (notebook, _temp) = test_notebook();

        // No note at all
        assert!(matches!(
            notebook.undo("p-1").await.unwrap(),
            UndoOutcome::NothingToUndo
        ));

        // Exactly one entry
        notebook.save("p-1", "only").await.unwrap();
        assert!(matches!(
            notebook.undo("p-1").await.unwrap(),
            UndoOutcome::NothingToUndo
        ));

        let note = notebook.load("p-1").await.unwrap().unwrap();
        assert_eq!(note.content, "only");
        assert_eq!(note.history.len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (notebook, _temp) = test_notebook();

        notebook.save("p-1", "scratch").await.unwrap();
        assert!(notebook.delete("p-1").await.unwrap());
        assert!(!notebook.delete("p-1").await.unwrap());
        assert!(notebook.load("p-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let (notebook, _temp) = test_notebook();

        notebook.save("p-1", "alpha").await.unwrap();
        notebook.save("p-2", "beta").await.unwrap();

        let first = notebook.load("p-1").await.unwrap().unwrap();
        let second = notebook.load("p-2").await.unwrap().unwrap();
        assert_eq!(first.content, "alpha");
        assert_eq!(second.content, "beta");
    }
}
