//! Notes subcommands: show, save, undo, history, delete.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::store::{Notebook, UndoOutcome};

#[derive(Subcommand, Debug)]
pub enum NotesCommands {
    /// Show the current note for a project
    Show {
        /// Project ID
        project_id: String,
    },

    /// Save note content (from --text, --file, or stdin)
    Save {
        /// Project ID
        project_id: String,

        /// Note content
        #[arg(short, long)]
        text: Option<String>,

        /// Read note content from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Restore the previous saved version
    Undo {
        /// Project ID
        project_id: String,
    },

    /// List saved versions, most recent first
    History {
        /// Project ID
        project_id: String,
    },

    /// Delete the note and its history
    Delete {
        /// Project ID
        project_id: String,
    },
}

/// Execute a notes subcommand
pub async fn execute(command: NotesCommands) -> Result<()> {
    let notebook = Notebook::open_default()?;

    match command {
        NotesCommands::Show { project_id } => show(&notebook, &project_id).await,
        NotesCommands::Save {
            project_id,
            text,
            file,
        } => save(&notebook, &project_id, text, file).await,
        NotesCommands::Undo { project_id } => undo(&notebook, &project_id).await,
        NotesCommands::History { project_id } => history(&notebook, &project_id).await,
        NotesCommands::Delete { project_id } => delete(&notebook, &project_id).await,
    }
}

async fn show(notebook: &Notebook, project_id: &str) -> Result<()> {
    match notebook.load(project_id).await? {
        Some(note) => {
            if let Some(timestamp) = note.timestamp {
                eprintln!("Last saved: {}", timestamp);
            }
            println!("{}", note.content);
        }
        None => {
            println!("No notes yet.");
        }
    }

    Ok(())
}

async fn save(
    notebook: &Notebook,
    project_id: &str,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let content = if let Some(text) = text {
        text
    } else if let Some(path) = file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read note file: {}", path.display()))?
    } else {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read note from stdin")?;
        buffer
    };

    let note = notebook.save(project_id, &content).await?;

    eprintln!(
        "Saved note for {} ({} version{} in history)",
        project_id,
        note.history.len(),
        if note.history.len() == 1 { "" } else { "s" }
    );

    Ok(())
}

async fn undo(notebook: &Notebook, project_id: &str) -> Result<()> {
    match notebook.undo(project_id).await? {
        UndoOutcome::Restored(note) => {
            eprintln!("Restored previous version:");
            println!("{}", note.content);
        }
        UndoOutcome::NothingToUndo => {
            eprintln!("Nothing to undo.");
        }
    }

    Ok(())
}

async fn history(notebook: &Notebook, project_id: &str) -> Result<()> {
    let note = match notebook.load(project_id).await? {
        Some(note) => note,
        None => {
            println!("No history yet.");
            return Ok(());
        }
    };

    for entry in note.history.iter().rev() {
        println!("--- {} ---", entry.timestamp);
        println!("{}\n", entry.content);
    }

    Ok(())
}

async fn delete(notebook: &Notebook, project_id: &str) -> Result<()> {
    if notebook.delete(project_id).await? {
        eprintln!("Note deleted.");
    } else {
        eprintln!("No note to delete.");
    }

    Ok(())
}
