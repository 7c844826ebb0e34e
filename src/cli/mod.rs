//! Command-line interface for fieldstudy.
//!
//! Provides commands for account/session management, projects, interview
//! ingestion, transcript analysis, notes, and export.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::adapters::{
    AppwriteClient, AssemblyAiClient, FileStore, GroqClient, InterviewStore, TavilyClient,
};
use crate::config;
use crate::core::analysis;
use crate::core::export;
use crate::core::ingest::{self, IngestPipeline, IngestRequest};
use crate::store::{AnalysisCache, CacheKind, Notebook, SessionStore, SessionToken, Snapshot};

pub mod notes;

/// fieldstudy - organize interview projects: ingest audio, analyze
/// transcripts, take notes, export
#[derive(Parser, Debug)]
#[command(name = "fieldstudy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and sign in
    Signup {
        /// Email address
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Password (prefer the environment variable)
        #[arg(short, long, env = "FIELDSTUDY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign in with email and password
    Login {
        /// Email address
        email: String,

        /// Password (prefer the environment variable)
        #[arg(short, long, env = "FIELDSTUDY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and drop the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Confirm email verification from the emailed link's token pair
    Verify {
        /// The userId query parameter
        #[arg(long)]
        user_id: String,

        /// The secret query parameter
        #[arg(long)]
        secret: String,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Manage interviews
    Interview {
        #[command(subcommand)]
        command: InterviewCommands,
    },

    /// Run transcript analyses (cached per project)
    Analyze {
        #[command(subcommand)]
        command: AnalyzeCommands,
    },

    /// Per-project research notes
    Notes {
        #[command(subcommand)]
        command: notes::NotesCommands,
    },

    /// Export a project as a JSON bundle
    Export {
        /// Project ID
        project_id: String,

        /// Output file (".json" appended when missing)
        #[arg(short, long, default_value = "project_export")]
        output: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    Create {
        /// Project name
        name: String,
    },

    /// List projects
    List,

    /// Rename a project
    Rename {
        /// Project ID
        project_id: String,

        /// New name
        name: String,
    },

    /// Delete a project document (its interviews are not removed)
    Delete {
        /// Project ID
        project_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum InterviewCommands {
    /// Upload audio, transcribe it, and record the interview
    Ingest {
        /// Project ID
        project_id: String,

        /// Audio file to ingest
        #[arg(short, long)]
        file: PathBuf,

        /// Interview title
        #[arg(short, long)]
        title: String,
    },

    /// List a project's interviews
    List {
        /// Project ID
        project_id: String,
    },

    /// Print an interview's transcript
    Show {
        /// Interview ID
        interview_id: String,
    },

    /// Print the viewable URL of an interview's audio
    AudioUrl {
        /// Interview ID
        interview_id: String,
    },

    /// Delete an interview: its stored audio and its record
    Delete {
        /// Interview ID
        interview_id: String,
    },

    /// Delete only the stored audio, leaving the record behind
    PruneAudio {
        /// Interview ID
        interview_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AnalyzeCommands {
    /// Extract themes from the project's transcripts
    Themes {
        /// Project ID
        project_id: String,

        /// Re-run the analysis, replacing the cached result
        #[arg(long)]
        refresh: bool,
    },

    /// Extract categorized keywords from the project's transcripts
    Keywords {
        /// Project ID
        project_id: String,

        /// Re-run the analysis, replacing the cached result
        #[arg(long)]
        refresh: bool,
    },

    /// Fetch background context for the project's themes
    Context {
        /// Project ID
        project_id: String,

        /// Re-fetch, replacing the cached result
        #[arg(long)]
        refresh: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Signup {
                email,
                name,
                password,
            } => signup(&email, &password, &name).await,
            Commands::Login { email, password } => login(&email, &password).await,
            Commands::Logout => logout().await,
            Commands::Whoami => whoami().await,
            Commands::Verify { user_id, secret } => verify(&user_id, &secret).await,
            Commands::Project { command } => execute_project(command).await,
            Commands::Interview { command } => execute_interview(command).await,
            Commands::Analyze { command } => execute_analyze(command).await,
            Commands::Notes { command } => notes::execute(command).await,
            Commands::Export { project_id, output } => export_project(&project_id, &output).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Backend client carrying the stored session cookie (if any)
async fn backend_client() -> Result<AppwriteClient> {
    let cfg = config::config()?;
    let backend = cfg.backend()?;

    let session = SessionStore::open_default()?.load().await?;
    Ok(AppwriteClient::new(backend, session.map(|s| s.cookie)))
}

/// Backend client without a session (signup/login)
fn anonymous_client() -> Result<AppwriteClient> {
    let cfg = config::config()?;
    Ok(AppwriteClient::new(cfg.backend()?, None))
}

fn speech_client() -> Result<AssemblyAiClient> {
    let cfg = config::config()?;
    let key = config::assemblyai_key()?;

    Ok(
        match cfg
            .providers
            .assemblyai
            .as_ref()
            .and_then(|p| p.base_url.as_deref())
        {
            Some(base) => AssemblyAiClient::with_base_url(key, base),
            None => AssemblyAiClient::new(key),
        },
    )
}

fn chat_client() -> Result<GroqClient> {
    let cfg = config::config()?;
    let key = config::groq_key()?;
    let groq = cfg.providers.groq.as_ref();

    let base = groq
        .and_then(|p| p.base_url.clone())
        .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string());

    Ok(match groq.and_then(|p| p.model.clone()) {
        Some(model) => GroqClient::with_options(key, base, model),
        None => GroqClient::with_options(key, base, "deepseek-r1-distill-llama-70b"),
    })
}

fn search_client() -> Result<TavilyClient> {
    let cfg = config::config()?;
    let key = config::tavily_key()?;

    Ok(
        match cfg
            .providers
            .tavily
            .as_ref()
            .and_then(|p| p.base_url.as_deref())
        {
            Some(base) => TavilyClient::with_base_url(key, base),
            None => TavilyClient::new(key),
        },
    )
}

// ----------------------------------------------------------------------
// Account / session
// ----------------------------------------------------------------------

async fn signup(email: &str, password: &str, name: &str) -> Result<()> {
    let client = anonymous_client()?;

    let user = client.create_account(email, password, name).await?;
    eprintln!("Account created: {}", user.email);

    // Sign in right away, like the signup flow in the app
    login(email, password).await
}

async fn login(email: &str, password: &str) -> Result<()> {
    let client = anonymous_client()?;
    let session = client.login(email, password).await?;

    let token = SessionToken {
        user_id: session.user_id.clone(),
        cookie: session.cookie,
        created_at: Utc::now(),
    };
    SessionStore::open_default()?.save(&token).await?;

    eprintln!("Signed in as {} ({})", email, session.user_id);
    Ok(())
}

async fn logout() -> Result<()> {
    let client = backend_client().await?;

    if let Err(e) = client.logout().await {
        eprintln!("Sign out failed remotely ({}), dropping local session anyway", e);
    }

    SessionStore::open_default()?.clear().await?;
    eprintln!("Signed out.");
    Ok(())
}

async fn whoami() -> Result<()> {
    let client = backend_client().await?;
    let user = client.current_user().await?;

    println!("{} <{}>", user.name, user.email);
    println!("ID: {}", user.id);
    println!(
        "Email verified: {}",
        if user.email_verified { "yes" } else { "no" }
    );

    Ok(())
}

async fn verify(user_id: &str, secret: &str) -> Result<()> {
    let client = anonymous_client()?;

    match client.confirm_verification(user_id, secret).await {
        Ok(()) => {
            eprintln!("Your email has been verified. You can now log in.");
            Ok(())
        }
        Err(e) => Err(e.context("Verification failed or link expired")),
    }
}

// ----------------------------------------------------------------------
// Projects
// ----------------------------------------------------------------------

async fn execute_project(command: ProjectCommands) -> Result<()> {
    let client = backend_client().await?;

    match command {
        ProjectCommands::Create { name } => {
            if name.trim().is_empty() {
                anyhow::bail!("A project name is required");
            }

            let project = client.create_project(name.trim()).await?;
            eprintln!("Created project: {}", project.name);
            println!("{}", project.id);
        }
        ProjectCommands::List => {
            let projects = client.list_projects().await?;

            if projects.is_empty() {
                println!("No projects yet. Use 'fieldstudy project create <name>'.");
                return Ok(());
            }

            println!("{:<24} {:<40}", "ID", "NAME");
            println!("{}", "-".repeat(64));
            for project in &projects {
                println!("{:<24} {:<40}", project.id, project.name);
            }
            println!("\nTotal: {} project(s)", projects.len());
        }
        ProjectCommands::Rename { project_id, name } => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                anyhow::bail!("A project name is required");
            }

            let current = client.get_project(&project_id).await?;
            if current.name == trimmed {
                eprintln!("Name unchanged.");
                return Ok(());
            }

            let project = client.rename_project(&project_id, trimmed).await?;
            eprintln!("Renamed to: {}", project.name);
        }
        ProjectCommands::Delete { project_id } => {
            client.delete_project(&project_id).await?;
            eprintln!("Project {} deleted. Its interviews were not removed.", project_id);
        }
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Interviews
// ----------------------------------------------------------------------

async fn execute_interview(command: InterviewCommands) -> Result<()> {
    let client = backend_client().await?;

    match command {
        InterviewCommands::Ingest {
            project_id,
            file,
            title,
        } => {
            // Friendly failure before uploading anything
            let project = client
                .get_project(&project_id)
                .await
                .context("Project not found")?;

            let speech = speech_client()?;
            let cfg = config::config()?;

            let pipeline = IngestPipeline::new(
                &client,
                &speech,
                &client,
                cfg.ingest.poll_interval,
                cfg.ingest.poll_timeout,
            );

            // Cancel the poll loop on ctrl-c instead of abandoning it
            let cancel = CancellationToken::new();
            let signal_guard = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_guard.cancel();
                }
            });

            eprintln!("Ingesting '{}' into {}...", title, project.name);

            let request = IngestRequest {
                project_id,
                title,
            };
            let outcome = pipeline.ingest_file(&request, &file, cancel).await?;

            eprintln!("Interview recorded: {}", outcome.interview.id);
            if let Some(error) = outcome.transcription_error {
                eprintln!("Transcription failed: {}", error);
                eprintln!("The interview was saved without a transcript.");
            } else if outcome.interview.has_transcript() {
                let preview: String = outcome.interview.transcript.chars().take(400).collect();
                let ellipsis = if outcome.interview.transcript.chars().count() > 400 {
                    "..."
                } else {
                    ""
                };
                eprintln!("Transcript preview:\n{}{}", preview, ellipsis);
            } else {
                eprintln!("Transcript is empty (no speech detected).");
            }
        }
        InterviewCommands::List { project_id } => {
            let interviews = client.list_interviews(&project_id).await?;

            if interviews.is_empty() {
                println!("No interviews uploaded yet.");
                return Ok(());
            }

            println!(
                "{:<24} {:<30} {:<22} {:<10}",
                "ID", "TITLE", "DATE", "TRANSCRIPT"
            );
            println!("{}", "-".repeat(88));
            for interview in &interviews {
                let title = if interview.title.len() > 27 {
                    format!("{}...", &interview.title[..27])
                } else {
                    interview.title.clone()
                };
                println!(
                    "{:<24} {:<30} {:<22} {:<10}",
                    interview.id,
                    title,
                    interview.date_time.format("%Y-%m-%d %H:%M"),
                    if interview.has_transcript() { "yes" } else { "-" }
                );
            }
        }
        InterviewCommands::Show { interview_id } => {
            let interview = client.get_interview(&interview_id).await?;

            eprintln!("{} ({})", interview.title, interview.date_time);
            if interview.has_transcript() {
                println!("{}", interview.transcript);
            } else {
                println!("No transcript available.");
            }
        }
        InterviewCommands::AudioUrl { interview_id } => {
            let interview = client.get_interview(&interview_id).await?;
            println!("{}", client.file_view_url(&interview.audio_file_id));
        }
        InterviewCommands::Delete { interview_id } => {
            ingest::delete_interview(&client, &client, &interview_id).await?;
            eprintln!("Interview {} and its audio deleted.", interview_id);
        }
        InterviewCommands::PruneAudio { interview_id } => {
            ingest::prune_interview_audio(&client, &client, &interview_id).await?;
            eprintln!(
                "Audio deleted. Interview {} still references the removed file.",
                interview_id
            );
        }
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Analysis
// ----------------------------------------------------------------------

async fn execute_analyze(command: AnalyzeCommands) -> Result<()> {
    let client = backend_client().await?;
    let cache = AnalysisCache::open_default()?;

    match command {
        AnalyzeCommands::Themes {
            project_id,
            refresh,
        } => {
            let chat = chat_client()?;
            let interviews = client.list_interviews(&project_id).await?;

            let snapshot =
                analysis::themes_for_project(&chat, &cache, &project_id, &interviews, refresh)
                    .await
                    .map_err(|e| anyhow::anyhow!("Analysis failed: {}", e))?;

            eprintln!("Last analyzed: {}", snapshot.analyzed_at);
            if snapshot.value.is_empty() {
                println!("No insights found.");
            }
            for theme in &snapshot.value {
                println!("{}", theme.theme);
                for point in &theme.subpoints {
                    println!("  - {}", point);
                }
            }
        }
        AnalyzeCommands::Keywords {
            project_id,
            refresh,
        } => {
            let chat = chat_client()?;
            let interviews = client.list_interviews(&project_id).await?;

            let snapshot =
                analysis::keywords_for_project(&chat, &cache, &project_id, &interviews, refresh)
                    .await
                    .map_err(|e| anyhow::anyhow!("Analysis failed: {}", e))?;

            eprintln!("Last analyzed: {}", snapshot.analyzed_at);
            if snapshot.value.is_empty() {
                println!("No keywords found yet.");
            }
            for group in &snapshot.value {
                println!("{} ({} keyword(s))", group.category, group.keywords.len());
                for keyword in &group.keywords {
                    println!("  {}: {}", keyword.term, keyword.description);
                    if !keyword.quote.is_empty() {
                        println!("    \"{}\"", keyword.quote);
                    }
                }
            }
        }
        AnalyzeCommands::Context {
            project_id,
            refresh,
        } => {
            // Context builds on themes: reuse the cached theme list, or
            // compute it first on a cache miss.
            let themes = match cache
                .load::<Vec<crate::domain::Theme>>(CacheKind::Insights, &project_id)
                .await?
            {
                Some(cached) => cached,
                None => {
                    let chat = chat_client()?;
                    let interviews = client.list_interviews(&project_id).await?;
                    analysis::themes_for_project(&chat, &cache, &project_id, &interviews, false)
                        .await
                        .map_err(|e| anyhow::anyhow!("Analysis failed: {}", e))?
                }
            };

            if themes.value.is_empty() {
                println!("No themes to contextualize.");
                return Ok(());
            }

            let search = search_client()?;
            let snapshot = analysis::context_for_project(
                &search,
                &cache,
                &project_id,
                &themes.value,
                refresh,
            )
            .await
            .map_err(|e| anyhow::anyhow!("Context fetch failed: {}", e))?;

            eprintln!("Last fetched: {}", snapshot.analyzed_at);
            for entry in &snapshot.value {
                println!("{}\n  {}\n", entry.theme, entry.context);
            }
        }
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Export
// ----------------------------------------------------------------------

async fn export_project(project_id: &str, output: &PathBuf) -> Result<()> {
    let client = backend_client().await?;
    let cache = AnalysisCache::open_default()?;
    let notebook = Notebook::open_default()?;

    let project = client.get_project(project_id).await?;
    let interviews = client.list_interviews(project_id).await?;

    // Export the current cached state; nothing is recomputed here
    let insights: Vec<_> = cache
        .load(CacheKind::Insights, project_id)
        .await?
        .map(|s: Snapshot<Vec<crate::domain::Theme>>| s.value)
        .unwrap_or_default();
    let keywords: Vec<_> = cache
        .load(CacheKind::Keywords, project_id)
        .await?
        .map(|s: Snapshot<Vec<crate::domain::KeywordGroup>>| s.value)
        .unwrap_or_default();
    let context: Vec<_> = cache
        .load(CacheKind::Context, project_id)
        .await?
        .map(|s: Snapshot<Vec<crate::domain::ContextEntry>>| s.value)
        .unwrap_or_default();
    let notes = notebook
        .load(project_id)
        .await?
        .map(|n| n.content)
        .unwrap_or_default();

    let bundle = export::assemble(&project, &interviews, insights, keywords, context, notes);
    let written = export::write_bundle(&bundle, output).await?;

    eprintln!(
        "Exported {} interview(s), {} theme(s), {} keyword group(s) to {}",
        bundle.interviews.len(),
        bundle.insights.len(),
        bundle.keywords.len(),
        written.display()
    );

    Ok(())
}

// ----------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------

async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("fieldstudy configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Cache:   {}", cfg.cache_dir().display());
    println!("  Notes:   {}", cfg.notes_dir().display());
    println!("  Session: {}", cfg.session_path().display());
    println!();
    match cfg.backend {
        Some(ref backend) => {
            println!("Backend:");
            println!("  Endpoint:    {}", backend.endpoint);
            println!("  Project:     {}", backend.project_id);
            println!("  Database:    {}", backend.database_id);
            println!("  Collections: {} / {}", backend.projects_collection_id, backend.interviews_collection_id);
            println!("  Bucket:      {}", backend.bucket_id);
        }
        None => println!("Backend: (not configured)"),
    }
    println!();
    println!("Ingest:");
    println!("  Poll interval: {:?}", cfg.ingest.poll_interval);
    println!("  Poll timeout:  {:?}", cfg.ingest.poll_timeout);

    Ok(())
}
