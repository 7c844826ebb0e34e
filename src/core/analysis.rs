//! Theme, keyword, and context analysis over interview transcripts.
//!
//! The LLM is asked for JSON but answers in prose: the contract is a fenced
//! ```json block, with a best-effort fallback to the first bracketed object
//! array in the text. When neither is found the analysis fails and the
//! previously cached result is left untouched.
//!
//! Results are memoized per project in the local analysis cache; an explicit
//! refresh overwrites the cached value unconditionally.

use anyhow::Result;
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::{ChatApi, SearchAnswer, SearchApi};
use crate::domain::{ContextEntry, Interview, KeywordGroup, Theme};
use crate::store::{AnalysisCache, CacheKind, Snapshot};

/// Token budget for the theme extraction call
const THEMES_MAX_TOKENS: u32 = 1024;

/// Token budget for the keyword extraction call
const KEYWORDS_MAX_TOKENS: u32 = 2048;

/// Fallback shown when the search provider has nothing useful
const NO_CONTEXT_FOUND: &str = "No relevant external information found.";

/// Per-theme placeholder when the search call itself fails
const CONTEXT_FETCH_ERROR: &str = "Error fetching context.";

/// Truncation budget for the top-result fallback
const CONTEXT_SNIPPET_CHARS: usize = 400;

/// Why an analysis run produced no result
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No non-empty transcripts to analyze
    #[error("no transcripts to analyze")]
    EmptyTranscript,

    /// The response contained neither a fenced block nor a bracketed array
    #[error("no JSON payload found in model response")]
    MissingPayload,

    /// A payload was found but did not parse as the expected shape
    #[error("model returned malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The provider call or the cache failed
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// Join all non-empty transcripts for a project, separated by blank lines
pub fn combined_transcript(interviews: &[Interview]) -> String {
    interviews
        .iter()
        .filter(|i| i.has_transcript())
        .map(|i| i.transcript.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pull the JSON payload out of a model response.
///
/// Prefers a fenced ```json block; falls back to the first bracketed object
/// array in the raw text.
pub fn extract_json_payload(content: &str) -> Result<String, AnalysisError> {
    let fenced = Regex::new(r"```json\s*([\s\S]*?)```").expect("fenced-block pattern");
    if let Some(captures) = fenced.captures(content) {
        return Ok(captures[1].trim().to_string());
    }

    let array = Regex::new(r"\[\s*\{[\s\S]*\}\s*\]").expect("raw-array pattern");
    if let Some(found) = array.find(content) {
        return Ok(found.as_str().to_string());
    }

    Err(AnalysisError::MissingPayload)
}

fn parse_payload<T: DeserializeOwned>(content: &str) -> Result<T, AnalysisError> {
    let payload = extract_json_payload(content)?;
    Ok(serde_json::from_str(&payload)?)
}

fn themes_prompt(transcript: &str) -> String {
    format!(
        "You are a qualitative research assistant. Analyze the following interview \
         transcript and extract the main themes and their subpoints.\n\
         Return your answer as a JSON array like:\n\
         [{{\"theme\": \"Theme title\", \"subpoints\": [\"point 1\", \"point 2\"]}}]\n\
         Transcript:\n{}",
        transcript
    )
}

fn keywords_prompt(transcript: &str) -> String {
    format!(
        "You are an AI research assistant. Analyze the following interview transcript \
         and extract the most relevant qualitative research keywords.\n\
         Group them under thematic categories (like Economy, Environment, Gender, etc), \
         and for each keyword, provide a short explanation and the exact matching quote \
         from the transcript.\n\
         (try to find as much as possible, but don't force it if there are no clear keywords)\n\
         Return your response only as a JSON array of this format:\n\
         [\n  {{\n    \"category\": \"Category Name\",\n    \"keywords\": [\n      {{\n        \
         \"term\": \"keyword\",\n        \"description\": \"short explanation\",\n        \
         \"quote\": \"exact excerpt from the interview\"\n      }}\n    ]\n  }}\n]\n\n\
         Transcript:\n{}",
        transcript
    )
}

/// Extract themes from a combined transcript
pub async fn extract_themes(
    chat: &dyn ChatApi,
    transcript: &str,
) -> Result<Vec<Theme>, AnalysisError> {
    if transcript.trim().is_empty() {
        return Err(AnalysisError::EmptyTranscript);
    }

    let content = chat
        .complete(&themes_prompt(transcript), THEMES_MAX_TOKENS)
        .await?;

    parse_payload(&content)
}

/// Extract categorized keywords from a combined transcript
pub async fn extract_keywords(
    chat: &dyn ChatApi,
    transcript: &str,
) -> Result<Vec<KeywordGroup>, AnalysisError> {
    if transcript.trim().is_empty() {
        return Err(AnalysisError::EmptyTranscript);
    }

    let content = chat
        .complete(&keywords_prompt(transcript), KEYWORDS_MAX_TOKENS)
        .await?;

    parse_payload(&content)
}

/// Choose the context text for one search response
fn resolve_context_text(answer: SearchAnswer) -> String {
    if let Some(text) = answer.answer {
        return text.trim().to_string();
    }

    if let Some(content) = answer.top_result {
        let snippet: String = content.chars().take(CONTEXT_SNIPPET_CHARS).collect();
        return format!("{}…", snippet);
    }

    NO_CONTEXT_FOUND.to_string()
}

/// Fetch background context for each theme in turn.
///
/// A failed search degrades that theme's entry to a fixed placeholder
/// instead of failing the whole batch.
pub async fn fetch_context(search: &dyn SearchApi, themes: &[Theme]) -> Vec<ContextEntry> {
    let mut entries = Vec::with_capacity(themes.len());

    for theme in themes {
        let query = format!("What is \"{}\"?", theme.theme);

        let context = match search.search(&query).await {
            Ok(answer) => resolve_context_text(answer),
            Err(e) => {
                warn!(theme = %theme.theme, error = %e, "Context fetch failed");
                CONTEXT_FETCH_ERROR.to_string()
            }
        };

        entries.push(ContextEntry {
            theme: theme.theme.clone(),
            context,
        });
    }

    entries
}

/// Themes for a project: cached unless absent or `refresh` is set.
///
/// A failed run (including a parse failure) leaves the cached value alone.
pub async fn themes_for_project(
    chat: &dyn ChatApi,
    cache: &AnalysisCache,
    project_id: &str,
    interviews: &[Interview],
    refresh: bool,
) -> Result<Snapshot<Vec<Theme>>, AnalysisError> {
    if !refresh {
        if let Some(cached) = cache.load(CacheKind::Insights, project_id).await? {
            info!(%project_id, "Using cached themes");
            return Ok(cached);
        }
    }

    let transcript = combined_transcript(interviews);
    let themes = extract_themes(chat, &transcript).await?;

    let snapshot = Snapshot::now(themes);
    cache
        .store(CacheKind::Insights, project_id, &snapshot)
        .await?;

    Ok(snapshot)
}

/// Keywords for a project: cached unless absent or `refresh` is set
pub async fn keywords_for_project(
    chat: &dyn ChatApi,
    cache: &AnalysisCache,
    project_id: &str,
    interviews: &[Interview],
    refresh: bool,
) -> Result<Snapshot<Vec<KeywordGroup>>, AnalysisError> {
    if !refresh {
        if let Some(cached) = cache.load(CacheKind::Keywords, project_id).await? {
            info!(%project_id, "Using cached keywords");
            return Ok(cached);
        }
    }

    let transcript = combined_transcript(interviews);
    let keywords = extract_keywords(chat, &transcript).await?;

    let snapshot = Snapshot::now(keywords);
    cache
        .store(CacheKind::Keywords, project_id, &snapshot)
        .await?;

    Ok(snapshot)
}

/// Context entries for a project's themes: cached unless absent or `refresh`
pub async fn context_for_project(
    search: &dyn SearchApi,
    cache: &AnalysisCache,
    project_id: &str,
    themes: &[Theme],
    refresh: bool,
) -> Result<Snapshot<Vec<ContextEntry>>, AnalysisError> {
    if !refresh {
        if let Some(cached) = cache.load(CacheKind::Context, project_id).await? {
            info!(%project_id, "Using cached context");
            return Ok(cached);
        }
    }

    let entries = fetch_context(search, themes).await;

    let snapshot = Snapshot::now(entries);
    cache
        .store(CacheKind::Context, project_id, &snapshot)
        .await?;

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn interview(id: &str, transcript: &str) -> Interview {
        Interview {
            id: id.to_string(),
            project_id: "p-1".to_string(),
            title: format!("Interview {}", id),
            transcript: transcript.to_string(),
            keywords: String::new(),
            date_time: Utc::now(),
            audio_file_id: format!("file-{}", id),
        }
    }

    #[test]
    fn test_combined_transcript_skips_empty() {
        let interviews = vec![
            interview("1", "First story."),
            interview("2", ""),
            interview("3", "Third story."),
        ];

        assert_eq!(
            combined_transcript(&interviews),
            "First story.\n\nThird story."
        );
    }

    #[test]
    fn test_extract_json_payload_fenced() {
        let content = "Here are the themes:\n```json\n[{\"theme\": \"A\"}]\n```\nDone.";
        let payload = extract_json_payload(content).unwrap();
        assert_eq!(payload, "[{\"theme\": \"A\"}]");
    }

    #[test]
    fn test_extract_json_payload_raw_array_fallback() {
        let content = "The analysis follows. [ {\"theme\": \"A\"} ] Hope that helps.";
        let payload = extract_json_payload(content).unwrap();
        assert_eq!(payload, "[ {\"theme\": \"A\"} ]");
    }

    #[test]
    fn test_extract_json_payload_missing() {
        let content = "I could not find any clear themes in this transcript.";
        assert!(matches!(
            extract_json_payload(content),
            Err(AnalysisError::MissingPayload)
        ));
    }

    #[test]
    fn test_parse_payload_malformed_json() {
        let content = "```json\n[{\"theme\": }]\n```";
        let result: Result<Vec<Theme>, _> = parse_payload(content);
        assert!(matches!(result, Err(AnalysisError::MalformedJson(_))));
    }

    #[test]
    fn test_resolve_context_prefers_answer() {
        let text = resolve_context_text(SearchAnswer {
            answer: Some("  A synthesized answer. ".to_string()),
            top_result: Some("ignored".to_string()),
        });
        assert_eq!(text, "A synthesized answer.");
    }

    #[test]
    fn test_resolve_context_truncates_fallback() {
        let long = "x".repeat(1000);
        let text = resolve_context_text(SearchAnswer {
            answer: None,
            top_result: Some(long),
        });
        assert_eq!(text.chars().count(), CONTEXT_SNIPPET_CHARS + 1);
        assert!(text.ends_with('…'));
    }

    #[test]
    fn test_resolve_context_placeholder() {
        let text = resolve_context_text(SearchAnswer::default());
        assert_eq!(text, NO_CONTEXT_FOUND);
    }

    #[test]
    fn test_prompts_embed_transcript() {
        let prompt = themes_prompt("the transcript body");
        assert!(prompt.contains("the transcript body"));
        assert!(prompt.contains("JSON array"));

        let prompt = keywords_prompt("the transcript body");
        assert!(prompt.contains("the transcript body"));
        assert!(prompt.contains("category"));
    }
}
