//! Analysis and cache integration tests.
//!
//! Scripted chat/search fakes drive the cache contract: results are
//! memoized per project, refresh replaces the cached value wholesale, and a
//! failed run (parse failure included) leaves the previous cache untouched.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use fieldstudy::adapters::{ChatApi, SearchAnswer, SearchApi};
use fieldstudy::core::analysis::{
    context_for_project, keywords_for_project, themes_for_project,
};
use fieldstudy::core::AnalysisError;
use fieldstudy::domain::{Interview, KeywordGroup, Theme};
use fieldstudy::store::{AnalysisCache, CacheKind, Snapshot};

/// Chat fake replaying scripted responses
struct FakeChat {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl FakeChat {
    fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no more scripted responses"))
    }
}

/// Search fake replaying scripted answers (an Err entry fails that call)
struct FakeSearch {
    answers: Mutex<VecDeque<Result<SearchAnswer, String>>>,
}

impl FakeSearch {
    fn with_answers(answers: Vec<Result<SearchAnswer, String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
        }
    }
}

#[async_trait]
impl SearchApi for FakeSearch {
    async fn search(&self, _query: &str) -> Result<SearchAnswer> {
        match self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("no more scripted answers")
        {
            Ok(answer) => Ok(answer),
            Err(message) => anyhow::bail!(message),
        }
    }
}

fn interview(transcript: &str) -> Interview {
    Interview {
        id: "int-1".to_string(),
        project_id: "p-1".to_string(),
        title: "Interview".to_string(),
        transcript: transcript.to_string(),
        keywords: String::new(),
        date_time: Utc::now(),
        audio_file_id: "file-1".to_string(),
    }
}

const THEMES_A: &str =
    "```json\n[{\"theme\": \"Migration\", \"subpoints\": [\"seasonal work\"]}]\n```";
const THEMES_B: &str = "```json\n[{\"theme\": \"Housing\"}, {\"theme\": \"Income\"}]\n```";

#[tokio::test]
async fn test_first_run_populates_cache() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());
    let chat = FakeChat::with_responses(vec![THEMES_A]);
    let interviews = vec![interview("We moved for seasonal work.")];

    let snapshot = themes_for_project(&chat, &cache, "p-1", &interviews, false)
        .await
        .unwrap();

    assert_eq!(snapshot.value.len(), 1);
    assert_eq!(snapshot.value[0].theme, "Migration");

    let cached: Snapshot<Vec<Theme>> = cache
        .load(CacheKind::Insights, "p-1")
        .await
        .unwrap()
        .expect("cache should be populated");
    assert_eq!(cached.value[0].theme, "Migration");
}

#[tokio::test]
async fn test_cached_value_skips_model_call() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());
    let chat = FakeChat::with_responses(vec![THEMES_A]);
    let interviews = vec![interview("transcript")];

    themes_for_project(&chat, &cache, "p-1", &interviews, false)
        .await
        .unwrap();
    themes_for_project(&chat, &cache, "p-1", &interviews, false)
        .await
        .unwrap();

    // Second call was served from the cache
    assert_eq!(chat.calls(), 1);
}

#[tokio::test]
async fn test_refresh_replaces_cached_value() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());
    let chat = FakeChat::with_responses(vec![THEMES_A, THEMES_B]);
    let interviews = vec![interview("transcript")];

    let first = themes_for_project(&chat, &cache, "p-1", &interviews, false)
        .await
        .unwrap();
    let second = themes_for_project(&chat, &cache, "p-1", &interviews, true)
        .await
        .unwrap();

    assert_eq!(chat.calls(), 2);
    assert!(second.analyzed_at >= first.analyzed_at);

    // Replaced wholesale, not merged
    let cached: Snapshot<Vec<Theme>> = cache
        .load(CacheKind::Insights, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.value.len(), 2);
    assert_eq!(cached.value[0].theme, "Housing");
    assert_eq!(cached.analyzed_at, second.analyzed_at);
}

#[tokio::test]
async fn test_parse_failure_leaves_cache_untouched() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());

    let keywords_ok = "```json\n[{\"category\": \"Economy\", \"keywords\": \
        [{\"term\": \"remittances\", \"description\": \"d\", \"quote\": \"q\"}]}]\n```";
    // Neither a fenced block nor a bracketed object array
    let keywords_bad = "I could not identify any keywords worth reporting.";

    let chat = FakeChat::with_responses(vec![keywords_ok, keywords_bad]);
    let interviews = vec![interview("transcript")];

    let first = keywords_for_project(&chat, &cache, "p-1", &interviews, false)
        .await
        .unwrap();
    assert_eq!(first.value[0].category, "Economy");

    let result = keywords_for_project(&chat, &cache, "p-1", &interviews, true).await;
    assert!(matches!(result, Err(AnalysisError::MissingPayload)));

    // The earlier result survives until the next successful run
    let cached: Snapshot<Vec<KeywordGroup>> = cache
        .load(CacheKind::Keywords, "p-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.value[0].category, "Economy");
    assert_eq!(cached.analyzed_at, first.analyzed_at);
}

#[tokio::test]
async fn test_empty_transcripts_fail_without_model_call() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());
    let chat = FakeChat::with_responses(vec![]);
    let interviews = vec![interview("")];

    let result = themes_for_project(&chat, &cache, "p-1", &interviews, false).await;
    assert!(matches!(result, Err(AnalysisError::EmptyTranscript)));
    assert_eq!(chat.calls(), 0);
}

#[tokio::test]
async fn test_context_prefers_answer_and_degrades_per_theme() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());

    let themes = vec![
        Theme {
            theme: "Migration".to_string(),
            subpoints: vec![],
        },
        Theme {
            theme: "Housing".to_string(),
            subpoints: vec![],
        },
        Theme {
            theme: "Income".to_string(),
            subpoints: vec![],
        },
    ];

    let search = FakeSearch::with_answers(vec![
        Ok(SearchAnswer {
            answer: Some("Migration is movement of people.".to_string()),
            top_result: None,
        }),
        // No answer: fall back to the top result
        Ok(SearchAnswer {
            answer: None,
            top_result: Some("Housing refers to...".to_string()),
        }),
        // Provider failure: that theme degrades, the batch continues
        Err("search quota exhausted".to_string()),
    ]);

    let snapshot = context_for_project(&search, &cache, "p-1", &themes, false)
        .await
        .unwrap();

    assert_eq!(snapshot.value.len(), 3);
    assert_eq!(snapshot.value[0].context, "Migration is movement of people.");
    assert!(snapshot.value[1].context.starts_with("Housing refers to"));
    assert_eq!(snapshot.value[2].context, "Error fetching context.");
}

#[tokio::test]
async fn test_context_refresh_replaces_cache() {
    let temp = TempDir::new().unwrap();
    let cache = AnalysisCache::new(temp.path());

    let themes = vec![Theme {
        theme: "Migration".to_string(),
        subpoints: vec![],
    }];

    let search = FakeSearch::with_answers(vec![
        Ok(SearchAnswer {
            answer: Some("old context".to_string()),
            top_result: None,
        }),
        Ok(SearchAnswer {
            answer: Some("new context".to_string()),
            top_result: None,
        }),
    ]);

    context_for_project(&search, &cache, "p-1", &themes, false)
        .await
        .unwrap();
    let refreshed = context_for_project(&search, &cache, "p-1", &themes, true)
        .await
        .unwrap();

    assert_eq!(refreshed.value[0].context, "new context");
}
