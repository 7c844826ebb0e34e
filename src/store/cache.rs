//! Per-project analysis cache in local JSON files.
//!
//! One file per project and analysis kind (`insights-{project}.json`,
//! `keywords-{project}.json`, `context-{project}.json`), each holding the
//! most recent result plus the time it was computed. A refresh overwrites
//! the file unconditionally; there is no history, no merging, and no
//! cross-process locking; concurrent writers are last-write-wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Which analysis a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Extracted themes
    Insights,
    /// Keyword groups
    Keywords,
    /// Per-theme background context
    Context,
}

impl CacheKind {
    /// File-name prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Insights => "insights",
            Self::Keywords => "keywords",
            Self::Context => "context",
        }
    }
}

/// A cached value with its computation timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub value: T,
    pub analyzed_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    /// Wrap a value with the current timestamp
    pub fn now(value: T) -> Self {
        Self {
            value,
            analyzed_at: Utc::now(),
        }
    }
}

/// File-backed analysis cache
pub struct AnalysisCache {
    dir: PathBuf,
}

impl AnalysisCache {
    /// Create a cache rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open the cache in the configured location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::config()?.cache_dir()))
    }

    /// Path of the cache file for a project and kind
    pub fn entry_path(&self, kind: CacheKind, project_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", kind.prefix(), project_id))
    }

    /// Load a cached snapshot, or None when nothing was cached yet
    pub async fn load<T: DeserializeOwned>(
        &self,
        kind: CacheKind,
        project_id: &str,
    ) -> Result<Option<Snapshot<T>>> {
        let path = self.entry_path(kind, project_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read cache entry: {}", path.display()))?;

        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache entry: {}", path.display()))?;

        Ok(Some(snapshot))
    }

    /// Store a snapshot, replacing any previous value
    pub async fn store<T: Serialize>(
        &self,
        kind: CacheKind,
        project_id: &str,
        snapshot: &Snapshot<T>,
    ) -> Result<()> {
        let path = self.entry_path(kind, project_id);
        write_json(&path, snapshot).await
    }

    /// Drop a cache entry; returns whether anything was removed
    pub async fn clear(&self, kind: CacheKind, project_id: &str) -> Result<bool> {
        let path = self.entry_path(kind, project_id);

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove cache entry: {}", path.display()))?;

        Ok(true)
    }
}

/// Write a value as pretty JSON, creating parent directories as needed
pub(crate) async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Theme;
    use tempfile::TempDir;

    fn test_cache() -> (AnalysisCache, TempDir) {
        let temp = TempDir::new().unwrap();
        (AnalysisCache::new(temp.path()), temp)
    }

    #[tokio::test]
    async fn test_load_missing_entry() {
        let (cache, _temp) = test_cache();

        let loaded: Option<Snapshot<Vec<Theme>>> =
            cache.load(CacheKind::Insights, "p-1").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let (cache, _temp) = test_cache();

        let themes = vec![Theme {
            theme: "Migration".to_string(),
            subpoints: vec!["seasonal work".to_string()],
        }];
        let snapshot = Snapshot::now(themes);

        cache
            .store(CacheKind::Insights, "p-1", &snapshot)
            .await
            .unwrap();

        let loaded: Snapshot<Vec<Theme>> = cache
            .load(CacheKind::Insights, "p-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.value.len(), 1);
        assert_eq!(loaded.value[0].theme, "Migration");
    }

    #[tokio::test]
    async fn test_store_replaces_previous_value() {
        let (cache, _temp) = test_cache();

        let first = Snapshot::now(vec![Theme {
            theme: "Old".to_string(),
            subpoints: vec![],
        }]);
        cache
            .store(CacheKind::Insights, "p-1", &first)
            .await
            .unwrap();

        let second = Snapshot::now(vec![
            Theme {
                theme: "New A".to_string(),
                subpoints: vec![],
            },
            Theme {
                theme: "New B".to_string(),
                subpoints: vec![],
            },
        ]);
        cache
            .store(CacheKind::Insights, "p-1", &second)
            .await
            .unwrap();

        // Replaced, not merged
        let loaded: Snapshot<Vec<Theme>> = cache
            .load(CacheKind::Insights, "p-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.value.len(), 2);
        assert_eq!(loaded.value[0].theme, "New A");
        assert_eq!(loaded.analyzed_at, second.analyzed_at);
    }

    #[tokio::test]
    async fn test_kinds_are_independent() {
        let (cache, _temp) = test_cache();

        let themes = Snapshot::now(vec![Theme {
            theme: "T".to_string(),
            subpoints: vec![],
        }]);
        cache
            .store(CacheKind::Insights, "p-1", &themes)
            .await
            .unwrap();

        let keywords: Option<Snapshot<Vec<Theme>>> =
            cache.load(CacheKind::Keywords, "p-1").await.unwrap();
        assert!(keywords.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let (cache, _temp) = test_cache();

        let themes = Snapshot::now(vec![Theme {
            theme: "T".to_string(),
            subpoints: vec![],
        }]);
        cache
            .store(CacheKind::Insights, "p-1", &themes)
            .await
            .unwrap();

        assert!(cache.clear(CacheKind::Insights, "p-1").await.unwrap());
        assert!(!cache.clear(CacheKind::Insights, "p-1").await.unwrap());

        let loaded: Option<Snapshot<Vec<Theme>>> =
            cache.load(CacheKind::Insights, "p-1").await.unwrap();
        assert!(loaded.is_none());
    }
}
