//! Persisted identity session.
//!
//! The session cookie captured at login is stored in a single JSON file so
//! successive CLI invocations act as the same signed-in user. Logging out
//! deletes the file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::cache::write_json;

/// A stored session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// The signed-in user's id
    pub user_id: String,

    /// Cookie string replayed on backend requests
    pub cookie: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,
}

/// File-backed session storage
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store at the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the store in the configured location
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::config()?.session_path()))
    }

    /// Load the saved session, or None when signed out
    pub async fn load(&self) -> Result<Option<SessionToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read session: {}", self.path.display()))?;

        let token = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session: {}", self.path.display()))?;

        Ok(Some(token))
    }

    /// Persist a session token
    pub async fn save(&self, token: &SessionToken) -> Result<()> {
        write_json(&self.path, token).await?;

        // Keep the cookie private on unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .await
                .with_context(|| format!("Failed to restrict session: {}", self.path.display()))?;
        }

        Ok(())
    }

    /// Remove the saved session; returns whether anything was removed
    pub async fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        fs::remove_file(&self.path)
            .await
            .with_context(|| format!("Failed to remove session: {}", self.path.display()))?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_clear() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path().join("session.json"));

        assert!(store.load().await.unwrap().is_none());

        let token = SessionToken {
            user_id: "user-1".to_string(),
            cookie: "a_session_proj=secret".to_string(),
            created_at: Utc::now(),
        };
        store.save(&token).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.cookie, "a_session_proj=secret");

        assert!(store.clear().await.unwrap());
        assert!(!store.clear().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }
}
