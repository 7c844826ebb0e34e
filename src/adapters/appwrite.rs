//! Appwrite-compatible backend client.
//!
//! Covers the three hosted services the workflow delegates to: identity
//! (accounts + email/password sessions), the document database (projects and
//! interviews collections), and object storage (one audio bucket). Requests
//! authenticate client-side with the session cookie captured at login, the
//! same way the hosted web SDK does.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::domain::{Interview, InterviewDraft, Project};

use super::{FileStore, InterviewStore};

/// Client for the hosted backend
pub struct AppwriteClient {
    endpoint: String,
    project_id: String,
    database_id: String,
    projects_collection: String,
    interviews_collection: String,
    bucket_id: String,
    /// Session cookie captured at login (absent for anonymous calls)
    session_cookie: Option<String>,
    client: reqwest::Client,
}

/// A freshly created session: the signed-in user plus the cookie to replay
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub cookie: String,
}

/// Account details returned by the identity service
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(rename = "emailVerification", default)]
    pub email_verified: bool,
}

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: u32,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DocumentList<T> {
    documents: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ProjectDoc {
    #[serde(rename = "$id")]
    id: String,
    name: String,
}

impl From<ProjectDoc> for Project {
    fn from(doc: ProjectDoc) -> Self {
        Self {
            id: doc.id,
            name: doc.name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InterviewDoc {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "projectId")]
    project_id: String,
    title: String,
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    keywords: String,
    #[serde(rename = "dateTime")]
    date_time: DateTime<Utc>,
    #[serde(rename = "audioFileId")]
    audio_file_id: String,
}

impl From<InterviewDoc> for Interview {
    fn from(doc: InterviewDoc) -> Self {
        Self {
            id: doc.id,
            project_id: doc.project_id,
            title: doc.title,
            transcript: doc.transcript,
            keywords: doc.keywords,
            date_time: doc.date_time,
            audio_file_id: doc.audio_file_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileDoc {
    #[serde(rename = "$id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct SessionDoc {
    #[serde(rename = "userId")]
    user_id: String,
}

impl AppwriteClient {
    /// Create a client from backend settings and an optional session cookie
    pub fn new(backend: &BackendConfig, session_cookie: Option<String>) -> Self {
        Self {
            endpoint: backend.endpoint.trim_end_matches('/').to_string(),
            project_id: backend.project_id.clone(),
            database_id: backend.database_id.clone(),
            projects_collection: backend.projects_collection_id.clone(),
            interviews_collection: backend.interviews_collection_id.clone(),
            bucket_id: backend.bucket_id.clone(),
            session_cookie,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header("X-Appwrite-Project", &self.project_id);

        if let Some(ref cookie) = self.session_cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        builder
    }

    /// Turn a non-success response into a readable error
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(err) => anyhow::bail!("Backend error {} ({}): {}", err.code, err.kind, err.message),
            Err(_) => anyhow::bail!("Backend returned HTTP {}: {}", status, body.trim()),
        }
    }

    // ------------------------------------------------------------------
    // Identity / session
    // ------------------------------------------------------------------

    /// Create an account (email verification is confirmed separately)
    pub async fn create_account(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let response = self
            .request(Method::POST, "/account")
            .json(&serde_json::json!({
                "userId": "unique()",
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await
            .context("Failed to reach identity service")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse account response")
    }

    /// Create an email/password session, capturing the session cookie
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .request(Method::POST, "/account/sessions/email")
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .context("Failed to reach identity service")?;

        let response = Self::check(response).await?;

        let cookie = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ");

        if cookie.is_empty() {
            anyhow::bail!("Login succeeded but no session cookie was returned");
        }

        let session: SessionDoc = response
            .json()
            .await
            .context("Failed to parse session response")?;

        Ok(AuthSession {
            user_id: session.user_id,
            cookie,
        })
    }

    /// Fetch the currently signed-in user
    pub async fn current_user(&self) -> Result<User> {
        let response = self
            .request(Method::GET, "/account")
            .send()
            .await
            .context("Failed to reach identity service")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse account response")
    }

    /// Delete the current session (sign out)
    pub async fn logout(&self) -> Result<()> {
        let response = self
            .request(Method::DELETE, "/account/sessions/current")
            .send()
            .await
            .context("Failed to reach identity service")?;

        Self::check(response).await?;
        Ok(())
    }

    /// Confirm email verification from the emailed token pair
    pub async fn confirm_verification(&self, user_id: &str, secret: &str) -> Result<()> {
        let response = self
            .request(Method::PUT, "/account/verification")
            .json(&serde_json::json!({
                "userId": user_id,
                "secret": secret,
            }))
            .send()
            .await
            .context("Failed to reach identity service")?;

        Self::check(response).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Projects collection
    // ------------------------------------------------------------------

    fn documents_path(&self, collection: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.database_id, collection
        )
    }

    fn document_path(&self, collection: &str, document_id: &str) -> String {
        format!("{}/{}", self.documents_path(collection), document_id)
    }

    /// Create a project document
    pub async fn create_project(&self, name: &str) -> Result<Project> {
        let path = self.documents_path(&self.projects_collection);
        let response = self
            .request(Method::POST, &path)
            .json(&serde_json::json!({
                "documentId": "unique()",
                "data": { "name": name },
            }))
            .send()
            .await
            .context("Failed to reach document database")?;

        let doc: ProjectDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse project document")?;

        Ok(doc.into())
    }

    /// List all projects visible to the session
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let path = self.documents_path(&self.projects_collection);
        let response = self
            .request(Method::GET, &path)
            .query(&[("queries[]", order_desc("$createdAt"))])
            .send()
            .await
            .context("Failed to reach document database")?;

        let list: DocumentList<ProjectDoc> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse project list")?;

        Ok(list.documents.into_iter().map(Into::into).collect())
    }

    /// Fetch one project by id
    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        let path = self.document_path(&self.projects_collection, project_id);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .context("Failed to reach document database")?;

        let doc: ProjectDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse project document")?;

        Ok(doc.into())
    }

    /// Update a project's display name in place
    pub async fn rename_project(&self, project_id: &str, name: &str) -> Result<Project> {
        let path = self.document_path(&self.projects_collection, project_id);
        let response = self
            .request(Method::PATCH, &path)
            .json(&serde_json::json!({
                "data": { "name": name },
            }))
            .send()
            .await
            .context("Failed to reach document database")?;

        let doc: ProjectDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse project document")?;

        Ok(doc.into())
    }

    /// Delete a project document. Interviews are not cascaded.
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        let path = self.document_path(&self.projects_collection, project_id);
        let response = self
            .request(Method::DELETE, &path)
            .send()
            .await
            .context("Failed to reach document database")?;

        Self::check(response).await?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Interviews collection
// ----------------------------------------------------------------------

#[async_trait]
impl InterviewStore for AppwriteClient {
    async fn create_interview(&self, draft: &InterviewDraft) -> Result<Interview> {
        let path = self.documents_path(&self.interviews_collection);
        let response = self
            .request(Method::POST, &path)
            .json(&serde_json::json!({
                "documentId": "unique()",
                "data": {
                    "projectId": draft.project_id,
                    "title": draft.title,
                    "transcript": draft.transcript,
                    "keywords": draft.keywords,
                    "dateTime": draft.date_time.to_rfc3339(),
                    "audioFileId": draft.audio_file_id,
                },
            }))
            .send()
            .await
            .context("Failed to reach document database")?;

        let doc: InterviewDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse interview document")?;

        Ok(doc.into())
    }

    async fn list_interviews(&self, project_id: &str) -> Result<Vec<Interview>> {
        let path = self.documents_path(&self.interviews_collection);
        let response = self
            .request(Method::GET, &path)
            .query(&[
                ("queries[]", equal("projectId", project_id)),
                ("queries[]", order_desc("$createdAt")),
            ])
            .send()
            .await
            .context("Failed to reach document database")?;

        let list: DocumentList<InterviewDoc> = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse interview list")?;

        Ok(list.documents.into_iter().map(Into::into).collect())
    }

    async fn get_interview(&self, interview_id: &str) -> Result<Interview> {
        let path = self.document_path(&self.interviews_collection, interview_id);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .context("Failed to reach document database")?;

        let doc: InterviewDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse interview document")?;

        Ok(doc.into())
    }

    async fn delete_interview(&self, interview_id: &str) -> Result<()> {
        let path = self.document_path(&self.interviews_collection, interview_id);
        let response = self
            .request(Method::DELETE, &path)
            .send()
            .await
            .context("Failed to reach document database")?;

        Self::check(response).await?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Object storage
// ----------------------------------------------------------------------

#[async_trait]
impl FileStore for AppwriteClient {
    async fn create_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let path = format!("/storage/buckets/{}/files", self.bucket_id);

        let file_part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .context("Invalid audio content type")?;

        let form = Form::new()
            .text("fileId", uuid::Uuid::new_v4().to_string())
            .part("file", file_part);

        let response = self
            .request(Method::POST, &path)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach object storage")?;

        let doc: FileDoc = Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse stored-file response")?;

        Ok(doc.id)
    }

    fn file_view_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        )
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let path = format!("/storage/buckets/{}/files/{}", self.bucket_id, file_id);
        let response = self
            .request(Method::DELETE, &path)
            .send()
            .await
            .context("Failed to reach object storage")?;

        Self::check(response).await?;
        Ok(())
    }
}

/// Equality filter in the backend's JSON query syntax
fn equal(attribute: &str, value: &str) -> String {
    serde_json::json!({
        "method": "equal",
        "attribute": attribute,
        "values": [value],
    })
    .to_string()
}

/// Descending order in the backend's JSON query syntax
fn order_desc(attribute: &str) -> String {
    serde_json::json!({
        "method": "orderDesc",
        "attribute": attribute,
    })
    .to_string()
}
