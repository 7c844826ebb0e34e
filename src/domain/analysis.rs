//! Analysis results derived from interview transcripts.
//!
//! These mirror the JSON shapes the model is prompted to return, so they
//! deserialize straight from the extracted payload.

use serde::{Deserialize, Serialize};

/// A theme extracted from the combined transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Theme title
    pub theme: String,

    /// Supporting subpoints
    #[serde(default)]
    pub subpoints: Vec<String>,
}

/// Keywords grouped under a thematic category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordGroup {
    /// Category name (e.g. Economy, Environment, Gender)
    pub category: String,

    /// Keywords in this category
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

/// A single keyword with its grounding quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,

    /// Short explanation of why the term matters
    #[serde(default)]
    pub description: String,

    /// Exact excerpt from the interview
    #[serde(default)]
    pub quote: String,
}

/// Background context fetched for one theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// The theme the context was fetched for
    pub theme: String,

    /// Resolved context text (or a fixed placeholder on failure)
    pub context: String,
}
