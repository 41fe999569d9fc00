use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request body for creating an email. Drafts are created with
/// `status: "draft"` and published later from the dashboard or API.
#[derive(Debug, Clone, Serialize)]
pub struct CreateEmailInput {
    pub subject: String,
    pub body: String,
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// One email as Buttondown returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Email {
    pub id: String,
    pub subject: String,
    pub status: String,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub absolute_url: Option<String>,
}
