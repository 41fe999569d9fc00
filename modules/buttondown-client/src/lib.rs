pub mod error;
pub mod types;

pub use error::{ButtondownError, Result};
pub use types::{CreateEmailInput, Email};

use std::collections::HashMap;

const BASE_URL: &str = "https://api.buttondown.email/v1";

pub struct ButtondownClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl ButtondownClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Create a draft email. Returns the created email's id so the caller
    /// can record it alongside the digest.
    pub async fn create_draft(
        &self,
        subject: &str,
        body: &str,
        tags: Vec<String>,
        metadata: HashMap<String, String>,
    ) -> Result<Email> {
        let input = CreateEmailInput {
            subject: subject.to_string(),
            body: body.to_string(),
            status: "draft".to_string(),
            tags,
            metadata,
        };

        let url = format!("{}/emails", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .json(&input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ButtondownError::from_status(status.as_u16(), body));
        }

        let email: Email = resp.json().await?;
        tracing::info!(email_id = %email.id, subject, "Buttondown draft created");
        Ok(email)
    }

    /// Fetch one email by id.
    pub async fn get_email(&self, id: &str) -> Result<Email> {
        let url = format!("{}/emails/{}", self.base_url, id);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ButtondownError::from_status(status.as_u16(), body));
        }

        Ok(resp.json().await?)
    }
}
