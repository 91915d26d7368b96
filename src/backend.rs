use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::models::{FrontendSettings, HistoryRow};

/// Client for the chat backend's REST endpoints.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn submit_feedback(&self, message_id: &str, feedback: &str) -> Result<()> {
        #[derive(Serialize)]
        struct FeedbackReq<'a> {
            message_id: &'a str,
            message_feedback: &'a str,
        }

        if feedback.trim().is_empty() {
            anyhow::bail!("refusing to submit empty feedback for message {message_id}");
        }

        let url = format!("{}/history/message_feedback", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&FeedbackReq {
                message_id,
                message_feedback: feedback,
            })
            .send()
            .await
            .context("failed to call message feedback endpoint")?;

        ensure_ok(response, "/history/message_feedback").await?;
        Ok(())
    }

    pub async fn history_rows(&self) -> Result<Vec<HistoryRow>> {
        let url = format!("{}/history_data", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call history data endpoint")?;

        ensure_ok(response, "/history_data")
            .await?
            .json::<Vec<HistoryRow>>()
            .await
            .context("failed to decode /history_data response")
    }

    pub async fn frontend_settings(&self) -> Result<FrontendSettings> {
        let url = format!("{}/frontend_settings", self.base_url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("failed to call frontend settings endpoint")?;

        ensure_ok(response, "/frontend_settings")
            .await?
            .json::<FrontendSettings>()
            .await
            .context("failed to decode /frontend_settings response")
    }
}

async fn ensure_ok(response: Response, endpoint: &str) -> Result<Response> {
    if response.status() == StatusCode::OK {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("backend {endpoint} returned {status}: {}", normalize_err_body(&body))
}

fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}
