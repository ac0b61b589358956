//! Typed HTTP client for the external ToxicoGPT backend API.
//!
//! The backend owns retrieval, model inference, and persistence; this
//! client is a thin wrapper that speaks its JSON endpoints: chat, session
//! history, health, and the admin log/stat/search surface.

use crate::models::{
    ChatLog, ChatRequest, ChatResponse, HealthStatus, HistoryResponse, SessionHistory,
    SessionStats, SessionSummary, StatsOverview,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Request timeout. Chat calls wait on model inference, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read a JSON body, folding HTTP errors and decode errors into one
    /// caller-facing message.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, String> {
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("Backend returned {}: {}", status, detail));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| format!("Malformed backend response: {}", e))
    }

    // ========================================================================
    // Chat Endpoints
    // ========================================================================

    /// POST /api/chat — send a question, get the assistant reply with
    /// evidence. `user_mode` defaults to "patient" when not given.
    pub async fn send_message(
        &self,
        message: &str,
        session_id: Option<&str>,
        user_mode: Option<&str>,
    ) -> Result<ChatResponse, String> {
        let request = ChatRequest {
            message: message.to_string(),
            session_id: session_id.map(|s| s.to_string()),
            user_mode: Some(user_mode.unwrap_or("patient").to_string()),
        };

        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Chat request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/history/{session_id} — logged Q/A pairs for a session.
    pub async fn chat_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<HistoryResponse, String> {
        let path = format!("/api/history/{}", urlencoding::encode(session_id));
        let response = self
            .client
            .get(self.endpoint(&path))
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| format!("History request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/session/{session_id}/stats
    pub async fn session_stats(&self, session_id: &str) -> Result<SessionStats, String> {
        let path = format!("/api/session/{}/stats", urlencoding::encode(session_id));
        let response = self
            .client
            .get(self.endpoint(&path))
            .send()
            .await
            .map_err(|e| format!("Session stats request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthStatus, String> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .send()
            .await
            .map_err(|e| format!("Health check failed: {}", e))?;

        Self::read_json(response).await
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    /// GET /api/admin/logs — paged log listing.
    pub async fn all_logs(&self, limit: usize, offset: usize) -> Result<Vec<ChatLog>, String> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/logs"))
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await
            .map_err(|e| format!("Log request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/admin/logs/recent — logs from the last `hours` hours.
    pub async fn recent_logs(&self, hours: u32, limit: usize) -> Result<Vec<ChatLog>, String> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/logs/recent"))
            .query(&[("hours", hours.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| format!("Recent log request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/admin/search — full-text search over questions and answers.
    pub async fn search_logs(&self, query: &str, limit: usize) -> Result<Vec<ChatLog>, String> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/search"))
            .query(&[("query", query.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| format!("Search request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/admin/stats/overview
    pub async fn stats_overview(&self) -> Result<StatsOverview, String> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/stats/overview"))
            .send()
            .await
            .map_err(|e| format!("Stats request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/admin/sessions — session listing for the dashboard.
    pub async fn sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, String> {
        let response = self
            .client
            .get(self.endpoint("/api/admin/sessions"))
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| format!("Session list request failed: {}", e))?;

        Self::read_json(response).await
    }

    /// GET /api/admin/sessions/{session_id}/history — full conversation
    /// replay, role-tagged with evidence and provenance intact.
    pub async fn session_history(&self, session_id: &str) -> Result<SessionHistory, String> {
        let path = format!(
            "/api/admin/sessions/{}/history",
            urlencoding::encode(session_id)
        );
        let response = self
            .client
            .get(self.endpoint(&path))
            .send()
            .await
            .map_err(|e| format!("Session history request failed: {}", e))?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint("/api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn test_chat_response_deserializes_minimal_payload() {
        let json = r#"{"answer": "ok", "session_id": "abc"}"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.answer, "ok");
        assert!(response.evidence.is_empty());
        assert!(response.consumer_summary.is_none());
    }

    #[test]
    fn test_chat_response_deserializes_evidence() {
        let json = r#"{
            "answer": "See evidence [1].",
            "session_id": "abc",
            "model_used": "deepseek",
            "response_time_ms": 420,
            "consumer_summary": "Short version.",
            "evidence": [{
                "id": 1,
                "drug_name": "Aspirin",
                "summary": "Platelet inhibition.",
                "references": [{"id": 9, "title": "Label", "url": "https://fda.gov/x"}]
            }],
            "provenance": {"source": "db", "evidence_ids": [1]}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.evidence.len(), 1);
        assert_eq!(response.evidence[0].references[0].url, "https://fda.gov/x");
        assert_eq!(response.provenance.unwrap().evidence_ids, vec![1]);
    }
}
