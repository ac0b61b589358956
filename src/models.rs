//! Data models for the ToxicoGPT front-end.
//!
//! This module contains the wire payloads exchanged with the external
//! backend API (chat, history, health, admin endpoints) and the
//! render-time entities produced by the reference pipeline.

use serde::{Deserialize, Serialize};

// ============================================================================
// Chat Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a conversation. Immutable once created; the page shell owns
/// the ordered log and appends to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Optional simplified reply shown in the "Simple" view mode.
    #[serde(default, alias = "consumerSummary", skip_serializing_if = "Option::is_none")]
    pub consumer_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Which underlying text field feeds the normalizer when rendering an
/// assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Simple,
    Technical,
}

impl ViewMode {
    /// The message text this mode displays, if present.
    pub fn content<'a>(&self, message: &'a ChatMessage) -> Option<&'a str> {
        match self {
            ViewMode::Simple => message.consumer_summary.as_deref(),
            ViewMode::Technical => Some(message.content.as_str()),
        }
    }
}

// ============================================================================
// Evidence
// ============================================================================

/// Backend-supplied structured record describing a drug/topic and its
/// supporting sources. Read-only on this side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub drug_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SourceReference>,
}

/// A source citation attached to an evidence item. Either fully structured
/// (backend-produced) or synthesized from unstructured reference text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceReference {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unverified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
}

/// Backend tag indicating which evidence informed a consumer summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub source: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_ids: Vec<i64>,
}

// ============================================================================
// Reference Pipeline Entities
// ============================================================================

/// An entry parsed out of a trailing "References:" block in reply text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReference {
    pub number: u32,
    pub citation: String,
    pub parts: CitationParts,
}

/// Best-effort structured decomposition of a freeform citation string.
/// Any or all fields may be absent; misfires on atypical citation formats
/// are tolerated, not corrected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationParts {
    pub authors: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub year: Option<String>,
    pub url: Option<String>,
}

/// The final, sequentially renumbered entry shown in the reference list.
/// Recomputed on every render pass; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayReference {
    pub number: usize,
    pub title: String,
    /// A resolvable link, or the "no link" sentinel `"#"`.
    pub url: String,
    pub excerpt: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub year: Option<String>,
    pub citation: Option<String>,
    /// Backend flagged this source as not independently verified.
    pub unverified: bool,
}

// ============================================================================
// Backend API Payloads
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// "patient", "doctor", or "researcher".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub session_id: String,
    #[serde(default)]
    pub model_used: String,
    #[serde(default)]
    pub response_time_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<EvidenceItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// A logged question/answer pair as the admin endpoints return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    pub id: i64,
    pub session_id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub response_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_metadata: Option<LogMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_data: Option<GeoData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_used: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
}

impl GeoData {
    /// "City, Region, Country" with absent parts skipped; "Unknown" when
    /// nothing is available.
    pub fn location(&self) -> String {
        let parts: Vec<&str> = [&self.city, &self.region, &self.country]
            .iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            "Unknown".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    #[serde(default)]
    pub message_count: i64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub last_active: Option<String>,
}

/// One row in the admin sessions listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub message_count: Option<i64>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub last_active: Option<String>,
}

/// Full conversation for one session, as replayed by the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Logged question/answer pairs for one session, public-history flavor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    #[serde(default)]
    pub history: Vec<ChatLog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub model_server: String,
    #[serde(default)]
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsOverview {
    #[serde(default)]
    pub total_queries: i64,
    #[serde(default)]
    pub unique_sessions: i64,
    #[serde(default)]
    pub avg_response_time_ms: f64,
    #[serde(default)]
    pub daily_queries: Vec<DailyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}
