//! ToxicoGPT front-end library - re-exports for testing and external use.
//!
//! This module provides public access to all the application's modules
//! for testing purposes and potential library use.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

pub mod auth;
pub mod backend;
pub mod handlers;
pub mod models;
pub mod references;
pub mod templates;
pub mod url_validator;

// ============================================================================
// Configuration
// ============================================================================

/// Backend API base URL override.
pub const BACKEND_URL_VAR: &str = "TOXICOGPT_API_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Public URL of this server, baked into the embeddable widget script.
pub const PUBLIC_URL_VAR: &str = "TOXICOGPT_PUBLIC_URL";
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:3000";

pub const BIND_ADDR: &str = "127.0.0.1:3000";

pub fn backend_url() -> String {
    std::env::var(BACKEND_URL_VAR).unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
}

pub fn public_url() -> String {
    std::env::var(PUBLIC_URL_VAR).unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string())
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Tracks login failures for rate limiting with exponential backoff.
pub struct LoginRateLimit {
    pub failures: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LoginRateLimit {
    pub fn new() -> Self {
        Self {
            failures: 0,
            locked_until: None,
        }
    }

    /// Check if login attempts are currently locked out.
    pub fn is_locked(&self) -> bool {
        if let Some(until) = self.locked_until {
            Utc::now() < until
        } else {
            false
        }
    }

    /// Record a failed login attempt. After 5 failures, apply exponential backoff capped at 64s.
    pub fn record_failure(&mut self) {
        self.failures += 1;
        if self.failures >= 5 {
            let delay_secs = std::cmp::min(1i64 << (self.failures - 5), 64);
            self.locked_until = Some(Utc::now() + chrono::Duration::seconds(delay_secs));
        }
    }

    /// Reset on successful login.
    pub fn reset(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }
}

impl Default for LoginRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub api: backend::ApiClient,
    pub login_rate_limit: Arc<Mutex<LoginRateLimit>>,
}

impl AppState {
    pub fn new() -> Result<Self, String> {
        let base_url = backend_url();
        url_validator::validate_backend_url(&base_url)
            .map_err(|e| format!("Invalid backend URL {}: {}", base_url, e))?;

        let api = backend::ApiClient::new(&base_url)?;

        Ok(Self {
            api,
            login_rate_limit: Arc::new(Mutex::new(LoginRateLimit::new())),
        })
    }
}

// Re-export commonly used types
pub use backend::ApiClient;

pub use models::{
    ChatLog, ChatMessage, ChatRequest, ChatResponse, CitationParts, DailyCount, DisplayReference,
    EvidenceItem, GeoData, HealthStatus, HistoryResponse, LogMetadata, ParsedReference,
    Provenance, Role, SessionHistory, SessionStats, SessionSummary, SourceReference,
    StatsOverview, ViewMode,
};

pub use references::{
    assemble_references, evidence_references, parse_reference_block, remove_references_section,
    scan_citations, split_paragraphs, strip_markdown, DecomposeCitation, HeuristicDecomposer,
    NO_LINK,
};

pub use auth::{
    create_session, is_auth_enabled, is_logged_in, verify_password, verify_session,
    ADMIN_PASSWORD_VAR, SESSION_COOKIE, SESSION_TTL_HOURS,
};

pub use templates::{base_html, chat_page, html_escape, js_escape, render_message, widget_js, STYLE};

pub use url_validator::{safe_href, validate_backend_url, validate_link, UrlValidationError};
