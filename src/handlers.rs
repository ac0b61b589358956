//! HTTP route handlers for the chat front-end.
//!
//! Three groups of routes:
//! - the public chat page and the JSON endpoints its script talks to
//!   (`/api/chat`, `/api/history/{id}`, `/api/health`), which proxy the
//!   external backend and return server-rendered message HTML;
//! - the session-protected admin dashboard (logs, stats, search, per-session
//!   conversation replay);
//! - the embeddable widget script.

use crate::auth::{
    create_session, is_auth_enabled, is_logged_in, verify_password, SESSION_COOKIE,
    SESSION_TTL_HOURS,
};
use crate::models::{ChatLog, ChatMessage, Role, SessionSummary, StatsOverview};
use crate::templates::{base_html, chat_page, html_escape, render_message, widget_js};
use crate::{public_url, AppState};
use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Chat Page
// ============================================================================

pub async fn index() -> Html<String> {
    Html(chat_page())
}

// ============================================================================
// Widget Script
// ============================================================================

pub async fn widget_script() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        "application/javascript; charset=utf-8".parse().expect("static header"),
    );
    (headers, widget_js(&public_url())).into_response()
}

// ============================================================================
// Chat API (proxied, server-rendered)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatPostBody {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RenderedChat {
    pub session_id: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct RenderedHistory {
    pub session_id: String,
    pub messages: Vec<RenderedMessage>,
}

/// POST /api/chat — forward the question to the backend, then render the
/// assistant reply (citations, references, view modes) to HTML.
pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatPostBody>,
) -> Response {
    let message = body.message.trim().to_string();
    if message.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Empty message" })))
            .into_response();
    }

    match state
        .api
        .send_message(&message, body.session_id.as_deref(), body.user_mode.as_deref())
        .await
    {
        Ok(response) => {
            let assistant = ChatMessage {
                role: Role::Assistant,
                content: response.answer,
                consumer_summary: response.consumer_summary,
                timestamp: Some(Utc::now().to_rfc3339()),
                evidence: response.evidence,
                provenance: response.provenance,
            };
            let html = render_message(&assistant);
            Json(RenderedChat {
                session_id: response.session_id,
                html,
            })
            .into_response()
        }
        Err(e) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": e }))).into_response(),
    }
}

/// GET /api/history/{session_id} — re-render a logged conversation through
/// the same pipeline as live replies. Prefers the full replay endpoint
/// (evidence and provenance intact); falls back to plain Q/A log pairs.
pub async fn api_history(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if let Ok(history) = state.api.session_history(&session_id).await {
        let messages = history
            .messages
            .iter()
            .map(|m| RenderedMessage {
                role: m.role,
                html: render_message(m),
            })
            .collect();
        return Json(RenderedHistory {
            session_id: history.session_id,
            messages,
        })
        .into_response();
    }

    match state.api.chat_history(&session_id, 50).await {
        Ok(history) => {
            let messages = history
                .history
                .iter()
                .flat_map(log_to_messages)
                .map(|m| RenderedMessage {
                    role: m.role,
                    html: render_message(&m),
                })
                .collect();
            Json(RenderedHistory {
                session_id: history.session_id,
                messages,
            })
            .into_response()
        }
        Err(e) => (StatusCode::BAD_GATEWAY, Json(json!({ "error": e }))).into_response(),
    }
}

/// A logged Q/A pair replayed as the two messages it came from.
fn log_to_messages(log: &ChatLog) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::User,
            content: log.question.clone(),
            consumer_summary: None,
            timestamp: Some(log.created_at.clone()),
            evidence: Vec::new(),
            provenance: None,
        },
        ChatMessage {
            role: Role::Assistant,
            content: log.answer.clone(),
            consumer_summary: None,
            timestamp: Some(log.created_at.clone()),
            evidence: Vec::new(),
            provenance: None,
        },
    ]
}

/// GET /api/health — backend reachability for the page's status badge.
/// Always 200; unreachable backends report their own status string.
pub async fn api_health(State(state): State<Arc<AppState>>) -> Response {
    match state.api.health().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => Json(json!({ "status": "unreachable", "detail": e })).into_response(),
    }
}

// ============================================================================
// Login Handlers
// ============================================================================

pub async fn login_page(jar: CookieJar) -> Response {
    if is_logged_in(&jar) {
        return Redirect::to("/admin").into_response();
    }

    Html(base_html("Login", LOGIN_FORM, false)).into_response()
}

const LOGIN_FORM: &str = r#"
    <div class="login-form">
        <h1>Admin Login</h1>
        <form method="POST" action="/login">
            <input type="password" name="password" placeholder="Password" autofocus required>
            <button type="submit" class="btn primary">Login</button>
        </form>
    </div>
"#;

#[derive(Deserialize)]
pub struct LoginForm {
    pub password: String,
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    if !is_auth_enabled() {
        let html = r#"<div class="message-box error">Authentication not configured. Set TOXICOGPT_ADMIN_PASSWORD to enable the admin dashboard.</div>"#;
        return Html(base_html("Error", html, false)).into_response();
    }

    {
        let limiter = state.login_rate_limit.lock().expect("rate limit lock");
        if limiter.is_locked() {
            let html = r#"<div class="message-box error">Too many failed attempts. Try again shortly.</div>"#;
            return Html(base_html("Login", html, false)).into_response();
        }
    }

    if !verify_password(&form.password) {
        state
            .login_rate_limit
            .lock()
            .expect("rate limit lock")
            .record_failure();
        let html = format!(
            r#"<div class="login-form"><div class="message-box error">Invalid password.</div>{}</div>"#,
            r#"<form method="POST" action="/login">
                <input type="password" name="password" placeholder="Password" autofocus required>
                <button type="submit" class="btn primary">Login</button>
            </form>"#
        );
        return Html(base_html("Login", &html, false)).into_response();
    }

    state
        .login_rate_limit
        .lock()
        .expect("rate limit lock")
        .reset();

    let session_token = match create_session() {
        Some(t) => t,
        None => {
            let html = r#"<div class="message-box error">Failed to create session.</div>"#;
            return Html(base_html("Error", html, false)).into_response();
        }
    };

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE,
        session_token,
        SESSION_TTL_HOURS * 3600
    );

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie.parse().expect("cookie header"));

    (headers, Redirect::to("/admin")).into_response()
}

pub async fn logout() -> Response {
    let cookie = format!("{}=; Path=/; HttpOnly; Secure; Max-Age=0", SESSION_COOKIE);

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie.parse().expect("cookie header"));

    (headers, Redirect::to("/")).into_response()
}

// ============================================================================
// Admin Dashboard
// ============================================================================

#[derive(Deserialize)]
pub struct AdminQuery {
    pub tab: Option<String>,
    pub q: Option<String>,
}

pub async fn admin(
    Query(query): Query<AdminQuery>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    if !is_auth_enabled() {
        let html = r#"<div class="message-box error">Admin dashboard disabled. Set TOXICOGPT_ADMIN_PASSWORD to enable it.</div>"#;
        return Html(base_html("Admin", html, false)).into_response();
    }
    if !is_logged_in(&jar) {
        return Redirect::to("/login").into_response();
    }

    let tab = query.tab.as_deref().unwrap_or("logs");
    let q = query.q.as_deref().unwrap_or("").trim().to_string();

    let content = match tab {
        "stats" => match state.api.stats_overview().await {
            Ok(stats) => render_stats(&stats),
            Err(e) => render_admin_error(&e),
        },
        "sessions" => match state.api.sessions(50).await {
            Ok(sessions) => render_sessions(&sessions),
            Err(e) => render_admin_error(&e),
        },
        _ => {
            let logs = if q.is_empty() {
                state.api.recent_logs(24, 100).await
            } else {
                state.api.search_logs(&q, 50).await
            };
            match logs {
                Ok(logs) => render_logs(&logs, &q),
                Err(e) => render_admin_error(&e),
            }
        }
    };

    let html = format!(
        r#"<h1>Admin Dashboard</h1>
        <p style="color: var(--muted); font-size: 0.85rem;">View and analyze chat interactions</p>
        <div class="admin-tabs">
            <a href="/admin?tab=logs" class="{logs_active}">Chat Logs</a>
            <a href="/admin?tab=sessions" class="{sessions_active}">Sessions</a>
            <a href="/admin?tab=stats" class="{stats_active}">Statistics</a>
        </div>
        {content}"#,
        logs_active = if tab == "stats" || tab == "sessions" { "" } else { "active" },
        sessions_active = if tab == "sessions" { "active" } else { "" },
        stats_active = if tab == "stats" { "active" } else { "" },
    );

    Html(base_html("Admin Dashboard - ToxicoGPT", &html, true)).into_response()
}

fn render_admin_error(error: &str) -> String {
    format!(
        r#"<div class="message-box error">Failed to load admin data: {}</div>"#,
        html_escape(error)
    )
}

fn render_stats(stats: &StatsOverview) -> String {
    let max_count = stats
        .daily_queries
        .iter()
        .map(|d| d.count)
        .max()
        .unwrap_or(0)
        .max(1);

    let mut bars = String::new();
    for day in &stats.daily_queries {
        let pct = (day.count * 100 / max_count).min(100);
        bars.push_str(&format!(
            r#"<div class="bar-row">
                <span class="date">{date}</span>
                <div class="bar-track"><div class="bar-fill" style="width: {pct}%">{count}</div></div>
            </div>"#,
            date = html_escape(&day.date),
            count = day.count,
        ));
    }

    format!(
        r#"<div class="stats-cards">
            <div class="stat-card"><div class="label">Total Queries</div><div class="value">{total}</div></div>
            <div class="stat-card"><div class="label">Unique Sessions</div><div class="value">{sessions}</div></div>
            <div class="stat-card"><div class="label">Avg Response Time</div><div class="value">{avg:.0}ms</div></div>
        </div>
        <h3>Daily Query Volume (Last 7 Days)</h3>
        {bars}"#,
        total = stats.total_queries,
        sessions = stats.unique_sessions,
        avg = stats.avg_response_time_ms,
    )
}

fn render_logs(logs: &[ChatLog], query: &str) -> String {
    let mut rows = String::new();

    if logs.is_empty() {
        rows.push_str(r#"<tr><td colspan="6" class="empty">No logs found</td></tr>"#);
    }

    for log in logs {
        let geo = log
            .extra_metadata
            .as_ref()
            .and_then(|m| m.geo_data.as_ref());
        let location = geo.map(|g| g.location()).unwrap_or_else(|| "Unknown".to_string());
        let timezone = geo
            .and_then(|g| g.timezone.as_deref())
            .map(|tz| format!(r#"<div style="font-size: 0.65rem; color: var(--faint);">{}</div>"#, html_escape(tz)))
            .unwrap_or_default();
        let response_time = log
            .response_time_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());

        rows.push_str(&format!(
            r#"<tr>
                <td>{created}</td>
                <td>&#128205; {location}{timezone}</td>
                <td class="mono">{ip}</td>
                <td class="clip" title="{question_full}">{question}</td>
                <td class="clip" title="{answer_full}">{answer}</td>
                <td>{response_time}</td>
                <td><a href="/admin/session/{session}">view</a></td>
            </tr>"#,
            created = html_escape(&log.created_at),
            location = html_escape(&location),
            ip = html_escape(log.ip_address.as_deref().unwrap_or("N/A")),
            question_full = html_escape(&log.question),
            question = html_escape(&clip(&log.question, 80)),
            answer_full = html_escape(&log.answer),
            answer = html_escape(&clip(&log.answer, 80)),
            session = html_escape(&urlencoding::encode(&log.session_id)),
        ));
    }

    format!(
        r#"<form class="search-box" method="get" action="/admin">
            <input type="hidden" name="tab" value="logs">
            <input type="text" name="q" placeholder="Search in questions and answers..." value="{q}">
            <button type="submit" class="btn">Search</button>
            <a class="btn" href="/admin?tab=logs">Refresh</a>
        </form>
        <table class="log-table">
            <thead>
                <tr>
                    <th>Time</th><th>Location</th><th>IP Address</th>
                    <th>Question</th><th>Answer</th><th>Response Time</th><th></th>
                </tr>
            </thead>
            <tbody>{rows}</tbody>
        </table>"#,
        q = html_escape(query),
    )
}

fn render_sessions(sessions: &[SessionSummary]) -> String {
    let mut rows = String::new();

    if sessions.is_empty() {
        rows.push_str(r#"<tr><td colspan="4" class="empty">No sessions found</td></tr>"#);
    }

    for session in sessions {
        rows.push_str(&format!(
            r#"<tr>
                <td class="mono"><a href="/admin/session/{encoded}">{id}</a></td>
                <td>{title}</td>
                <td>{count}</td>
                <td>{last_active}</td>
            </tr>"#,
            encoded = html_escape(&urlencoding::encode(&session.session_id)),
            id = html_escape(&clip(&session.session_id, 36)),
            title = html_escape(session.title.as_deref().unwrap_or("-")),
            count = session
                .message_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_active = html_escape(session.last_active.as_deref().unwrap_or("-")),
        ));
    }

    format!(
        r#"<table class="log-table">
            <thead>
                <tr><th>Session</th><th>Title</th><th>Messages</th><th>Last Active</th></tr>
            </thead>
            <tbody>{rows}</tbody>
        </table>"#
    )
}

/// Truncate on a char boundary, appending an ellipsis.
fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

/// GET /admin/session/{session_id} — replay one conversation through the
/// message renderer, exactly as the chat page would show it.
pub async fn admin_session(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Response {
    if !is_auth_enabled() || !is_logged_in(&jar) {
        return Redirect::to("/login").into_response();
    }

    match state.api.session_history(&session_id).await {
        Ok(history) => {
            let messages: String = history.messages.iter().map(render_message).collect();
            let body = if messages.is_empty() {
                r#"<p style="color: var(--muted);">No messages in this session.</p>"#.to_string()
            } else {
                messages
            };
            let html = format!(
                r#"<h1>Session</h1>
                <p class="mono" style="font-family: monospace; font-size: 0.8rem; color: var(--muted);">{id}</p>
                <p><a href="/admin?tab=logs">&larr; Back to logs</a></p>
                {body}"#,
                id = html_escape(&history.session_id),
            );
            Html(base_html("Session - ToxicoGPT Admin", &html, true)).into_response()
        }
        Err(e) => {
            let html = render_admin_error(&e);
            Html(base_html("Session - ToxicoGPT Admin", &html, true)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_short_strings_untouched() {
        assert_eq!(clip("short", 80), "short");
    }

    #[test]
    fn test_clip_truncates_on_char_boundary() {
        let clipped = clip("αβγδε", 3);
        assert_eq!(clipped, "αβγ...");
    }

    #[test]
    fn test_log_to_messages_preserves_order_and_roles() {
        let log = ChatLog {
            id: 1,
            session_id: "s".to_string(),
            question: "Q?".to_string(),
            answer: "A.".to_string(),
            model_used: None,
            response_time_ms: None,
            ip_address: None,
            user_agent: None,
            created_at: "2024-05-01T10:00:00Z".to_string(),
            extra_metadata: None,
        };
        let messages = log_to_messages(&log);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Q?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "A.");
    }
}
