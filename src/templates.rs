//! HTML templates and styling.
//!
//! This module contains the CSS, the chat page and its client-side
//! JavaScript, the embeddable widget script, and the assistant-message
//! renderer that wires the reference pipeline into HTML.

use crate::models::{ChatMessage, DisplayReference, Role, ViewMode};
use crate::references::{
    assemble_references, parse_reference_block, remove_references_section, scan_citations,
    split_paragraphs, strip_markdown,
};
use crate::url_validator::safe_href;

// ============================================================================
// Text Escaping
// ============================================================================

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a string for inclusion inside a single-quoted JS string literal.
pub fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace("</", "<\\/")
}

// ============================================================================
// CSS Styles
// ============================================================================

pub const STYLE: &str = r#"
:root {
    --bg: #0f172a;
    --panel: #1e293b;
    --panel-raised: #334155;
    --border: #334155;
    --fg: #e2e8f0;
    --muted: #94a3b8;
    --faint: #64748b;
    --accent: #3b82f6;
    --accent-strong: #2563eb;
    --accent-soft: #60a5fa;
    --ok: #10b981;
    --warn: #f59e0b;
    --error: #ef4444;
}

* { box-sizing: border-box; margin: 0; padding: 0; }

body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
    line-height: 1.6;
    color: var(--fg);
    background: var(--bg);
}

a { color: var(--accent-soft); text-decoration: none; }
a:hover { text-decoration: underline; }

.container { max-width: 960px; margin: 0 auto; padding: 1rem; }

/* --- Header --- */

.top-bar {
    display: flex;
    align-items: center;
    justify-content: space-between;
    gap: 1rem;
    padding: 0.75rem 1.25rem;
    background: var(--panel);
    border-bottom: 1px solid var(--border);
}

.brand { display: flex; align-items: center; gap: 0.6rem; }
.brand .logo { font-size: 1.5rem; }
.brand h1 { font-size: 1.1rem; font-weight: 700; }
.brand .tagline { font-size: 0.7rem; color: var(--muted); }

.top-actions { display: flex; align-items: center; gap: 0.6rem; flex-wrap: wrap; }

.health-badge {
    display: inline-flex;
    align-items: center;
    gap: 0.4rem;
    font-size: 0.75rem;
    color: var(--muted);
    padding: 0.25rem 0.6rem;
    border: 1px solid var(--border);
    border-radius: 6px;
}
.health-badge .dot { width: 8px; height: 8px; border-radius: 50%; background: var(--faint); }
.health-badge.online .dot { background: var(--ok); }
.health-badge.offline .dot { background: var(--error); }

.btn {
    padding: 0.4rem 0.8rem;
    border: 1px solid var(--border);
    border-radius: 6px;
    background: var(--panel);
    color: var(--fg);
    cursor: pointer;
    font-size: 0.85rem;
    font-family: inherit;
    text-decoration: none;
    display: inline-block;
}
.btn:hover { background: var(--panel-raised); }
.btn.primary { background: var(--accent-strong); border-color: var(--accent-strong); color: #fff; }
.btn.primary:hover { background: var(--accent); }

select.mode-select {
    padding: 0.35rem 0.5rem;
    border: 1px solid var(--border);
    border-radius: 6px;
    background: var(--panel);
    color: var(--fg);
    font-size: 0.8rem;
}

/* --- Chat layout --- */

.chat-shell { display: flex; flex-direction: column; height: 100vh; }
.chat-main { flex: 1; overflow-y: auto; }
.chat-log { max-width: 780px; margin: 0 auto; padding: 1.5rem 1rem 2rem; }

.chat-input-bar { border-top: 1px solid var(--border); background: var(--panel); }
.chat-input-bar form { max-width: 780px; margin: 0 auto; display: flex; gap: 0.6rem; padding: 0.9rem 1rem; }
.chat-input-bar input {
    flex: 1;
    padding: 0.75rem 1rem;
    border: 1px solid var(--border);
    border-radius: 10px;
    background: var(--bg);
    color: var(--fg);
    font-size: 0.95rem;
}
.chat-input-bar input:focus { outline: 2px solid var(--accent); border-color: transparent; }
.chat-input-bar button {
    padding: 0.75rem 1.5rem;
    border: none;
    border-radius: 10px;
    background: var(--accent-strong);
    color: #fff;
    font-weight: 600;
    cursor: pointer;
}
.chat-input-bar button:disabled { opacity: 0.5; cursor: not-allowed; }

.chat-footer {
    text-align: center;
    font-size: 0.7rem;
    color: var(--faint);
    padding: 0.5rem 1rem;
    border-top: 1px solid var(--border);
}

/* --- Welcome screen --- */

.welcome { text-align: center; padding: 3rem 1rem; }
.welcome .big { font-size: 3.5rem; }
.welcome h2 { font-size: 1.8rem; margin: 0.5rem 0; }
.welcome p { color: var(--muted); max-width: 560px; margin: 0 auto 2rem; }
.welcome-cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; text-align: left; }
.welcome-card {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 10px;
    padding: 1.1rem;
    cursor: pointer;
}
.welcome-card:hover { background: var(--panel-raised); border-color: var(--accent); }
.welcome-card .emoji { font-size: 1.5rem; }
.welcome-card h3 { font-size: 0.95rem; margin: 0.4rem 0 0.2rem; }
.welcome-card p { font-size: 0.8rem; color: var(--muted); margin: 0; }

/* --- Messages --- */

.message { margin-bottom: 1.75rem; }
.message-head { display: flex; align-items: center; justify-content: space-between; gap: 0.5rem; margin-bottom: 0.5rem; }
.message-head .who { display: flex; align-items: center; gap: 0.5rem; font-size: 0.8rem; font-weight: 600; }
.message-head .avatar {
    width: 28px; height: 28px; border-radius: 50%;
    display: inline-flex; align-items: center; justify-content: center;
    background: var(--panel-raised); font-size: 0.9rem;
}
.message.assistant .avatar { background: var(--accent-strong); }
.message-head .when { font-size: 0.7rem; color: var(--faint); font-weight: 400; }

.message.user .bubble {
    background: var(--panel);
    border: 1px solid var(--border);
    border-radius: 12px;
    padding: 0.8rem 1rem;
}

.view-toggle { display: inline-flex; background: var(--panel); border-radius: 8px; padding: 2px; gap: 2px; }
.view-toggle button {
    border: none;
    background: transparent;
    color: var(--muted);
    font-size: 0.7rem;
    font-weight: 600;
    padding: 0.25rem 0.7rem;
    border-radius: 6px;
    cursor: pointer;
}
.view-toggle button.active { background: var(--accent-strong); color: #fff; }

.view-pane p.msg-para { margin-bottom: 0.9rem; font-size: 1rem; }
.view-pane .placeholder { color: var(--muted); font-style: italic; font-size: 0.9rem; }

.citation-link {
    font-size: 0.7rem;
    font-weight: 700;
    padding: 0 0.15rem;
    color: var(--accent-soft);
}

/* --- References --- */

.refs-toggle {
    display: inline-flex;
    align-items: center;
    gap: 0.4rem;
    border: none;
    background: none;
    color: var(--accent-soft);
    font-size: 0.85rem;
    font-weight: 600;
    cursor: pointer;
    margin-top: 0.5rem;
    font-family: inherit;
}
.refs-toggle:hover { color: var(--accent); }

.references-list { margin-top: 1rem; border-top: 1px solid var(--border); padding-top: 1rem; }
.references-list h3 { font-size: 1rem; margin-bottom: 0.8rem; }

.reference-item { display: flex; gap: 0.7rem; margin-bottom: 0.9rem; }
.reference-number {
    flex-shrink: 0;
    width: 22px; height: 22px;
    border-radius: 50%;
    background: var(--panel-raised);
    color: var(--fg);
    font-size: 0.7rem;
    font-weight: 700;
    display: inline-flex;
    align-items: center;
    justify-content: center;
}
.reference-title { font-weight: 600; font-size: 0.9rem; }
.reference-meta { font-size: 0.8rem; color: var(--muted); margin-top: 0.15rem; }
.reference-excerpt { font-size: 0.8rem; color: var(--muted); font-style: italic; margin-top: 0.15rem; }
.reference-url { font-size: 0.7rem; color: var(--faint); font-family: monospace; word-break: break-all; margin-top: 0.15rem; }
.unverified-badge {
    font-size: 0.6rem;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    color: var(--warn);
    border: 1px solid var(--warn);
    border-radius: 3px;
    padding: 0 0.3rem;
    margin-left: 0.4rem;
    vertical-align: middle;
}
.provenance-note { font-size: 0.75rem; color: var(--faint); margin-top: 0.6rem; }

/* --- Spinner / errors --- */

.thinking { display: flex; align-items: center; gap: 0.6rem; color: var(--muted); font-size: 0.85rem; padding: 0.5rem 0; }
.thinking .dots { display: inline-flex; gap: 4px; }
.thinking .dots span {
    width: 7px; height: 7px; border-radius: 50%;
    background: var(--accent);
    animation: bounce 1s infinite;
}
.thinking .dots span:nth-child(2) { animation-delay: 0.15s; }
.thinking .dots span:nth-child(3) { animation-delay: 0.3s; }
@keyframes bounce { 0%, 60%, 100% { transform: translateY(0); } 30% { transform: translateY(-5px); } }

.error-banner {
    background: rgba(239, 68, 68, 0.1);
    border: 1px solid var(--error);
    border-radius: 8px;
    padding: 0.8rem 1rem;
    font-size: 0.85rem;
    color: #fca5a5;
    margin-bottom: 1rem;
}
.error-banner button {
    border: none; background: none; color: var(--error);
    cursor: pointer; font-size: 0.85rem; margin-left: 0.5rem;
    font-family: inherit;
}

/* --- Admin --- */

.stats-cards { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 1rem; margin-bottom: 1.5rem; }
.stat-card { background: var(--panel); border: 1px solid var(--border); border-radius: 10px; padding: 1.1rem; }
.stat-card .label { font-size: 0.75rem; color: var(--muted); }
.stat-card .value { font-size: 1.8rem; font-weight: 700; margin-top: 0.2rem; }

.bar-row { display: flex; align-items: center; gap: 0.8rem; margin-bottom: 0.4rem; }
.bar-row .date { width: 90px; font-size: 0.75rem; color: var(--muted); }
.bar-row .bar-track { flex: 1; background: var(--panel); border-radius: 999px; height: 20px; overflow: hidden; }
.bar-row .bar-fill {
    background: var(--accent-strong);
    height: 100%;
    display: flex;
    align-items: center;
    padding: 0 0.5rem;
    font-size: 0.7rem;
    color: #fff;
    min-width: fit-content;
}

.admin-tabs { display: flex; gap: 1rem; border-bottom: 1px solid var(--border); margin-bottom: 1.5rem; }
.admin-tabs a { padding: 0.5rem 0.2rem; font-size: 0.85rem; color: var(--muted); border-bottom: 2px solid transparent; }
.admin-tabs a.active { color: var(--accent-soft); border-bottom-color: var(--accent); }

.search-box { display: flex; gap: 0.5rem; margin-bottom: 1rem; }
.search-box input {
    flex: 1;
    padding: 0.5rem 0.8rem;
    border: 1px solid var(--border);
    border-radius: 6px;
    background: var(--panel);
    color: var(--fg);
}

.log-table { width: 100%; border-collapse: collapse; font-size: 0.8rem; }
.log-table th {
    text-align: left;
    font-size: 0.7rem;
    text-transform: uppercase;
    letter-spacing: 0.05em;
    color: var(--muted);
    padding: 0.5rem 0.6rem;
    border-bottom: 1px solid var(--border);
}
.log-table td { padding: 0.55rem 0.6rem; border-bottom: 1px solid var(--border); vertical-align: top; }
.log-table tr:hover td { background: var(--panel); }
.log-table .mono { font-family: monospace; font-size: 0.75rem; }
.log-table .clip { max-width: 280px; overflow: hidden; text-overflow: ellipsis; white-space: nowrap; }
.log-table .empty { text-align: center; color: var(--muted); padding: 2rem 0; }

/* --- Login --- */

.login-form { max-width: 320px; margin: 4rem auto; }
.login-form h1 { margin-bottom: 1rem; }
.login-form input {
    width: 100%;
    padding: 0.6rem 0.8rem;
    border: 1px solid var(--border);
    border-radius: 6px;
    background: var(--panel);
    color: var(--fg);
    margin-bottom: 0.8rem;
}
.message-box.error { color: #fca5a5; font-size: 0.85rem; margin-bottom: 0.8rem; }
"#;

// ============================================================================
// Base Page Shell (admin / login)
// ============================================================================

pub fn nav_bar(logged_in: bool) -> String {
    let auth_link = if logged_in {
        r#"<a class="btn" href="/logout">Logout</a>"#
    } else {
        r#"<a class="btn" href="/login">Login</a>"#
    };

    format!(
        r#"<header class="top-bar">
        <div class="brand">
            <span class="logo">&#129516;</span>
            <div>
                <h1>ToxicoGPT</h1>
                <div class="tagline">Evidence-Based Toxicology AI</div>
            </div>
        </div>
        <div class="top-actions">
            <a class="btn" href="/">Back to Chat</a>
            {auth_link}
        </div>
    </header>"#
    )
}

pub fn base_html(title: &str, content: &str, logged_in: bool) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    {nav}
    <div class="container">
        {content}
    </div>
</body>
</html>"#,
        title = html_escape(title),
        nav = nav_bar(logged_in),
    )
}

// ============================================================================
// Message Rendering
// ============================================================================

/// Render one conversation entry to HTML. User messages are a plain bubble;
/// assistant messages get the full treatment: view-mode toggle, normalized
/// paragraphs with superscript citation links, and the assembled reference
/// panel (expanded by default).
pub fn render_message(message: &ChatMessage) -> String {
    match message.role {
        Role::User => render_user_message(message),
        Role::Assistant => render_assistant_message(message),
    }
}

fn render_user_message(message: &ChatMessage) -> String {
    format!(
        r#"<div class="message user">
        <div class="message-head">
            <span class="who"><span class="avatar">&#128100;</span>You<span class="when">{when}</span></span>
        </div>
        <div class="bubble">{content}</div>
    </div>"#,
        when = format_time(message.timestamp.as_deref()),
        content = html_escape(&message.content),
    )
}

fn render_assistant_message(message: &ChatMessage) -> String {
    let has_summary = message
        .consumer_summary
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);

    // Simple view is the default; without a summary it shows a placeholder
    // pointing at the Technical view.
    let toggle = if has_summary || !message.content.is_empty() {
        r#"<span class="view-toggle">
            <button type="button" class="active" data-mode="simple" onclick="setViewMode(this, 'simple')" aria-pressed="true">Simple</button>
            <button type="button" data-mode="technical" onclick="setViewMode(this, 'technical')" aria-pressed="false">Technical</button>
        </span>"#
            .to_string()
    } else {
        String::new()
    };

    let simple_pane = render_view_pane(message, ViewMode::Simple, true);
    let technical_pane = render_view_pane(message, ViewMode::Technical, false);

    format!(
        r#"<div class="message assistant">
        <div class="message-head">
            <span class="who"><span class="avatar">&#129516;</span>ToxicoGPT<span class="when">{when}</span></span>
            {toggle}
        </div>
        {simple_pane}
        {technical_pane}
    </div>"#,
        when = format_time(message.timestamp.as_deref()),
    )
}

/// One view mode's pane: normalized paragraphs plus its own reference panel.
/// Each mode derives references from the text it actually displays, with the
/// evidence array as the shared fallback.
fn render_view_pane(message: &ChatMessage, mode: ViewMode, visible: bool) -> String {
    let mode_name = match mode {
        ViewMode::Simple => "simple",
        ViewMode::Technical => "technical",
    };
    let raw = mode.content(message).unwrap_or("");

    let body = strip_markdown(&remove_references_section(raw));
    let paragraphs = split_paragraphs(&body);

    let paragraphs_html = if paragraphs.is_empty() {
        let placeholder = match mode {
            ViewMode::Simple => {
                "No simplified summary available. Switch to Technical view for the full response."
            }
            ViewMode::Technical => "No content available.",
        };
        format!(r#"<p class="placeholder">{}</p>"#, placeholder)
    } else {
        paragraphs
            .iter()
            .map(|p| render_paragraph(p))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let parsed = parse_reference_block(raw);
    let references = assemble_references(&parsed, &message.evidence);
    let references_html = render_reference_panel(&references, message);

    let style = if visible { "" } else { r#" style="display:none""# };

    format!(
        r#"<div class="view-pane" data-mode="{mode_name}"{style}>
        {paragraphs_html}
        {references_html}
    </div>"#
    )
}

/// A paragraph keeps its inline `[n]` markers as text; the distinct cited
/// numbers are appended as superscript anchor links.
fn render_paragraph(paragraph: &str) -> String {
    let citations = scan_citations(paragraph);
    let sups: String = citations
        .iter()
        .map(|n| {
            format!(
                r##"<sup><a href="#ref-{n}" class="citation-link" onclick="return citeClick(this, '{n}')">{n}</a></sup>"##
            )
        })
        .collect();

    format!(
        r#"<p class="msg-para">{}{}</p>"#,
        html_escape(paragraph),
        sups
    )
}

fn render_reference_panel(references: &[DisplayReference], message: &ChatMessage) -> String {
    let provenance_html = match &message.provenance {
        Some(p) => {
            let ids: Vec<String> = p.evidence_ids.iter().map(|i| i.to_string()).collect();
            let sources = if ids.is_empty() {
                String::new()
            } else {
                format!(", sources: {}", ids.join(","))
            };
            format!(
                r#"<div class="provenance-note">Based on: {}{}</div>"#,
                html_escape(&p.source),
                sources
            )
        }
        None => String::new(),
    };

    if references.is_empty() && provenance_html.is_empty() {
        return String::new();
    }

    let items: String = references.iter().map(render_reference_item).collect();

    // Expanded by default; the toggle and citation clicks flip it.
    format!(
        r#"<button type="button" class="refs-toggle" onclick="toggleRefs(this)" aria-expanded="true"><span class="arrow">&#9660;</span> References ({count})</button>
    <div class="references-list">
        <h3>&#128218; References</h3>
        {items}
        {provenance_html}
    </div>"#,
        count = references.len(),
    )
}

fn render_reference_item(reference: &DisplayReference) -> String {
    let badge = if reference.unverified {
        r#"<span class="unverified-badge">unverified</span>"#
    } else {
        ""
    };
    let title_html = match safe_href(&reference.url) {
        Some(href) => format!(
            r#"<a class="reference-title" href="{}" target="_blank" rel="noopener noreferrer">{}</a>{}"#,
            html_escape(&href),
            html_escape(&reference.title),
            badge
        ),
        None => format!(
            r#"<span class="reference-title">{}</span>{}"#,
            html_escape(&reference.title),
            badge
        ),
    };

    // Secondary line: structured metadata when the decomposition produced
    // any, otherwise the citation remainder.
    let mut meta_parts: Vec<String> = Vec::new();
    if let Some(ref authors) = reference.authors {
        meta_parts.push(html_escape(authors));
    }
    if let Some(ref journal) = reference.journal {
        meta_parts.push(html_escape(journal));
    }
    if let Some(ref year) = reference.year {
        meta_parts.push(html_escape(year));
    }
    let meta_html = if !meta_parts.is_empty() {
        format!(
            r#"<div class="reference-meta">{}</div>"#,
            meta_parts.join(" &middot; ")
        )
    } else if let Some(ref citation) = reference.citation {
        if citation != &reference.title {
            format!(r#"<div class="reference-meta">{}</div>"#, html_escape(citation))
        } else {
            String::new()
        }
    } else {
        String::new()
    };

    let excerpt_html = match &reference.excerpt {
        Some(excerpt) => format!(
            r#"<div class="reference-excerpt">{}</div>"#,
            html_escape(excerpt)
        ),
        None => String::new(),
    };

    let url_html = match safe_href(&reference.url) {
        Some(href) => format!(r#"<div class="reference-url">{}</div>"#, html_escape(&href)),
        None => String::new(),
    };

    format!(
        r#"<div class="reference-item" id="ref-{number}">
            <span class="reference-number">{number}</span>
            <div>
                {title_html}
                {meta_html}
                {excerpt_html}
                {url_html}
            </div>
        </div>"#,
        number = reference.number,
    )
}

/// "HH:MM" from an RFC 3339 timestamp, or empty when absent/unparsable.
fn format_time(timestamp: Option<&str>) -> String {
    let ts = match timestamp {
        Some(t) => t,
        None => return String::new(),
    };
    match chrono::DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.format("%H:%M").to_string(),
        Err(_) => String::new(),
    }
}

// ============================================================================
// Chat Page
// ============================================================================

/// Client-side behavior for the chat page. Message HTML itself always comes
/// from the server; this script only manages session state, transport, and
/// the per-message toggles.
const CHAT_JS: &str = r#"
// --- Per-message UI state (delegated, survives server-rendered inserts) ---

function setViewMode(btn, mode) {
    var msg = btn.closest('.message');
    msg.querySelectorAll('.view-pane').forEach(function(pane) {
        pane.style.display = pane.dataset.mode === mode ? '' : 'none';
    });
    msg.querySelectorAll('.view-toggle button').forEach(function(b) {
        var active = b.dataset.mode === mode;
        b.classList.toggle('active', active);
        b.setAttribute('aria-pressed', active ? 'true' : 'false');
    });
}

function toggleRefs(btn) {
    var list = btn.parentElement.querySelector('.references-list');
    if (!list) return;
    var hidden = list.style.display === 'none';
    list.style.display = hidden ? '' : 'none';
    btn.querySelector('.arrow').innerHTML = hidden ? '&#9660;' : '&#9658;';
    btn.setAttribute('aria-expanded', hidden ? 'true' : 'false');
}

function citeClick(link, num) {
    var pane = link.closest('.view-pane');
    var list = pane.querySelector('.references-list');
    if (list) {
        // Force the panel open, then scroll once the target is laid out.
        list.style.display = '';
        var btn = pane.querySelector('.refs-toggle');
        if (btn) {
            btn.querySelector('.arrow').innerHTML = '&#9660;';
            btn.setAttribute('aria-expanded', 'true');
        }
        setTimeout(function() {
            var target = list.querySelector('#ref-' + num) ||
                         document.getElementById('ref-' + num);
            if (target) target.scrollIntoView({ behavior: 'smooth', block: 'center' });
        }, 100);
    }
    return false;
}

// --- Session management ---

var sessionId = null;
var healthy = false;
var sending = false;

function newSessionId() {
    if (window.crypto && crypto.randomUUID) return crypto.randomUUID();
    return 'xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx'.replace(/[xy]/g, function(c) {
        var r = Math.random() * 16 | 0;
        return (c === 'x' ? r : (r & 0x3 | 0x8)).toString(16);
    });
}

function initSession() {
    var params = new URLSearchParams(window.location.search);
    var fromUrl = params.get('session');
    if (fromUrl) {
        sessionId = fromUrl;
        localStorage.setItem('toxicogpt_session', sessionId);
        loadHistory(sessionId);
        return;
    }
    var stored = localStorage.getItem('toxicogpt_session');
    if (stored) {
        sessionId = stored;
        history.replaceState(null, '', '/?session=' + sessionId);
        loadHistory(sessionId);
    } else {
        sessionId = newSessionId();
        localStorage.setItem('toxicogpt_session', sessionId);
        history.replaceState(null, '', '/?session=' + sessionId);
    }
}

function clearChat() {
    if (!confirm('Start a new chat? This will create a new conversation.')) return;
    document.getElementById('chat-log').innerHTML = '';
    sessionId = newSessionId();
    localStorage.setItem('toxicogpt_session', sessionId);
    history.replaceState(null, '', '/?session=' + sessionId);
    notifySessionUpdate();
    showWelcome(true);
}

function shareChat() {
    var url = window.location.origin + '/?session=' + sessionId;
    navigator.clipboard.writeText(url);
    alert('Chat link copied to clipboard! Share this link to continue this conversation on any device.');
}

// --- Widget postMessage protocol ---

function notifySessionUpdate() {
    if (window.parent !== window) {
        window.parent.postMessage({ type: 'SESSION_UPDATE', sessionId: sessionId }, '*');
    }
}

window.addEventListener('message', function(event) {
    if (event.data && event.data.type === 'GET_SESSION_ID') {
        event.source.postMessage({ type: 'SESSION_ID_RESPONSE', sessionId: sessionId }, event.origin);
    }
});

// --- Health check ---

function checkHealth() {
    fetch('/api/health')
        .then(function(r) { return r.json(); })
        .then(function(data) {
            healthy = data.status === 'healthy';
            updateHealthBadge(healthy ? 'online' : 'offline');
            if (!healthy) setTimeout(checkHealth, 3000);
        })
        .catch(function() {
            healthy = false;
            updateHealthBadge('offline');
            setTimeout(checkHealth, 3000);
        });
}

function updateHealthBadge(state) {
    var badge = document.getElementById('health-badge');
    badge.className = 'health-badge ' + state;
    badge.querySelector('.label').textContent = state === 'online' ? 'Online' : 'Offline';
    document.getElementById('chat-send').disabled = (state !== 'online') || sending;
}

// --- Rendering helpers ---

function showWelcome(show) {
    document.getElementById('welcome').style.display = show ? '' : 'none';
}

function appendHtml(html) {
    var log = document.getElementById('chat-log');
    var holder = document.createElement('div');
    holder.innerHTML = html;
    while (holder.firstChild) log.appendChild(holder.firstChild);
    scrollToBottom();
}

function appendUserMessage(text) {
    var tpl = document.getElementById('user-msg-template');
    var node = tpl.content.cloneNode(true);
    node.querySelector('.bubble').textContent = text;
    node.querySelector('.when').textContent = new Date().toLocaleTimeString([], { hour: '2-digit', minute: '2-digit' });
    document.getElementById('chat-log').appendChild(node);
    scrollToBottom();
}

function scrollToBottom() {
    var main = document.getElementById('chat-main');
    main.scrollTop = main.scrollHeight;
}

function setThinking(on) {
    document.getElementById('thinking').style.display = on ? '' : 'none';
    if (on) scrollToBottom();
}

function showError(message) {
    var banner = document.getElementById('error-banner');
    banner.querySelector('.text').textContent = message;
    banner.style.display = '';
}

function hideError() {
    document.getElementById('error-banner').style.display = 'none';
}

// --- History ---

function loadHistory(sid) {
    fetch('/api/history/' + encodeURIComponent(sid))
        .then(function(r) { if (!r.ok) throw new Error('history unavailable'); return r.json(); })
        .then(function(data) {
            if (!data.messages || data.messages.length === 0) return;
            showWelcome(false);
            data.messages.forEach(function(m) { appendHtml(m.html); });
        })
        .catch(function() { /* start fresh, don't bother the user */ });
}

// --- Sending ---

function sendMessage(text) {
    if (!text || sending) return;
    hideError();
    showWelcome(false);
    appendUserMessage(text);
    sending = true;
    setThinking(true);
    document.getElementById('chat-send').disabled = true;

    fetch('/api/chat', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
            message: text,
            session_id: sessionId,
            user_mode: document.getElementById('user-mode').value
        })
    })
        .then(function(r) {
            if (!r.ok) return r.json().then(function(e) { throw new Error(e.error || 'Request failed'); });
            return r.json();
        })
        .then(function(data) {
            if (data.session_id) {
                sessionId = data.session_id;
                localStorage.setItem('toxicogpt_session', sessionId);
                notifySessionUpdate();
            }
            appendHtml(data.html);
        })
        .catch(function(err) {
            showError(err.message || 'Failed to get response. Please try again.');
        })
        .finally(function() {
            sending = false;
            setThinking(false);
            document.getElementById('chat-send').disabled = !healthy;
        });
}

function onSubmit(event) {
    event.preventDefault();
    var input = document.getElementById('chat-input');
    var text = input.value.trim();
    if (!text) return;
    input.value = '';
    sendMessage(text);
}

function sendPrompt(prompt) {
    sendMessage(prompt);
}

document.addEventListener('DOMContentLoaded', function() {
    initSession();
    checkHealth();
});
"#;

/// The single-page chat UI.
pub fn chat_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ToxicoGPT - Evidence-Based Toxicology AI</title>
    <meta name="description" content="AI-powered toxicology assistant with cited, evidence-based answers">
    <style>{STYLE}</style>
</head>
<body>
<div class="chat-shell">
    <header class="top-bar">
        <div class="brand">
            <span class="logo">&#129516;</span>
            <div>
                <h1>ToxicoGPT</h1>
                <div class="tagline">Evidence-Based Toxicology AI</div>
            </div>
        </div>
        <div class="top-actions">
            <span id="health-badge" class="health-badge"><span class="dot"></span><span class="label">Checking...</span></span>
            <select id="user-mode" class="mode-select" title="Answer style">
                <option value="patient">Patient</option>
                <option value="doctor">Doctor</option>
                <option value="researcher">Researcher</option>
            </select>
            <button type="button" class="btn" onclick="clearChat()">+ New Chat</button>
            <button type="button" class="btn" onclick="shareChat()" title="Copy shareable link">&#128279; Share</button>
            <a class="btn primary" href="/admin">Admin</a>
        </div>
    </header>

    <main id="chat-main" class="chat-main">
        <div class="chat-log" id="chat-log-wrap">
            <div id="welcome" class="welcome">
                <div class="big">&#129516;</div>
                <h2>Welcome to ToxicoGPT</h2>
                <p>Your AI-powered toxicology assistant. Ask questions about drug toxicity,
                   chemical safety, dose-response relationships, and more.</p>
                <div class="welcome-cards">
                    <div class="welcome-card" role="button" tabindex="0"
                         onclick="sendPrompt('Drug Toxicity: Learn about adverse effects, overdose symptoms, and safety profiles')">
                        <div class="emoji">&#128138;</div>
                        <h3>Drug Toxicity</h3>
                        <p>Learn about adverse effects, overdose symptoms, and safety profiles</p>
                    </div>
                    <div class="welcome-card" role="button" tabindex="0"
                         onclick="sendPrompt('Chemical Safety: Understand hazards, exposure limits, and handling procedures')">
                        <div class="emoji">&#9878;&#65039;</div>
                        <h3>Chemical Safety</h3>
                        <p>Understand hazards, exposure limits, and handling procedures</p>
                    </div>
                    <div class="welcome-card" role="button" tabindex="0"
                         onclick="sendPrompt('Risk Assessment: Explore dose-response data and toxicological pathways')">
                        <div class="emoji">&#128202;</div>
                        <h3>Risk Assessment</h3>
                        <p>Explore dose-response data and toxicological pathways</p>
                    </div>
                </div>
            </div>

            <div id="error-banner" class="error-banner" style="display:none">
                <span class="text"></span>
                <button type="button" onclick="hideError()">Dismiss</button>
            </div>

            <div id="chat-log"></div>

            <div id="thinking" class="thinking" style="display:none">
                <span class="dots"><span></span><span></span><span></span></span>
                ToxicoGPT is thinking...
            </div>
        </div>
    </main>

    <div class="chat-input-bar">
        <form onsubmit="onSubmit(event)">
            <input type="text" id="chat-input" placeholder="Ask about drug interactions..." autocomplete="off" autofocus>
            <button type="submit" id="chat-send" disabled>&#8594;</button>
        </form>
    </div>

    <footer class="chat-footer">
        &#9888;&#65039; For educational and research purposes only. Not a substitute for professional
        medical advice. Always consult healthcare professionals for medical decisions.
    </footer>
</div>

<template id="user-msg-template">
    <div class="message user">
        <div class="message-head">
            <span class="who"><span class="avatar">&#128100;</span>You<span class="when"></span></span>
        </div>
        <div class="bubble"></div>
    </div>
</template>

<script>{CHAT_JS}</script>
</body>
</html>"#
    )
}

// ============================================================================
// Embeddable Widget
// ============================================================================

/// Standalone widget script: a floating chat bubble that opens the chat UI
/// in a modal iframe. Third parties embed it with a single script tag.
const WIDGET_JS_TEMPLATE: &str = r#"(function() {
  'use strict';

  var config = {
    chatUrl: '__CHAT_URL__',
    bubbleIcon: '💬'
  };

  if (window.ToxicoGPTWidget) {
    console.warn('ToxicoGPT Widget already initialized');
    return;
  }

  var widgetHTML = [
    '<style>',
    '#toxicogpt-bubble { position: fixed; bottom: 20px; right: 20px; width: 60px; height: 60px;',
    '  background: linear-gradient(135deg, #2563eb 0%, #4f46e5 100%); border-radius: 50%;',
    '  display: flex; align-items: center; justify-content: center; cursor: pointer;',
    '  box-shadow: 0 4px 12px rgba(37, 99, 235, 0.4); font-size: 28px; z-index: 999998;',
    '  transition: transform 0.3s, box-shadow 0.3s; border: none; }',
    '#toxicogpt-bubble:hover { transform: scale(1.1); box-shadow: 0 6px 20px rgba(37, 99, 235, 0.6); }',
    '#toxicogpt-modal { position: fixed; top: 0; left: 0; width: 100%; height: 100%;',
    '  background: rgba(0, 0, 0, 0.5); display: none; align-items: center; justify-content: center;',
    '  z-index: 999999; backdrop-filter: blur(4px); }',
    '#toxicogpt-modal.active { display: flex; }',
    '#toxicogpt-container { width: 90%; max-width: 450px; height: 80%; max-height: 700px;',
    '  background: white; border-radius: 16px; box-shadow: 0 20px 60px rgba(0, 0, 0, 0.3);',
    '  display: flex; flex-direction: column; overflow: hidden; }',
    '#toxicogpt-iframe { width: 100%; height: calc(100% - 50px); border: none; }',
    '#toxicogpt-header { height: 50px; background: linear-gradient(135deg, #2563eb 0%, #4f46e5 100%);',
    '  display: flex; align-items: center; justify-content: space-between; padding: 0 15px; color: white; }',
    '#toxicogpt-header h3 { margin: 0; font-size: 16px; font-weight: 600; }',
    '.toxicogpt-btn { background: rgba(255, 255, 255, 0.2); border: none; padding: 8px 12px;',
    '  border-radius: 6px; cursor: pointer; color: white; font-weight: 600; font-size: 13px; }',
    '.toxicogpt-btn:hover { background: rgba(255, 255, 255, 0.3); }',
    '@media (max-width: 768px) { #toxicogpt-container { width: 100%; height: 100%; max-height: 100%; border-radius: 0; } }',
    '</style>',
    '<div id="toxicogpt-bubble" title="Chat with ToxicoGPT" aria-label="Open chat">' + config.bubbleIcon + '</div>',
    '<div id="toxicogpt-modal" role="dialog" aria-modal="true" aria-labelledby="toxicogpt-title">',
    '  <div id="toxicogpt-container">',
    '    <div id="toxicogpt-header">',
    '      <h3 id="toxicogpt-title">ToxicoGPT</h3>',
    '      <div>',
    '        <button class="toxicogpt-btn" id="toxicogpt-open-new" aria-label="Open in new window">⧉ Open Full</button>',
    '        <button class="toxicogpt-btn" id="toxicogpt-close" aria-label="Close chat">✕</button>',
    '      </div>',
    '    </div>',
    '    <iframe id="toxicogpt-iframe" src="' + config.chatUrl + '" title="ToxicoGPT Chat"></iframe>',
    '  </div>',
    '</div>'
  ].join('\n');

  function injectWidget() {
    var container = document.createElement('div');
    container.innerHTML = widgetHTML;
    document.body.appendChild(container);
    initializeWidget();
  }

  function initializeWidget() {
    var bubble = document.getElementById('toxicogpt-bubble');
    var modal = document.getElementById('toxicogpt-modal');
    var closeBtn = document.getElementById('toxicogpt-close');
    var openNewBtn = document.getElementById('toxicogpt-open-new');
    var iframe = document.getElementById('toxicogpt-iframe');
    var baseUrl = config.chatUrl.replace(/\/$/, '');
    var iframeLoaded = false;
    var currentSessionId = null;

    iframe.addEventListener('load', function() { iframeLoaded = true; });

    bubble.addEventListener('click', function() {
      modal.classList.add('active');
      document.body.style.overflow = 'hidden';
    });

    function closeModal() {
      modal.classList.remove('active');
      document.body.style.overflow = '';
    }

    closeBtn.addEventListener('click', closeModal);

    modal.addEventListener('click', function(e) {
      if (e.target === modal) closeModal();
    });

    document.addEventListener('keydown', function(e) {
      if (e.key === 'Escape' && modal.classList.contains('active')) closeModal();
    });

    window.addEventListener('message', function(event) {
      if (event.origin !== baseUrl) return;
      var data = event.data;
      if (data.type === 'SESSION_ID_RESPONSE' || data.type === 'SESSION_UPDATE') {
        currentSessionId = data.sessionId;
      }
    });

    openNewBtn.addEventListener('click', function() {
      if (!iframeLoaded) {
        alert('Please wait for chat to load...');
        return;
      }
      iframe.contentWindow.postMessage({ type: 'GET_SESSION_ID' }, baseUrl);
      setTimeout(function() {
        var targetUrl = baseUrl;
        if (currentSessionId) targetUrl = baseUrl + '/?session=' + currentSessionId;
        window.open(targetUrl, '_blank', 'noopener,noreferrer');
        closeModal();
      }, 300);
    });
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', injectWidget);
  } else {
    injectWidget();
  }

  window.ToxicoGPTWidget = {
    version: '1.0.0',
    open: function() {
      var modal = document.getElementById('toxicogpt-modal');
      if (modal) modal.classList.add('active');
    },
    close: function() {
      var modal = document.getElementById('toxicogpt-modal');
      if (modal) modal.classList.remove('active');
    },
    config: config
  };
})();
"#;

/// The widget script with the chat URL baked in.
pub fn widget_js(chat_url: &str) -> String {
    WIDGET_JS_TEMPLATE.replace("__CHAT_URL__", &js_escape(chat_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EvidenceItem, Provenance};

    fn assistant_message(content: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: content.to_string(),
            consumer_summary: None,
            timestamp: None,
            evidence: Vec::new(),
            provenance: None,
        }
    }

    #[test]
    fn test_render_assistant_message_wires_citations_to_anchors() {
        let msg = assistant_message(
            "Drug X is safe [1].\n\nReferences:\n[1] Smith et al. Journal Y. 2020. http://example.com/a",
        );
        let html = render_message(&msg);

        assert!(html.contains(r##"href="#ref-1""##), "inline marker should link to ref-1");
        assert!(html.contains(r#"id="ref-1""#), "reference item should carry the ref-1 anchor");
        assert!(html.contains("http://example.com/a"));
        // Reference block must not be rendered as body text
        assert!(!html.contains("References:"));
    }

    #[test]
    fn test_render_reference_panel_expanded_by_default() {
        let msg = assistant_message("Answer [1].\n\nReferences:\n[1] Some source.");
        let html = render_message(&msg);
        assert!(html.contains(r#"aria-expanded="true""#));
        assert!(!html.contains(r#"class="references-list" style="display:none""#));
    }

    #[test]
    fn test_render_falls_back_to_evidence_references() {
        let mut msg = assistant_message("Plain answer with no reference block.");
        msg.evidence = vec![EvidenceItem {
            id: 1,
            drug_name: "Aspirin".to_string(),
            summary: "Platelet inhibition.".to_string(),
            ..Default::default()
        }];
        let html = render_message(&msg);
        assert!(html.contains("Aspirin"));
        assert!(html.contains("References (1)"));
    }

    #[test]
    fn test_render_provenance_in_reference_panel() {
        let mut msg = assistant_message("Full technical answer here");
        msg.consumer_summary = Some("Short summary".to_string());
        msg.provenance = Some(Provenance {
            source: "db".to_string(),
            evidence_ids: vec![1, 2],
        });
        let html = render_message(&msg);
        assert!(html.contains("Short summary"));
        assert!(html.contains("Based on: db"));
        assert!(html.contains("sources: 1,2"));
    }

    #[test]
    fn test_render_user_message_escapes_content() {
        let msg = ChatMessage {
            role: Role::User,
            content: "<script>alert(1)</script>".to_string(),
            consumer_summary: None,
            timestamp: None,
            evidence: Vec::new(),
            provenance: None,
        };
        let html = render_message(&msg);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_rejects_unsafe_reference_urls() {
        let msg = assistant_message(
            "Answer [1].\n\nReferences:\n[1] Sketchy source. javascript:alert(1)",
        );
        let html = render_message(&msg);
        assert!(!html.contains(r#"href="javascript:"#));
    }

    #[test]
    fn test_widget_js_injects_chat_url() {
        let js = widget_js("https://chat.example.org");
        assert!(js.contains("https://chat.example.org"));
        assert!(!js.contains("__CHAT_URL__"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
