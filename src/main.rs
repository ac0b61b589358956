//! ToxicoGPT web front-end - chat UI for the toxicology assistant backend.
//!
//! This is the main entry point for the front-end web server.
//! The application is organized into the following modules:
//!
//! - `models`: Wire payloads and render-time reference entities
//! - `references`: Citation scanning, reference parsing, and normalization
//! - `backend`: Typed HTTP client for the external backend API
//! - `auth`: Admin session management and authentication
//! - `templates`: HTML/CSS/JS templates and message rendering
//! - `handlers`: HTTP route handlers

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use toxicogpt::{auth, backend_url, handlers, AppState, BIND_ADDR};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let state = match AppState::new() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let app = Router::new()
        // Chat UI
        .route("/", get(handlers::index))
        .route("/widget.js", get(handlers::widget_script))
        // JSON API consumed by the page script
        .route("/api/chat", post(handlers::api_chat))
        .route("/api/history/{session_id}", get(handlers::api_history))
        .route("/api/health", get(handlers::api_health))
        // Admin dashboard
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .route("/admin", get(handlers::admin))
        .route("/admin/session/{session_id}", get(handlers::admin_session))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR)
        .await
        .expect("Failed to bind server port");

    println!("ToxicoGPT front-end running at http://{}", BIND_ADDR);
    println!("Backend API: {}", backend_url());

    if auth::is_auth_enabled() {
        println!("Admin dashboard: ENABLED (TOXICOGPT_ADMIN_PASSWORD set)");
    } else {
        println!("Admin dashboard: DISABLED (set TOXICOGPT_ADMIN_PASSWORD to enable)");
    }

    axum::serve(listener, app).await.expect("Server error");
}
