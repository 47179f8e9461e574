// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for signing in, persisting and losing a session.
//!
//! These tests validate:
//! - The login redirect token is stored and survives a restart
//! - Logging out clears the stored token
//! - A 401 from the task service surfaces as `SessionExpired` and sends
//!   the app back to the login screen with storage cleared

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::RwLock;
use serde_json::json;

use tasksync::api::HttpTaskApi;
use tasksync::app::{App, Screen};
use tasksync::net::{self, NetCommand, NetConfig, NetEvent};
use tasksync::push::loopback::LoopbackSource;
use tasksync::session::{FileStorage, Session};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A storage file unique to this test, removed on drop.
struct TempStorage(PathBuf);

impl TempStorage {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "tasksync-session-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Self(dir.join("storage.toml"))
    }

    fn session(&self) -> Session {
        Session::restore(FileStorage::open(&self.0).unwrap())
    }
}

impl Drop for TempStorage {
    fn drop(&mut self) {
        if let Some(dir) = self.0.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

#[test]
fn redirect_login_survives_restart_and_logout_clears_it() {
    let storage = TempStorage::new("restart");

    let session = Arc::new(RwLock::new(storage.session()));
    let mut app = App::new(Arc::clone(&session), "http://localhost:5000", 5, today());
    assert!(matches!(app.screen, Screen::Login { .. }));

    for c in "http://localhost:3000/login/success?token=abc123".chars() {
        app.handle_key_event(key(KeyCode::Char(c)));
    }
    let cmds = app.handle_key_event(key(KeyCode::Enter));
    assert_eq!(app.screen, Screen::Main);
    assert!(cmds.iter().any(|c| matches!(c, NetCommand::Activate { .. })));
    drop(app);
    drop(session);

    // A fresh process starts signed in.
    let restored = storage.session();
    assert_eq!(restored.token(), Some("abc123"));
    let session = Arc::new(RwLock::new(restored));
    let app = App::new(Arc::clone(&session), "http://localhost:5000", 5, today());
    assert_eq!(app.screen, Screen::Main);

    session.write().logout().unwrap();
    assert!(storage.session().token().is_none());
}

#[test]
fn bad_redirect_keeps_the_previous_state() {
    let storage = TempStorage::new("bad-redirect");
    let mut session = storage.session();
    assert!(session.complete_login("not a url").is_err());
    assert!(session.complete_login("http://h/login/success?other=1").is_err());
    assert!(!session.is_authenticated());
    assert!(storage.session().token().is_none());
}

#[tokio::test]
async fn expired_token_returns_app_to_login() {
    let app_routes = Router::new().route(
        "/api/tasks",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Not authenticated" })),
            )
                .into_response()
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app_routes).await.unwrap();
    });

    let storage = TempStorage::new("expired");
    let mut session = storage.session();
    session.set_token("stale".to_string()).unwrap();
    let session = Arc::new(RwLock::new(session));

    let api = HttpTaskApi::new(&base, Arc::clone(&session), Duration::from_secs(5)).unwrap();
    let (source, _hub) = LoopbackSource::new(8);
    let (tx, mut rx) = net::spawn_net(api, source, NetConfig::default());

    let mut app = App::new(Arc::clone(&session), &base, 5, today());
    for cmd in app.start() {
        if !matches!(cmd, NetCommand::FetchProfile) {
            tx.send(cmd).await.unwrap();
        }
    }

    tokio::time::timeout(EVENT_TIMEOUT, async {
        while matches!(app.screen, Screen::Main) {
            let event = rx.recv().await.unwrap();
            for cmd in app.apply_net_event(event) {
                tx.send(cmd).await.unwrap();
            }
        }
    })
    .await
    .expect("session never expired");

    assert!(matches!(&app.screen, Screen::Login { error: Some(_), .. }));
    assert!(app.view.is_none());
    assert!(!session.read().is_authenticated());
    assert!(storage.session().token().is_none());

    // The fetch failure that follows belongs to the torn-down view.
    let late = rx.recv().await.unwrap();
    assert!(matches!(late, NetEvent::FetchFailed { .. }));
    app.apply_net_event(late);
    assert!(app.notice.is_none());

    tx.send(NetCommand::Shutdown).await.unwrap();
}
