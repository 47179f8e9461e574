// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::significant_drop_tightening
)]

//! End-to-end tests for the REST client and the live task view.
//!
//! An axum server stands in for the task service: it keeps tasks in
//! memory, checks the bearer token, and broadcasts `taskCreated` /
//! `taskUpdated` / `taskDeleted` frames to every `/ws` subscriber.
//!
//! These tests validate:
//! - `HttpTaskApi` CRUD, share and profile calls against real HTTP
//! - `spawn_net` delivers the initial snapshot and pushed events
//! - A rejected toggle is rolled back in the app state
//! - Pushes missed while disconnected are recovered by a re-fetch

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Json;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use tasksync::api::{ApiError, HttpTaskApi, SharedSession, TaskApi};
use tasksync::app::{App, Page};
use tasksync::net::{self, NetCommand, NetConfig, NetEvent, ReconnectPolicy, ViewId};
use tasksync::push::ws::WsEventSource;
use tasksync::session::{MemoryStorage, Session};
use tasksync_proto::codec;
use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::{
    NewTask, Priority, ShareRequest, Task, TaskId, TaskPatch, TaskStatus,
};
use tasksync_proto::user::UserProfile;

const TOKEN: &str = "secret";
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Fake task service
// =============================================================================

struct FakeServer {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    /// Encoded push frames.
    events: broadcast::Sender<String>,
    /// Closes every open push connection.
    kick: broadcast::Sender<()>,
    fail_updates: AtomicBool,
}

impl FakeServer {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            events,
            kick,
            fail_updates: AtomicBool::new(false),
        })
    }

    fn publish(&self, event: &TaskEvent) {
        let _ = self.events.send(codec::encode_event(event).unwrap());
    }

    /// Adds a task without announcing it on the push channel.
    fn insert_silently(&self, title: &str) -> Task {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task::new(format!("task{id}"), title);
        self.tasks.lock().insert(0, task.clone());
        task
    }

    async fn wait_for_subscribers(&self, count: usize) {
        tokio::time::timeout(EVENT_TIMEOUT, async {
            while self.events.receiver_count() < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("push subscriber never attached");
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn unauthorized() -> Response {
    message(StatusCode::UNAUTHORIZED, "Not authenticated")
}

async fn list_tasks(State(server): State<Arc<FakeServer>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(server.tasks.lock().clone()).into_response()
}

async fn create_task(
    State(server): State<Arc<FakeServer>>,
    headers: HeaderMap,
    Json(new): Json<NewTask>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let id = server.next_id.fetch_add(1, Ordering::SeqCst);
    let mut task = Task::new(format!("task{id}"), new.title);
    task.description = new.description;
    task.status = new.status;
    task.priority = new.priority;
    task.due_date = new.due_date;
    server.tasks.lock().insert(0, task.clone());
    server.publish(&TaskEvent::TaskCreated(task.clone()));
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn update_task(
    State(server): State<Arc<FakeServer>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if server.fail_updates.load(Ordering::SeqCst) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }
    let updated = {
        let mut tasks = server.tasks.lock();
        let Some(task) = tasks.iter_mut().find(|t| t.id.as_str() == id) else {
            return message(StatusCode::NOT_FOUND, "Task not found");
        };
        patch.apply_to(task);
        task.clone()
    };
    server.publish(&TaskEvent::TaskUpdated(updated.clone()));
    Json(updated).into_response()
}

async fn delete_task(
    State(server): State<Arc<FakeServer>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    server.tasks.lock().retain(|t| t.id.as_str() != id);
    server.publish(&TaskEvent::TaskDeleted(TaskId::new(id)));
    message(StatusCode::OK, "Task deleted")
}

async fn share_task(
    headers: HeaderMap,
    Path(_id): Path<String>,
    Json(request): Json<ShareRequest>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if request.email_or_username == "nobody" {
        return message(StatusCode::NOT_FOUND, "User not found");
    }
    message(StatusCode::OK, "Task shared")
}

async fn me(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "_id": "u1",
        "name": "Ada Lovelace",
        "email": "ada@example.com",
    }))
    .into_response()
}

async fn ws_handler(ws: WebSocketUpgrade, State(server): State<Arc<FakeServer>>) -> Response {
    ws.on_upgrade(move |socket| push_frames(socket, server))
}

async fn push_frames(mut socket: WebSocket, server: Arc<FakeServer>) {
    let mut events = server.events.subscribe();
    let mut kick = server.kick.subscribe();
    loop {
        tokio::select! {
            frame = events.recv() => {
                let Ok(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            _ = kick.recv() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

/// Starts the fake service on an ephemeral port; returns its base URL.
async fn start_server(server: Arc<FakeServer>) -> String {
    let app = Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/share", post(share_task))
        .route("/api/user/me", get(me))
        .route("/ws", get(ws_handler))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// =============================================================================
// Helpers
// =============================================================================

fn session_with(token: Option<&str>) -> SharedSession {
    let mut session = Session::restore(MemoryStorage::default());
    if let Some(token) = token {
        session.set_token(token.to_string()).unwrap();
    }
    Arc::new(RwLock::new(session))
}

fn api(base: &str, session: SharedSession) -> HttpTaskApi {
    HttpTaskApi::new(base, session, Duration::from_secs(5)).unwrap()
}

fn fast_net_config() -> NetConfig {
    NetConfig {
        channel_capacity: 64,
        reconnect: ReconnectPolicy {
            initial: Duration::from_millis(20),
            max: Duration::from_millis(200),
            max_attempts: None,
        },
    }
}

fn spawn_live(base: &str) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let api = api(base, session_with(Some(TOKEN)));
    let push_url = base.replacen("http://", "ws://", 1) + "/ws";
    let source = WsEventSource::new(push_url, Duration::from_secs(2));
    net::spawn_net(api, source, fast_net_config())
}

/// Waits for the first event matching `pred`, discarding others.
async fn next_matching(
    rx: &mut mpsc::Receiver<NetEvent>,
    mut pred: impl FnMut(&NetEvent) -> bool,
) -> NetEvent {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("net channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for net event")
}

/// Activates `view` and waits until both the snapshot and the push
/// connection are in.
async fn activate(
    tx: &mpsc::Sender<NetCommand>,
    rx: &mut mpsc::Receiver<NetEvent>,
    view: ViewId,
) -> Vec<Task> {
    tx.send(NetCommand::Activate { view }).await.unwrap();
    let mut snapshot = None;
    let mut connected = false;
    tokio::time::timeout(EVENT_TIMEOUT, async {
        while snapshot.is_none() || !connected {
            match rx.recv().await.expect("net channel closed") {
                NetEvent::Snapshot { tasks, .. } => snapshot = Some(tasks),
                NetEvent::ConnectionStatus { connected: true, .. } => connected = true,
                _ => {}
            }
        }
    })
    .await
    .expect("view never became live");
    snapshot.unwrap_or_default()
}

// =============================================================================
// REST client
// =============================================================================

#[tokio::test]
async fn http_api_round_trips_every_endpoint() {
    let server = FakeServer::new();
    let base = start_server(Arc::clone(&server)).await;
    let api = api(&base, session_with(Some(TOKEN)));

    let created = api
        .create_task(&NewTask {
            title: "Write report".to_string(),
            description: Some("quarterly".to_string()),
            status: TaskStatus::Pending,
            priority: Priority::High,
            due_date: None,
        })
        .await
        .unwrap();
    assert_eq!(created.title, "Write report");
    assert_eq!(created.priority, Priority::High);

    let listed = api.list_tasks().await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let updated = api
        .update_task(&created.id, &TaskPatch::status_only(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.title, "Write report");

    let shared = api
        .share_task(
            &created.id,
            &ShareRequest {
                email_or_username: "grace".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(shared.as_deref(), Some("Task shared"));

    let err = api
        .share_task(
            &created.id,
            &ShareRequest {
                email_or_username: "nobody".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.share_message(), "User not found");

    api.delete_task(&created.id).await.unwrap();
    assert!(api.list_tasks().await.unwrap().is_empty());

    let profile: UserProfile = api.fetch_profile().await.unwrap();
    assert_eq!(profile.display_name(), "Ada Lovelace");
}

#[tokio::test]
async fn http_api_reports_auth_failures() {
    let server = FakeServer::new();
    let base = start_server(server).await;

    let anonymous = api(&base, session_with(None));
    assert!(matches!(
        anonymous.list_tasks().await,
        Err(ApiError::Unauthenticated)
    ));

    let stale = api(&base, session_with(Some("expired")));
    let err = stale.list_tasks().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(
        err,
        ApiError::Status { status: 401, message: Some(ref m) } if m == "Not authenticated"
    ));

    let missing = api(&base, session_with(Some(TOKEN)))
        .update_task(&TaskId::new("ghost"), &TaskPatch::status_only(TaskStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(missing, ApiError::Status { status: 404, .. }));
}

// =============================================================================
// Live view
// =============================================================================

#[tokio::test]
async fn live_view_receives_snapshot_and_pushes() {
    let server = FakeServer::new();
    server.insert_silently("existing");
    let base = start_server(Arc::clone(&server)).await;
    let (tx, mut rx) = spawn_live(&base);
    let view = ViewId::new(1);

    let snapshot = activate(&tx, &mut rx, view).await;
    assert_eq!(snapshot.len(), 1);
    server.wait_for_subscribers(1).await;

    // Another client creates a task; this view sees the push.
    let other = api(&base, session_with(Some(TOKEN)));
    let created = other
        .create_task(&NewTask {
            title: "from elsewhere".to_string(),
            description: None,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            due_date: None,
        })
        .await
        .unwrap();

    let event = next_matching(&mut rx, |e| matches!(e, NetEvent::Push { .. })).await;
    let NetEvent::Push { view: v, event } = event else {
        unreachable!()
    };
    assert_eq!(v, view);
    assert_eq!(event, TaskEvent::TaskCreated(created.clone()));

    // A local delete yields both the direct result and the push.
    tx.send(NetCommand::DeleteTask {
        view,
        id: created.id.clone(),
    })
    .await
    .unwrap();
    let deleted = next_matching(&mut rx, |e| matches!(e, NetEvent::Deleted { .. })).await;
    assert!(matches!(deleted, NetEvent::Deleted { id, .. } if id == created.id));
    let pushed = next_matching(&mut rx, |e| matches!(e, NetEvent::Push { .. })).await;
    assert!(matches!(
        pushed,
        NetEvent::Push { event: TaskEvent::TaskDeleted(id), .. } if id == created.id
    ));

    tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn rejected_toggle_rolls_back_app_state() {
    let server = FakeServer::new();
    server.insert_silently("flaky");
    server.fail_updates.store(true, Ordering::SeqCst);
    let base = start_server(Arc::clone(&server)).await;

    let session = session_with(Some(TOKEN));
    let (tx, mut rx) = net::spawn_net(
        api(&base, Arc::clone(&session)),
        WsEventSource::new(base.replacen("http://", "ws://", 1) + "/ws", Duration::from_secs(2)),
        fast_net_config(),
    );
    let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    let mut app = App::new(session, &base, 5, today);

    let mut cmds = app.start();
    cmds.extend(app.switch_page(Page::AllTasks));
    for cmd in cmds {
        tx.send(cmd).await.unwrap();
    }

    tokio::time::timeout(EVENT_TIMEOUT, async {
        while app.snapshot.is_empty() {
            let event = rx.recv().await.unwrap();
            app.apply_net_event(event);
        }
    })
    .await
    .expect("snapshot never arrived");

    for cmd in app.handle_key_event(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)) {
        tx.send(cmd).await.unwrap();
    }
    assert_eq!(app.snapshot.tasks()[0].status, TaskStatus::Completed);

    let failed = next_matching(&mut rx, |e| matches!(e, NetEvent::ToggleFailed { .. })).await;
    app.apply_net_event(failed);
    assert_eq!(app.snapshot.tasks()[0].status, TaskStatus::Pending);
    assert!(app.notice.as_deref().unwrap().contains("Could not update task"));

    tx.send(NetCommand::Shutdown).await.unwrap();
}

#[tokio::test]
async fn reconnect_refetches_missed_changes() {
    let server = FakeServer::new();
    let base = start_server(Arc::clone(&server)).await;
    let (tx, mut rx) = spawn_live(&base);
    let view = ViewId::new(7);

    assert!(activate(&tx, &mut rx, view).await.is_empty());
    server.wait_for_subscribers(1).await;

    // A change the push channel never announces, then a dropped connection.
    let missed = server.insert_silently("missed while offline");
    let _ = server.kick.send(());
    next_matching(&mut rx, |e| {
        matches!(e, NetEvent::ConnectionStatus { connected: false, .. })
    })
    .await;

    let refetched = next_matching(&mut rx, |e| matches!(e, NetEvent::Snapshot { .. })).await;
    let NetEvent::Snapshot { view: v, tasks } = refetched else {
        unreachable!()
    };
    assert_eq!(v, view);
    assert_eq!(tasks, vec![missed]);

    tx.send(NetCommand::Shutdown).await.unwrap();
}
