//! Networking coordinator wiring the TUI to the async API and push layers.
//!
//! Bridges the synchronous TUI event loop (crossterm poll-based) with the
//! async [`TaskApi`] and [`EventSource`]. Background tokio tasks do the
//! work; the main thread talks to them through channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  tokio background tasks
//!                     ─── NetCommand →
//! ```
//!
//! Every view activation gets a fresh [`ViewId`]. All events produced on
//! behalf of a view carry its id so the UI can drop results that arrive
//! after the view was torn down. Requests are never cancelled; only the
//! push subscription is aborted on [`NetCommand::Deactivate`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::{NewTask, ShareRequest, Task, TaskId, TaskPatch};
use tasksync_proto::user::UserProfile;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiError, TaskApi};
use crate::push::{EventSource, EventStream};
use crate::tasks::PendingToggle;

/// Identifies one activation of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The id after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// Commands sent from the TUI main loop to the networking tasks.
#[derive(Debug)]
pub enum NetCommand {
    /// Load the snapshot for `view` and subscribe to push events.
    Activate { view: ViewId },
    /// Tear down the push subscription of `view`.
    Deactivate { view: ViewId },
    /// Re-fetch the snapshot for `view`.
    Refresh { view: ViewId },
    /// Create a task.
    CreateTask { view: ViewId, task: NewTask },
    /// Apply an edit.
    UpdateTask {
        view: ViewId,
        id: TaskId,
        patch: TaskPatch,
    },
    /// Send an optimistic toggle already applied locally.
    ToggleStatus {
        view: ViewId,
        toggle: PendingToggle,
        patch: TaskPatch,
    },
    /// Delete a task.
    DeleteTask { view: ViewId, id: TaskId },
    /// Share a task with another user.
    ShareTask {
        view: ViewId,
        id: TaskId,
        request: ShareRequest,
    },
    /// Fetch the signed-in user's profile.
    FetchProfile,
    /// Stop all networking tasks.
    Shutdown,
}

/// Events sent from the networking tasks to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// A bulk fetch completed; replaces the view's snapshot.
    Snapshot { view: ViewId, tasks: Vec<Task> },
    /// A bulk fetch failed; the snapshot is left as is.
    FetchFailed { view: ViewId, error: String },
    /// A push event for the view's snapshot.
    Push { view: ViewId, event: TaskEvent },
    /// A create succeeded; carries the stored record.
    Created { view: ViewId, task: Task },
    /// An edit or toggle succeeded; carries the stored record.
    Updated { view: ViewId, task: Task },
    /// A delete succeeded.
    Deleted { view: ViewId, id: TaskId },
    /// A toggle request failed and should be rolled back.
    ToggleFailed {
        view: ViewId,
        toggle: PendingToggle,
        error: String,
    },
    /// A create, edit or delete failed.
    MutationFailed {
        view: ViewId,
        action: &'static str,
        error: String,
    },
    /// A share succeeded; carries the server's message, if any.
    Shared {
        view: ViewId,
        id: TaskId,
        message: Option<String>,
    },
    /// A share failed; carries the message to display.
    ShareFailed {
        view: ViewId,
        id: TaskId,
        message: String,
    },
    /// The signed-in user's profile.
    Profile(UserProfile),
    /// The view's push connection opened or closed.
    ConnectionStatus { view: ViewId, connected: bool },
    /// The push connection will be retried after `delay`.
    Reconnecting {
        view: ViewId,
        attempt: u32,
        delay: Duration,
    },
    /// The server rejected the token; the user must sign in again.
    SessionExpired,
}

/// Exponential backoff for push reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound on any delay.
    pub max: Duration,
    /// Give up after this many consecutive failures; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based): `initial * 2^(attempt-1)`,
    /// capped at `max`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Whether retry number `attempt` is allowed.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Configuration for the networking layer.
#[derive(Debug, Clone, Copy)]
pub struct NetConfig {
    /// Channel capacity for command/event mpsc channels.
    pub channel_capacity: usize,
    /// Push reconnect backoff.
    pub reconnect: ReconnectPolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Spawn the networking tasks and return the channel handles.
///
/// Must be called from within a tokio runtime.
pub fn spawn_net<A, S>(
    api: A,
    source: S,
    config: NetConfig,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>)
where
    A: TaskApi + 'static,
    S: EventSource + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(config.channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(config.channel_capacity);

    let ctx = NetContext {
        api: Arc::new(api),
        source: Arc::new(source),
        evt_tx,
        reconnect: config.reconnect,
    };
    tokio::spawn(command_handler(ctx, cmd_rx));

    (cmd_tx, evt_rx)
}

/// Shared handles cloned into every spawned task.
struct NetContext<A, S> {
    api: Arc<A>,
    source: Arc<S>,
    evt_tx: mpsc::Sender<NetEvent>,
    reconnect: ReconnectPolicy,
}

impl<A, S> Clone for NetContext<A, S> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            source: Arc::clone(&self.source),
            evt_tx: self.evt_tx.clone(),
            reconnect: self.reconnect,
        }
    }
}

impl<A: TaskApi + 'static, S: EventSource + 'static> NetContext<A, S> {
    async fn emit(&self, event: NetEvent) {
        let _ = self.evt_tx.send(event).await;
    }

    /// Emits `SessionExpired` for auth failures. Returns the error text.
    async fn note_failure(&self, err: &ApiError) -> String {
        if err.is_unauthorized() {
            self.emit(NetEvent::SessionExpired).await;
        }
        err.to_string()
    }

    async fn fetch_snapshot(&self, view: ViewId) {
        match self.api.list_tasks().await {
            Ok(tasks) => {
                tracing::debug!(%view, count = tasks.len(), "snapshot fetched");
                self.emit(NetEvent::Snapshot { view, tasks }).await;
            }
            Err(e) => {
                tracing::warn!(%view, err = %e, "task fetch failed");
                let error = self.note_failure(&e).await;
                self.emit(NetEvent::FetchFailed { view, error }).await;
            }
        }
    }
}

/// Background task: dispatch commands from the TUI main loop.
///
/// Each request runs on its own task so a slow call never blocks the
/// next command.
async fn command_handler<A, S>(ctx: NetContext<A, S>, mut cmd_rx: mpsc::Receiver<NetCommand>)
where
    A: TaskApi + 'static,
    S: EventSource + 'static,
{
    let mut subscriptions: HashMap<ViewId, JoinHandle<()>> = HashMap::new();

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            NetCommand::Activate { view } => {
                tracing::debug!(%view, "activating view");
                let fetch_ctx = ctx.clone();
                tokio::spawn(async move { fetch_ctx.fetch_snapshot(view).await });
                let handle = tokio::spawn(push_loop(ctx.clone(), view));
                if let Some(old) = subscriptions.insert(view, handle) {
                    old.abort();
                }
            }
            NetCommand::Deactivate { view } => {
                if let Some(handle) = subscriptions.remove(&view) {
                    handle.abort();
                    tracing::debug!(%view, "view deactivated");
                }
            }
            NetCommand::Refresh { view } => {
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.fetch_snapshot(view).await });
            }
            NetCommand::CreateTask { view, task } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.create_task(&task).await {
                        Ok(task) => ctx.emit(NetEvent::Created { view, task }).await,
                        Err(e) => {
                            tracing::warn!(err = %e, "create failed");
                            let error = ctx.note_failure(&e).await;
                            ctx.emit(NetEvent::MutationFailed {
                                view,
                                action: "create",
                                error,
                            })
                            .await;
                        }
                    }
                });
            }
            NetCommand::UpdateTask { view, id, patch } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.update_task(&id, &patch).await {
                        Ok(task) => ctx.emit(NetEvent::Updated { view, task }).await,
                        Err(e) => {
                            tracing::warn!(task_id = %id, err = %e, "update failed");
                            let error = ctx.note_failure(&e).await;
                            ctx.emit(NetEvent::MutationFailed {
                                view,
                                action: "update",
                                error,
                            })
                            .await;
                        }
                    }
                });
            }
            NetCommand::ToggleStatus {
                view,
                toggle,
                patch,
            } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.update_task(&toggle.id, &patch).await {
                        Ok(task) => ctx.emit(NetEvent::Updated { view, task }).await,
                        Err(e) => {
                            tracing::warn!(task_id = %toggle.id, err = %e, "toggle failed, rolling back");
                            let error = ctx.note_failure(&e).await;
                            ctx.emit(NetEvent::ToggleFailed {
                                view,
                                toggle,
                                error,
                            })
                            .await;
                        }
                    }
                });
            }
            NetCommand::DeleteTask { view, id } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.delete_task(&id).await {
                        Ok(()) => ctx.emit(NetEvent::Deleted { view, id }).await,
                        Err(e) => {
                            tracing::warn!(task_id = %id, err = %e, "delete failed");
                            let error = ctx.note_failure(&e).await;
                            ctx.emit(NetEvent::MutationFailed {
                                view,
                                action: "delete",
                                error,
                            })
                            .await;
                        }
                    }
                });
            }
            NetCommand::ShareTask { view, id, request } => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.share_task(&id, &request).await {
                        Ok(message) => ctx.emit(NetEvent::Shared { view, id, message }).await,
                        Err(e) => {
                            tracing::warn!(task_id = %id, err = %e, "share failed");
                            ctx.note_failure(&e).await;
                            let message = e.share_message();
                            ctx.emit(NetEvent::ShareFailed { view, id, message }).await;
                        }
                    }
                });
            }
            NetCommand::FetchProfile => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    match ctx.api.fetch_profile().await {
                        Ok(profile) => ctx.emit(NetEvent::Profile(profile)).await,
                        Err(e) => {
                            tracing::warn!(err = %e, "profile fetch failed");
                            ctx.note_failure(&e).await;
                        }
                    }
                });
            }
            NetCommand::Shutdown => {
                tracing::info!("net command handler shutting down");
                break;
            }
        }
    }

    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
}

/// Background task: the push subscription of one view.
///
/// Forwards events tagged with `view`. When the connection drops it
/// reconnects with exponential backoff, and after every successful
/// reconnect re-fetches the snapshot so events missed in the gap are
/// recovered.
async fn push_loop<A, S>(ctx: NetContext<A, S>, view: ViewId)
where
    A: TaskApi + 'static,
    S: EventSource + 'static,
{
    let mut failures: u32 = 0;
    let mut connected_before = false;

    loop {
        match ctx.source.connect().await {
            Ok(mut stream) => {
                failures = 0;
                ctx.emit(NetEvent::ConnectionStatus {
                    view,
                    connected: true,
                })
                .await;
                if connected_before {
                    tracing::info!(%view, "push reconnected, re-fetching snapshot");
                    ctx.fetch_snapshot(view).await;
                }
                connected_before = true;

                while let Ok(event) = stream.next_event().await {
                    if ctx.evt_tx.send(NetEvent::Push { view, event }).await.is_err() {
                        // TUI dropped; exit.
                        return;
                    }
                }
                tracing::info!(%view, "push stream closed");
                ctx.emit(NetEvent::ConnectionStatus {
                    view,
                    connected: false,
                })
                .await;
            }
            Err(e) => {
                tracing::warn!(%view, err = %e, "push connect failed");
            }
        }

        failures = failures.saturating_add(1);
        if !ctx.reconnect.allows(failures) {
            tracing::warn!(%view, attempts = failures, "giving up on push reconnect");
            return;
        }
        let delay = ctx.reconnect.delay(failures);
        ctx.emit(NetEvent::Reconnecting {
            view,
            attempt: failures,
            delay,
        })
        .await;
        tokio::time::sleep(delay).await;
    }
}
