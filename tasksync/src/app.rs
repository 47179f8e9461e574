//! Application state and event handling.
//!
//! [`App`] is driven by two inputs: key presses from the terminal
//! ([`App::handle_key_event`]) and results from the networking layer
//! ([`App::apply_net_event`]). Both return the [`NetCommand`]s the main
//! loop should forward.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tasksync_proto::task::{Task, TaskId};
use tasksync_proto::user::UserProfile;

use crate::api::SharedSession;
use crate::net::{NetCommand, NetEvent, ViewId};
use crate::session::Session;
use crate::tasks::view::{self, Dashboard, ListQuery, Page as ListPage, PriorityGroup};
use crate::tasks::{
    CreateForm, EditForm, FormField, ShareForm, ShareOutcome, TaskFields, TaskSnapshot,
    begin_toggle,
};

/// Top-level pages reachable from the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Stats, today, upcoming and calendar.
    Dashboard,
    /// Filterable, sortable, paginated list.
    AllTasks,
    /// Completed tasks only.
    Completed,
    /// Tasks grouped by priority.
    Categories,
}

impl Page {
    /// Sidebar order.
    pub const ALL: [Self; 4] = [
        Self::Dashboard,
        Self::AllTasks,
        Self::Completed,
        Self::Categories,
    ];

    /// Sidebar label.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::AllTasks => "All Tasks",
            Self::Completed => "Completed",
            Self::Categories => "Categories",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Dashboard => 0,
            Self::AllTasks => 1,
            Self::Completed => 2,
            Self::Categories => 3,
        }
    }
}

/// Which panel receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Page list.
    Sidebar,
    /// Page content.
    Content,
}

/// Signed-out or signed-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Waiting for the login redirect URL (or a raw token).
    Login {
        /// Text typed so far.
        input: String,
        /// Last login error.
        error: Option<String>,
    },
    /// Signed in.
    Main,
}

/// Overlay dialogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    /// Add-task form.
    Create(CreateForm),
    /// Edit-task form.
    Edit(EditForm),
    /// Share-task form.
    Share(ShareForm),
    /// Delete confirmation.
    ConfirmDelete { id: TaskId, title: String },
}

/// Main application state.
pub struct App {
    /// Signed-in state.
    pub screen: Screen,
    /// Browser login URL shown on the login screen.
    pub login_url: String,
    /// Current page.
    pub page: Page,
    /// Focused panel.
    pub focus: PanelFocus,
    /// Sidebar cursor.
    pub sidebar_index: usize,
    /// Active view; events for any other view are discarded.
    pub view: Option<ViewId>,
    next_view: ViewId,
    /// Tasks of the active view.
    pub snapshot: TaskSnapshot,
    /// Filter, sort and page of the all-tasks page.
    pub query: ListQuery,
    /// Dashboard search text.
    pub dashboard_search: String,
    /// Whether keys go to the search box.
    pub search_editing: bool,
    /// Calendar date on the dashboard.
    pub selected_date: NaiveDate,
    /// Cursor in the visible task list.
    pub selected: usize,
    /// Open dialog.
    pub modal: Option<Modal>,
    /// Validation error shown in the open dialog.
    pub modal_error: Option<String>,
    /// Signed-in user's profile.
    pub profile: Option<UserProfile>,
    /// Whether the push connection is open.
    pub connected: bool,
    /// Current reconnect attempt, if reconnecting.
    pub reconnecting: Option<u32>,
    /// One-line message for the status bar.
    pub notice: Option<String>,
    /// Local calendar date used by every date comparison.
    pub today: NaiveDate,
    /// Whether the app should quit.
    pub should_quit: bool,
    session: SharedSession,
}

impl App {
    /// Creates the app. Starts on the login screen unless `session` holds
    /// a token.
    #[must_use]
    pub fn new(session: SharedSession, api_url: &str, page_size: usize, today: NaiveDate) -> Self {
        let screen = if session.read().is_authenticated() {
            Screen::Main
        } else {
            Screen::Login {
                input: String::new(),
                error: None,
            }
        };
        Self {
            screen,
            login_url: Session::login_url(api_url),
            page: Page::Dashboard,
            focus: PanelFocus::Content,
            sidebar_index: 0,
            view: None,
            next_view: ViewId::new(1),
            snapshot: TaskSnapshot::new(),
            query: ListQuery {
                page_size,
                ..ListQuery::default()
            },
            dashboard_search: String::new(),
            search_editing: false,
            selected_date: today,
            selected: 0,
            modal: None,
            modal_error: None,
            profile: None,
            connected: false,
            reconnecting: None,
            notice: None,
            today,
            should_quit: false,
            session,
        }
    }

    /// Commands to issue at startup: profile plus the first view when
    /// already signed in.
    pub fn start(&mut self) -> Vec<NetCommand> {
        if self.screen == Screen::Main {
            let mut cmds = vec![NetCommand::FetchProfile];
            cmds.extend(self.activate_page());
            cmds
        } else {
            Vec::new()
        }
    }

    /// Updates the local date (called every tick).
    pub fn set_today(&mut self, today: NaiveDate) {
        if today != self.today {
            if self.selected_date == self.today {
                self.selected_date = today;
            }
            self.today = today;
        }
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// The all-tasks page as currently filtered.
    #[must_use]
    pub fn list_page(&self) -> ListPage<'_> {
        view::compose(self.snapshot.tasks(), &self.query, self.today)
    }

    /// The dashboard sections.
    #[must_use]
    pub fn dashboard(&self) -> Dashboard<'_> {
        view::dashboard(self.snapshot.tasks(), &self.dashboard_search, self.today)
    }

    /// Priority groups for the categories page.
    #[must_use]
    pub fn categories(&self) -> Vec<PriorityGroup<'_>> {
        view::group_by_priority(self.snapshot.tasks())
    }

    /// The selectable task list of the current page, in display order.
    #[must_use]
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let tasks = self.snapshot.tasks();
        match self.page {
            Page::Dashboard => {
                if self.dashboard_search.trim().is_empty() {
                    view::tasks_on(tasks, self.selected_date)
                } else {
                    self.dashboard().matches
                }
            }
            Page::AllTasks => self.list_page().items,
            Page::Completed => view::completed_tasks(tasks),
            Page::Categories => self
                .categories()
                .into_iter()
                .flat_map(|group| group.tasks)
                .collect(),
        }
    }

    /// The task under the cursor.
    #[must_use]
    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.selected).copied()
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.selected_task().map(|t| t.id.clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_tasks().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Text in the active search box.
    #[must_use]
    pub fn search_text(&self) -> &str {
        match self.page {
            Page::Dashboard => &self.dashboard_search,
            _ => &self.query.filter.search,
        }
    }

    // -----------------------------------------------------------------------
    // View lifecycle
    // -----------------------------------------------------------------------

    /// Tears down the active view (if any) and activates a fresh one for
    /// the current page with an empty snapshot.
    fn activate_page(&mut self) -> Vec<NetCommand> {
        let mut cmds = self.deactivate_view();
        let view = self.next_view;
        self.next_view = view.next();
        self.view = Some(view);
        self.snapshot = TaskSnapshot::new();
        self.selected = 0;
        self.connected = false;
        self.reconnecting = None;
        tracing::debug!(%view, page = self.page.title(), "activating page");
        cmds.push(NetCommand::Activate { view });
        cmds
    }

    fn deactivate_view(&mut self) -> Vec<NetCommand> {
        self.view
            .take()
            .map(|view| NetCommand::Deactivate { view })
            .into_iter()
            .collect()
    }

    /// Switches to `page`, replacing the active view.
    pub fn switch_page(&mut self, page: Page) -> Vec<NetCommand> {
        if page == self.page && self.view.is_some() {
            return Vec::new();
        }
        self.page = page;
        self.sidebar_index = page.index();
        self.search_editing = false;
        self.query = ListQuery {
            page_size: self.query.page_size,
            ..ListQuery::default()
        };
        self.dashboard_search.clear();
        self.selected_date = self.today;
        self.activate_page()
    }

    fn is_live(&self, view: ViewId) -> bool {
        self.view == Some(view)
    }

    // -----------------------------------------------------------------------
    // Network events
    // -----------------------------------------------------------------------

    /// Applies a result from the networking layer.
    ///
    /// Events tagged with a view other than the active one are dropped.
    pub fn apply_net_event(&mut self, event: NetEvent) -> Vec<NetCommand> {
        match event {
            NetEvent::Snapshot { view, tasks } if self.is_live(view) => {
                self.snapshot.replace_all(tasks);
            }
            NetEvent::FetchFailed { view, error } if self.is_live(view) => {
                self.notice = Some(format!("Could not load tasks: {error}"));
            }
            NetEvent::Push { view, event } if self.is_live(view) => {
                self.snapshot.apply(&event);
            }
            NetEvent::Created { view, task } if self.is_live(view) => {
                self.notice = Some(format!("Created \"{}\"", task.title));
                self.snapshot.prepend(task);
            }
            NetEvent::Updated { view, task } if self.is_live(view) => {
                self.snapshot.replace(task);
            }
            NetEvent::Deleted { view, id } if self.is_live(view) => {
                self.snapshot.remove(&id);
            }
            NetEvent::ToggleFailed {
                view,
                toggle,
                error,
            } if self.is_live(view) => {
                toggle.rollback(&mut self.snapshot);
                self.notice = Some(format!("Could not update task: {error}"));
            }
            NetEvent::MutationFailed {
                view,
                action,
                error,
            } if self.is_live(view) => {
                self.notice = Some(format!("Could not {action} task: {error}"));
            }
            NetEvent::Shared { view, id, message } if self.is_live(view) => {
                tracing::debug!(task_id = %id, ?message, "share confirmed");
                self.set_share_outcome(&id, ShareOutcome::Shared);
                // The shared-with list lives on the server record.
                return vec![NetCommand::Refresh { view }];
            }
            NetEvent::ShareFailed { view, id, message } if self.is_live(view) => {
                self.set_share_outcome(&id, ShareOutcome::Failed(message));
            }
            NetEvent::Profile(profile) => {
                self.session.write().set_profile(profile.clone());
                self.profile = Some(profile);
            }
            NetEvent::ConnectionStatus { view, connected } if self.is_live(view) => {
                self.connected = connected;
                if connected {
                    self.reconnecting = None;
                }
            }
            NetEvent::Reconnecting { view, attempt, .. } if self.is_live(view) => {
                self.reconnecting = Some(attempt);
            }
            NetEvent::SessionExpired => return self.sign_out("Session expired, please sign in again"),
            stale => {
                tracing::trace!(?stale, "dropping event for inactive view");
            }
        }
        self.clamp_selection();
        Vec::new()
    }

    /// Undoes local effects of a command the networking layer never
    /// accepted. An optimistic toggle is rolled back.
    pub fn command_rejected(&mut self, cmd: NetCommand, reason: &str) {
        tracing::warn!(?cmd, reason, "command not delivered");
        if let NetCommand::ToggleStatus { toggle, .. } = cmd {
            toggle.rollback(&mut self.snapshot);
            self.clamp_selection();
        }
        self.notice = Some(reason.to_string());
    }

    fn set_share_outcome(&mut self, id: &TaskId, outcome: ShareOutcome) {
        if let Some(Modal::Share(form)) = &mut self.modal {
            if &form.task_id == id {
                if outcome == ShareOutcome::Shared {
                    form.recipient.clear();
                }
                form.outcome = Some(outcome);
            }
        }
    }

    fn sign_out(&mut self, reason: &str) -> Vec<NetCommand> {
        if let Err(e) = self.session.write().logout() {
            tracing::warn!(err = %e, "failed to clear stored session");
        }
        self.profile = None;
        self.modal = None;
        self.snapshot = TaskSnapshot::new();
        self.screen = Screen::Login {
            input: String::new(),
            error: Some(reason.to_string()),
        };
        self.deactivate_view()
    }

    // -----------------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------------

    /// Handles a key press.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Vec<NetCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Vec::new();
        }
        if matches!(self.screen, Screen::Login { .. }) {
            return self.handle_login_key(key);
        }
        if self.modal.is_some() {
            return self.handle_modal_key(key);
        }
        if self.search_editing {
            self.handle_search_key(key);
            return Vec::new();
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return Vec::new();
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    PanelFocus::Sidebar => PanelFocus::Content,
                    PanelFocus::Content => PanelFocus::Sidebar,
                };
                return Vec::new();
            }
            KeyCode::Char(c @ '1'..='4') => {
                let index = usize::from(c as u8 - b'1');
                return self.switch_page(Page::ALL[index]);
            }
            KeyCode::Char('L') => return self.sign_out("Signed out"),
            _ => {}
        }

        match self.focus {
            PanelFocus::Sidebar => self.handle_sidebar_key(key),
            PanelFocus::Content => self.handle_content_key(key),
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) -> Vec<NetCommand> {
        let Screen::Login { input, error } = &mut self.screen else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let text = input.trim().to_string();
                if text.is_empty() {
                    return Vec::new();
                }
                let result = {
                    let mut session = self.session.write();
                    if text.contains("://") {
                        session.complete_login(&text)
                    } else {
                        session.set_token(text)
                    }
                };
                match result {
                    Ok(()) => {
                        self.screen = Screen::Main;
                        self.notice = Some("Signed in".to_string());
                        return self.start();
                    }
                    Err(e) => *error = Some(e.to_string()),
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Vec<NetCommand> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.sidebar_index = self.sidebar_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.sidebar_index = (self.sidebar_index + 1).min(Page::ALL.len() - 1);
            }
            KeyCode::Enter => {
                self.focus = PanelFocus::Content;
                return self.switch_page(Page::ALL[self.sidebar_index]);
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let search = match self.page {
            Page::Dashboard => &mut self.dashboard_search,
            _ => &mut self.query.filter.search,
        };
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.search_editing = false,
            KeyCode::Char(c) => search.push(c),
            KeyCode::Backspace => {
                search.pop();
            }
            _ => {}
        }
        self.query.page = 1;
        self.selected = 0;
    }

    fn handle_content_key(&mut self, key: KeyEvent) -> Vec<NetCommand> {
        let Some(view) = self.view else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected += 1;
                self.clamp_selection();
            }
            KeyCode::Char('/') if matches!(self.page, Page::Dashboard | Page::AllTasks) => {
                self.search_editing = true;
            }
            KeyCode::Char('n' | 'a') => self.open_modal(Modal::Create(CreateForm::default())),
            KeyCode::Char('r') => return vec![NetCommand::Refresh { view }],
            KeyCode::Char(' ') | KeyCode::Enter => return self.toggle_selected(view),
            KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    let form = EditForm::from_task(task);
                    self.open_modal(Modal::Edit(form));
                }
            }
            KeyCode::Char('s') => {
                if let Some(task) = self.selected_task() {
                    let form = ShareForm::for_task(task);
                    self.open_modal(Modal::Share(form));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    let modal = Modal::ConfirmDelete {
                        id: task.id.clone(),
                        title: task.title.clone(),
                    };
                    self.open_modal(modal);
                }
            }
            _ => self.handle_page_key(key),
        }
        Vec::new()
    }

    /// Page-specific keys: filters and paging on the all-tasks page, date
    /// navigation on the dashboard.
    fn handle_page_key(&mut self, key: KeyEvent) {
        match (self.page, key.code) {
            (Page::AllTasks, KeyCode::Char('f')) => self.query.filter.cycle_status(),
            (Page::AllTasks, KeyCode::Char('p')) => self.query.filter.cycle_priority(),
            (Page::AllTasks, KeyCode::Char('u')) => self.query.filter.cycle_due(),
            (Page::AllTasks, KeyCode::Char('o')) => {
                self.query.sort = Some(self.query.sort.unwrap_or_default().toggled());
            }
            (Page::AllTasks, KeyCode::Char('c')) => {
                self.query.filter = view::TaskFilter::default();
            }
            (Page::AllTasks, KeyCode::Right | KeyCode::Char('l')) => {
                if self.query.page < self.list_page().total_pages {
                    self.query.page += 1;
                }
                self.selected = 0;
                return;
            }
            (Page::AllTasks, KeyCode::Left | KeyCode::Char('h')) => {
                self.query.page = self.query.page.saturating_sub(1).max(1);
                self.selected = 0;
                return;
            }
            (Page::Dashboard, KeyCode::Char(']') | KeyCode::Right) => {
                self.selected_date = self.selected_date.succ_opt().unwrap_or(self.selected_date);
            }
            (Page::Dashboard, KeyCode::Char('[') | KeyCode::Left) => {
                self.selected_date = self.selected_date.pred_opt().unwrap_or(self.selected_date);
            }
            (Page::Dashboard, KeyCode::Char('t')) => self.selected_date = self.today,
            _ => return,
        }
        // Filter changes reset to the first page.
        if self.page == Page::AllTasks {
            self.query.page = 1;
        }
        self.selected = 0;
    }

    fn toggle_selected(&mut self, view: ViewId) -> Vec<NetCommand> {
        let Some(id) = self.selected_id() else {
            return Vec::new();
        };
        let Some((toggle, patch)) = begin_toggle(&mut self.snapshot, &id) else {
            return Vec::new();
        };
        self.clamp_selection();
        vec![NetCommand::ToggleStatus {
            view,
            toggle,
            patch,
        }]
    }

    fn open_modal(&mut self, modal: Modal) {
        self.modal = Some(modal);
        self.modal_error = None;
    }

    fn close_modal(&mut self) {
        self.modal = None;
        self.modal_error = None;
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Vec<NetCommand> {
        let Some(view) = self.view else {
            self.close_modal();
            return Vec::new();
        };
        if key.code == KeyCode::Esc {
            self.close_modal();
            return Vec::new();
        }
        let Some(modal) = self.modal.as_mut() else {
            return Vec::new();
        };

        match modal {
            Modal::Create(form) => {
                if key.code == KeyCode::Enter {
                    match form.submit() {
                        Ok(task) => {
                            self.close_modal();
                            return vec![NetCommand::CreateTask { view, task }];
                        }
                        Err(e) => self.modal_error = Some(e.to_string()),
                    }
                } else {
                    edit_fields(&mut form.fields, &mut form.focus, key);
                }
            }
            Modal::Edit(form) => {
                if key.code == KeyCode::Enter {
                    match form.to_patch() {
                        Ok(patch) => {
                            let id = form.id.clone();
                            self.close_modal();
                            return vec![NetCommand::UpdateTask { view, id, patch }];
                        }
                        Err(e) => self.modal_error = Some(e.to_string()),
                    }
                } else {
                    edit_fields(&mut form.fields, &mut form.focus, key);
                }
            }
            Modal::Share(form) => match key.code {
                KeyCode::Enter => match form.to_request() {
                    Ok(request) => {
                        form.outcome = None;
                        self.modal_error = None;
                        return vec![NetCommand::ShareTask {
                            view,
                            id: form.task_id.clone(),
                            request,
                        }];
                    }
                    Err(e) => self.modal_error = Some(e.to_string()),
                },
                KeyCode::Char(c) => form.recipient.push(c),
                KeyCode::Backspace => {
                    form.recipient.pop();
                }
                _ => {}
            },
            Modal::ConfirmDelete { id, .. } => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let id = id.clone();
                    self.close_modal();
                    return vec![NetCommand::DeleteTask { view, id }];
                }
                KeyCode::Char('n') => self.close_modal(),
                _ => {}
            },
        }
        Vec::new()
    }
}

/// Shared key handling for the create and edit forms.
fn edit_fields(fields: &mut TaskFields, focus: &mut FormField, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => *focus = focus.next(),
        KeyCode::BackTab | KeyCode::Up => *focus = focus.prev(),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if focus.is_selector() => {
            fields.cycle(*focus);
        }
        KeyCode::Char(c) => {
            if let Some(text) = fields.text_mut(*focus) {
                text.push(c);
            }
        }
        KeyCode::Backspace => {
            if let Some(text) = fields.text_mut(*focus) {
                text.pop();
            }
        }
        _ => {}
    }
}
