//! Terminal UI rendering.

pub mod dashboard;
pub mod login;
pub mod modal;
pub mod sidebar;
pub mod status_bar;
pub mod task_panel;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, Page, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if matches!(app.screen, Screen::Login { .. }) {
        login::render(frame, area, app);
        return;
    }

    // Content above, status bar at the bottom
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(20)])
        .split(main_chunks[0]);

    sidebar::render(frame, content_chunks[0], app);
    match app.page {
        Page::Dashboard => dashboard::render(frame, content_chunks[1], app),
        Page::AllTasks | Page::Completed | Page::Categories => {
            task_panel::render(frame, content_chunks[1], app);
        }
    }
    status_bar::render(frame, main_chunks[1], app);

    modal::render(frame, area, app);
}
