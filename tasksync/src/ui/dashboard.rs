//! Dashboard rendering: stats, today, upcoming and the calendar day.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use tasksync_proto::task::{Task, TaskStatus};

use super::{task_panel, theme};
use crate::app::App;
use crate::tasks::view::DashboardStats;

/// Render the dashboard page.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let dashboard = app.dashboard();
    render_stats(frame, rows[0], &dashboard.stats);
    render_search(frame, rows[1], app);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[2]);
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    render_section(frame, sections[0], "Today", &dashboard.today, app);
    render_section(frame, sections[1], "Upcoming", &dashboard.upcoming, app);

    let tasks = app.visible_tasks();
    let title = if app.dashboard_search.trim().is_empty() {
        format!("{} ({})", app.selected_date.format("%a %b %-d, %Y"), tasks.len())
    } else {
        format!("Search results ({})", tasks.len())
    };
    let (items, cursor) = if tasks.is_empty() {
        (
            vec![ListItem::new(Span::styled("No tasks found.", theme::dimmed()))],
            None,
        )
    } else {
        let items = tasks.iter().map(|t| task_panel::task_item(t, app.today)).collect();
        (items, Some(app.selected))
    };
    task_panel::render_list(frame, columns[1], app, title, items, cursor);
}

fn render_stats(frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let stat = |label: &'static str, count: usize, status: Option<TaskStatus>| {
        let color = status.map_or(theme::FG_PRIMARY, theme::status_color);
        vec![
            Span::styled(format!("{label}: "), theme::dimmed()),
            Span::styled(count.to_string(), Style::default().fg(color)),
            Span::styled(format!(" ({:.0}%)  ", stats.percent(count)), theme::dimmed()),
        ]
    };
    let mut spans = vec![
        Span::styled("Total: ", theme::dimmed()),
        Span::styled(format!("{}  ", stats.total), theme::bold()),
    ];
    spans.extend(stat("Completed", stats.completed, Some(TaskStatus::Completed)));
    spans.extend(stat("In progress", stats.in_progress, Some(TaskStatus::InProgress)));
    spans.extend(stat("Pending", stats.pending, Some(TaskStatus::Pending)));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled("Overview", theme::panel_title(theme::DASHBOARD_TITLE)));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_search(frame: &mut Frame, area: Rect, app: &App) {
    let cursor = if app.search_editing { "▏" } else { "" };
    let text = if app.dashboard_search.is_empty() && !app.search_editing {
        Span::styled("Press / to search title or description", theme::dimmed())
    } else {
        Span::styled(format!("{}{cursor}", app.dashboard_search), theme::input_cursor())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Search")
        .border_style(theme::border(app.search_editing));
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);
}

fn render_section(frame: &mut Frame, area: Rect, title: &str, tasks: &[&Task], app: &App) {
    let items: Vec<ListItem> = if tasks.is_empty() {
        vec![ListItem::new(Span::styled("No tasks found.", theme::dimmed()))]
    } else {
        tasks.iter().map(|t| task_panel::task_item(t, app.today)).collect()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!("{title} ({})", tasks.len()),
            theme::panel_title(theme::DASHBOARD_TITLE),
        ));
    frame.render_widget(List::new(items).block(block), area);
}
