//! Task list rendering for the all-tasks, completed and categories pages.

use chrono::NaiveDate;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use tasksync_proto::task::Task;

use super::theme;
use crate::app::{App, Page, PanelFocus};
use crate::tasks::view;

/// One task row: checkbox, title, status, priority and due date.
#[must_use]
pub fn task_item(task: &Task, today: NaiveDate) -> ListItem<'_> {
    let done = task.is_completed();
    let checkbox = if done { "[✓]" } else { "[ ]" };
    let title_style = if done { theme::dimmed() } else { theme::normal() };
    let due = view::due_state(task, today);

    let line = Line::from(vec![
        Span::styled(checkbox, title_style),
        Span::raw(" "),
        Span::styled(task.title.as_str(), title_style),
        Span::raw("  "),
        Span::styled(
            task.status.label(),
            Style::default().fg(theme::status_color(task.status)),
        ),
        Span::raw(" · "),
        Span::styled(
            task.priority.label(),
            Style::default().fg(theme::priority_color(task.priority)),
        ),
        Span::raw(" · "),
        Span::styled(view::format_due(task.due_date), theme::due(due)),
    ]);
    ListItem::new(line)
}

/// Placeholder row for an empty or loading list.
fn placeholder(app: &App) -> ListItem<'static> {
    let text = if app.snapshot.is_loaded() {
        "No tasks found."
    } else {
        "Loading…"
    };
    ListItem::new(Span::styled(text, theme::dimmed()))
}

/// Renders `items` with the cursor on `cursor`.
pub fn render_list(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    title: String,
    items: Vec<ListItem<'_>>,
    cursor: Option<usize>,
) {
    let is_focused = app.focus == PanelFocus::Content && app.modal.is_none();
    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::TASKS_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::border(is_focused));

    let list = List::new(items).block(block).highlight_style(if is_focused {
        theme::selected()
    } else {
        theme::highlighted()
    });
    let mut state = ListState::default().with_selected(cursor);
    frame.render_stateful_widget(list, area, &mut state);
}

/// Render the task list for the current page.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    match app.page {
        Page::AllTasks => render_all(frame, area, app),
        Page::Categories => render_categories(frame, area, app),
        Page::Completed | Page::Dashboard => {
            let tasks = app.visible_tasks();
            let (items, cursor) = if tasks.is_empty() {
                (vec![placeholder(app)], None)
            } else {
                let items = tasks.iter().map(|t| task_item(t, app.today)).collect();
                (items, Some(app.selected))
            };
            let title = format!("{} ({})", app.page.title(), tasks.len());
            render_list(frame, area, app, title, items, cursor);
        }
    }
}

fn render_all(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    let filter = &app.query.filter;
    let search_style = if app.search_editing {
        theme::input_cursor()
    } else {
        theme::normal()
    };
    let cursor = if app.search_editing { "▏" } else { "" };
    let filters = Line::from(vec![
        Span::styled("Search: ", theme::dimmed()),
        Span::styled(format!("{}{cursor}", filter.search), search_style),
        Span::styled("  Status: ", theme::dimmed()),
        Span::raw(filter.status.map_or("All", |s| s.label())),
        Span::styled("  Priority: ", theme::dimmed()),
        Span::raw(filter.priority.map_or("All", |p| p.label())),
        Span::styled("  Due: ", theme::dimmed()),
        Span::raw(filter.due.map_or("Any", |d| d.label())),
        Span::styled("  Sort: ", theme::dimmed()),
        Span::raw(app.query.sort.map_or("None", |s| s.label())),
    ]);
    let filter_block = Block::default()
        .borders(Borders::ALL)
        .title("Filters")
        .border_style(theme::border(app.search_editing));
    frame.render_widget(Paragraph::new(filters).block(filter_block), chunks[0]);

    let page = app.list_page();
    let (items, cursor) = if page.items.is_empty() {
        (vec![placeholder(app)], None)
    } else {
        let items = page.items.iter().map(|t| task_item(t, app.today)).collect();
        (items, Some(app.selected))
    };
    let title = format!("All Tasks ({})", page.total_matches);
    render_list(frame, chunks[1], app, title, items, cursor);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("◀ ", theme::dimmed()),
        Span::raw(format!("Page {} of {}", page.page, page.total_pages.max(1))),
        Span::styled(" ▶", theme::dimmed()),
    ]));
    frame.render_widget(footer, chunks[2]);
}

fn render_categories(frame: &mut Frame, area: Rect, app: &App) {
    let groups = app.categories();
    let mut items = Vec::new();
    let mut cursor = None;
    let mut index = 0;

    for group in &groups {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(
                format!("{} priority", group.priority.label()),
                theme::panel_title(theme::priority_color(group.priority)),
            ),
            Span::styled(format!(" ({})", group.tasks.len()), theme::dimmed()),
        ])));
        if group.tasks.is_empty() {
            items.push(ListItem::new(Span::styled("  No tasks found.", theme::dimmed())));
        }
        for task in &group.tasks {
            if index == app.selected {
                cursor = Some(items.len());
            }
            items.push(task_item(task, app.today));
            index += 1;
        }
    }

    render_list(frame, area, app, "Categories".to_string(), items, cursor);
}
