//! Sidebar rendering for the page list.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, Page, PanelFocus};

/// Render the sidebar with the page list and the signed-in user.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Sidebar;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = Page::ALL
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            let marker = if *page == app.page { "▸ " } else { "  " };
            let line = Line::from(vec![
                Span::raw(marker),
                Span::raw(format!("{} {}", idx + 1, page.title())),
            ]);
            let style = if idx == app.sidebar_index && is_focused {
                theme::selected()
            } else if *page == app.page {
                theme::highlighted()
            } else {
                theme::normal()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(Span::styled("Tasksync", theme::panel_title(theme::SIDEBAR_TITLE)))
        .borders(Borders::ALL)
        .border_style(theme::border(is_focused));
    frame.render_widget(List::new(items).block(block), chunks[0]);

    let user = app
        .profile
        .as_ref()
        .map_or("…", |profile| profile.display_name());
    let profile = Paragraph::new(Line::from(Span::styled(user, theme::dimmed())))
        .block(Block::default().borders(Borders::ALL).title("User"));
    frame.render_widget(profile, chunks[1]);
}
