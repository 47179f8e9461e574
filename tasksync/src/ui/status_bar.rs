//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Page, PanelFocus};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.modal.is_some() {
        "Enter: submit | Tab: next field | ←→: change | Esc: close"
    } else if app.search_editing {
        "Type to search | Enter/Esc: done"
    } else {
        match (app.focus, app.page) {
            (PanelFocus::Sidebar, _) => "Tab: content | ↑↓/jk: navigate | Enter: open | q: quit",
            (PanelFocus::Content, Page::AllTasks) => {
                "n: new | Space: toggle | e/s/d: edit/share/delete | /: search | f/p/u: filters | o: sort | ←→: page"
            }
            (PanelFocus::Content, Page::Dashboard) => {
                "n: new | Space: toggle | e/s/d: edit/share/delete | /: search | [ ]: day | t: today"
            }
            (PanelFocus::Content, _) => {
                "n: new | Space: toggle | e/s/d: edit/share/delete | r: refresh | L: sign out | q: quit"
            }
        }
    };

    let (dot_color, status_text) = if app.connected {
        (theme::SUCCESS, "Live".to_string())
    } else if let Some(attempt) = app.reconnecting {
        (theme::WARNING, format!("Reconnecting (attempt {attempt})..."))
    } else {
        (theme::OFFLINE, "Offline".to_string())
    };

    let mut spans = vec![
        Span::styled(concat!("tasksync v", env!("CARGO_PKG_VERSION")), theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.as_str(), theme::normal().fg(theme::WARNING)));
        spans.push(Span::raw(" | "));
    }
    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
