//! Sign-in screen.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::{modal, theme};
use crate::app::{App, Screen};

/// Render the sign-in screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let Screen::Login { input, error } = &app.screen else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled("Sign in with Google", theme::bold())),
        Line::from(""),
        Line::from(Span::styled("1. Open this address in a browser:", theme::dimmed())),
        Line::from(Span::styled(app.login_url.as_str(), theme::highlighted())),
        Line::from(""),
        Line::from(Span::styled(
            "2. Paste the address you are redirected to (or the token) below:",
            theme::dimmed(),
        )),
        Line::from(Span::styled(format!("> {input}▏"), theme::input_cursor())),
    ];
    if let Some(error) = error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.as_str(), theme::error())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Enter: sign in | Esc: quit", theme::dimmed())));

    let rect = modal::centered(area, 80, 14);
    let block = Block::default()
        .title(Span::styled("tasksync", theme::highlighted()))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}
