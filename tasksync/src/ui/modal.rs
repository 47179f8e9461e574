//! Dialog rendering: create, edit, share and delete confirmation.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::theme;
use crate::app::{App, Modal};
use crate::tasks::{FormField, ShareOutcome, TaskFields};

/// A rectangle of `width` x `height` centered in `area`, clamped to fit.
#[must_use]
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);
    horizontal[1]
}

/// Render the open dialog, if any, over the page.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let Some(modal) = &app.modal else {
        return;
    };

    let (title, mut lines) = match modal {
        Modal::Create(form) => ("Add Task", field_lines(&form.fields, form.focus)),
        Modal::Edit(form) => ("Edit Task", field_lines(&form.fields, form.focus)),
        Modal::Share(form) => {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("Task: ", theme::dimmed()),
                    Span::styled(form.task_title.as_str(), theme::bold()),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Share with (email or name): ", theme::dimmed()),
                    Span::styled(format!("{}▏", form.recipient), theme::input_cursor()),
                ]),
            ];
            if let Some(outcome) = &form.outcome {
                let style = match outcome {
                    ShareOutcome::Shared => theme::normal().fg(theme::SUCCESS),
                    ShareOutcome::Failed(_) => theme::error(),
                };
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(outcome.message(), style)));
            }
            ("Share Task", lines)
        }
        Modal::ConfirmDelete { title, .. } => (
            "Delete Task",
            vec![
                Line::from(vec![
                    Span::raw("Delete "),
                    Span::styled(format!("\"{title}\""), theme::bold()),
                    Span::raw("?"),
                ]),
                Line::from(""),
                Line::from(Span::styled("y: delete | n/Esc: cancel", theme::dimmed())),
            ],
        ),
    };

    if let Some(error) = &app.modal_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.as_str(), theme::error())));
    }

    let height = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_add(2);
    let rect = centered(area, 64, height);
    let block = Block::default()
        .title(Span::styled(title, theme::highlighted()))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        rect,
    );
}

fn field_lines(fields: &TaskFields, focus: FormField) -> Vec<Line<'_>> {
    FormField::ALL
        .iter()
        .map(|&field| {
            let focused = field == focus;
            let label_style = if focused { theme::highlighted() } else { theme::dimmed() };
            let value = fields.value(field);
            let value = if field.is_selector() {
                format!("◀ {value} ▶")
            } else if focused {
                format!("{value}▏")
            } else if field == FormField::DueDate && value.is_empty() {
                "YYYY-MM-DD".to_string()
            } else {
                value.to_string()
            };
            Line::from(vec![
                Span::styled(format!("{:<12}", field.label()), label_style),
                Span::styled(value, theme::normal()),
            ])
        })
        .collect()
}
