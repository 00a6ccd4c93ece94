use std::fmt::Display;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    symbols::border,
    text::Text,
    widgets::{Block, Borders, Paragraph, TableState, Widget, Wrap},
};

pub const COLUMN_SPACING: u16 = 2;

/// Moves the selection by `delta` rows, clamped to the table
pub fn scroll(state: &mut TableState, items: usize, delta: isize) -> Option<usize> {
    let selection = if items == 0 {
        None
    } else {
        Some(
            (state.selected().unwrap_or_default() as isize + delta).clamp(0, items as isize - 1)
                as usize,
        )
    };

    state.select(selection);
    selection
}

/// Selects the row at `row` lines below the top of a table with one header line
pub fn click(state: &mut TableState, items: usize, row: usize) {
    let idx = state.offset().saturating_add(row);
    if idx >= 1 && idx <= items {
        state.select(Some(idx - 1));
    }
}

/// Right aligns displayable value
pub fn right_align_text<'a, T: Display>(v: T) -> Text<'a> {
    Text::from(v.to_string()).alignment(Alignment::Right)
}

/// Creates a `height`/`width` Rect centered in the specified `area`
pub fn center_layout(area: Rect, width: u16, height: u16) -> Option<Rect> {
    if width > area.width || height > area.height {
        return None;
    }

    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);

    Some(area)
}

/// Renders a short boxed message in the center of `area`, e.g. in place of an empty table
pub fn render_notice(area: Rect, buf: &mut Buffer, message: &str) {
    // Size of message + surrounding border, wrapping long messages
    let width = (message.chars().count() as u16 + 2).min(area.width);
    let height = (message.chars().count() as u16).div_ceil(width.saturating_sub(2).max(1)) + 2;

    if let Some(area) = center_layout(area, width, height) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_set(border::PLAIN);

        Paragraph::new(message)
            .wrap(Wrap { trim: true })
            .block(block)
            .render(area, buf);
    }
}

pub fn mb_to_string(mb: usize) -> String {
    if mb < 1024 {
        format!("{}M", mb)
    } else if mb < 1048576 {
        format!("{:.1}G", mb as f64 / 1024.0)
    } else {
        format!("{:.1}T", mb as f64 / 1048576.0)
    }
}
