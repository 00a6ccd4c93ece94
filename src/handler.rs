use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, MIN_REPORT_INTERVAL};
use crate::{slurm::Reporter, ui::UI};

/// Handles the key events and updates the state of [`App`].
/// Returns true if the interface needs to be redrawn.
pub fn handle_key_events<R: Reporter>(key_event: KeyEvent, app: &mut App<R>, ui: &mut UI) -> bool {
    let mut processed = true;

    match key_event.code {
        // Exit application on `ESC` or `q`
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
            app.quit();
        }
        // Exit application on `Ctrl-C`
        KeyCode::Char('c') | KeyCode::Char('C') => {
            if key_event.modifiers == KeyModifiers::CONTROL {
                app.quit();
            } else {
                processed = false;
            }
        }
        // Toggle show/hide unavailable nodes
        KeyCode::Char('h') | KeyCode::Char('H') => {
            ui.toggle_unavailable();
        }
        // Force refresh of jobs and nodes
        KeyCode::Char('r') | KeyCode::Char('R') => {
            if app.update(1) {
                ui.update(&app.dashboard);
            } else {
                processed = false;
            }
        }
        // Force refresh of sreport summaries
        KeyCode::Char('u') | KeyCode::Char('U') => {
            if app.update_reports(MIN_REPORT_INTERVAL) {
                ui.update(&app.dashboard);
            } else {
                processed = false;
            }
        }
        // Scrolling
        KeyCode::Home => ui.scroll(isize::MIN),
        KeyCode::PageUp => ui.scroll(-10),
        KeyCode::Up => ui.scroll(-1),
        KeyCode::Down => ui.scroll(1),
        KeyCode::PageDown => ui.scroll(10),
        KeyCode::End => ui.scroll(isize::MAX),
        // Sorting
        KeyCode::Left => ui.set_sort_column(-1),
        KeyCode::Right => ui.set_sort_column(1),
        KeyCode::Char('s') | KeyCode::Char('S') => {
            ui.toggle_sort_order();
        }
        // Switch focus between nodes / jobs
        KeyCode::Tab | KeyCode::BackTab => ui.toggle_focus(),
        _ => processed = false,
    }

    processed
}

/// Handles mouse events; returns true if the interface needs to be redrawn.
pub fn handle_mouse_events(event: MouseEvent, ui: &mut UI) -> bool {
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => ui.mouse_click(event.column, event.row),
        MouseEventKind::ScrollUp => ui.mouse_wheel(event.column, event.row, -1),
        MouseEventKind::ScrollDown => ui.mouse_wheel(event.column, event.row, 1),
        _ => return false,
    }

    true
}
