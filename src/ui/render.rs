//! Render functions for the TUI.
//!
//! Dispatches to the browse or reader view and guards against terminals
//! too small to draw them.

use crate::app::{App, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    widgets::Paragraph,
    Frame,
};

use super::{posts, reader, status, tabs};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    match app.view {
        View::Browse => render_browse(f, app),
        View::Reader => render_reader(f, app),
    }
}

/// Tab bar, post list, status bar.
fn render_browse(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    tabs::render(f, app, chunks[0]);
    posts::render(f, app, chunks[1]);
    status::render(f, app, chunks[2]);
}

fn render_reader(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    reader::render(f, app, chunks[0]);
    status::render(f, app, chunks[1]);
}
