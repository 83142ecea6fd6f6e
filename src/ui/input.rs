//! Input handling for the TUI.
//!
//! Keys are dispatched by view. Handlers mutate `App` and spawn whatever
//! page fetch the composer asks for.

use crate::app::{App, AppEvent, View};
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{dispatch, spawn_record_view};
use super::Action;

/// Lines scrolled by Ctrl+d / Ctrl+u in the reader.
const PAGE_SCROLL: usize = 10;

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match app.view {
        View::Browse => handle_browse_input(app, code, event_tx),
        View::Reader => handle_reader_input(app, code, modifiers),
    }
}

fn handle_browse_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
            let request = app.next_facet();
            dispatch(app, request, event_tx);
        }
        KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
            let request = app.prev_facet();
            dispatch(app, request, event_tx);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            let request = app.nav_down();
            dispatch(app, request, event_tx);
        }
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Char('m') => {
            if !app.composer.has_more() {
                app.set_status("No more posts");
            } else if app.composer.is_loading() {
                app.set_status("Already loading...");
            } else {
                let request = app.load_more();
                dispatch(app, request, event_tx);
            }
        }
        KeyCode::Enter => {
            if let Some(post) = app.enter_reader() {
                tracing::debug!(post_id = %post.id, "Opening post");
                spawn_record_view(app, post.id.clone(), event_tx);
            }
        }
        KeyCode::Esc => {
            if app.composer.error().is_some() {
                app.composer.dismiss_error();
            }
        }
        KeyCode::Char('t') => {
            let name = app.cycle_theme();
            app.set_status(format!("Theme: {}", name));
        }
        _ => {}
    }
    Action::Continue
}

fn handle_reader_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Backspace => app.exit_reader(),
        KeyCode::Char('d') if ctrl => app.scroll_down(PAGE_SCROLL),
        KeyCode::Char('u') if ctrl => app.scroll_up(PAGE_SCROLL),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_down(PAGE_SCROLL),
        KeyCode::PageUp => app.scroll_up(PAGE_SCROLL),
        KeyCode::Home | KeyCode::Char('g') => app.scroll_offset = 0,
        _ => {}
    }
    Action::Continue
}
