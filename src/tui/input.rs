//! Keyboard input -> Control Plane command mapping, grounded on the
//! teacher's `tui/mod.rs` key-dispatch loop (search-mode-first
//! handling, then a flat `match key.code` for playback keys).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::App;

const VOLUME_STEP: f32 = 0.05;
const SEEK_STEP_MS: i64 = 5_000;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    if app.searching {
        handle_search_key(app, key);
        return;
    }

    let control = app.engine.control();

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            control.quit();
            app.should_quit = true;
        }
        KeyCode::Char(' ') => {
            let _ = control.toggle_pause();
        }
        KeyCode::Enter => {
            let _ = control.play(control.get_focused_index());
        }
        KeyCode::Up => {
            let _ = control.focus(control.get_focused_index().saturating_sub(1));
        }
        KeyCode::Down => {
            let _ = control.focus(control.get_focused_index() + 1);
        }
        KeyCode::Char('n') => {
            let _ = control.next();
        }
        KeyCode::Char('p') => {
            let _ = control.prev();
        }
        KeyCode::Right => {
            let _ = control.seek_rel(SEEK_STEP_MS);
        }
        KeyCode::Left => {
            let _ = control.seek_rel(-SEEK_STEP_MS);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let _ = control.volume_bump(VOLUME_STEP);
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            let _ = control.volume_bump(-VOLUME_STEP);
        }
        KeyCode::Char('m') => {
            let _ = control.toggle_mute();
        }
        KeyCode::Char('r') => {
            let forward = !key.modifiers.contains(KeyModifiers::SHIFT);
            let _ = control.cycle_repeat(forward);
        }
        KeyCode::Char('/') => app.enter_search(),
        KeyCode::Char('c') => app.show_cover = !app.show_cover,
        _ => {}
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.exit_search(false),
        KeyCode::Enter => app.exit_search(true),
        KeyCode::Backspace => {
            app.search_buf.pop();
        }
        KeyCode::Char(c) => app.search_buf.push(c),
        _ => {}
    }
}
