//! A thin `ratatui` + `crossterm` terminal front end: renders the
//! engine's render snapshot and feeds keyboard input into the Control
//! Plane. Raw-mode setup with a panic hook that restores the
//! terminal, `event::poll` with a short timeout, then
//! `terminal.draw`, in a single-pane layout.

mod app;
mod input;
mod view;

use std::io::{self, stdout};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::player::{AudioEngine, EngineEvent};

pub use app::App;

const FRAME_DURATION: Duration = Duration::from_millis(33);
const POLL_TIMEOUT: Duration = Duration::from_millis(16);

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(stdout(), LeaveAlternateScreen);
}

/// Runs the T-ui loop until the user quits or the engine requests
/// shutdown. Synchronous poll, not async: blocks on input with only a
/// short timeout each frame.
pub fn run(engine: AudioEngine, show_cover: bool) -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        original_hook(info);
    }));

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    let mut app = App::new(engine, show_cover);

    let result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen)?;
    let _ = std::panic::take_hook();

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        let frame_start = Instant::now();

        if event::poll(POLL_TIMEOUT)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    input::handle_key(app, key);
                }
            }
        }

        if let Err(e) = app.engine.tick() {
            tracing::warn!("engine tick error: {}", e);
        }
        for event in app.engine.poll_events() {
            if let EngineEvent::PlaybackError(message) = event {
                app.set_notice(message);
            }
        }

        if app.should_quit || app.engine.quit_requested() {
            break;
        }

        terminal.draw(|f| view::draw(f, app))?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }

    Ok(())
}
