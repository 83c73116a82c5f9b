//! TUI application state: wraps the [`AudioEngine`] with the bits of
//! state that exist purely for rendering (search-box edit mode, quit
//! flag, the transient error notice) and have no meaning to the core
//! engine.

use std::time::{Duration, Instant};

use crate::player::AudioEngine;

/// How long a surfaced [`crate::player::EngineEvent::PlaybackError`]
/// stays on screen before the footer reverts to the normal status line.
const NOTICE_DURATION: Duration = Duration::from_secs(4);

pub struct App {
    pub engine: AudioEngine,
    pub searching: bool,
    pub search_buf: String,
    pub show_cover: bool,
    pub should_quit: bool,
    notice: Option<(String, Instant)>,
}

impl App {
    pub fn new(engine: AudioEngine, show_cover: bool) -> Self {
        Self {
            engine,
            searching: false,
            search_buf: String::new(),
            show_cover,
            should_quit: false,
            notice: None,
        }
    }

    pub fn enter_search(&mut self) {
        self.searching = true;
        self.search_buf = self.engine.control().get_filter();
    }

    pub fn exit_search(&mut self, apply: bool) {
        if apply {
            let _ = self.engine.control().search(&self.search_buf);
        }
        self.searching = false;
    }

    pub fn set_notice(&mut self, message: String) {
        self.notice = Some((message, Instant::now()));
    }

    /// The current notice text, if one is set and hasn't yet expired.
    pub fn active_notice(&self) -> Option<&str> {
        let (message, shown_at) = self.notice.as_ref()?;
        if shown_at.elapsed() < NOTICE_DURATION {
            Some(message.as_str())
        } else {
            None
        }
    }
}
