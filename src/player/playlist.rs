//! Playlist Controller: song list, focus/selection indices, search
//! filter, and repeat semantics.
//!
//! Tracks three indices rather than a single playing position —
//! `songs` / `filter_indices` / `focused_filter_index` /
//! `selected_song_index` — so that browsing a filtered view never
//! disturbs what's actually playing. The repeat-mode decision tree and
//! the order-preserving, case-insensitive substring filter are the
//! core of `on_song_end`/`substring_search` below.

use crate::model::{RepeatMode, Song};

/// What `on_song_end` decided should happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongEndOutcome {
    /// Play this absolute song index.
    Play(usize),
    /// Playlist exhausted under `RepeatMode::None`; signal the main
    /// loop to quit.
    Quit,
}

pub struct Playlist {
    songs: Vec<Song>,
    filter_indices: Vec<usize>,
    focused_filter_index: usize,
    selected_song_index: Option<usize>,
    repeat_mode: RepeatMode,
    filter_query: String,
}

impl Playlist {
    pub fn new(songs: Vec<Song>) -> Self {
        let filter_indices: Vec<usize> = (0..songs.len()).collect();
        Self {
            songs,
            filter_indices,
            focused_filter_index: 0,
            selected_song_index: None,
            repeat_mode: RepeatMode::default(),
            filter_query: String::new(),
        }
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn filter_indices(&self) -> &[usize] {
        &self.filter_indices
    }

    pub fn focused_filter_index(&self) -> usize {
        self.focused_filter_index
    }

    pub fn selected_song_index(&self) -> Option<usize> {
        self.selected_song_index
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn filter_query(&self) -> &str {
        &self.filter_query
    }

    pub fn focused_song(&self) -> Option<&Song> {
        self.filter_indices
            .get(self.focused_filter_index)
            .and_then(|&i| self.songs.get(i))
    }

    pub fn selected_song(&self) -> Option<&Song> {
        self.selected_song_index.and_then(|i| self.songs.get(i))
    }

    /// Select the song at `filter_index` within `filter_indices`.
    /// Returns the absolute song index to hand to the Mixer, or `None`
    /// if `filter_index` is out of range.
    pub fn select(&mut self, filter_index: usize) -> Option<usize> {
        let song_index = *self.filter_indices.get(filter_index)?;
        self.selected_song_index = Some(song_index);
        self.focused_filter_index = filter_index;
        Some(song_index)
    }

    pub fn select_next(&mut self) -> Option<usize> {
        self.advance_selected(1)
    }

    pub fn select_prev(&mut self) -> Option<usize> {
        self.advance_selected(-1)
    }

    fn advance_selected(&mut self, delta: isize) -> Option<usize> {
        if self.filter_indices.is_empty() {
            return None;
        }
        let current = self.position_of_selected().unwrap_or(0) as isize;
        let len = self.filter_indices.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.select(next)
    }

    fn position_of_selected(&self) -> Option<usize> {
        let selected = self.selected_song_index?;
        self.filter_indices.iter().position(|&i| i == selected)
    }

    pub fn focus(&mut self, filter_index: usize) {
        self.focused_filter_index = self.clamp_filter_index(filter_index);
    }

    pub fn focus_next(&mut self) {
        let next = self.focused_filter_index.saturating_add(1);
        self.focus(next);
    }

    pub fn focus_prev(&mut self) {
        let prev = self.focused_filter_index.saturating_sub(1);
        self.focus(prev);
    }

    pub fn focus_first(&mut self) {
        self.focused_filter_index = 0;
    }

    pub fn focus_last(&mut self) {
        self.focused_filter_index = self.filter_indices.len().saturating_sub(1);
    }

    pub fn focus_selected(&mut self) {
        if let Some(pos) = self.position_of_selected() {
            self.focused_filter_index = pos;
        }
    }

    fn clamp_filter_index(&self, index: usize) -> usize {
        if self.filter_indices.is_empty() {
            0
        } else {
            index.min(self.filter_indices.len() - 1)
        }
    }

    /// Invoked by the Control Plane when the Mixer raises `song_end`.
    /// Exactly one call per end-of-stream event.
    pub fn on_song_end(&mut self) -> SongEndOutcome {
        match self.repeat_mode {
            RepeatMode::Track => {
                let current = self.selected_song_index.unwrap_or(0);
                SongEndOutcome::Play(current)
            }
            RepeatMode::Playlist => {
                let next_pos = self.position_of_selected().map(|p| p + 1).unwrap_or(0);
                let wrapped = if self.filter_indices.is_empty() {
                    0
                } else {
                    next_pos % self.filter_indices.len()
                };
                match self.select(wrapped) {
                    Some(song) => SongEndOutcome::Play(song),
                    None => SongEndOutcome::Quit,
                }
            }
            RepeatMode::None => {
                let next_pos = self.position_of_selected().map(|p| p + 1).unwrap_or(0);
                if next_pos < self.filter_indices.len() {
                    match self.select(next_pos) {
                        Some(song) => SongEndOutcome::Play(song),
                        None => SongEndOutcome::Quit,
                    }
                } else {
                    SongEndOutcome::Quit
                }
            }
        }
    }

    pub fn cycle_repeat_mode(&mut self, forward: bool) {
        self.repeat_mode = self.repeat_mode.cycle(forward);
    }

    /// Rebuild `filter_indices` to only the songs whose display name
    /// contains `query`, Unicode case-insensitively, preserving
    /// original order. Resets focus to 0; selection is unaffected.
    pub fn substring_search(&mut self, query: &str) {
        self.filter_query = query.to_string();
        let needle = uppercase(query);

        self.filter_indices = self
            .songs
            .iter()
            .enumerate()
            .filter(|(_, song)| uppercase(&song.display_name).contains(&needle))
            .map(|(i, _)| i)
            .collect();

        self.focused_filter_index = 0;
    }
}

fn uppercase(s: &str) -> String {
    s.chars().flat_map(char::to_uppercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn songs(names: &[&str]) -> Vec<Song> {
        names
            .iter()
            .map(|n| Song::from_path(PathBuf::from(n)))
            .collect()
    }

    #[test]
    fn select_sets_selected_and_focus() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3", "c.mp3"]));
        let selected = playlist.select(1);
        assert_eq!(selected, Some(1));
        assert_eq!(playlist.selected_song_index(), Some(1));
        assert_eq!(playlist.focused_filter_index(), 1);
    }

    #[test]
    fn select_next_wraps_around() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3", "c.mp3"]));
        playlist.select(2);
        let next = playlist.select_next();
        assert_eq!(next, Some(0));
    }

    #[test]
    fn select_prev_wraps_around() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3", "c.mp3"]));
        playlist.select(0);
        let prev = playlist.select_prev();
        assert_eq!(prev, Some(2));
    }

    #[test]
    fn focus_clamps_into_range() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3"]));
        playlist.focus(99);
        assert_eq!(playlist.focused_filter_index(), 1);
    }

    #[test]
    fn on_song_end_track_replays_same_song() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3"]));
        playlist.select(0);
        playlist.cycle_repeat_mode(true); // None -> Track
        let outcome = playlist.on_song_end();
        assert_eq!(outcome, SongEndOutcome::Play(0));
    }

    #[test]
    fn on_song_end_playlist_wraps_to_zero() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3"]));
        playlist.select(1);
        playlist.cycle_repeat_mode(true); // None -> Track
        playlist.cycle_repeat_mode(true); // Track -> Playlist
        let outcome = playlist.on_song_end();
        assert_eq!(outcome, SongEndOutcome::Play(0));
    }

    #[test]
    fn on_song_end_none_quits_past_last() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3"]));
        playlist.select(1);
        let outcome = playlist.on_song_end();
        assert_eq!(outcome, SongEndOutcome::Quit);
    }

    #[test]
    fn substring_search_is_case_insensitive_and_order_preserving() {
        let mut playlist = Playlist::new(songs(&["Alpha.mp3", "beta.mp3", "gamma.mp3", "Alphorn.mp3"]));
        playlist.substring_search("alph");
        let names: Vec<&str> = playlist
            .filter_indices()
            .iter()
            .map(|&i| playlist.songs()[i].display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha.mp3", "Alphorn.mp3"]);
        assert_eq!(playlist.focused_filter_index(), 0);
    }

    #[test]
    fn substring_search_does_not_affect_selection() {
        let mut playlist = Playlist::new(songs(&["a.mp3", "b.mp3", "c.mp3"]));
        playlist.select(2);
        playlist.substring_search("a");
        assert_eq!(playlist.selected_song_index(), Some(2));
    }
}
