//! Core data types shared across the engine: [`Song`], cover-art
//! [`Image`], [`TrackMetadata`], and [`RepeatMode`].

use std::path::{Path, PathBuf};

/// An immutable playlist entry. Indices into the playlist's `songs`
/// vector are the stable identity; `Song` itself carries no mutable
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub full_path: PathBuf,
    pub display_name: String,
}

impl Song {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let full_path = path.into();
        let display_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| full_path.to_string_lossy().into_owned());
        Self {
            full_path,
            display_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.full_path
    }
}

/// Repeat behavior for the Playlist Controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    Track,
    Playlist,
}

impl RepeatMode {
    /// Rotate to the next mode in `{None, Track, Playlist}`, in either
    /// direction.
    pub fn cycle(self, forward: bool) -> Self {
        use RepeatMode::*;
        match (self, forward) {
            (None, true) => Track,
            (Track, true) => Playlist,
            (Playlist, true) => None,
            (None, false) => Playlist,
            (Track, false) => None,
            (Playlist, false) => Track,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::Track => "track",
            RepeatMode::Playlist => "playlist",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "track" => RepeatMode::Track,
            "playlist" => RepeatMode::Playlist,
            _ => RepeatMode::None,
        }
    }
}

/// Pixel format of a decoded cover image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Rgb8,
    Rgba8Premultiplied,
    Rgba8Straight,
    None,
}

/// A decoded cover image, or the absence of one.
///
/// `get_cover_image()` returns `Image::none()` rather than an
/// `Option<Image>` so the Decoder's accessor surface stays a plain
/// total function.
#[derive(Debug, Clone)]
pub struct Image {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

impl Image {
    pub fn none() -> Self {
        Self {
            pixels: Vec::new(),
            width: 0,
            height: 0,
            format: ImageFormat::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.format, ImageFormat::None)
    }
}

/// Title/album/artist, as read from a file's tags.
///
/// Title falls back to the file's display name when absent; album and
/// artist stay empty.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
}

impl TrackMetadata {
    pub fn get(&self, key: &str) -> &str {
        match key {
            "title" => self.title.as_deref().unwrap_or(""),
            "album" => self.album.as_deref().unwrap_or(""),
            "artist" => self.artist.as_deref().unwrap_or(""),
            _ => "",
        }
    }
}

/// The terminal interface's read model: everything a UI backend
/// needs to draw a frame, with no rendering concerns of its own.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    pub metadata: TrackMetadata,
    pub focused_index: usize,
    pub selected_index: Option<usize>,
    /// Display names in filter order; windowing to the visible rows is
    /// the UI backend's concern.
    pub filter_names: Vec<String>,
    /// `current_time_ms / total_time_ms`, clamped to `[0, 1]`.
    pub progress: f32,
    pub volume: f32,
    pub muted: bool,
    pub repeat_mode: RepeatMode,
    pub cover: Image,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_display_name_from_path() {
        let song = Song::from_path("/music/artist/Track 01.flac");
        assert_eq!(song.display_name, "Track 01.flac");
    }

    #[test]
    fn repeat_mode_cycles_forward_and_back() {
        let m = RepeatMode::None;
        let m = m.cycle(true);
        assert_eq!(m, RepeatMode::Track);
        let m = m.cycle(true);
        assert_eq!(m, RepeatMode::Playlist);
        let m = m.cycle(true);
        assert_eq!(m, RepeatMode::None);
        let m = m.cycle(false);
        assert_eq!(m, RepeatMode::Playlist);
    }

    #[test]
    fn image_none_reports_none_format() {
        let img = Image::none();
        assert!(img.is_none());
    }
}
