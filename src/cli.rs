//! Command-line surface: initial volume, cover-art toggle, UI/
//! mixer backend selectors, and the playlist file list — from
//! positional arguments and, when piped, a newline-separated stdin
//! list.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::Parser;

/// Extensions accepted as playable files, matched case-insensitively
/// against the path's suffix.
const ACCEPTED_EXTENSIONS: &[&str] = &[
    "mp2", "mp3", "mp4", "m4a", "m4b", "fla", "flac", "ogg", "opus", "umx", "s3m", "wav", "caf",
    "aif", "webm", "mkv",
];

#[derive(Debug, Parser)]
#[command(name = "waveterm", about = "A terminal music player")]
pub struct Cli {
    /// Initial volume in [0, MAX_VOLUME].
    #[arg(long, default_value_t = 1.0)]
    pub volume: f32,

    /// Disable cover-art rendering.
    #[arg(long)]
    pub no_image: bool,

    /// UI backend selector (opaque to the core engine).
    #[arg(long)]
    pub ui: Option<String>,

    /// Mixer/output-device backend selector.
    #[arg(long)]
    pub mixer: Option<String>,

    /// Playlist file paths.
    pub files: Vec<PathBuf>,
}

impl Cli {
    /// Every playable path: `files` filtered by [`is_accepted_path`],
    /// plus (when stdin is piped and non-empty) a newline-separated
    /// list read from it.
    pub fn resolve_playlist(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .iter()
            .filter(|p| is_accepted_path(p))
            .cloned()
            .collect();

        if let Some(piped) = read_stdin_playlist() {
            paths.extend(piped.into_iter().filter(|p| is_accepted_path(p)));
        }

        paths
    }
}

/// Accepted iff the suffix, lowercased, is in [`ACCEPTED_EXTENSIONS`].
fn is_accepted_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads a newline-separated file list from stdin, only when stdin is
/// not a terminal (i.e. the process is part of a pipe) and carries at
/// least one line.
fn read_stdin_playlist() -> Option<Vec<PathBuf>> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return None;
    }

    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf).ok()?;

    let lines: Vec<PathBuf> = buf
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect();

    if lines.is_empty() { None } else { Some(lines) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert!(is_accepted_path(Path::new("song.MP3")));
        assert!(is_accepted_path(Path::new("song.flac")));
        assert!(is_accepted_path(Path::new("song.OPUS")));
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(!is_accepted_path(Path::new("notes.txt")));
        assert!(!is_accepted_path(Path::new("cover.jpg")));
    }

    #[test]
    fn rejects_extensionless_paths() {
        assert!(!is_accepted_path(Path::new("README")));
    }

    #[test]
    fn parses_volume_and_flags() {
        let cli = Cli::parse_from([
            "waveterm",
            "--volume",
            "0.5",
            "--no-image",
            "--ui",
            "tui",
            "a.mp3",
        ]);
        assert_eq!(cli.volume, 0.5);
        assert!(cli.no_image);
        assert_eq!(cli.ui.as_deref(), Some("tui"));
        assert_eq!(cli.files, vec![PathBuf::from("a.mp3")]);
    }
}
