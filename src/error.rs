//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: top-level application error enum, the type the Control
//!   Plane translates into user-visible messages.
//! - [`DecoderError`]: detailed decode-path failures, wrapped into
//!   [`Error::Decode`].
//! - [`ConfigError`]: detailed config load/save failures, wrapped into
//!   [`Error::Config`].

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening or decoding an audio file.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("no playable track found in {0}")]
    NoTrack(PathBuf),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors raised while loading or saving the persisted config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to create config directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to replace config file: {0}")]
    Rename(#[source] std::io::Error),
}

/// Errors raised at the Mixer/Control Plane boundary: backend failures
/// plus anything bubbled up from the Decoder.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("audio backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Decode(#[from] DecoderError),

    #[error("no track loaded")]
    NoTrackLoaded,
}

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoder-path error (open/probe/decode failures)
    #[error("decode error: {0}")]
    Decode(#[from] DecoderError),

    /// Audio backend error (device lost, stream build failure)
    #[error("audio backend error: {0}")]
    Backend(String),

    /// Mixer/Control Plane boundary error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// File not found
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid file format
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/path/to/file.mp3");
        assert!(err.to_string().contains("/path/to/file.mp3"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::backend("buffer underrun").context("while playing track");
        let msg = err.to_string();
        assert!(msg.contains("while playing track"));
    }

    #[test]
    fn test_decoder_error_wraps() {
        let err: Error = DecoderError::NoTrack(PathBuf::from("song.mp3")).into();
        assert!(err.to_string().contains("song.mp3"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::backend("test"));
        let with_ctx = result.with_context("additional context");
        assert!(with_ctx.unwrap_err().to_string().contains("additional context"));
    }
}
