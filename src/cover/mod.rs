//! Cover art extraction.
//!
//! Reads only the file's own embedded tags; no sidecar or network
//! lookup is attempted.

mod embedded;

pub use embedded::extract_embedded_cover;
