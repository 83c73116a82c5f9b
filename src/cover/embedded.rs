//! Extract and decode the cover art embedded in an audio file's tags.
//!
//! Uses lofty to read picture bytes from ID3v2/Vorbis comment/MP4 atom
//! tags, then the `image` crate to decode those bytes to raw pixels —
//! the Decoder exposes cover art at the pixel level, not as encoded
//! bytes.

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use std::path::Path;

use crate::model::{Image, ImageFormat};

/// Extract and decode the front cover from embedded tags.
///
/// Fast, synchronous; returns [`Image::none()`] if no picture is
/// embedded, the tags can't be read, or the picture bytes don't decode
/// as a known image format.
pub fn extract_embedded_cover(path: &Path) -> Image {
    decode(path).unwrap_or_else(Image::none)
}

fn decode(path: &Path) -> Option<Image> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;

    let pictures = tag.pictures();
    let picture = pictures
        .iter()
        .find(|p| p.pic_type() == lofty::picture::PictureType::CoverFront)
        .or_else(|| pictures.first())?;

    let decoded = image::load_from_memory(picture.data()).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    Some(Image {
        pixels: rgba.into_raw(),
        width,
        height,
        format: ImageFormat::Rgba8Straight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn extract_from_nonexistent_file_is_none() {
        let img = extract_embedded_cover(Path::new("nonexistent.mp3"));
        assert!(img.is_none());
    }

    #[test]
    fn extract_from_non_audio_file_is_none() {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        writeln!(file, "not an audio file").expect("failed to write");

        let img = extract_embedded_cover(file.path());
        assert!(img.is_none());
    }
}
