//! Decoder façade: open a file, expose its properties, metadata and
//! cover image, and produce interleaved f32 PCM on demand at a
//! caller-chosen sample rate and channel count.
//!
//! Uses symphonia to probe the container, find the audio track, and
//! decode packets into f32; rate and channel adaptation happen inside
//! `write_to_buffer` so the Decoder owns that conversion end to end.

use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

use crate::cover;
use crate::error::DecoderError;
use crate::model::{Image, TrackMetadata};
use crate::player::resampler::Resampler;

/// Outcome of a [`Decoder::write_to_buffer`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Ok,
    EndOfFile,
    Error,
}

pub struct Decoder {
    path: PathBuf,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    native_sample_rate: u32,
    native_channels: u16,
    total_ms: u64,
    time_base: Option<TimeBase>,

    output_sample_rate: u32,
    output_channels: u16,
    resampler: Resampler,

    /// Already rate/channel-adapted samples waiting to be handed out.
    pending: VecDeque<f32>,
    current_ms: u64,
    eof: bool,

    metadata: TrackMetadata,
    cover: Option<Image>,
}

impl Decoder {
    /// Open `path` for decoding. Resets to the start of the file;
    /// determines native sample rate/channels/duration; reads
    /// metadata tags. Output format defaults to the native format
    /// until [`Decoder::configure_output`] is called.
    pub fn open(path: &Path) -> Result<Self, DecoderError> {
        let file = File::open(path).map_err(|source| DecoderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let metadata_opts = MetadataOptions::default();

        let mut probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| DecoderError::UnsupportedFormat(e.to_string()))?;

        let mut reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecoderError::NoTrack(path.to_path_buf()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let native_sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| DecoderError::Decode("unknown sample rate".into()))?;
        let native_channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let time_base = codec_params.time_base;
        let total_ms = if let Some(n_frames) = codec_params.n_frames {
            if let Some(tb) = time_base {
                let time = tb.calc_time(n_frames);
                ((time.seconds as f64 + time.frac) * 1000.0) as u64
            } else {
                (n_frames as f64 / native_sample_rate as f64 * 1000.0) as u64
            }
        } else {
            0
        };

        let metadata = read_metadata(&mut reader, path);

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecoderError::Decode(e.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            decoder,
            track_id,
            native_sample_rate,
            native_channels,
            total_ms,
            time_base,
            output_sample_rate: native_sample_rate,
            output_channels: native_channels,
            resampler: Resampler::new(native_sample_rate, native_sample_rate, native_channels),
            pending: VecDeque::new(),
            current_ms: 0,
            eof: false,
            metadata,
            cover: None,
        })
    }

    /// Idempotent; dropping the decoder already releases everything,
    /// this exists so call sites can close explicitly without giving
    /// up ownership semantics.
    pub fn close(&mut self) {
        self.pending.clear();
        self.eof = true;
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.native_sample_rate
    }

    pub fn get_channels(&self) -> u16 {
        self.native_channels
    }

    pub fn get_current_ms(&self) -> u64 {
        self.current_ms
    }

    pub fn get_total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn get_metadata(&self, key: &str) -> String {
        if key == "title" {
            if let Some(title) = &self.metadata.title {
                return title.clone();
            }
            return self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        self.metadata.get(key).to_string()
    }

    /// Decode-lazily and cache the embedded cover image.
    pub fn get_cover_image(&mut self) -> &Image {
        if self.cover.is_none() {
            self.cover = Some(cover::extract_embedded_cover(&self.path));
        }
        self.cover.as_ref().unwrap()
    }

    /// Set the sample rate / channel count subsequent
    /// `write_to_buffer` calls should produce. Rebuilds the internal
    /// resampler when the requested format changes.
    pub fn configure_output(&mut self, sample_rate: u32, channels: u16) {
        if sample_rate == self.output_sample_rate && channels == self.output_channels {
            return;
        }
        self.output_sample_rate = sample_rate;
        self.output_channels = channels;
        self.resampler = Resampler::new(self.native_sample_rate, sample_rate, channels);
        self.pending.clear();
    }

    /// Seek so that subsequent `write_to_buffer` calls produce samples
    /// from approximately `target_ms`.
    pub fn seek(&mut self, target_ms: u64) -> Result<(), DecoderError> {
        let target_secs = target_ms as f64 / 1000.0;
        let seek_to = SeekTo::Time {
            time: Time::from(target_secs),
            track_id: Some(self.track_id),
        };

        self.reader
            .seek(SeekMode::Accurate, seek_to)
            .map_err(|e| DecoderError::Decode(format!("seek failed: {}", e)))?;

        self.decoder.reset();
        self.resampler.reset();
        self.pending.clear();
        self.current_ms = target_ms;
        self.eof = false;
        Ok(())
    }

    /// Write up to `requested_frames` frames of `channel_count`-channel
    /// interleaved f32 PCM into `dst` (which must be at least
    /// `requested_frames * channel_count` long). Returns the number of
    /// samples written and a status.
    pub fn write_to_buffer(
        &mut self,
        dst: &mut [f32],
        requested_frames: usize,
        channel_count: u16,
    ) -> (usize, WriteStatus) {
        self.configure_output(self.output_sample_rate, channel_count);

        let needed = requested_frames * channel_count as usize;
        let mut written = 0;

        while written < needed {
            if let Some(sample) = self.pending.pop_front() {
                dst[written] = sample;
                written += 1;
                continue;
            }

            if self.eof {
                break;
            }

            match self.decode_one_packet() {
                Ok(true) => continue,
                Ok(false) => {
                    self.eof = true;
                    let flushed = self.resampler.flush();
                    self.pending.extend(flushed);
                }
                Err(_) => return (written, WriteStatus::Error),
            }
        }

        if written < needed && self.eof {
            return (written, WriteStatus::EndOfFile);
        }

        (written, WriteStatus::Ok)
    }

    /// Decode and push one packet's worth of (channel-adapted,
    /// resampled) samples into `pending`. Returns `Ok(false)` at
    /// end of stream.
    fn decode_one_packet(&mut self) -> Result<bool, DecoderError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(DecoderError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            if let Some(tb) = self.time_base {
                let time = tb.calc_time(packet.ts());
                self.current_ms = ((time.seconds as f64 + time.frac) * 1000.0) as u64;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(DecoderError::Decode(e.to_string())),
            };

            let native = convert_to_f32(&decoded);
            let adapted = adapt_channels(
                &native,
                self.native_channels as usize,
                self.output_channels as usize,
            );
            let resampled = self.resampler.process(&adapted);
            self.pending.extend(resampled);

            return Ok(true);
        }
    }
}

fn read_metadata(reader: &mut Box<dyn FormatReader>, path: &Path) -> TrackMetadata {
    let mut info = TrackMetadata::default();

    if let Some(metadata) = reader.metadata().current() {
        for tag in metadata.tags() {
            match tag.std_key {
                Some(symphonia::core::meta::StandardTagKey::TrackTitle) => {
                    info.title = Some(tag.value.to_string());
                }
                Some(symphonia::core::meta::StandardTagKey::Artist) => {
                    info.artist = Some(tag.value.to_string());
                }
                Some(symphonia::core::meta::StandardTagKey::Album) => {
                    info.album = Some(tag.value.to_string());
                }
                _ => {}
            }
        }
    }

    if info.title.is_none() {
        info.title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
    }

    info
}

/// Duplicate mono to N channels, average N channels to mono, or repeat
/// the last source channel to fill extra target channels — a plain,
/// general adaptation rather than a true spatial downmix.
fn adapt_channels(native: &[f32], native_channels: usize, target_channels: usize) -> Vec<f32> {
    if native_channels == 0 || native_channels == target_channels {
        return native.to_vec();
    }

    let frames = native.len() / native_channels;
    let mut out = Vec::with_capacity(frames * target_channels);

    for frame in 0..frames {
        let base = frame * native_channels;
        if native_channels == 1 {
            let sample = native[base];
            for _ in 0..target_channels {
                out.push(sample);
            }
        } else if target_channels == 1 {
            let sum: f32 = native[base..base + native_channels].iter().sum();
            out.push(sum / native_channels as f32);
        } else {
            for ch in 0..target_channels {
                let src_ch = ch.min(native_channels - 1);
                out.push(native[base + src_ch]);
            }
        }
    }

    out
}

fn convert_to_f32(buffer: &AudioBufferRef) -> Vec<f32> {
    match buffer {
        AudioBufferRef::F32(buf) => {
            let planes = buf.planes();
            let plane_slice = planes.planes();
            if plane_slice.is_empty() {
                return Vec::new();
            }
            let frames = plane_slice[0].len();
            let mut output = Vec::with_capacity(frames * plane_slice.len());
            for frame in 0..frames {
                for plane in plane_slice {
                    output.push(plane[frame]);
                }
            }
            output
        }
        AudioBufferRef::S16(buf) => {
            let planes = buf.planes();
            let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
            for frame in 0..buf.frames() {
                for plane in planes.planes() {
                    output.push(plane[frame] as f32 / 32768.0);
                }
            }
            output
        }
        AudioBufferRef::S24(buf) => {
            let planes = buf.planes();
            let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
            for frame in 0..buf.frames() {
                for plane in planes.planes() {
                    output.push(plane[frame].0 as f32 / 8_388_608.0);
                }
            }
            output
        }
        AudioBufferRef::S32(buf) => {
            let planes = buf.planes();
            let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
            for frame in 0..buf.frames() {
                for plane in planes.planes() {
                    output.push(plane[frame] as f32 / 2_147_483_648.0);
                }
            }
            output
        }
        AudioBufferRef::U8(buf) => {
            let planes = buf.planes();
            let mut output = Vec::with_capacity(buf.frames() * planes.planes().len());
            for frame in 0..buf.frames() {
                for plane in planes.planes() {
                    output.push((plane[frame] as f32 - 128.0) / 128.0);
                }
            }
            output
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_file_errors() {
        let result = Decoder::open(Path::new("/nonexistent/file.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn adapt_channels_duplicates_mono_to_stereo() {
        let mono = vec![0.5, -0.5];
        let stereo = adapt_channels(&mono, 1, 2);
        assert_eq!(stereo, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn adapt_channels_averages_stereo_to_mono() {
        let stereo = vec![1.0, -1.0, 0.5, 0.5];
        let mono = adapt_channels(&stereo, 2, 1);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn adapt_channels_passthrough_when_equal() {
        let stereo = vec![1.0, -1.0];
        let out = adapt_channels(&stereo, 2, 2);
        assert_eq!(out, stereo);
    }
}
