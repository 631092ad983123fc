//! Audio duration probing.
//!
//! WAV files are read with `hound`; every other container goes through the
//! `symphonia` probe. Nothing here is cached: each call re-reads the file.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::error::{ErrorCode, JukeboxError, Result};

/// Returns the playback duration of the audio file at `path`.
///
/// Fails with `MEDIA_ERROR` if the file is unreadable, not audio, or empty.
pub fn probe_duration(path: &Path) -> Result<Duration> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));

    let duration = if is_wav {
        probe_wav(path)?
    } else {
        probe_container(path)?
    };

    if duration.is_zero() {
        return Err(media_error(path, "audio has zero length"));
    }

    Ok(duration)
}

fn probe_wav(path: &Path) -> Result<Duration> {
    let reader = hound::WavReader::open(path).map_err(|e| media_error(path, e.to_string()))?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Err(media_error(path, "sample rate is 0"));
    }

    // hound reports frames, independent of channel count
    let frames = reader.duration() as u64;
    Ok(frames_to_duration(frames, sample_rate))
}

fn probe_container(path: &Path) -> Result<Duration> {
    let file = File::open(path).map_err(|e| media_error(path, e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| media_error(path, e.to_string()))?;

    let mut reader = probed.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| media_error(path, "no audio track"))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let time_base = match (params.time_base, params.sample_rate) {
        (Some(tb), _) => tb,
        (None, Some(rate)) if rate > 0 => TimeBase::new(1, rate),
        _ => return Err(media_error(path, "unknown time base")),
    };

    if let Some(frames) = params.n_frames {
        return Ok(timestamp_to_duration(time_base, frames));
    }

    // Container does not declare a length: walk the packets.
    let mut total: u64 = 0;
    loop {
        match reader.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total = total.saturating_add(packet.dur);
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(media_error(path, e.to_string())),
        }
    }

    Ok(timestamp_to_duration(time_base, total))
}

fn timestamp_to_duration(time_base: TimeBase, ts: u64) -> Duration {
    let time = time_base.calc_time(ts);
    Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac)
}

/// Converts a frame count to wall-clock duration.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    let secs = frames / sample_rate as u64;
    let rem = frames % sample_rate as u64;
    Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / sample_rate as u64)
}

fn media_error(path: &Path, reason: impl Into<String>) -> JukeboxError {
    JukeboxError::new(
        ErrorCode::MediaError,
        format!("Cannot read duration of {}: {}", path.display(), reason.into()),
    )
}
