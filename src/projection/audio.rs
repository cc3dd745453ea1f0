use crate::container::source::Stream;
use crate::foundation::error::HoloreelResult;
use crate::projection::model::AudioInfo;

/// Read a window of interleaved PCM16 samples from one audio variant.
///
/// The sample offset is clamped to `[0, sample_count]`; the read length is
/// bounded by the bytes remaining in the variant, a one-second byte budget,
/// and the caller's buffer capacity, trimmed to whole sample frames so a
/// stereo read never splits a frame. Returns the sample frames read; zero
/// signals end-of-stream for the variant, not an error.
pub(crate) fn read_audio(
    stream: &mut Stream,
    info: AudioInfo,
    variant: u16,
    sample_offset: i64,
    buf: &mut [u8],
) -> HoloreelResult<u64> {
    if variant >= info.variant_count || info.sample_count <= 0 {
        return Ok(0);
    }

    let bytes_per_frame = info.bytes_per_frame();
    let variant_len = info.variant_byte_len();
    let offset = sample_offset.clamp(0, info.sample_count) as u64;

    let start = offset * bytes_per_frame;
    let remaining = variant_len - start;

    let budget = u64::from(info.sample_rate) * bytes_per_frame;
    let mut len = remaining.min(budget).min(buf.len() as u64);
    len -= len % bytes_per_frame;
    if len == 0 {
        return Ok(0);
    }

    let pos = info.base_pos + u64::from(variant) * variant_len + start;
    if pos + len > stream.len() {
        tracing::debug!(pos, len, stream_len = stream.len(), "audio window past end of stream");
        return Ok(0);
    }

    stream.seek(pos)?;
    stream.read_exact(&mut buf[..len as usize])?;
    Ok(len / bytes_per_frame)
}

#[cfg(test)]
#[path = "../../tests/unit/projection/audio.rs"]
mod tests;
