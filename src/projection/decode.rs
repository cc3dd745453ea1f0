use crate::container::source::Stream;
use crate::foundation::error::{HoloreelError, HoloreelResult};
use crate::projection::model::{DataPointer, PixelFormat, ResolvedPointer};

/// Expand PackBits-style RLE over fixed-size pixel units.
///
/// Control byte `n`: high bit set = a run of `(n & 0x7F) + 1` copies of the
/// next unit; clear = `n + 1` literal units. Expansion must land exactly on
/// `expected_units`.
pub(crate) fn expand_rle(
    src: &[u8],
    unit_len: usize,
    expected_units: usize,
    out: &mut Vec<u8>,
) -> HoloreelResult<()> {
    out.clear();
    out.reserve(expected_units * unit_len);

    let mut pos = 0usize;
    let mut units = 0usize;
    while units < expected_units {
        let control = *src
            .get(pos)
            .ok_or_else(|| HoloreelError::decode("rle stream truncated at control byte"))?;
        pos += 1;

        let count = usize::from(control & 0x7F) + 1;
        if units + count > expected_units {
            return Err(HoloreelError::decode(format!(
                "rle overrun: {} units declared past the expected {expected_units}",
                units + count
            )));
        }

        if control & 0x80 != 0 {
            let unit = src
                .get(pos..pos + unit_len)
                .ok_or_else(|| HoloreelError::decode("rle stream truncated inside run unit"))?;
            pos += unit_len;
            for _ in 0..count {
                out.extend_from_slice(unit);
            }
        } else {
            let literal = src
                .get(pos..pos + count * unit_len)
                .ok_or_else(|| HoloreelError::decode("rle stream truncated inside literal"))?;
            pos += literal.len();
            out.extend_from_slice(literal);
        }
        units += count;
    }

    if pos != src.len() {
        return Err(HoloreelError::decode(format!(
            "rle stream has {} trailing bytes",
            src.len() - pos
        )));
    }
    Ok(())
}

/// Look up one palette entry with the pointer's offset, clamped to bounds.
#[inline]
fn palette_entry(palette: &[[u8; 4]], offset: u16, index: usize) -> [u8; 4] {
    if palette.is_empty() {
        return [0, 0, 0, 0];
    }
    let i = (index + usize::from(offset)).min(palette.len() - 1);
    palette[i]
}

/// Decode one resolved layer-channel into `dst` (straight-alpha RGBA8).
///
/// Returns `Ok(false)` without touching `dst` when the pointer is the empty
/// terminal — the documented "layer absent for this frame" case, not an
/// error. `scratch` holds the raw payload, `units` the RLE expansion.
pub(crate) fn decode_channel(
    stream: &mut Stream,
    ptr: ResolvedPointer,
    palette: &[[u8; 4]],
    pixel_count: usize,
    dst: &mut [u8],
    scratch: &mut Vec<u8>,
    units: &mut Vec<u8>,
) -> HoloreelResult<bool> {
    let ResolvedPointer::Data(data) = ptr else {
        return Ok(false);
    };
    debug_assert_eq!(dst.len(), pixel_count * 4);

    let unit_len = data.format.unit_len();
    let encoded = read_payload(stream, data, scratch)?;

    let raw: &[u8] = if data.rle {
        expand_rle(encoded, unit_len, pixel_count, units)?;
        units
    } else {
        if encoded.len() != pixel_count * unit_len {
            return Err(HoloreelError::decode(format!(
                "payload of {} bytes does not cover {pixel_count} pixels of {unit_len} bytes",
                encoded.len()
            )));
        }
        encoded
    };

    match data.format {
        PixelFormat::Rgba32 => dst.copy_from_slice(raw),
        PixelFormat::Indexed8 => {
            for (px, &idx) in dst.chunks_exact_mut(4).zip(raw.iter()) {
                px.copy_from_slice(&palette_entry(palette, data.palette_offset, usize::from(idx)));
            }
        }
        PixelFormat::Indexed16 => {
            for (px, idx) in dst.chunks_exact_mut(4).zip(raw.chunks_exact(2)) {
                let idx = usize::from(u16::from_le_bytes([idx[0], idx[1]]));
                px.copy_from_slice(&palette_entry(palette, data.palette_offset, idx));
            }
        }
    }
    Ok(true)
}

fn read_payload<'a>(
    stream: &mut Stream,
    data: DataPointer,
    scratch: &'a mut Vec<u8>,
) -> HoloreelResult<&'a [u8]> {
    let len = data.byte_len as usize;
    let end = data
        .pos
        .checked_add(u64::from(data.byte_len))
        .ok_or_else(|| HoloreelError::decode("payload position overflows"))?;
    if end > stream.len() {
        return Err(HoloreelError::decode("payload extends past end of stream"));
    }

    stream.seek(data.pos)?;
    scratch.resize(len, 0);
    stream.read_exact(&mut scratch[..len])?;
    Ok(&scratch[..len])
}

#[cfg(test)]
#[path = "../../tests/unit/projection/decode.rs"]
mod tests;
