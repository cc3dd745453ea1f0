use crate::container::source::Stream;
use crate::foundation::core::{ChannelKind, MAX_LAYERS};
use crate::foundation::error::{HoloreelError, HoloreelResult};
use crate::projection::model::{DataPointer, Frame, PixelFormat, RawPointer, ResolvedPointer};

/// Flat index of a `(frame, layer, channel)` triple in the pointer table.
#[inline]
pub(crate) fn pointer_index(layer_count: usize, frame: usize, layer: usize, channel: usize) -> usize {
    (frame * layer_count + layer) * ChannelKind::COUNT + channel
}

/// Read every frame header and raw pointer record in file order.
///
/// Self-contained payloads are not decoded here; their absolute stream
/// position is recorded and the cursor advances past the declared byte
/// length so subsequent frames' offsets stay correct regardless of where
/// aliases logically point.
pub(crate) fn read_frames(
    stream: &mut Stream,
    layer_count: usize,
    frame_count: usize,
) -> HoloreelResult<(Vec<Frame>, Vec<RawPointer>)> {
    debug_assert!((1..=MAX_LAYERS).contains(&layer_count));

    let mut frames = Vec::with_capacity(frame_count);
    let mut raw = Vec::with_capacity(frame_count * layer_count * ChannelKind::COUNT);

    for _ in 0..frame_count {
        let flags = stream.read_u32()?;
        let duration = stream.read_f32()?;
        frames.push(Frame { flags, duration });

        for _ in 0..layer_count * ChannelKind::COUNT {
            raw.push(read_pointer(stream)?);
        }
    }

    Ok((frames, raw))
}

fn read_pointer(stream: &mut Stream) -> HoloreelResult<RawPointer> {
    let target = stream.read_u8()?;
    match target {
        0 => Ok(RawPointer::Empty),
        1 => {
            let format_byte = stream.read_u8()?;
            let format = PixelFormat::from_u8(format_byte).ok_or_else(|| {
                HoloreelError::validation(format!("unknown pixel format tag {format_byte}"))
            })?;
            let codec = stream.read_u8()?;
            let palette_offset = if format.is_indexed() {
                stream.read_u16()?
            } else {
                0
            };
            let byte_len = stream.read_u32()?;
            let pos = stream.position()?;
            stream.skip(u64::from(byte_len))?;
            Ok(RawPointer::Data(DataPointer {
                pos,
                format,
                rle: codec & 1 != 0,
                palette_offset,
                byte_len,
            }))
        }
        2 => {
            let frame = stream.read_u16()?;
            let layer = stream.read_u8()?;
            let channel_byte = stream.read_u8()?;
            let channel = ChannelKind::from_u8(channel_byte).ok_or_else(|| {
                HoloreelError::validation(format!("unknown channel tag {channel_byte}"))
            })?;
            Ok(RawPointer::Alias {
                frame,
                layer,
                channel,
            })
        }
        other => Err(HoloreelError::validation(format!(
            "unknown pointer target tag {other}"
        ))),
    }
}

/// Resolve every channel's alias chain to a concrete pointer or `Empty`.
///
/// Resolution is bounded to `layers * 2` hops per channel. A hop that
/// repeats the current or the immediately previous triple, or that lands
/// out of range, terminates the chain as `Empty` — a malformed channel
/// degrades to "no image" instead of failing the load.
pub(crate) fn resolve_pointers(
    raw: &[RawPointer],
    frame_count: usize,
    layer_count: usize,
) -> Vec<ResolvedPointer> {
    let mut resolved = Vec::with_capacity(raw.len());
    for frame in 0..frame_count {
        for layer in 0..layer_count {
            for channel in 0..ChannelKind::COUNT {
                resolved.push(resolve_one(raw, frame_count, layer_count, (frame, layer, channel)));
            }
        }
    }
    resolved
}

fn resolve_one(
    raw: &[RawPointer],
    frame_count: usize,
    layer_count: usize,
    start: (usize, usize, usize),
) -> ResolvedPointer {
    let mut prev = start;
    let mut cur = start;

    for _ in 0..layer_count * ChannelKind::COUNT {
        match raw[pointer_index(layer_count, cur.0, cur.1, cur.2)] {
            RawPointer::Empty => return ResolvedPointer::Empty,
            RawPointer::Data(data) => return ResolvedPointer::Data(data),
            RawPointer::Alias {
                frame,
                layer,
                channel,
            } => {
                let next = (usize::from(frame), usize::from(layer), channel.index());
                if next.0 >= frame_count || next.1 >= layer_count {
                    tracing::debug!(
                        from = ?cur,
                        to = ?next,
                        "pointer alias out of range, channel degrades to empty"
                    );
                    return ResolvedPointer::Empty;
                }
                if next == cur || next == prev {
                    tracing::debug!(at = ?cur, "pointer alias cycle, channel degrades to empty");
                    return ResolvedPointer::Empty;
                }
                prev = cur;
                cur = next;
            }
        }
    }

    tracing::debug!(at = ?start, "pointer chain exceeded hop budget, channel degrades to empty");
    ResolvedPointer::Empty
}

#[cfg(test)]
#[path = "../../tests/unit/projection/graph.rs"]
mod tests;
