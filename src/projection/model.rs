use crate::foundation::core::ChannelKind;

/// Layer flag bit: composited by default without a stack unlock.
pub(crate) const LAYER_DEFAULT_VISIBLE: u32 = 1;
/// Layer flag bit: contributes to the emission transparency mask.
pub(crate) const LAYER_TRANSPARENCY: u32 = 1 << 1;

/// One of up to 16 independently maskable image channels of a projection.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Layer name.
    pub name: String,
    /// Flag bitset.
    pub flags: u32,
    /// Collected-stack size at which this layer unlocks.
    pub unlock_stack: i32,
}

impl Layer {
    /// Whether the layer is visible without any stack unlock.
    pub fn default_visible(&self) -> bool {
        self.flags & LAYER_DEFAULT_VISIBLE != 0
    }

    /// Whether the layer feeds the emission transparency mask.
    pub fn transparency_contributing(&self) -> bool {
        self.flags & LAYER_TRANSPARENCY != 0
    }
}

/// One timestep of the animation.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    /// Frame flag bitset.
    pub flags: u32,
    /// Display duration in seconds.
    pub duration: f32,
}

/// Pixel encoding of one self-contained frame payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// Raw 32-bit RGBA.
    Rgba32,
    /// 8-bit palette indices.
    Indexed8,
    /// 16-bit palette indices.
    Indexed16,
}

impl PixelFormat {
    /// Decode a wire format byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Rgba32),
            1 => Some(Self::Indexed8),
            2 => Some(Self::Indexed16),
            _ => None,
        }
    }

    /// Byte length of one encoded pixel unit.
    pub fn unit_len(self) -> usize {
        match self {
            Self::Rgba32 => 4,
            Self::Indexed8 => 1,
            Self::Indexed16 => 2,
        }
    }

    /// Whether pixel units index into the shared palette.
    pub fn is_indexed(self) -> bool {
        !matches!(self, Self::Rgba32)
    }
}

/// Self-contained payload location resolved from the pointer graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct DataPointer {
    /// Absolute stream position of the payload.
    pub pos: u64,
    /// Pixel encoding.
    pub format: PixelFormat,
    /// Whether the payload is run-length compressed.
    pub rle: bool,
    /// Offset added to palette indices before clamping.
    pub palette_offset: u16,
    /// Declared payload byte length.
    pub byte_len: u32,
}

/// Raw per-channel pointer record as read from the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RawPointer {
    /// No data for this channel.
    Empty,
    /// Payload stored at this record.
    Data(DataPointer),
    /// Same data as another frame's channel.
    Alias {
        frame: u16,
        layer: u8,
        channel: ChannelKind,
    },
}

/// Fully resolved per-channel pointer: either concrete data or nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResolvedPointer {
    Empty,
    Data(DataPointer),
}

/// Optional per-frame alpha multiplier image (stencil).
#[derive(Clone, Debug)]
pub(crate) struct FrameMask {
    /// Row-major 8-bit alpha, one byte per pixel.
    pub alpha: Vec<u8>,
}

/// How the playback clock maps onto frame indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnimationMode {
    /// Wrap around at the end.
    Loop,
    /// Bounce between the first and last frame.
    PingPong,
    /// Hold the last frame.
    Once,
}

impl AnimationMode {
    /// Decode a wire mode byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Loop),
            1 => Some(Self::PingPong),
            2 => Some(Self::Once),
            _ => None,
        }
    }
}

/// One stack-size → unlocked-frame-count gating rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StackThreshold {
    /// Collected quantity required.
    pub stack_size: i32,
    /// Frames unlocked at that quantity.
    pub unlocked_frames: i32,
}

/// Audio trailer metadata; the PCM payload itself is read lazily.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct AudioInfo {
    /// Whether samples are stereo interleaved.
    pub stereo: bool,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Samples per variant.
    pub sample_count: i64,
    /// Number of alternate audio takes stored back-to-back.
    pub variant_count: u16,
    /// Absolute stream position where variant 0 begins.
    pub base_pos: u64,
}

impl AudioInfo {
    /// Interleaved channel count.
    pub fn channels(self) -> u16 {
        if self.stereo { 2 } else { 1 }
    }

    /// Bytes per sample frame (16-bit samples times channels).
    pub fn bytes_per_frame(self) -> u64 {
        2 * u64::from(self.channels())
    }

    /// Byte length of one variant's PCM region.
    pub fn variant_byte_len(self) -> u64 {
        self.sample_count.max(0) as u64 * self.bytes_per_frame()
    }
}
