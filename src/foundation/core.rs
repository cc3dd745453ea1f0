use crate::foundation::error::{HoloreelError, HoloreelResult};

/// Maximum number of layers a projection asset may carry.
///
/// Layers are mask-addressable through a 16-bit field, so the container
/// format caps the layer count at 16.
pub const MAX_LAYERS: usize = 16;

/// The two composited output channels each frame produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ChannelKind {
    /// Base color output.
    Diffuse,
    /// Glow contribution output.
    Emission,
}

impl ChannelKind {
    /// Number of channels per layer.
    pub const COUNT: usize = 2;

    /// Stable channel index used by the flat pointer table.
    pub fn index(self) -> usize {
        match self {
            Self::Diffuse => 0,
            Self::Emission => 1,
        }
    }

    /// Decode a wire channel byte.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Diffuse),
            1 => Some(Self::Emission),
            _ => None,
        }
    }
}

/// Bit mask selecting which layers participate in a composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LayerMask(pub u16);

impl LayerMask {
    /// Mask with every layer enabled.
    pub const ALL: Self = Self(u16::MAX);
    /// Mask with no layers enabled.
    pub const NONE: Self = Self(0);

    /// Return `true` when layer `index` is enabled.
    pub fn contains(self, index: usize) -> bool {
        index < MAX_LAYERS && self.0 & (1 << index) != 0
    }

    /// Return a copy with layer `index` enabled.
    pub fn with(self, index: usize) -> Self {
        if index < MAX_LAYERS {
            Self(self.0 | (1 << index))
        } else {
            self
        }
    }
}

/// Validated pixel dimensions of a projection's frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelDims {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelDims {
    /// Create validated dimensions with a non-zero, non-overflowing area.
    pub fn new(width: i32, height: i32) -> HoloreelResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(HoloreelError::validation(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        let (width, height) = (width as u32, height as u32);
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| HoloreelError::validation("frame pixel buffer size overflow"))?;
        Ok(Self { width, height })
    }

    /// Pixel count of one frame.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of one RGBA8 frame buffer.
    pub fn byte_len(self) -> usize {
        self.pixel_count() * 4
    }
}
