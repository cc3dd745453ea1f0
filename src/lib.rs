//! Holoreel is the decode-and-playback engine for layered projection assets.
//!
//! A projection container holds a multi-layer, optionally palette/RLE-compressed
//! frame animation plus an interleaved multi-variant audio stream. The engine is
//! consumed on demand by a rendering/audio front end:
//!
//! - Open a [`StreamSource`] (in-memory bytes or a disk path)
//! - [`ProjectionAsset::load`] parses and validates the container once
//! - `register_user`/`unregister_user` gate the backing stream handle
//! - [`ProjectionAsset::compose_frame`] produces diffuse/emission images per tick
//! - [`ProjectionAsset::read_audio`] serves sample-accurate PCM windows
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod container;
/// Shared material metadata record and its wire loader.
pub mod material;
/// Frame graph, pixel decode, compositing, audio, and asset lifecycle.
pub mod projection;


pub use crate::foundation::core::{ChannelKind, LayerMask, MAX_LAYERS, PixelDims};
pub use crate::foundation::error::{HoloreelError, HoloreelResult};

pub use crate::container::header::{IO_VERSION, PROJECTION_MAGIC};
pub use crate::container::source::StreamSource;
pub use crate::material::model::{DropSource, IconImage, Ingredient, Material, Rarity, Recipe};
pub use crate::projection::asset::{ProjectionAsset, StreamStats};
pub use crate::projection::composite::{Composed, FrameTarget};
pub use crate::projection::model::{AnimationMode, AudioInfo, Layer, PixelFormat, StackThreshold};
