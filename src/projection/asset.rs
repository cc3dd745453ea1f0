use crate::container::header::{PROJECTION_MAGIC, read_header};
use crate::container::source::{Stream, StreamSource};
use crate::foundation::core::{ChannelKind, LayerMask, MAX_LAYERS, PixelDims};
use crate::foundation::error::{HoloreelError, HoloreelResult};
use crate::foundation::math::BlendLut;
use crate::material::loader::read_material;
use crate::material::model::Material;
use crate::projection::audio::read_audio;
use crate::projection::composite::{Composed, FrameTarget, accumulate_claim, apply_stencil, blend_over};
use crate::projection::decode::decode_channel;
use crate::projection::graph::{pointer_index, read_frames, resolve_pointers};
use crate::projection::model::{
    AnimationMode, AudioInfo, Frame, FrameMask, Layer, ResolvedPointer, StackThreshold,
};

/// Caps applied before allocating from untrusted counts.
const MAX_FRAMES: i32 = 65_536;
const MAX_THRESHOLDS: i32 = 1024;
const MAX_TAGS: u16 = 256;
const MAX_PALETTE: i32 = 65_536;
const MAX_MASKS: i32 = 256;

/// Lifecycle states of a projection asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AssetState {
    Unloaded,
    Loading,
    Loaded,
}

/// Backing-stream open/close transition counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Times the backing stream was opened.
    pub opens: u64,
    /// Times the backing stream was closed.
    pub closes: u64,
}

/// Everything parsed out of a container body, installed atomically on load.
struct ParsedBody {
    material: Material,
    loop_time: f32,
    dims: PixelDims,
    mode: AnimationMode,
    thresholds: Vec<StackThreshold>,
    tags: Vec<String>,
    layers: Vec<Layer>,
    frames: Vec<Frame>,
    pointers: Vec<ResolvedPointer>,
    palette: Vec<[u8; 4]>,
    masks: Vec<FrameMask>,
    audio: AudioInfo,
}

/// One addressable animation + audio + material unit.
///
/// The asset owns its backing stream exclusively; all decode, composite,
/// and audio calls run to completion on the caller's thread. A single
/// render/update tick is assumed to drive every call — no internal
/// synchronization is provided.
pub struct ProjectionAsset {
    source: StreamSource,
    identifier: [u8; 4],

    state: AssetState,
    users: u32,
    pending_reset: bool,
    stats: StreamStats,
    stream: Option<Stream>,

    material: Option<Material>,
    loop_time: f32,
    dims: Option<PixelDims>,
    mode: AnimationMode,
    thresholds: Vec<StackThreshold>,
    tags: Vec<String>,
    layers: Vec<Layer>,
    frames: Vec<Frame>,
    pointers: Vec<ResolvedPointer>,
    palette: Vec<[u8; 4]>,
    masks: Vec<FrameMask>,
    audio: Option<AudioInfo>,

    lut: BlendLut,
    scratch_rgba: Vec<u8>,
    scratch_bytes: Vec<u8>,
    scratch_units: Vec<u8>,
    claim: Vec<u8>,
}

impl ProjectionAsset {
    /// Create an unloaded asset over the given source.
    pub fn new(source: StreamSource) -> Self {
        Self::with_identifier(source, PROJECTION_MAGIC)
    }

    /// Create an unloaded asset expecting a kind-specific identifier.
    pub fn with_identifier(source: StreamSource, identifier: [u8; 4]) -> Self {
        Self {
            source,
            identifier,
            state: AssetState::Unloaded,
            users: 0,
            pending_reset: false,
            stats: StreamStats::default(),
            stream: None,
            material: None,
            loop_time: 0.0,
            dims: None,
            mode: AnimationMode::Loop,
            thresholds: Vec::new(),
            tags: Vec::new(),
            layers: Vec::new(),
            frames: Vec::new(),
            pointers: Vec::new(),
            palette: Vec::new(),
            masks: Vec::new(),
            audio: None,
            lut: BlendLut::new(),
            scratch_rgba: Vec::new(),
            scratch_bytes: Vec::new(),
            scratch_units: Vec::new(),
            claim: Vec::new(),
        }
    }

    /// Parse and validate the whole container up to the audio payload.
    ///
    /// On failure the stream is closed, no partial state survives, and the
    /// asset stays `Unloaded`; callers fall back to a placeholder. Loading
    /// an already loaded asset is a no-op.
    pub fn load(&mut self) -> HoloreelResult<()> {
        if self.state == AssetState::Loaded {
            return Ok(());
        }
        self.state = AssetState::Loading;
        match self.try_load() {
            Ok(()) => {
                self.state = AssetState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.clear_parsed();
                self.state = AssetState::Unloaded;
                tracing::warn!(error = %e, "projection load failed");
                Err(e)
            }
        }
    }

    fn try_load(&mut self) -> HoloreelResult<()> {
        let mut stream = Stream::open(&self.source)?;
        self.stats.opens += 1;

        let parsed = match parse_container(&mut stream, self.identifier) {
            Ok(parsed) => parsed,
            Err(e) => {
                drop(stream);
                self.stats.closes += 1;
                return Err(e);
            }
        };

        self.material = Some(parsed.material);
        self.loop_time = parsed.loop_time;
        self.dims = Some(parsed.dims);
        self.mode = parsed.mode;
        self.thresholds = parsed.thresholds;
        self.tags = parsed.tags;
        self.layers = parsed.layers;
        self.frames = parsed.frames;
        self.pointers = parsed.pointers;
        self.palette = parsed.palette;
        self.masks = parsed.masks;
        self.audio = Some(parsed.audio);

        if self.users > 0 {
            self.stream = Some(stream);
        } else {
            drop(stream);
            self.stats.closes += 1;
        }
        Ok(())
    }

    /// Release every parsed array and close the stream. Safe to repeat.
    pub fn unload(&mut self) {
        self.users = 0;
        self.pending_reset = false;
        self.close_stream();
        self.clear_parsed();
        self.state = AssetState::Unloaded;
    }

    /// Register one consumer; the 0→1 transition opens the backing stream.
    pub fn register_user(&mut self) -> HoloreelResult<()> {
        if self.state != AssetState::Loaded {
            return Err(HoloreelError::validation(
                "register_user requires a loaded asset",
            ));
        }
        self.users += 1;
        self.pending_reset = false;
        if self.users == 1 && self.stream.is_none() {
            self.stream = Some(Stream::open(&self.source)?);
            self.stats.opens += 1;
        }
        Ok(())
    }

    /// Unregister one consumer.
    ///
    /// Reaching zero users only marks a pending reset; the stream closes on
    /// the next [`update`](Self::update) tick that still sees zero users, so
    /// register/unregister churn within one tick never cycles the handle.
    pub fn unregister_user(&mut self) {
        self.users = self.users.saturating_sub(1);
        if self.users == 0 {
            self.pending_reset = true;
        }
    }

    /// Periodic tick: perform the deferred stream close and teardown.
    pub fn update(&mut self) {
        if self.pending_reset && self.users == 0 {
            self.close_stream();
            if let Some(material) = &mut self.material {
                material.icon = None;
            }
            self.pending_reset = false;
        }
    }

    /// Composite one frame into `target`.
    ///
    /// Layer 0 always composites; layers `1..N` participate when enabled in
    /// `mask`. `stencil` selects an optional frame mask by index. The target
    /// is cleared up front, so every failure mode leaves a defined empty
    /// state; an out-of-range frame, an unloaded asset, or a closed stream
    /// produce [`Composed::none`] rather than an error.
    pub fn compose_frame(
        &mut self,
        mask: LayerMask,
        frame: usize,
        stencil: Option<usize>,
        target: &mut FrameTarget,
    ) -> HoloreelResult<Composed> {
        let Some(dims) = self.dims else {
            target.clear();
            return Ok(Composed::none());
        };
        target.prepare(dims);

        if self.state != AssetState::Loaded || frame >= self.frames.len() {
            return Ok(Composed::none());
        }

        let Self {
            stream,
            layers,
            pointers,
            palette,
            masks,
            lut,
            scratch_rgba,
            scratch_bytes,
            scratch_units,
            claim,
            ..
        } = self;
        let Some(stream) = stream.as_mut() else {
            tracing::debug!("compose_frame without an open stream; register a user first");
            return Ok(Composed::none());
        };

        let pixel_count = dims.pixel_count();
        let byte_len = dims.byte_len();
        scratch_rgba.resize(byte_len, 0);
        claim.resize(pixel_count, 0);

        let layer_count = layers.len();
        let stencil_alpha = match stencil {
            Some(index) if layer_count > 1 => {
                let found = masks.get(index).map(|m| m.alpha.as_slice());
                if found.is_none() {
                    tracing::debug!(index, "stencil mask index out of range, ignoring");
                }
                found
            }
            _ => None,
        };

        let ptr = |layer: usize, channel: ChannelKind| {
            pointers[pointer_index(layer_count, frame, layer, channel.index())]
        };
        let mut decode = |stream: &mut Stream, p: ResolvedPointer, dst: &mut [u8]| -> bool {
            match decode_channel(
                stream,
                p,
                palette,
                pixel_count,
                dst,
                scratch_bytes,
                scratch_units,
            ) {
                Ok(present) => present,
                Err(e) => {
                    tracing::debug!(error = %e, frame, "channel decode failed, treating as absent");
                    false
                }
            }
        };

        let mut produced = Composed::none();

        // Diffuse: base layer straight into the destination, upper layers
        // blended source-over.
        if decode(stream, ptr(0, ChannelKind::Diffuse), &mut target.diffuse) {
            produced.diffuse = true;
        }
        if let Some(st) = stencil_alpha {
            apply_stencil(lut, &mut target.diffuse, st);
        }
        for layer in 1..layer_count {
            if !mask.contains(layer) {
                continue;
            }
            if decode(stream, ptr(layer, ChannelKind::Diffuse), scratch_rgba) {
                if let Some(st) = stencil_alpha {
                    apply_stencil(lut, scratch_rgba, st);
                }
                blend_over(lut, &mut target.diffuse, scratch_rgba);
                produced.diffuse = true;
            }
        }

        // Emission: base layer, then the cumulative transparency claim of
        // the enabled transparency-contributing layers masks it before the
        // upper layers blend on top.
        if decode(stream, ptr(0, ChannelKind::Emission), &mut target.emission) {
            produced.emission = true;
        }
        if layer_count > 1 {
            claim.fill(0);
            let mut any_claim = false;
            for layer in 1..layer_count {
                if !mask.contains(layer) || !layers[layer].transparency_contributing() {
                    continue;
                }
                if decode(stream, ptr(layer, ChannelKind::Diffuse), scratch_rgba) {
                    accumulate_claim(claim, scratch_rgba);
                    any_claim = true;
                }
            }
            if any_claim {
                apply_stencil(lut, &mut target.emission, claim);
            }
        }
        if let Some(st) = stencil_alpha {
            apply_stencil(lut, &mut target.emission, st);
        }
        for layer in 1..layer_count {
            if !mask.contains(layer) {
                continue;
            }
            if decode(stream, ptr(layer, ChannelKind::Emission), scratch_rgba) {
                if let Some(st) = stencil_alpha {
                    apply_stencil(lut, scratch_rgba, st);
                }
                blend_over(lut, &mut target.emission, scratch_rgba);
                produced.emission = true;
            }
        }

        Ok(produced)
    }

    /// Read a window of PCM16 samples from an audio variant into `buf`.
    ///
    /// Returns the sample frames read; zero signals end-of-stream, an
    /// out-of-range variant, an unloaded asset, or a closed stream.
    pub fn read_audio(
        &mut self,
        variant: u16,
        sample_offset: i64,
        buf: &mut [u8],
    ) -> HoloreelResult<u64> {
        if self.state != AssetState::Loaded {
            return Ok(0);
        }
        let Some(info) = self.audio else {
            return Ok(0);
        };
        let Some(stream) = self.stream.as_mut() else {
            tracing::debug!("read_audio without an open stream; register a user first");
            return Ok(0);
        };
        read_audio(stream, info, variant, sample_offset, buf)
    }

    /// Display duration of one frame in seconds; 0.0 out of range.
    pub fn frame_duration(&self, frame: usize) -> f32 {
        self.frames.get(frame).map(|f| f.duration).unwrap_or(0.0)
    }

    /// Linear total duration: the sum of frame durations, falling back to
    /// the container loop time when frames carry none.
    pub fn total_duration(&self) -> f32 {
        let sum: f32 = self.frames.iter().map(|f| f.duration.max(0.0)).sum();
        if sum > 0.0 { sum } else { self.loop_time.max(0.0) }
    }

    /// Map a playback clock to a frame index under the animation mode.
    pub fn frame_at(&self, seconds: f32) -> usize {
        let count = self.frames.len();
        let total = self.total_duration();
        if count == 0 || total <= 0.0 {
            return 0;
        }

        let t = match self.mode {
            AnimationMode::Loop => seconds.rem_euclid(total),
            AnimationMode::Once => seconds.clamp(0.0, total),
            AnimationMode::PingPong => {
                let m = seconds.rem_euclid(2.0 * total);
                if m > total { 2.0 * total - m } else { m }
            }
        };

        let explicit: f32 = self.frames.iter().map(|f| f.duration.max(0.0)).sum();
        let mut acc = 0.0f32;
        for (i, frame) in self.frames.iter().enumerate() {
            let d = if explicit > 0.0 {
                frame.duration.max(0.0)
            } else {
                total / count as f32
            };
            acc += d;
            if t < acc {
                return i;
            }
        }
        count - 1
    }

    /// Number of frames unlocked at the given collected quantity.
    pub fn unlocked_frames(&self, stack_size: i32) -> usize {
        if self.thresholds.is_empty() {
            return self.frames.len();
        }
        let mut unlocked = 0i32;
        for t in &self.thresholds {
            if stack_size >= t.stack_size {
                unlocked = t.unlocked_frames;
            } else {
                break;
            }
        }
        unlocked.clamp(0, self.frames.len() as i32) as usize
    }

    /// Layers visible at the given collected quantity.
    pub fn visible_layers(&self, stack_size: i32) -> LayerMask {
        let mut mask = LayerMask::NONE;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.default_visible() || stack_size >= layer.unlock_stack {
                mask = mask.with(i);
            }
        }
        mask
    }

    /// The shared material record, once loaded.
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// Searchable tag strings attached to the asset.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Layer descriptions, once loaded.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Audio trailer metadata, once loaded.
    pub fn audio(&self) -> Option<AudioInfo> {
        self.audio
    }

    /// Frame dimensions, once loaded.
    pub fn dimensions(&self) -> Option<PixelDims> {
        self.dims
    }

    /// Number of animation frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the asset is fully loaded.
    pub fn is_loaded(&self) -> bool {
        self.state == AssetState::Loaded
    }

    /// Current consumer count.
    pub fn users(&self) -> u32 {
        self.users
    }

    /// Backing-stream open/close transition counts.
    pub fn stream_stats(&self) -> StreamStats {
        self.stats
    }

    fn close_stream(&mut self) {
        if self.stream.take().is_some() {
            self.stats.closes += 1;
        }
    }

    fn clear_parsed(&mut self) {
        self.material = None;
        self.loop_time = 0.0;
        self.dims = None;
        self.mode = AnimationMode::Loop;
        self.thresholds.clear();
        self.tags.clear();
        self.layers.clear();
        self.frames.clear();
        self.pointers.clear();
        self.palette.clear();
        self.masks.clear();
        self.audio = None;
    }
}

fn parse_container(stream: &mut Stream, identifier: [u8; 4]) -> HoloreelResult<ParsedBody> {
    read_header(stream, identifier)?;
    let material = read_material(stream)?;

    let loop_time = stream.read_f32()?;
    let width = stream.read_i32()?;
    let height = stream.read_i32()?;
    let dims = PixelDims::new(width, height)?;

    let mode_byte = stream.read_u8()?;
    let mode = AnimationMode::from_u8(mode_byte).ok_or_else(|| {
        HoloreelError::validation(format!("unknown animation mode {mode_byte}"))
    })?;

    let threshold_count = stream.read_i32()?;
    if !(0..=MAX_THRESHOLDS).contains(&threshold_count) {
        return Err(HoloreelError::validation(format!(
            "stack threshold count {threshold_count} outside 0..={MAX_THRESHOLDS}"
        )));
    }
    let mut thresholds = Vec::with_capacity(threshold_count as usize);
    for _ in 0..threshold_count {
        let stack_size = stream.read_i32()?;
        let unlocked_frames = stream.read_i32()?;
        thresholds.push(StackThreshold {
            stack_size,
            unlocked_frames,
        });
    }

    let tag_count = stream.read_u16()?;
    if tag_count > MAX_TAGS {
        return Err(HoloreelError::validation(format!(
            "tag count {tag_count} exceeds the cap of {MAX_TAGS}"
        )));
    }
    let mut tags = Vec::with_capacity(usize::from(tag_count));
    for _ in 0..tag_count {
        tags.push(stream.read_string()?);
    }

    let layer_count = stream.read_i32()?;
    if !(1..=MAX_LAYERS as i32).contains(&layer_count) {
        return Err(HoloreelError::validation(format!(
            "layer count {layer_count} outside 1..={MAX_LAYERS}"
        )));
    }
    let layer_count = layer_count as usize;
    let mut layers = Vec::with_capacity(layer_count);
    for _ in 0..layer_count {
        let name = stream.read_string()?;
        let flags = stream.read_u32()?;
        let unlock_stack = stream.read_i32()?;
        layers.push(Layer {
            name,
            flags,
            unlock_stack,
        });
    }

    let frame_count = stream.read_i32()?;
    if !(0..=MAX_FRAMES).contains(&frame_count) {
        return Err(HoloreelError::validation(format!(
            "frame count {frame_count} outside 0..={MAX_FRAMES}"
        )));
    }
    let frame_count = frame_count as usize;
    let (frames, raw_pointers) = read_frames(stream, layer_count, frame_count)?;
    let pointers = resolve_pointers(&raw_pointers, frame_count, layer_count);

    let palette_count = stream.read_i32()?;
    if !(0..=MAX_PALETTE).contains(&palette_count) {
        return Err(HoloreelError::validation(format!(
            "palette entry count {palette_count} outside 0..={MAX_PALETTE}"
        )));
    }
    let mut palette = Vec::with_capacity(palette_count as usize);
    for _ in 0..palette_count {
        let mut entry = [0u8; 4];
        stream.read_exact(&mut entry)?;
        palette.push(entry);
    }

    let mask_count = stream.read_i32()?;
    if !(0..=MAX_MASKS).contains(&mask_count) {
        return Err(HoloreelError::validation(format!(
            "mask count {mask_count} outside 0..={MAX_MASKS}"
        )));
    }
    let mut masks = Vec::with_capacity(mask_count as usize);
    for _ in 0..mask_count {
        let byte_len = stream.read_u32()? as usize;
        if byte_len != dims.pixel_count() {
            return Err(HoloreelError::validation(format!(
                "mask payload of {byte_len} bytes does not cover {} pixels",
                dims.pixel_count()
            )));
        }
        let mut alpha = vec![0u8; byte_len];
        stream.read_exact(&mut alpha)?;
        masks.push(FrameMask { alpha });
    }

    let audio = read_audio_trailer(stream)?;

    Ok(ParsedBody {
        material,
        loop_time,
        dims,
        mode,
        thresholds,
        tags,
        layers,
        frames,
        pointers,
        palette,
        masks,
        audio,
    })
}

fn read_audio_trailer(stream: &mut Stream) -> HoloreelResult<AudioInfo> {
    let type_byte = stream.read_u8()?;
    let format = type_byte & 0x7F;
    if format != 0 {
        return Err(HoloreelError::validation(format!(
            "unknown audio sample format {format}"
        )));
    }
    let stereo = type_byte & 0x80 != 0;
    let sample_rate = stream.read_u32()?;
    let sample_count = stream.read_i64()?;
    if sample_count < 0 {
        return Err(HoloreelError::validation(format!(
            "negative audio sample count {sample_count}"
        )));
    }
    let variant_count = stream.read_u16()?;
    let base_pos = stream.position()?;

    let info = AudioInfo {
        stereo,
        sample_rate,
        sample_count,
        variant_count,
        base_pos,
    };

    let payload = info
        .variant_byte_len()
        .checked_mul(u64::from(variant_count))
        .ok_or_else(|| HoloreelError::validation("audio payload size overflow"))?;
    if base_pos + payload > stream.len() {
        return Err(HoloreelError::validation(format!(
            "audio payload of {payload} bytes extends past end of stream"
        )));
    }
    Ok(info)
}

#[cfg(test)]
#[path = "../../tests/unit/projection/asset.rs"]
mod tests;
