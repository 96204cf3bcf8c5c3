// Sprite handles: shared frames, private playback

use super::{AnimationClock, AssetEntry, Frame, LoadState, ResourceId};
use crate::engine::renderer::NativeTexture;
use glam::{UVec2, Vec2};
use std::sync::Arc;

/// A caller-owned view of a cached sprite
///
/// Handles to the same resource share frame data but each owns its own
/// [`AnimationClock`], so their playback never interferes.
#[derive(Debug, Clone)]
pub struct SpriteHandle {
    entry: Arc<AssetEntry>,
    requested: ResourceId,
    clock: Option<AnimationClock>,
}

impl SpriteHandle {
    /// A handle with a fresh clock seeded from the entry's template
    pub(crate) fn new(entry: Arc<AssetEntry>) -> Self {
        let requested = entry.id().clone();
        Self::with_requested_id(entry, requested)
    }

    /// A handle asked for as `requested`, which replacement may have
    /// redirected to another entry
    pub(crate) fn with_requested_id(entry: Arc<AssetEntry>, requested: ResourceId) -> Self {
        let clock = entry.template().map(|t| AnimationClock::from_template(&t));
        Self {
            entry,
            requested,
            clock,
        }
    }

    /// The resolved id this handle draws from
    pub fn id(&self) -> &ResourceId {
        self.entry.id()
    }

    /// The id the caller asked for, before replacement
    pub fn requested_id(&self) -> &ResourceId {
        &self.requested
    }

    pub fn entry(&self) -> &Arc<AssetEntry> {
        &self.entry
    }

    /// Whether two handles share the same backing entry
    pub fn shares_frames_with(&self, other: &SpriteHandle) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }

    pub fn load_state(&self) -> LoadState {
        self.entry.load_state()
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_resident()
    }

    pub fn is_loading(&self) -> bool {
        self.entry.is_loading()
    }

    pub fn frame_count(&self) -> usize {
        self.entry.frame_count()
    }

    pub fn resolution(&self) -> f32 {
        self.entry.resolution()
    }

    pub fn animation(&self) -> Option<&AnimationClock> {
        self.clock.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut AnimationClock> {
        self.clock.as_mut()
    }

    /// Index of the frame to draw
    ///
    /// Clamped to the entry's current frame count, which can shrink when a
    /// deferred load truncates the sheet.
    pub fn current_frame(&self) -> usize {
        let frame = self.clock.as_ref().map_or(0, AnimationClock::frame);
        frame.min(self.entry.frame_count().saturating_sub(1))
    }

    /// The frame to draw, if the sheet has any
    pub fn frame(&self) -> Option<Frame> {
        self.entry.frame(self.current_frame())
    }

    /// Texture of the current frame, once resident
    pub fn texture(&self) -> Option<NativeTexture> {
        self.frame().and_then(|f| f.texture())
    }

    /// Pixel size of the current frame
    pub fn original_size(&self) -> UVec2 {
        self.frame().map_or(UVec2::ZERO, |f| f.size())
    }

    /// Drawn size: pixel size scaled by the resolution factor
    pub fn size(&self) -> Vec2 {
        (self.original_size().as_vec2() * self.resolution()).floor()
    }

    pub fn width(&self) -> u32 {
        self.size().x as u32
    }

    pub fn height(&self) -> u32 {
        self.size().y as u32
    }

    /// Advance the animation clock
    pub fn update(&mut self, elapsed: f32) {
        let frame_count = self.entry.frame_count();
        if let Some(clock) = &mut self.clock {
            if clock.frame_count() != frame_count && self.entry.load_state() == LoadState::Resident
            {
                clock.set_frame_count(frame_count);
            }
            clock.update(elapsed);
        }
    }
}
