// Cached frame storage shared by all handles of one resource

use super::{AnimationTemplate, MemoryAccountant, ResourceId, SpriteLayout};
use crate::engine::renderer::{DeviceError, NativeTexture, RenderDevice};
use glam::UVec2;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use std::time::Instant;

/// Upload state of an [`AssetEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Resident,
}

/// One image of a sprite
///
/// A frame may own a CPU-side copy of its pixels. The copy survives losing the
/// native texture, so the frame can be restored without decoding its source.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    size: UVec2,
    texture: Option<NativeTexture>,
    charged: u64,
    system_copy: Option<Arc<[u8]>>,
    uploaded_at: Option<Instant>,
}

impl Frame {
    /// Frame size in pixels (not the texture's allocated size)
    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn texture(&self) -> Option<NativeTexture> {
        self.texture
    }

    pub fn is_resident(&self) -> bool {
        self.texture.is_some()
    }

    /// Bytes charged to the accountant for this frame's texture
    pub fn charged_bytes(&self) -> u64 {
        self.charged
    }

    pub fn has_system_copy(&self) -> bool {
        self.system_copy.is_some()
    }

    pub fn system_copy(&self) -> Option<&[u8]> {
        self.system_copy.as_deref()
    }

    /// When the current texture was uploaded
    pub fn uploaded_at(&self) -> Option<Instant> {
        self.uploaded_at
    }

    pub(crate) fn with_system_copy(size: UVec2, pixels: Vec<u8>) -> Self {
        Self {
            size,
            system_copy: Some(pixels.into()),
            ..Default::default()
        }
    }

    /// Replace the texture with a fresh upload of `pixels`
    pub(crate) fn upload(
        &mut self,
        device: &dyn RenderDevice,
        memory: &mut MemoryAccountant,
        size: UVec2,
        pixels: &[u8],
        retain: bool,
    ) -> Result<(), DeviceError> {
        self.release(device, memory);

        let texture = device.create_texture(size.x, size.y)?;
        if let Err(e) = device.upload(&texture, size.x, size.y, pixels) {
            device.release(texture);
            return Err(e);
        }

        self.charged = texture.byte_size();
        memory.charge(self.charged);
        self.texture = Some(texture);
        self.size = size;
        self.uploaded_at = Some(Instant::now());
        if retain {
            self.system_copy = Some(pixels.into());
        }
        Ok(())
    }

    /// Re-upload the retained copy. Returns false when there is none.
    pub(crate) fn restore(
        &mut self,
        device: &dyn RenderDevice,
        memory: &mut MemoryAccountant,
    ) -> Result<bool, DeviceError> {
        let Some(copy) = self.system_copy.clone() else {
            return Ok(false);
        };
        let size = self.size;
        self.upload(device, memory, size, &copy, false)?;
        Ok(true)
    }

    /// Free the texture, refunding exactly what was charged for it
    pub(crate) fn release(&mut self, device: &dyn RenderDevice, memory: &mut MemoryAccountant) {
        if let Some(texture) = self.texture.take() {
            device.release(texture);
            memory.release(self.charged);
            self.charged = 0;
        }
    }
}

/// Mutable part of an entry
#[derive(Debug)]
pub(crate) struct EntryState {
    pub(crate) frames: Vec<Frame>,
    pub(crate) load_state: LoadState,
    pub(crate) resolution: f32,
    pub(crate) template: Option<AnimationTemplate>,
}

impl EntryState {
    /// Keep only the first `len` frames
    pub(crate) fn truncate(
        &mut self,
        len: usize,
        device: &dyn RenderDevice,
        memory: &mut MemoryAccountant,
    ) {
        for frame in self.frames.iter_mut().skip(len) {
            frame.release(device, memory);
        }
        self.frames.truncate(len);
        if let Some(template) = &mut self.template {
            template.frame_count = len;
        }
    }

    pub(crate) fn release(&mut self, device: &dyn RenderDevice, memory: &mut MemoryAccountant) {
        for frame in &mut self.frames {
            frame.release(device, memory);
        }
    }

    pub(crate) fn all_frames_have_copies(&self) -> bool {
        !self.frames.is_empty() && self.frames.iter().all(Frame::has_system_copy)
    }
}

/// The single cached record behind every handle of one resolved resource
#[derive(Debug)]
pub struct AssetEntry {
    id: ResourceId,
    state: RwLock<EntryState>,
}

impl AssetEntry {
    /// An unloaded entry shaped by the processor's layout
    pub(crate) fn new(id: ResourceId, layout: &SpriteLayout, resolution: f32) -> Self {
        Self {
            id,
            state: RwLock::new(EntryState {
                frames: vec![Frame::default(); layout.frame_count],
                load_state: LoadState::Unloaded,
                resolution,
                template: layout.animation,
            }),
        }
    }

    /// An unloaded entry whose only frame is already decoded in memory
    pub(crate) fn from_pixels(id: ResourceId, size: UVec2, pixels: Vec<u8>, resolution: f32) -> Self {
        Self {
            id,
            state: RwLock::new(EntryState {
                frames: vec![Frame::with_system_copy(size, pixels)],
                load_state: LoadState::Unloaded,
                resolution,
                template: None,
            }),
        }
    }

    /// The resolved id the frames are decoded from
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn load_state(&self) -> LoadState {
        self.state.read().load_state
    }

    pub fn is_resident(&self) -> bool {
        self.load_state() == LoadState::Resident
    }

    pub fn is_loading(&self) -> bool {
        self.load_state() == LoadState::Loading
    }

    pub fn frame_count(&self) -> usize {
        self.state.read().frames.len()
    }

    /// Scale from the frame's pixel size to its drawn size
    pub fn resolution(&self) -> f32 {
        self.state.read().resolution
    }

    pub fn template(&self) -> Option<AnimationTemplate> {
        self.state.read().template
    }

    pub fn frame(&self, index: usize) -> Option<Frame> {
        self.state.read().frames.get(index).cloned()
    }

    /// Run `f` over the frames without copying them
    pub fn with_frames<R>(&self, f: impl FnOnce(&[Frame]) -> R) -> R {
        f(&self.state.read().frames)
    }

    /// Bytes currently charged for this entry's resident frames
    pub fn resident_bytes(&self) -> u64 {
        self.with_frames(|frames| frames.iter().map(Frame::charged_bytes).sum())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, EntryState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, EntryState> {
        self.state.write()
    }
}
