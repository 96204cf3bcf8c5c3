// Render device trait and an in-memory implementation

use super::DeviceError;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every native texture stores RGBA8
pub const BYTES_PER_PIXEL: u64 = 4;

/// Opaque identifier of a native texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u64);

/// A texture allocated by a [`RenderDevice`]
///
/// `width` and `height` are the allocated extent, which can be larger than the
/// frame uploaded into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

impl NativeTexture {
    /// Native bytes backing this texture
    pub fn byte_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * BYTES_PER_PIXEL
    }
}

/// The subset of a graphics device the asset cache needs
///
/// Implementations synchronize internally; all methods take `&self`.
pub trait RenderDevice: Send + Sync {
    /// Allocate a texture able to hold a `width` x `height` frame
    fn create_texture(&self, width: u32, height: u32) -> Result<NativeTexture, DeviceError>;

    /// Copy tightly packed RGBA8 `pixels` into the top-left corner of `texture`
    fn upload(
        &self,
        texture: &NativeTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), DeviceError>;

    /// Free a texture. Releasing an already lost texture is not an error.
    fn release(&self, texture: NativeTexture);

    /// Whether the texture still holds its contents
    fn is_valid(&self, texture: &NativeTexture) -> bool;
}

/// Texture extent for a frame: both sides rounded up to a power of two
pub fn texture_extent(width: u32, height: u32) -> (u32, u32) {
    (
        width.max(1).next_power_of_two(),
        height.max(1).next_power_of_two(),
    )
}

pub(crate) fn check_upload(
    texture: &NativeTexture,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<(), DeviceError> {
    if width > texture.width || height > texture.height {
        return Err(DeviceError::OutOfBounds {
            width,
            height,
            texture_width: texture.width,
            texture_height: texture.height,
        });
    }
    let expected = (width as u64 * height as u64 * BYTES_PER_PIXEL) as usize;
    if pixels.len() < expected {
        return Err(DeviceError::ShortBuffer {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

struct HeadlessTexture {
    width: u32,
    pixels: Vec<u8>,
}

/// A device that keeps textures in system memory
///
/// Used for tests and tools that run without a GPU. [`HeadlessDevice::lose_all`]
/// simulates a device reset.
pub struct HeadlessDevice {
    textures: Mutex<HashMap<TextureId, HeadlessTexture>>,
    next_id: AtomicU64,
    uploads: AtomicU64,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            uploads: AtomicU64::new(0),
        }
    }

    /// Number of textures currently allocated
    pub fn live_textures(&self) -> usize {
        self.textures.lock().len()
    }

    /// Total successful uploads since creation
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::Relaxed)
    }

    /// Drop every texture, as a lost device would
    pub fn lose_all(&self) {
        let mut textures = self.textures.lock();
        debug!("Headless device lost {} textures", textures.len());
        textures.clear();
    }

    /// Read back one pixel
    pub fn read_pixel(&self, texture: &NativeTexture, x: u32, y: u32) -> Option<[u8; 4]> {
        let textures = self.textures.lock();
        let stored = textures.get(&texture.id)?;
        let offset = ((y * stored.width + x) as u64 * BYTES_PER_PIXEL) as usize;
        let px = stored.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_texture(&self, width: u32, height: u32) -> Result<NativeTexture, DeviceError> {
        let (width, height) = texture_extent(width, height);
        let id = TextureId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let texture = NativeTexture { id, width, height };
        self.textures.lock().insert(
            id,
            HeadlessTexture {
                width,
                pixels: vec![0; texture.byte_size() as usize],
            },
        );
        Ok(texture)
    }

    fn upload(
        &self,
        texture: &NativeTexture,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), DeviceError> {
        check_upload(texture, width, height, pixels)?;

        let mut textures = self.textures.lock();
        let stored = textures
            .get_mut(&texture.id)
            .ok_or(DeviceError::Lost(texture.id))?;

        let row = (width as u64 * BYTES_PER_PIXEL) as usize;
        let pitch = (stored.width as u64 * BYTES_PER_PIXEL) as usize;
        for y in 0..height as usize {
            stored.pixels[y * pitch..y * pitch + row]
                .copy_from_slice(&pixels[y * row..(y + 1) * row]);
        }

        self.uploads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn release(&self, texture: NativeTexture) {
        self.textures.lock().remove(&texture.id);
    }

    fn is_valid(&self, texture: &NativeTexture) -> bool {
        self.textures.lock().contains_key(&texture.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_extent_rounds_up() {
        assert_eq!(texture_extent(1, 1), (1, 1));
        assert_eq!(texture_extent(3, 5), (4, 8));
        assert_eq!(texture_extent(64, 65), (64, 128));
        assert_eq!(texture_extent(0, 0), (1, 1));
    }

    #[test]
    fn test_headless_create_and_release() {
        let device = HeadlessDevice::new();
        let tex = device.create_texture(3, 3).unwrap();
        assert_eq!((tex.width, tex.height), (4, 4));
        assert_eq!(tex.byte_size(), 64);
        assert_eq!(device.live_textures(), 1);
        assert!(device.is_valid(&tex));

        device.release(tex);
        assert_eq!(device.live_textures(), 0);
        assert!(!device.is_valid(&tex));
    }

    #[test]
    fn test_headless_upload_uses_texture_pitch() {
        let device = HeadlessDevice::new();
        let tex = device.create_texture(2, 2).unwrap();
        let pixels = [
            1, 1, 1, 1, 2, 2, 2, 2, //
            3, 3, 3, 3, 4, 4, 4, 4,
        ];
        device.upload(&tex, 2, 2, &pixels).unwrap();
        assert_eq!(device.read_pixel(&tex, 1, 1), Some([4, 4, 4, 4]));
        assert_eq!(device.upload_count(), 1);
    }

    #[test]
    fn test_headless_upload_rejects_bad_input() {
        let device = HeadlessDevice::new();
        let tex = device.create_texture(2, 2).unwrap();

        let err = device.upload(&tex, 4, 4, &[0; 64]).unwrap_err();
        assert!(matches!(err, DeviceError::OutOfBounds { .. }));

        let err = device.upload(&tex, 2, 2, &[0; 8]).unwrap_err();
        assert!(matches!(err, DeviceError::ShortBuffer { expected: 16, .. }));
    }

    #[test]
    fn test_lost_texture_rejects_upload() {
        let device = HeadlessDevice::new();
        let tex = device.create_texture(1, 1).unwrap();
        device.lose_all();

        assert!(!device.is_valid(&tex));
        let err = device.upload(&tex, 1, 1, &[0; 4]).unwrap_err();
        assert!(matches!(err, DeviceError::Lost(_)));
    }
}
