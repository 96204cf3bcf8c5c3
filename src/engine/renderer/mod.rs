// Rendering device abstraction
//
// The asset cache only talks to the graphics API through `RenderDevice`.

mod device;
pub mod texture;

pub use device::{
    texture_extent, HeadlessDevice, NativeTexture, RenderDevice, TextureId, BYTES_PER_PIXEL,
};
pub use texture::WgpuDevice;

use bytemuck::{Pod, Zeroable};

/// Errors reported by a render device
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Texture {0:?} is no longer valid")]
    Lost(TextureId),

    #[error("Upload of {width}x{height} does not fit texture {texture_width}x{texture_height}")]
    OutOfBounds {
        width: u32,
        height: u32,
        texture_width: u32,
        texture_height: u32,
    },

    #[error("Pixel buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("Device backend error: {0}")]
    Backend(String),
}

/// An RGBA8 color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PixelColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PixelColor {
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with its alpha scaled by `coverage` (0..=255)
    pub fn with_coverage(self, coverage: u8) -> Self {
        let a = (self.a as u16 * coverage as u16 + 127) / 255;
        Self { a: a as u8, ..self }
    }
}
