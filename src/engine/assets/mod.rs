// Asset management system
//
// Provides centralized loading, caching and deferred device upload of sprites,
// fonts, data objects and text tables.

mod animation;
mod data;
mod entry;
mod font;
mod handle;
mod id;
mod loader;
mod manager;
mod memory;
mod processor;
mod queue;
mod replacement;
mod text;

pub use animation::{AnimationClock, AnimationTemplate, FRAME_EPSILON};
pub use data::{DataObject, DataProcessor, DataRef, SpriteData, SpriteDataProcessor};
pub use entry::{AssetEntry, Frame, LoadState};
pub use font::{Font, FontInfo, FontProcessor, GlyphInfo, GlyphSheet, TxtFontProcessor};
pub use handle::SpriteHandle;
pub use id::ResourceId;
pub use loader::AssetLoader;
pub use manager::{AssetStats, ResourceManager, ResourceSettings, MAX_SPRITE_FRAMES};
pub use memory::{MemoryAccountant, MemoryStats};
pub use processor::{
    DecodedFrame, FrameSource, PngProcessor, PngSequenceProcessor, SpriteLayout, SpriteProcessor,
};
pub use queue::{DeferredLoadQueue, LoadBudget};
pub use replacement::{resolve, Resolution, ReplacementTable};
pub use text::{TextEncoding, TextTable};

use crate::engine::renderer::DeviceError;

/// How a cache miss is turned into resident data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Decode and upload before returning
    Immediate,
    /// Return at once and upload from the deferred queue
    #[default]
    Deferred,
    /// Register a placeholder only; nothing is uploaded until an explicit load
    LinkOnly,
}

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Unsupported format \"{format}\" for {id}")]
    UnsupportedFormat { format: String, id: String },

    #[error("Invalid resource id: {0}")]
    InvalidId(String),

    #[error("Failed to decode {0}: {1}")]
    Decode(String, String),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::Path;

    /// Write a `width` x `height` PNG filled with `color`
    pub fn write_png(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
        img.save_with_format(path, image::ImageFormat::Png).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_display() {
        let err = AssetError::NotFound("test.png".to_string());
        assert_eq!(err.to_string(), "Asset not found: test.png");

        let err = AssetError::UnsupportedFormat {
            format: "bmp".to_string(),
            id: "title.bmp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported format \"bmp\" for title.bmp"
        );
    }

    #[test]
    fn test_default_load_mode_is_deferred() {
        assert_eq!(LoadMode::default(), LoadMode::Deferred);
    }
}
