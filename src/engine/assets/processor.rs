// Sprite processors: turn a resource id into decoded frames

use super::{AnimationTemplate, AssetError, AssetLoader, ResourceId};
use glam::UVec2;
use image::{DynamicImage, GenericImageView, ImageFormat};

const INDEX_PLACEHOLDER: &str = "{0}";

/// Frame count and playback defaults a processor declares for an id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteLayout {
    pub frame_count: usize,
    pub animation: Option<AnimationTemplate>,
}

impl SpriteLayout {
    /// A static sprite
    pub fn single() -> Self {
        Self {
            frame_count: 1,
            animation: None,
        }
    }

    pub fn animated(template: AnimationTemplate) -> Self {
        Self {
            frame_count: template.frame_count,
            animation: Some(template),
        }
    }
}

/// Tightly packed RGBA8 pixels of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub size: UVec2,
    pub pixels: Vec<u8>,
}

impl DecodedFrame {
    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            size: UVec2::new(width, height),
            pixels: img.to_rgba8().into_raw(),
        }
    }
}

/// Sequential stream of decoded frames
///
/// `Ok(None)` means the source ended; the caller keeps what it got so far.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, AssetError>;
}

/// Decodes one sprite format
pub trait SpriteProcessor: Send + Sync {
    /// Frames and animation defaults for `id`, known before decoding
    fn layout(&self, id: &ResourceId) -> SpriteLayout;

    /// Open the backing source of `id`
    fn open(&self, id: &ResourceId, loader: &AssetLoader)
        -> Result<Box<dyn FrameSource>, AssetError>;

    /// Whether the backing source of `id` is present
    fn exists(&self, id: &ResourceId, loader: &AssetLoader) -> bool {
        loader.exists(&id.source_path(None))
    }
}

fn decode_png(name: &str, bytes: &[u8]) -> Result<DecodedFrame, AssetError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| AssetError::Decode(name.to_string(), e.to_string()))?;
    Ok(DecodedFrame::from_image(&img))
}

struct SingleFrame(Option<DecodedFrame>);

impl FrameSource for SingleFrame {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, AssetError> {
        Ok(self.0.take())
    }
}

/// Static PNG sprites
///
/// A `{0}` in the file name is replaced by the id's index, so `tile{0}.png?3`
/// reads `tile3.png`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngProcessor;

impl SpriteProcessor for PngProcessor {
    fn layout(&self, _id: &ResourceId) -> SpriteLayout {
        SpriteLayout::single()
    }

    fn open(
        &self,
        id: &ResourceId,
        loader: &AssetLoader,
    ) -> Result<Box<dyn FrameSource>, AssetError> {
        let name = id.source_path(None);
        let bytes = loader.load_bytes(&name)?;
        Ok(Box::new(SingleFrame(Some(decode_png(&name, &bytes)?))))
    }
}

/// Animated sheets stored as numbered PNG files
///
/// `walk{0}.pngani?0-5` reads `walk0.png` .. `walk5.png`. Without a `{0}` the
/// index goes in front of the extension. The custom segment carries playback
/// hints, see [`AnimationTemplate::with_hints`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PngSequenceProcessor;

impl PngSequenceProcessor {
    fn frame_path(id: &ResourceId, index: u32) -> String {
        let file = id.file();
        let stem = file
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file);
        if stem.contains(INDEX_PLACEHOLDER) {
            format!("{}.png", stem.replace(INDEX_PLACEHOLDER, &index.to_string()))
        } else {
            format!("{}{}.png", stem, index)
        }
    }
}

struct SequenceSource {
    loader: AssetLoader,
    id: ResourceId,
    next: u32,
    end: u32,
}

impl FrameSource for SequenceSource {
    fn next_frame(&mut self) -> Result<Option<DecodedFrame>, AssetError> {
        if self.next > self.end {
            return Ok(None);
        }
        let name = PngSequenceProcessor::frame_path(&self.id, self.next);
        if !self.loader.exists(&name) {
            return Ok(None);
        }
        let bytes = self.loader.load_bytes(&name)?;
        self.next += 1;
        decode_png(&name, &bytes).map(Some)
    }
}

impl SpriteProcessor for PngSequenceProcessor {
    fn layout(&self, id: &ResourceId) -> SpriteLayout {
        let template = AnimationTemplate::new(id.range_len());
        SpriteLayout::animated(match id.custom() {
            Some(hints) => template.with_hints(hints),
            None => template,
        })
    }

    fn open(
        &self,
        id: &ResourceId,
        loader: &AssetLoader,
    ) -> Result<Box<dyn FrameSource>, AssetError> {
        let start = id.index().unwrap_or(0);
        Ok(Box::new(SequenceSource {
            loader: loader.clone(),
            id: id.clone(),
            next: start,
            end: id.end_index().unwrap_or(start),
        }))
    }

    fn exists(&self, id: &ResourceId, loader: &AssetLoader) -> bool {
        loader.exists(&Self::frame_path(id, id.index().unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_util::write_png;

    #[test]
    fn test_png_layout_is_single() {
        let layout = PngProcessor.layout(&ResourceId::parse("a.png?0-9"));
        assert_eq!(layout, SpriteLayout::single());
    }

    #[test]
    fn test_png_decodes_rgba() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("tile2.png"), 3, 2, [10, 20, 30, 255]);
        let loader = AssetLoader::new(dir.path());
        let id = ResourceId::parse("tile{0}.png?2");

        assert!(PngProcessor.exists(&id, &loader));
        let mut source = PngProcessor.open(&id, &loader).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.size, UVec2::new(3, 2));
        assert_eq!(frame.pixels.len(), 3 * 2 * 4);
        assert_eq!(&frame.pixels[..4], &[10, 20, 30, 255]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_png_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.png"), b"not a png").unwrap();
        let loader = AssetLoader::new(dir.path());

        let err = PngProcessor
            .open(&ResourceId::parse("missing.png"), &loader)
            .err()
            .unwrap();
        assert!(matches!(err, AssetError::NotFound(_)));

        let err = PngProcessor
            .open(&ResourceId::parse("bad.png"), &loader)
            .err()
            .unwrap();
        assert!(matches!(err, AssetError::Decode(..)));
    }

    #[test]
    fn test_sequence_paths() {
        let id = ResourceId::parse("ani/walk{0}.pngani?0-3");
        assert_eq!(PngSequenceProcessor::frame_path(&id, 2), "ani/walk2.png");

        let id = ResourceId::parse("ani/walk.pngani?0-3");
        assert_eq!(PngSequenceProcessor::frame_path(&id, 1), "ani/walk1.png");
    }

    #[test]
    fn test_sequence_layout_uses_range_and_hints() {
        let layout = PngSequenceProcessor.layout(&ResourceId::parse("w.pngani?4-13?fps=20;once"));
        assert_eq!(layout.frame_count, 10);
        let template = layout.animation.unwrap();
        assert_eq!(template.frame_count, 10);
        assert!(!template.endless);
        assert_eq!(template.speed, 20.0);
    }

    #[test]
    fn test_sequence_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        for i in [1, 2, 4] {
            write_png(&dir.path().join(format!("f{}.png", i)), 2, 2, [0, 0, 0, 255]);
        }
        let loader = AssetLoader::new(dir.path());
        let id = ResourceId::parse("f{0}.pngani?1-4");

        assert!(PngSequenceProcessor.exists(&id, &loader));
        let mut source = PngSequenceProcessor.open(&id, &loader).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }
}
