// Bitmap fonts
//
// A font is decoded once into a coverage sheet, colorized on the CPU and kept
// as a system copy, so it can always be restored after a device loss.

use super::{AssetError, AssetLoader, SpriteHandle};
use crate::engine::renderer::PixelColor;
use glam::UVec2;
use image::GenericImageView;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a glyph sits on the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphInfo {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Decoded glyph coverage, one byte per pixel
#[derive(Debug, Clone)]
pub struct GlyphSheet {
    pub size: UVec2,
    pub coverage: Vec<u8>,
    pub glyphs: HashMap<char, GlyphInfo>,
    pub resolution: f32,
}

impl GlyphSheet {
    /// Tallest glyph
    pub fn line_height(&self) -> u32 {
        self.glyphs.values().map(|g| g.height).max().unwrap_or(0)
    }

    /// Colorize into RGBA8. Without a back color the background is transparent.
    pub fn render(&self, fore: PixelColor, back: Option<PixelColor>) -> Vec<u8> {
        let pixels: Vec<PixelColor> = self
            .coverage
            .iter()
            .map(|&c| match back {
                Some(back) => blend(fore, back, c),
                None => fore.with_coverage(c),
            })
            .collect();
        bytemuck::cast_slice(&pixels).to_vec()
    }
}

fn blend(fore: PixelColor, back: PixelColor, coverage: u8) -> PixelColor {
    let mix = |f: u8, b: u8| {
        ((f as u16 * coverage as u16 + b as u16 * (255 - coverage as u16) + 127) / 255) as u8
    };
    PixelColor::rgba(
        mix(fore.r, back.r),
        mix(fore.g, back.g),
        mix(fore.b, back.b),
        mix(fore.a, back.a),
    )
}

/// Decodes one font descriptor format
pub trait FontProcessor: Send + Sync {
    fn process(&self, file: &str, loader: &AssetLoader) -> Result<GlyphSheet, AssetError>;
}

/// Text font descriptors
///
/// ```text
/// # comment
/// image = font.png
/// resolution = 0.5
/// glyph 65 0 0 6 8
/// ```
///
/// `glyph` lines give a Unicode code point and the glyph's rectangle. The
/// image path is relative to the descriptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct TxtFontProcessor;

impl TxtFontProcessor {
    fn parse_glyph(file: &str, line: &str) -> Result<(char, GlyphInfo), AssetError> {
        let bad = || AssetError::Decode(file.to_string(), format!("bad glyph line \"{}\"", line));
        let fields: Vec<u32> = line
            .split_whitespace()
            .skip(1)
            .map(|f| f.parse().map_err(|_| bad()))
            .collect::<Result<_, _>>()?;
        let [code, x, y, width, height] = fields[..] else {
            return Err(bad());
        };
        let c = char::from_u32(code).ok_or_else(bad)?;
        Ok((c, GlyphInfo { x, y, width, height }))
    }
}

impl FontProcessor for TxtFontProcessor {
    fn process(&self, file: &str, loader: &AssetLoader) -> Result<GlyphSheet, AssetError> {
        let bytes = loader.load_bytes(file)?;
        let text = String::from_utf8_lossy(&bytes);

        let mut image_name = None;
        let mut resolution = 1.0;
        let mut glyphs = HashMap::new();

        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("glyph ") {
                let (c, glyph) = Self::parse_glyph(file, line)?;
                glyphs.insert(c, glyph);
            } else if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "image" => image_name = Some(value.trim().to_string()),
                    "resolution" => {
                        resolution = value.trim().parse().map_err(|_| {
                            AssetError::Decode(file.to_string(), "bad resolution".to_string())
                        })?
                    }
                    _ => {}
                }
            }
        }

        let image_name = image_name.ok_or_else(|| {
            AssetError::Decode(file.to_string(), "missing image".to_string())
        })?;
        let image_path = match file.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, image_name),
            None => image_name,
        };

        let bytes = loader.load_bytes(&image_path)?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| AssetError::Decode(image_path.clone(), e.to_string()))?;
        let (width, height) = img.dimensions();
        let coverage = img
            .to_rgba8()
            .pixels()
            .map(|p| {
                let luma = p[0].max(p[1]).max(p[2]) as u16;
                (luma * p[3] as u16 / 255) as u8
            })
            .collect();

        Ok(GlyphSheet {
            size: UVec2::new(width, height),
            coverage,
            glyphs,
            resolution,
        })
    }
}

/// Font request parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontInfo {
    pub file: String,
    pub fore: PixelColor,
    pub back: PixelColor,
    /// False when the back color is opaque black, which means no background
    pub use_back_color: bool,
}

impl FontInfo {
    pub fn new(file: &str, fore: PixelColor, back: PixelColor) -> Self {
        Self {
            file: file.trim().replace('\\', "/"),
            fore,
            back,
            use_back_color: back != PixelColor::BLACK,
        }
    }
}

/// A colorized bitmap font
#[derive(Debug, Clone)]
pub struct Font {
    info: FontInfo,
    sprite: SpriteHandle,
    glyphs: Arc<HashMap<char, GlyphInfo>>,
    height: u32,
}

impl Font {
    pub(crate) fn new(info: FontInfo, sprite: SpriteHandle, sheet: &GlyphSheet) -> Self {
        Self {
            info,
            sprite,
            height: sheet.line_height(),
            glyphs: Arc::new(sheet.glyphs.clone()),
        }
    }

    pub fn info(&self) -> &FontInfo {
        &self.info
    }

    /// The sheet holding every glyph
    pub fn sprite(&self) -> &SpriteHandle {
        &self.sprite
    }

    pub fn glyph(&self, c: char) -> Option<GlyphInfo> {
        self.glyphs.get(&c).copied()
    }

    /// Line height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drawn width of `text`; characters without a glyph take no space
    pub fn text_width(&self, text: &str) -> f32 {
        let pixels: u32 = text.chars().filter_map(|c| self.glyph(c)).map(|g| g.width).sum();
        pixels as f32 * self.sprite.resolution()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_util::write_png;

    fn sheet() -> GlyphSheet {
        GlyphSheet {
            size: UVec2::new(2, 1),
            coverage: vec![255, 0],
            glyphs: HashMap::from([('a', GlyphInfo { x: 0, y: 0, width: 1, height: 1 })]),
            resolution: 1.0,
        }
    }

    #[test]
    fn test_render_without_back_is_transparent() {
        let pixels = sheet().render(PixelColor::rgb(200, 0, 0), None);
        assert_eq!(pixels, vec![200, 0, 0, 255, 200, 0, 0, 0]);
    }

    #[test]
    fn test_render_with_back_blends() {
        let pixels = sheet().render(PixelColor::WHITE, Some(PixelColor::rgb(0, 0, 255)));
        assert_eq!(pixels, vec![255, 255, 255, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_black_back_means_no_background() {
        assert!(!FontInfo::new("f.txt", PixelColor::WHITE, PixelColor::BLACK).use_back_color);
        assert!(FontInfo::new("f.txt", PixelColor::WHITE, PixelColor::rgb(0, 0, 1)).use_back_color);
    }

    #[test]
    fn test_txt_font_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("fonts/small.png"), 8, 4, [255, 255, 255, 255]);
        std::fs::write(
            dir.path().join("fonts/small.txt"),
            "# small font\nimage = small.png\nresolution = 0.5\nglyph 65 0 0 4 4\nglyph 66 4 0 3 4\n",
        )
        .unwrap();
        let loader = AssetLoader::new(dir.path());

        let sheet = TxtFontProcessor.process("fonts/small.txt", &loader).unwrap();
        assert_eq!(sheet.size, UVec2::new(8, 4));
        assert_eq!(sheet.coverage.len(), 32);
        assert!(sheet.coverage.iter().all(|&c| c == 255));
        assert_eq!(sheet.resolution, 0.5);
        assert_eq!(sheet.line_height(), 4);
        assert_eq!(
            sheet.glyphs.get(&'B'),
            Some(&GlyphInfo { x: 4, y: 0, width: 3, height: 4 })
        );
    }

    #[test]
    fn test_txt_font_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("noimage.txt"), "glyph 65 0 0 1 1\n").unwrap();
        std::fs::write(dir.path().join("badglyph.txt"), "image = x.png\nglyph 65 0 0\n").unwrap();
        let loader = AssetLoader::new(dir.path());

        assert!(matches!(
            TxtFontProcessor.process("noimage.txt", &loader),
            Err(AssetError::Decode(..))
        ));
        assert!(matches!(
            TxtFontProcessor.process("badglyph.txt", &loader),
            Err(AssetError::Decode(..))
        ));
        assert!(matches!(
            TxtFontProcessor.process("missing.txt", &loader),
            Err(AssetError::NotFound(_))
        ));
    }
}
