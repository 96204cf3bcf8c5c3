// Logical resource identifiers
//
// Grammar: `file[.ext][?index[-end]][?custom]`

use std::fmt;
use std::hash::{Hash, Hasher};

/// Placeholder in a file name that is replaced by a frame index
const INDEX_PLACEHOLDER: &str = "{0}";

/// Identifies a logical asset: a file, an optional frame range and an opaque
/// per-format modifier
///
/// Two ids are equal when their normalized string forms are equal.
#[derive(Debug, Clone)]
pub struct ResourceId {
    file: String,
    format: String,
    index: Option<u32>,
    end_index: Option<u32>,
    custom: Option<String>,
    normalized: String,
}

impl ResourceId {
    /// Parse an identifier string. Never fails: malformed index segments are
    /// treated as absent.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.trim().splitn(3, '?');
        let file = parts.next().unwrap_or_default();
        let range = parts.next().and_then(parse_range);
        let custom = parts
            .next()
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Self::from_parts(file, range, custom)
    }

    fn from_parts(file: &str, range: Option<(u32, Option<u32>)>, custom: Option<String>) -> Self {
        let file = file.trim().replace('\\', "/");
        let format = format_of(&file);
        let (index, end_index) = match range {
            Some((start, end)) => (Some(start), end),
            None => (None, None),
        };

        let mut normalized = file.clone();
        if let Some(index) = index {
            normalized.push('?');
            normalized.push_str(&index.to_string());
            if let Some(end) = end_index {
                normalized.push('-');
                normalized.push_str(&end.to_string());
            }
        }
        if let Some(custom) = &custom {
            if index.is_none() {
                normalized.push('?');
            }
            normalized.push('?');
            normalized.push_str(custom);
        }

        Self {
            file,
            format,
            index,
            end_index,
            custom,
            normalized,
        }
    }

    /// File part, without index or modifier
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Lowercase file extension, empty when the file has none
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn end_index(&self) -> Option<u32> {
        self.end_index
    }

    pub fn custom(&self) -> Option<&str> {
        self.custom.as_deref()
    }

    pub fn index_provided(&self) -> bool {
        self.index.is_some()
    }

    /// Number of frames addressed by the index range (1 without a range)
    pub fn range_len(&self) -> usize {
        match (self.index, self.end_index) {
            (Some(start), Some(end)) => (end - start) as usize + 1,
            _ => 1,
        }
    }

    /// The normalized string form
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// `file?(index + shift)`, dropping any end index and modifier
    ///
    /// Used to walk consecutive entries of a string table.
    pub fn shift(&self, shift: i64) -> Self {
        let pos = (self.index.unwrap_or(0) as i64 + shift).clamp(0, u32::MAX as i64) as u32;
        Self::from_parts(&self.file, Some((pos, None)), None)
    }

    /// Same range and modifier, different file
    pub fn with_file(&self, file: &str) -> Self {
        let range = self.index.map(|start| (start, self.end_index));
        Self::from_parts(file, range, self.custom.clone())
    }

    /// Path of the backing file, with `{0}` replaced by `index`, the id's own
    /// index, or 0
    pub fn source_path(&self, index: Option<u32>) -> String {
        if self.file.contains(INDEX_PLACEHOLDER) {
            let index = index.or(self.index).unwrap_or(0);
            self.file.replace(INDEX_PLACEHOLDER, &index.to_string())
        } else {
            self.file.clone()
        }
    }
}

fn parse_range(segment: &str) -> Option<(u32, Option<u32>)> {
    let segment = segment.trim();
    match segment.split_once('-') {
        Some((start, end)) => {
            let start: u32 = start.trim().parse().ok()?;
            let end: u32 = end.trim().parse().ok()?;
            (end >= start).then_some((start, Some(end)))
        }
        None => Some((segment.parse().ok()?, None)),
    }
}

fn format_of(file: &str) -> String {
    let name = file.rsplit('/').next().unwrap_or(file);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_file() {
        let id = ResourceId::parse("gfx/title.PNG");
        assert_eq!(id.file(), "gfx/title.PNG");
        assert_eq!(id.format(), "png");
        assert_eq!(id.index(), None);
        assert_eq!(id.custom(), None);
        assert_eq!(id.range_len(), 1);
    }

    #[test]
    fn test_parse_range_and_custom() {
        let id = ResourceId::parse("ani/walk{0}.pngani?2-7?fps=8");
        assert_eq!(id.format(), "pngani");
        assert_eq!(id.index(), Some(2));
        assert_eq!(id.end_index(), Some(7));
        assert_eq!(id.range_len(), 6);
        assert_eq!(id.custom(), Some("fps=8"));
        assert_eq!(id.to_string(), "ani/walk{0}.pngani?2-7?fps=8");
    }

    #[test]
    fn test_custom_without_index() {
        let id = ResourceId::parse("burn.raw??once");
        assert_eq!(id.index(), None);
        assert_eq!(id.custom(), Some("once"));
        assert_eq!(id.to_string(), "burn.raw??once");
    }

    #[test]
    fn test_malformed_segments_are_absent() {
        let id = ResourceId::parse("a.png?x1");
        assert_eq!(id.index(), None);
        assert_eq!(id.to_string(), "a.png");

        let id = ResourceId::parse("a.png?4-2");
        assert_eq!(id.index(), None);

        let id = ResourceId::parse("a.png?3-");
        assert_eq!(id.index(), None);

        let id = ResourceId::parse("a.png?3?");
        assert_eq!(id.custom(), None);
        assert_eq!(id.to_string(), "a.png?3");
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            "",
            "plain",
            "dir\\file.png",
            "  spaced.png?1  ",
            "file.png?0",
            "file.pngani?0-9",
            "file.pngani?0-9?once?reverse",
            "file.raw??custom",
            "file.raw?bad?custom",
            "file.raw?1-x?custom",
            "x.txt?s3",
        ];
        for s in samples {
            let once = ResourceId::parse(s);
            let twice = ResourceId::parse(&once.to_string());
            assert_eq!(once, twice, "round trip of {:?}", s);
            assert_eq!(once.index(), twice.index());
            assert_eq!(once.end_index(), twice.end_index());
            assert_eq!(once.custom(), twice.custom());
        }
    }

    #[test]
    fn test_equality_uses_normalized_form() {
        assert_eq!(
            ResourceId::parse("gfx\\a.png?1"),
            ResourceId::parse("gfx/a.png?1")
        );
        assert_ne!(ResourceId::parse("a.png?1"), ResourceId::parse("a.png?2"));
        assert_ne!(ResourceId::parse("A.png"), ResourceId::parse("a.png"));
    }

    #[test]
    fn test_shift() {
        let id = ResourceId::parse("burn.txt?40?custom");
        assert_eq!(id.shift(3).to_string(), "burn.txt?43");
        assert_eq!(id.shift(-50).to_string(), "burn.txt?0");
        assert_eq!(ResourceId::parse("burn.txt").shift(2).to_string(), "burn.txt?2");
        assert_eq!(
            ResourceId::parse("a.pngani?1-4").shift(1).to_string(),
            "a.pngani?2"
        );
    }

    #[test]
    fn test_with_file_keeps_range_and_custom() {
        let id = ResourceId::parse("a.pngani?1-4?once");
        let replaced = id.with_file("hires/a.pngani");
        assert_eq!(replaced.to_string(), "hires/a.pngani?1-4?once");

        let id = ResourceId::parse("a.png??tint");
        assert_eq!(id.with_file("b.png").to_string(), "b.png??tint");
    }

    #[test]
    fn test_source_path_substitutes_index() {
        let id = ResourceId::parse("tiles/t{0}.png?5");
        assert_eq!(id.source_path(None), "tiles/t5.png");
        assert_eq!(id.source_path(Some(7)), "tiles/t7.png");
        assert_eq!(ResourceId::parse("t{0}.png").source_path(None), "t0.png");
        assert_eq!(ResourceId::parse("plain.png?3").source_path(None), "plain.png");
    }
}
