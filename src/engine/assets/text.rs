// Localized text tables
//
// A table is a plain text file read line by line. Lines of one logical string
// run until a line containing the `}#` marker.

use encoding_rs::Encoding;

const GROUP_MARKER: &str = "}#";
const LINE_END: char = '}';

/// Character encoding of text tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Look up an encoding by WHATWG label, e.g. `windows-1252`
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, _) = self.0.decode(bytes);
        text.into_owned()
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Line-indexed string table
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    lines: Vec<String>,
}

impl TextTable {
    pub fn from_bytes(bytes: &[u8], encoding: TextEncoding) -> Self {
        Self::from_text(&encoding.decode(bytes))
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// One line with a single trailing `}` removed
    pub fn get_string(&self, index: usize) -> Option<String> {
        let line = self.line(index)?;
        Some(line.strip_suffix(LINE_END).unwrap_or(line).to_string())
    }

    /// Lines from `start` up to, not including, the next marker line
    ///
    /// Without a following marker only the start line is returned. Every `}`
    /// is removed.
    pub fn get_strings(&self, start: usize) -> Vec<String> {
        if start >= self.lines.len() {
            return Vec::new();
        }

        let last = self.lines[start..]
            .iter()
            .position(|line| line.contains(GROUP_MARKER))
            .map_or(start + 1, |offset| start + offset);

        self.lines[start..last]
            .iter()
            .map(|line| line.replace(LINE_END, ""))
            .collect()
    }

    /// First line after the `section`-th marker line (0 for section 0)
    pub fn section_start(&self, section: usize) -> usize {
        let mut index = 0;
        let mut sections = 0;
        for (i, line) in self.lines.iter().enumerate() {
            if sections >= section {
                break;
            }
            if line.contains(GROUP_MARKER) {
                sections += 1;
                index = i + 1;
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Welcome}
to the wasteland}
}#
first line}
second line
}#
lonely}";

    #[test]
    fn test_get_string_strips_trailing_brace() {
        let table = TextTable::from_text(TABLE);
        assert_eq!(table.get_string(0).as_deref(), Some("Welcome"));
        assert_eq!(table.get_string(4).as_deref(), Some("second line"));
        assert_eq!(table.get_string(99), None);
    }

    #[test]
    fn test_get_strings_until_marker() {
        let table = TextTable::from_text(TABLE);
        assert_eq!(table.get_strings(0), vec!["Welcome", "to the wasteland"]);
        assert_eq!(table.get_strings(3), vec!["first line", "second line"]);
    }

    #[test]
    fn test_get_strings_without_marker_is_one_line() {
        let table = TextTable::from_text(TABLE);
        assert_eq!(table.get_strings(6), vec!["lonely"]);
        assert!(table.get_strings(7).is_empty());
    }

    #[test]
    fn test_section_start() {
        let table = TextTable::from_text(TABLE);
        assert_eq!(table.section_start(0), 0);
        assert_eq!(table.section_start(1), 3);
        assert_eq!(table.section_start(2), 6);
        assert_eq!(table.section_start(9), 6);
    }

    #[test]
    fn test_decode_latin1() {
        let encoding = TextEncoding::for_label("windows-1252").unwrap();
        let table = TextTable::from_bytes(b"Stra\xdfe}\r\nzwei", encoding);
        assert_eq!(table.get_string(0).as_deref(), Some("Straße"));
        assert_eq!(table.line(1), Some("zwei"));
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert!(TextEncoding::for_label("no-such-encoding").is_none());
        assert_eq!(TextEncoding::default().name(), "UTF-8");
    }
}
