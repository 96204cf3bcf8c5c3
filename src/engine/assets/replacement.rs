// Resource replacement table
//
// Lets an asset pack substitute files, e.g. higher resolution sprites.
//
// ```ini
// sprite_resolution = 0.5
//
// [replacement]
// png@gfx/title.png = hires/title.png
// gfx/font.txt = hires/font.txt
// ```

use super::{AssetError, ResourceId};
use configparser::ini::Ini;
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;

const REPLACEMENT_SECTION: &str = "replacement";
const SPRITE_RESOLUTION_KEY: &str = "sprite_resolution";

/// Maps logical files to override files
///
/// Keys are either `format@file` or `file`; the format-qualified key wins.
#[derive(Debug, Clone)]
pub struct ReplacementTable {
    overrides: HashMap<String, String>,
    sprite_resolution: f32,
}

impl ReplacementTable {
    /// Create an empty table whose overrides are drawn at `sprite_resolution`
    pub fn new(sprite_resolution: f32) -> Self {
        Self {
            overrides: HashMap::new(),
            sprite_resolution,
        }
    }

    /// Load a table from an INI file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let mut config = Ini::new_cs();
        config
            .load(path)
            .map_err(|e| AssetError::Config(format!("{}: {}", path.display(), e)))?;

        let table = Self::from_config(&config)?;
        info!(
            "Loaded {} resource replacements from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from INI text
    pub fn from_ini(text: &str) -> Result<Self, AssetError> {
        let mut config = Ini::new_cs();
        config
            .read(text.to_string())
            .map_err(AssetError::Config)?;
        Self::from_config(&config)
    }

    fn from_config(config: &Ini) -> Result<Self, AssetError> {
        let sprite_resolution = config
            .getfloat("default", SPRITE_RESOLUTION_KEY)
            .map_err(AssetError::Config)?
            .unwrap_or(1.0) as f32;

        let mut table = Self::new(sprite_resolution);
        if let Some(section) = config.get_map_ref().get(REPLACEMENT_SECTION) {
            for (key, value) in section {
                if let Some(value) = value {
                    table.insert(key.as_str(), value.as_str());
                }
            }
        }
        Ok(table)
    }

    /// Add or overwrite an override
    pub fn insert(&mut self, key: &str, file: &str) {
        self.overrides
            .insert(key.trim().replace('\\', "/"), file.trim().to_string());
    }

    /// Override file for an id, if any
    pub fn lookup(&self, id: &ResourceId) -> Option<&str> {
        let qualified = format!("{}@{}", id.format(), id.file());
        self.overrides
            .get(&qualified)
            .or_else(|| self.overrides.get(id.file()))
            .map(String::as_str)
    }

    /// Resolution factor applied to adopted overrides
    pub fn sprite_resolution(&self) -> f32 {
        self.sprite_resolution
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Outcome of resolving an id through the replacement table
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub id: ResourceId,
    pub resolution: f32,
    pub replaced: bool,
}

impl Resolution {
    fn original(id: &ResourceId) -> Self {
        Self {
            id: id.clone(),
            resolution: 1.0,
            replaced: false,
        }
    }
}

/// Rewrite `id` through `table`
///
/// A candidate already known to the cache is adopted without touching the
/// file system. Otherwise the candidate is adopted only if `exists` confirms
/// its backing file; if not, the original id is kept.
pub fn resolve(
    table: Option<&ReplacementTable>,
    id: &ResourceId,
    is_cached: impl Fn(&ResourceId) -> bool,
    exists: impl Fn(&ResourceId) -> bool,
) -> Resolution {
    let Some(table) = table else {
        return Resolution::original(id);
    };
    let Some(file) = table.lookup(id) else {
        return Resolution::original(id);
    };

    let candidate = id.with_file(file);
    if is_cached(&candidate) || exists(&candidate) {
        debug!("replace \"{}\" with \"{}\"", id, candidate);
        return Resolution {
            id: candidate,
            resolution: table.sprite_resolution(),
            replaced: true,
        };
    }

    debug!("replacement \"{}\" unavailable, using \"{}\"", candidate, id);
    Resolution::original(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    const CONFIG: &str = "\
sprite_resolution = 0.5

[replacement]
png@foo.png = hires/foo_png.png
foo.png = hires/foo_any.png
gfx/Font.txt = hires/font.txt
";

    #[test]
    fn test_parse_config() {
        let table = ReplacementTable::from_ini(CONFIG).unwrap();
        assert_eq!(table.len(), 3);
        assert_relative_eq!(table.sprite_resolution(), 0.5);
        assert_eq!(
            table.lookup(&ResourceId::parse("gfx/Font.txt")),
            Some("hires/font.txt")
        );
    }

    #[test]
    fn test_missing_resolution_defaults_to_one() {
        let table = ReplacementTable::from_ini("[replacement]\na.png = b.png\n").unwrap();
        assert_relative_eq!(table.sprite_resolution(), 1.0);
    }

    #[test]
    fn test_format_key_takes_precedence() {
        let table = ReplacementTable::from_ini(CONFIG).unwrap();
        let id = ResourceId::parse("foo.png");
        assert_eq!(table.lookup(&id), Some("hires/foo_png.png"));

        let resolved = resolve(Some(&table), &id, |_| false, |_| true);
        assert_eq!(resolved.id.to_string(), "hires/foo_png.png");
        assert!(resolved.replaced);
        assert_relative_eq!(resolved.resolution, 0.5);
    }

    #[test]
    fn test_no_table_is_identity() {
        let id = ResourceId::parse("foo.png?1");
        let resolved = resolve(None, &id, |_| true, |_| true);
        assert_eq!(resolved.id, id);
        assert!(!resolved.replaced);
        assert_relative_eq!(resolved.resolution, 1.0);
    }

    #[test]
    fn test_missing_override_falls_back() {
        let table = ReplacementTable::from_ini(CONFIG).unwrap();
        let id = ResourceId::parse("foo.png");
        let resolved = resolve(Some(&table), &id, |_| false, |_| false);
        assert_eq!(resolved.id, id);
        assert!(!resolved.replaced);
    }

    #[test]
    fn test_cached_candidate_skips_existence_check() {
        let table = ReplacementTable::from_ini(CONFIG).unwrap();
        let checks = Cell::new(0);
        let id = ResourceId::parse("foo.png?2??tint");

        let resolved = resolve(
            Some(&table),
            &id,
            |c| c.to_string() == "hires/foo_png.png?2?tint",
            |_| {
                checks.set(checks.get() + 1);
                false
            },
        );
        assert!(resolved.replaced);
        assert_eq!(resolved.id.index(), Some(2));
        assert_eq!(resolved.id.custom(), Some("tint"));
        assert_eq!(checks.get(), 0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hires.ini");
        std::fs::write(&path, CONFIG).unwrap();

        let table = ReplacementTable::load(&path).unwrap();
        assert_eq!(table.len(), 3);
        assert!(ReplacementTable::load(dir.path().join("missing.ini")).is_err());
    }
}
