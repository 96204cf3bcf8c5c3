// Runtime settings read from an INI file
//
// ```ini
// [assets]
// root = assets
// replacement = replace.ini
// retain_system_copies = true
// encoding = windows-1252
//
// [queue]
// max_entries = 8
// max_millis = 4
// ```
//
// Missing keys keep their defaults.

use crate::engine::assets::{LoadBudget, ResourceSettings, TextEncoding};
use anyhow::{anyhow, Context, Result};
use configparser::ini::Ini;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory resource ids are relative to
    pub asset_root: PathBuf,
    /// Replacement table, relative to the asset root
    pub replacement: Option<String>,
    pub retain_system_copies: bool,
    /// WHATWG label of the text table encoding
    pub encoding: String,
    pub budget: LoadBudget,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            replacement: None,
            retain_system_copies: false,
            encoding: "utf-8".to_string(),
            budget: LoadBudget::default(),
        }
    }
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        Self::from_ini(&text).with_context(|| format!("Invalid settings {}", path.display()))
    }

    pub fn from_ini(text: &str) -> Result<Self> {
        let mut config = Ini::new();
        config.read(text.to_string()).map_err(|e| anyhow!(e))?;

        let mut settings = Self::default();
        if let Some(root) = config.get("assets", "root") {
            settings.asset_root = PathBuf::from(root);
        }
        settings.replacement = config
            .get("assets", "replacement")
            .filter(|file| !file.trim().is_empty());
        if let Some(retain) = config
            .getbool("assets", "retain_system_copies")
            .map_err(|e| anyhow!(e))?
        {
            settings.retain_system_copies = retain;
        }
        if let Some(encoding) = config.get("assets", "encoding") {
            settings.encoding = encoding;
        }

        if let Some(entries) = config.getuint("queue", "max_entries").map_err(|e| anyhow!(e))? {
            settings.budget.max_entries = (entries > 0).then_some(entries as usize);
        }
        if let Some(millis) = config.getuint("queue", "max_millis").map_err(|e| anyhow!(e))? {
            settings.budget.max_time = (millis > 0).then(|| Duration::from_millis(millis));
        }

        Ok(settings)
    }

    /// Cache settings; fails on an unknown encoding label
    pub fn resource_settings(&self) -> Result<ResourceSettings> {
        let encoding = TextEncoding::for_label(&self.encoding)
            .ok_or_else(|| anyhow!("Unknown text encoding \"{}\"", self.encoding))?;
        Ok(ResourceSettings {
            retain_system_copies: self.retain_system_copies,
            budget: self.budget,
            encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let settings = Settings::from_ini("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let settings = Settings::from_ini(
            "[assets]\nroot = data\nreplacement = hires.ini\nretain_system_copies = true\n\
             encoding = windows-1252\n\n[queue]\nmax_entries = 0\nmax_millis = 10\n",
        )
        .unwrap();

        assert_eq!(settings.asset_root, PathBuf::from("data"));
        assert_eq!(settings.replacement.as_deref(), Some("hires.ini"));
        assert!(settings.retain_system_copies);
        assert_eq!(settings.budget.max_entries, None);
        assert_eq!(settings.budget.max_time, Some(Duration::from_millis(10)));

        let resources = settings.resource_settings().unwrap();
        assert_eq!(resources.encoding.name(), "windows-1252");
    }

    #[test]
    fn test_bad_values_are_errors() {
        assert!(Settings::from_ini("[queue]\nmax_entries = many\n").is_err());

        let settings = Settings::from_ini("[assets]\nencoding = klingon\n").unwrap();
        assert!(settings.resource_settings().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        std::fs::write(&path, "[assets]\nroot = gfx\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.asset_root, PathBuf::from("gfx"));
        assert!(Settings::load(dir.path().join("missing.ini")).is_err());
    }
}
