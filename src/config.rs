use dirs_next::home_dir;
use log::debug;
use std::collections::BTreeMap;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Section holding global display options (`type`, `mode`)
pub const EPD_SECTION: &str = "EPD";
/// Section holding geometry and dithering options
pub const IMAGE_DISPLAY: &str = "ImageDisplay";
/// Section holding enhancement factors
pub const IMAGE_ENHANCEMENTS: &str = "ImageEnhancements";

/// Base name of the global configuration file
pub const CONFIG_FILE_STEM: &str = "epdkit";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value '{value}' for [{section}] {key}: expected {expected}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Layered key/value settings, keyed by section name.
///
/// Values are stored as strings and parsed on demand by the typed accessors,
/// so a malformed value only fails when somebody actually asks for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Settings::set`]
    pub fn with(mut self, section: &str, key: &str, value: impl ToString) -> Self {
        self.set(section, key, value);
        self
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl ToString) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Merge `other` into `self`, later values win per key.
    pub fn merge(&mut self, other: &Settings) {
        for (name, values) in &other.sections {
            let section = self.sections.entry(name.clone()).or_default();
            for (k, v) in values {
                section.insert(k.clone(), v.clone());
            }
        }
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// All keys of one section, empty if the section does not exist
    pub fn section(&self, section: &str) -> BTreeMap<String, String> {
        self.sections.get(section).cloned().unwrap_or_default()
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<String> {
        self.get(section, key).map(str::to_string)
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        self.parse_with(section, key, "an integer", |v| v.parse::<i64>().ok())
    }

    pub fn get_float(&self, section: &str, key: &str) -> Result<Option<f64>, ConfigError> {
        self.parse_with(section, key, "a number", |v| v.parse::<f64>().ok())
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        self.parse_with(section, key, "a boolean", parse_bool)
    }

    fn parse_with<T>(
        &self,
        section: &str,
        key: &str,
        expected: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        match self.get(section, key) {
            None => Ok(None),
            Some(raw) => parse(raw.trim()).map(Some).ok_or_else(|| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw.to_string(),
                expected,
            }),
        }
    }

    /// Parse a YAML document of `section: { key: scalar }` mappings
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let doc: Option<BTreeMap<String, Option<BTreeMap<String, serde_yaml::Value>>>> =
            serde_yaml::from_str(s)?;

        let mut settings = Settings::new();
        for (section, values) in doc.unwrap_or_default() {
            // keep empty sections visible
            settings.sections.entry(section.clone()).or_default();
            for (key, value) in values.unwrap_or_default() {
                let value = scalar_to_string(&value).ok_or_else(|| ConfigError::Validation(
                    format!("[{}] {} must be a scalar value", section, key)
                ))?;
                settings.set(&section, &key, value);
            }
        }
        Ok(settings)
    }

    pub fn read_yaml(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_yaml_str(&s)
    }
}

/// Accepts the usual INI-style spellings of a boolean.
pub fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Null => Some(String::new()),
        // palette lists and custom dither matrices may be written as YAML sequences
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => {
            serde_json::to_string(value).ok()
        }
        serde_yaml::Value::Tagged(t) => scalar_to_string(&t.value),
    }
}

/// Locates the global and per-device configuration layers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    search_dirs: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    /// Working directory first, then `~/.config/epdkit`
    fn default() -> Self {
        let mut search_dirs = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            search_dirs.push(cwd);
        }
        if let Some(home) = home_dir() {
            search_dirs.push(home.join(".config").join(CONFIG_FILE_STEM));
        }
        Self { search_dirs }
    }
}

impl ConfigLoader {
    /// Loader restricted to a single directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { search_dirs: vec![dir.into()] }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Global layer, empty when no file exists
    pub fn load_global(&self) -> Result<Settings, ConfigError> {
        self.load_layer(CONFIG_FILE_STEM)
    }

    /// Per-device layer (`<device id>.yaml`), empty when no file exists
    pub fn load_device(&self, device_name: &str) -> Result<Settings, ConfigError> {
        self.load_layer(device_name)
    }

    fn load_layer(&self, stem: &str) -> Result<Settings, ConfigError> {
        match self.find_file(stem) {
            Some(p) => {
                debug!("Loading {}", p.display());
                Settings::read_yaml(&p)
            }
            None => Ok(Settings::new()),
        }
    }

    /// Try every search directory in order (first hit wins).
    fn find_file(&self, stem: &str) -> Option<PathBuf> {
        for dir in &self.search_dirs {
            for ext in ["yaml", "yml"] {
                let p = dir.join(format!("{stem}.{ext}"));
                if p.exists() { return Some(p) }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_last_wins() {
        let mut base = Settings::new()
            .with(IMAGE_DISPLAY, "rotate", 90)
            .with(IMAGE_DISPLAY, "flip_horizontal", true);
        let top = Settings::new().with(IMAGE_DISPLAY, "flip_horizontal", false);

        base.merge(&top);

        assert_eq!(base.get(IMAGE_DISPLAY, "rotate"), Some("90"));
        assert_eq!(base.get_bool(IMAGE_DISPLAY, "flip_horizontal").unwrap(), Some(false));
    }

    #[test]
    fn test_typed_accessors() {
        let s = Settings::new()
            .with("dev", "spi_hz", "4000000")
            .with("dev", "vcom", "-1.48")
            .with("dev", "border", "Yes")
            .with("dev", "bad", "nope");

        assert_eq!(s.get_int("dev", "spi_hz").unwrap(), Some(4_000_000));
        assert_eq!(s.get_float("dev", "vcom").unwrap(), Some(-1.48));
        assert_eq!(s.get_bool("dev", "border").unwrap(), Some(true));
        assert_eq!(s.get_int("dev", "missing").unwrap(), None);
        assert!(matches!(
            s.get_bool("dev", "bad"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(s.get_float("dev", "bad").is_err());
    }

    #[test]
    fn test_yaml_scalars_normalised() {
        let s = Settings::from_yaml_str(
            "EPD:\n  type: epdkit.mock\nImageDisplay:\n  rotate: 90\n  flip_vertical: true\nEmpty:\n",
        ).unwrap();

        assert_eq!(s.get(EPD_SECTION, "type"), Some("epdkit.mock"));
        assert_eq!(s.get_float(IMAGE_DISPLAY, "rotate").unwrap(), Some(90.0));
        assert_eq!(s.get_bool(IMAGE_DISPLAY, "flip_vertical").unwrap(), Some(true));
        assert!(s.has_section("Empty"));
    }

    #[test]
    fn test_yaml_sequence_kept_as_json() {
        let s = Settings::from_yaml_str("dev:\n  palette_filter: [[255, 0, 0], [0, 0, 0]]\n").unwrap();
        assert_eq!(s.get("dev", "palette_filter"), Some("[[255,0,0],[0,0,0]]"));
    }

    #[test]
    fn test_loader_layers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("epdkit.yaml"), "EPD:\n  type: epdkit.mock\n").unwrap();
        fs::write(dir.path().join("epdkit.mock.yml"), "EPD:\n  mode: color\n").unwrap();

        let loader = ConfigLoader::in_dir(dir.path());
        let global = loader.load_global().unwrap();
        let device = loader.load_device("epdkit.mock").unwrap();

        assert_eq!(global.get(EPD_SECTION, "type"), Some("epdkit.mock"));
        assert_eq!(device.get(EPD_SECTION, "mode"), Some("color"));
        assert_eq!(loader.load_device("epdkit.other").unwrap(), Settings::new());
    }
}
