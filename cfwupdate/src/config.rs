//! Persistent defaults in `config.ini`.
//!
//! The file lives at `<config-dir>/cfwupdate/config.ini`. Every value is
//! optional; command-line flags take precedence over the file.
//!
//! ```ini
//! [source]
//! page_url = https://www.patreon.com/posts/76561333
//! links = RG35XX-CopyPasteOnTopOfStock.7z.001, RG35XX-CopyPasteOnTopOfStock.7z.002
//! archive_name = RG35XX-CopyPasteOnTopOfStock.7z
//!
//! [paths]
//! work_dir = /tmp/cfwupdate
//! retroarch_overrides = ~/handheld/retroarch.cfg
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;

use crate::engine::{DEFAULT_ARCHIVE_NAME, DEFAULT_LINK_NAMES, DEFAULT_PAGE_URL};
use crate::error::{UpdateError, UpdateResult};

const SOURCE_SECTION: &str = "source";
const PATHS_SECTION: &str = "paths";

/// Path of the default configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cfwupdate")
        .join("config.ini")
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Release page listing the part links.
    pub page_url: String,
    /// Display names of the part links.
    pub links: Vec<String>,
    /// Base name of the part files.
    pub archive_name: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            links: DEFAULT_LINK_NAMES.iter().map(|s| s.to_string()).collect(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSettings {
    pub work_dir: Option<PathBuf>,
    pub boot_volume: Option<PathBuf>,
    pub runtime_volume: Option<PathBuf>,
    pub retroarch_overrides: Option<PathBuf>,
    pub skin_overrides: Option<PathBuf>,
    pub system_icons: Option<PathBuf>,
    pub boot_logo: Option<PathBuf>,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub paths: PathSettings,
}

impl ConfigFile {
    /// Load the default configuration file, or defaults if it does not exist.
    pub fn load() -> UpdateResult<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> UpdateResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| UpdateError::ParseFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self::from_ini(&ini))
    }

    /// Write to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> UpdateResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|e| UpdateError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SOURCE_SECTION)) {
            if let Some(v) = non_empty(section.get("page_url")) {
                config.source.page_url = v.to_string();
            }
            if let Some(v) = non_empty(section.get("links")) {
                config.source.links = v
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            if let Some(v) = non_empty(section.get("archive_name")) {
                config.source.archive_name = v.to_string();
            }
        }

        if let Some(section) = ini.section(Some(PATHS_SECTION)) {
            let path = |key: &str| non_empty(section.get(key)).map(expand_home);
            config.paths = PathSettings {
                work_dir: path("work_dir"),
                boot_volume: path("boot_volume"),
                runtime_volume: path("runtime_volume"),
                retroarch_overrides: path("retroarch_overrides"),
                skin_overrides: path("skin_overrides"),
                system_icons: path("system_icons"),
                boot_logo: path("boot_logo"),
            };
        }

        config
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SOURCE_SECTION))
            .set("page_url", self.source.page_url.as_str())
            .set("links", self.source.links.join(", "))
            .set("archive_name", self.source.archive_name.as_str());

        let paths = [
            ("work_dir", &self.paths.work_dir),
            ("boot_volume", &self.paths.boot_volume),
            ("runtime_volume", &self.paths.runtime_volume),
            ("retroarch_overrides", &self.paths.retroarch_overrides),
            ("skin_overrides", &self.paths.skin_overrides),
            ("system_icons", &self.paths.system_icons),
            ("boot_logo", &self.paths.boot_logo),
        ];
        for (key, value) in paths {
            if let Some(path) = value {
                ini.with_section(Some(PATHS_SECTION))
                    .set(key, path.to_string_lossy().to_string());
            }
        }

        ini
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = ConfigFile::load_from(Path::new("/nonexistent/config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.source.links.len(), 2);
    }

    #[test]
    fn test_load_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[source]\nlinks = a.7z.001 , a.7z.002,\narchive_name = a.7z\n\n\
             [paths]\nwork_dir = /var/tmp/cfw\nboot_logo =\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.source.page_url, DEFAULT_PAGE_URL);
        assert_eq!(config.source.links, vec!["a.7z.001", "a.7z.002"]);
        assert_eq!(config.source.archive_name, "a.7z");
        assert_eq!(config.paths.work_dir, Some(PathBuf::from("/var/tmp/cfw")));
        assert_eq!(config.paths.boot_logo, None);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");
        let mut config = ConfigFile::default();
        config.paths.skin_overrides = Some(PathBuf::from("/home/me/skin.json"));
        config.source.links = vec!["x.001".to_string()];

        config.save_to(&path).unwrap();
        let reloaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.cfg"), home.join("x.cfg"));
        }
    }
}
