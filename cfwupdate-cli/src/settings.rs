//! Merge command-line flags with `config.ini`.

use std::path::{Path, PathBuf};

use cfwupdate::archive::ArchiveSource;
use cfwupdate::config::{config_file_path, ConfigFile};
use cfwupdate::engine::{OverrideSpec, UpdateConfig};

use crate::error::CliError;
use crate::Cli;

/// Load the configuration file named by `--config`, or the default one.
///
/// An explicitly named file must exist.
pub fn load_config_file(cli: &Cli) -> Result<ConfigFile, CliError> {
    match &cli.config {
        Some(path) if !path.is_file() => Err(CliError::Config(format!(
            "configuration file {} does not exist",
            path.display()
        ))),
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(load_or_default(&config_file_path())),
    }
}

/// Load the default configuration file, falling back to defaults when it
/// cannot be parsed.
fn load_or_default(path: &Path) -> ConfigFile {
    match ConfigFile::load_from(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable config file"
            );
            ConfigFile::default()
        }
    }
}

/// Build the run configuration, flags first then file values.
pub fn build_update_config(cli: &Cli, file: &ConfigFile) -> UpdateConfig {
    let archive_name = cli
        .archive_name
        .clone()
        .unwrap_or_else(|| file.source.archive_name.clone());

    let source = match &cli.archive_dir {
        Some(dir) => ArchiveSource::Local {
            dir: dir.clone(),
            archive_name,
        },
        None => ArchiveSource::Remote {
            page_url: cli
                .page_url
                .clone()
                .unwrap_or_else(|| file.source.page_url.clone()),
            link_names: if cli.link.is_empty() {
                file.source.links.clone()
            } else {
                cli.link.clone()
            },
            archive_name,
        },
    };

    let paths = &file.paths;
    let pick = |flag: &Option<PathBuf>, fallback: &Option<PathBuf>| {
        flag.clone().or_else(|| fallback.clone())
    };

    let overrides = OverrideSpec {
        retroarch_overrides: pick(&cli.retroarch_overrides, &paths.retroarch_overrides),
        skin_overrides: pick(&cli.skin_overrides, &paths.skin_overrides),
        system_icons: pick(&cli.system_icons, &paths.system_icons),
        boot_logo: pick(&cli.boot_logo, &paths.boot_logo),
    };

    let mut config = match pick(&cli.work_dir, &paths.work_dir) {
        Some(dir) => UpdateConfig::new(dir),
        None => UpdateConfig::default(),
    }
    .with_source(source)
    .with_overrides(overrides);

    if let Some(boot) = pick(&cli.boot_volume, &paths.boot_volume) {
        config = config.with_boot_volume(boot);
    }
    if let Some(runtime) = pick(&cli.runtime_volume, &paths.runtime_volume) {
        config = config.with_runtime_volume(runtime);
    }
    for root in &cli.mount_root {
        config = config.with_mount_root(root);
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("cfwupdate").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_come_from_file() {
        let mut file = ConfigFile::default();
        file.paths.work_dir = Some(PathBuf::from("/var/tmp/cfw"));
        file.paths.boot_logo = Some(PathBuf::from("/home/me/logo.bmp"));

        let config = build_update_config(&parse(&[]), &file);

        assert_eq!(config.work_dir(), Path::new("/var/tmp/cfw"));
        assert_eq!(config.overrides.boot_logo, Some(PathBuf::from("/home/me/logo.bmp")));
        match &config.source {
            ArchiveSource::Remote { link_names, .. } => assert_eq!(link_names, &file.source.links),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_flags_take_precedence() {
        let mut file = ConfigFile::default();
        file.paths.boot_logo = Some(PathBuf::from("/home/me/logo.bmp"));
        file.paths.runtime_volume = Some(PathBuf::from("F:"));

        let cli = parse(&[
            "-l",
            "/other/logo.bmp.gz",
            "--link",
            "a.001",
            "--link",
            "a.002",
            "--archive-name",
            "a",
            "-r",
            "G:",
        ]);
        let config = build_update_config(&cli, &file);

        assert_eq!(config.overrides.boot_logo, Some(PathBuf::from("/other/logo.bmp.gz")));
        assert_eq!(config.runtime_volume, Some(PathBuf::from("G:")));
        assert_eq!(
            config.source,
            ArchiveSource::Remote {
                page_url: file.source.page_url.clone(),
                link_names: vec!["a.001".to_string(), "a.002".to_string()],
                archive_name: "a".to_string(),
            }
        );
    }

    #[test]
    fn test_archive_dir_selects_local_source() {
        let cli = parse(&["--archive-dir", "/downloads", "--mount-root", "/media/sd1"]);
        let config = build_update_config(&cli, &ConfigFile::default());

        assert!(matches!(
            config.source,
            ArchiveSource::Local { ref dir, .. } if dir == Path::new("/downloads")
        ));
        assert_eq!(config.mount_roots, vec![PathBuf::from("/media/sd1")]);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let cli = parse(&["--config", "/nonexistent/cfwupdate.ini"]);
        assert!(matches!(load_config_file(&cli), Err(CliError::Config(_))));
    }

    #[test]
    fn test_explicit_config_file_is_read() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.ini");
        std::fs::write(&path, "[paths]\nskin_overrides = /skin.json\n").unwrap();

        let cli = parse(&["--config", path.to_str().unwrap()]);
        let file = load_config_file(&cli).unwrap();

        assert_eq!(file.paths.skin_overrides, Some(PathBuf::from("/skin.json")));
    }

    #[test]
    fn test_malformed_default_config_falls_back() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[source\nlinks = a.001\n").unwrap();

        assert!(ConfigFile::load_from(&path).is_err());
        assert_eq!(load_or_default(&path), ConfigFile::default());
    }

    #[test]
    fn test_cleanup_flags_conflict() {
        let result = Cli::try_parse_from(["cfwupdate", "--cleanup", "--keep-files"]);
        assert!(result.is_err());
    }
}
