use std::path::Path;

use serde::Deserialize;

use crate::archive::ArchiveSource;
use crate::error::VfsError;
#[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
use crate::filesystem::FilesystemSource;
use crate::url::Url;
use crate::vfs::Vfs;

/// VFS layout loaded from a TOML file.
///
/// ```toml
/// [[scheme]]
/// name = "assets"
/// path = "./assets"
///
/// [[scheme]]
/// name = "pack"
/// type = "archive"
/// path = "./data/pack.zip"
///
/// [[alias]]
/// name = "tex"
/// target = "pack://textures"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VfsConfig {
    #[serde(default)]
    pub scheme: Vec<SchemeConfig>,
    #[serde(default)]
    pub alias: Vec<AliasConfig>,
}

/// A single scheme definition.
///
/// The `type` field selects the source: `"filesystem"` (default), whose
/// `path` is the root directory, or `"archive"`, whose `path` is a ZIP file.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemeConfig {
    pub name: String,
    pub path: String,
    /// `"filesystem"` (default) or `"archive"`.
    #[serde(default = "default_scheme_type")]
    pub r#type: String,
}

/// A scheme alias definition. `target` is URL text such as `"assets://textures"`.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasConfig {
    pub name: String,
    pub target: String,
}

fn default_scheme_type() -> String {
    "filesystem".into()
}

impl VfsConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, VfsError> {
        toml::from_str(text).map_err(|e| VfsError::Config(e.to_string()))
    }
}

/// Load a VFS config from a TOML file.
///
/// Returns [`VfsError::Config`] with a human-readable message if the file
/// cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<VfsConfig, VfsError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| VfsError::Config(format!("failed to read {}: {e}", path.display())))?;
    toml::from_str(&content)
        .map_err(|e| VfsError::Config(format!("failed to parse {}: {e}", path.display())))
}

/// Build a [`Vfs`] from a config.
///
/// Schemes are registered before aliases. Entries that fail (unknown type,
/// unreadable archive, duplicate name) are logged and skipped; the rest of
/// the config still applies.
pub fn build_vfs(config: &VfsConfig) -> Vfs {
    let vfs = Vfs::new();

    for scheme in &config.scheme {
        let result = match scheme.r#type.as_str() {
            #[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
            "filesystem" => {
                log::info!(
                    "VFS scheme: \"{}\" -> filesystem {:?}",
                    scheme.name,
                    scheme.path
                );
                vfs.register_scheme(&scheme.name, FilesystemSource::rooted(&scheme.path))
            }
            "archive" => {
                log::info!(
                    "VFS scheme: \"{}\" -> archive {:?}",
                    scheme.name,
                    scheme.path
                );
                vfs.register_scheme(&scheme.name, ArchiveSource::from_path(&scheme.path))
            }
            other => {
                log::warn!("Unknown scheme type \"{}\" for \"{}\"", other, scheme.name);
                continue;
            }
        };
        if let Err(e) = result {
            log::error!("Failed to register scheme \"{}\": {e}", scheme.name);
        }
    }

    for alias in &config.alias {
        if let Err(e) = vfs.register_scheme_alias(&alias.name, Url::parse(&alias.target)) {
            log::error!("Failed to register alias \"{}\": {e}", alias.name);
        }
    }

    vfs
}

/// Load a config file and build its [`Vfs`], falling back to an empty
/// config if the file is missing or invalid.
pub fn load_or_default(path: &Path) -> (VfsConfig, Vfs) {
    let config = match load_config(path) {
        Ok(config) => {
            log::info!(
                "Loaded VFS config: {} schemes, {} aliases",
                config.scheme.len(),
                config.alias.len()
            );
            config
        }
        Err(e) => {
            log::warn!("No VFS config ({e}), using defaults");
            VfsConfig::default()
        }
    };

    let vfs = build_vfs(&config);
    (config, vfs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::ZipBuilder;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("scheme_vfs_config_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parse_full_config() {
        let config = VfsConfig::from_toml_str(
            r#"
            [[scheme]]
            name = "assets"
            path = "./assets"

            [[scheme]]
            name = "pack"
            type = "archive"
            path = "pack.zip"

            [[alias]]
            name = "tex"
            target = "pack://textures"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheme.len(), 2);
        assert_eq!(config.scheme[0].r#type, "filesystem");
        assert_eq!(config.scheme[1].r#type, "archive");
        assert_eq!(config.alias[0].target, "pack://textures");
    }

    #[test]
    fn empty_config_is_valid() {
        let config = VfsConfig::from_toml_str("").unwrap();
        assert!(config.scheme.is_empty());
        assert!(config.alias.is_empty());
    }

    #[test]
    fn malformed_config_is_error() {
        assert!(matches!(
            VfsConfig::from_toml_str("[[scheme]]\nname = 3"),
            Err(VfsError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = temp_dir("missing");
        assert!(matches!(
            load_config(&dir.join("vfs.toml")),
            Err(VfsError::Config(_))
        ));
        let (config, vfs) = load_or_default(&dir.join("vfs.toml"));
        assert!(config.scheme.is_empty());
        assert!(vfs.registry().scheme_names().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(all(feature = "filesystem", not(target_arch = "wasm32")))]
    #[test]
    fn build_skips_bad_entries() {
        let dir = temp_dir("skip");
        std::fs::write(dir.join("ok.txt"), b"ok").unwrap();
        std::fs::write(dir.join("broken.zip"), b"not a zip").unwrap();

        let config = VfsConfig {
            scheme: vec![
                SchemeConfig {
                    name: "root".into(),
                    path: dir.display().to_string(),
                    r#type: "filesystem".into(),
                },
                SchemeConfig {
                    name: "broken".into(),
                    path: dir.join("broken.zip").display().to_string(),
                    r#type: "archive".into(),
                },
                SchemeConfig {
                    name: "remote".into(),
                    path: "host:/data".into(),
                    r#type: "http".into(),
                },
                SchemeConfig {
                    name: "root".into(),
                    path: "/elsewhere".into(),
                    r#type: "filesystem".into(),
                },
            ],
            alias: vec![AliasConfig {
                name: "r".into(),
                target: "root://".into(),
            }],
        };

        let vfs = build_vfs(&config);
        assert_eq!(vfs.registry().scheme_names(), vec!["root"]);
        assert_eq!(vfs.load(&Url::parse("r://ok.txt")).unwrap(), b"ok");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_file_and_build() {
        let dir = temp_dir("file");
        std::fs::write(
            dir.join("pack.zip"),
            ZipBuilder::new().stored("textures/brick.png", b"png").finish(),
        )
        .unwrap();
        let config_path = dir.join("vfs.toml");
        std::fs::write(
            &config_path,
            format!(
                "[[scheme]]\nname = \"pack\"\ntype = \"archive\"\npath = {:?}\n\n\
                 [[alias]]\nname = \"tex\"\ntarget = \"pack://textures\"\n",
                dir.join("pack.zip").display().to_string()
            ),
        )
        .unwrap();

        let (config, vfs) = load_or_default(&config_path);
        assert_eq!(config.scheme.len(), 1);
        assert_eq!(vfs.load(&Url::parse("tex://brick.png")).unwrap(), b"png");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
