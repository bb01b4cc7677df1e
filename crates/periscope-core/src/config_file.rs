use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub storage: Option<StorageConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub tools: Option<ToolsConfig>,
    pub catalog: Option<CatalogConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub num_workers: Option<usize>,
    pub download_workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub qpdf_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub url: Option<String>,
}

/// Platform config directory path: `<config_dir>/periscope/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("periscope").join("config.toml"))
}

/// Load config by cascading CWD `.periscope.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".periscope.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        storage: Some(StorageConfig {
            data_dir: overlay
                .storage
                .as_ref()
                .and_then(|s| s.data_dir.clone())
                .or_else(|| base.storage.as_ref().and_then(|s| s.data_dir.clone())),
        }),
        concurrency: Some(ConcurrencyConfig {
            num_workers: overlay
                .concurrency
                .as_ref()
                .and_then(|c| c.num_workers)
                .or_else(|| base.concurrency.as_ref().and_then(|c| c.num_workers)),
            download_workers: overlay
                .concurrency
                .as_ref()
                .and_then(|c| c.download_workers)
                .or_else(|| base.concurrency.as_ref().and_then(|c| c.download_workers)),
        }),
        tools: Some(ToolsConfig {
            qpdf_path: overlay
                .tools
                .as_ref()
                .and_then(|t| t.qpdf_path.clone())
                .or_else(|| base.tools.as_ref().and_then(|t| t.qpdf_path.clone())),
        }),
        catalog: Some(CatalogConfig {
            url: overlay
                .catalog
                .as_ref()
                .and_then(|c| c.url.clone())
                .or_else(|| base.catalog.as_ref().and_then(|c| c.url.clone())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qpdf_path_round_trip_toml() {
        let config = ConfigFile {
            tools: Some(ToolsConfig {
                qpdf_path: Some("/opt/qpdf/bin/qpdf".to_string()),
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.tools.unwrap().qpdf_path.unwrap(),
            "/opt/qpdf/bin/qpdf"
        );
    }

    #[test]
    fn data_dir_absent_deserializes_as_none() {
        let toml_str = "[concurrency]\nnum_workers = 8\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert!(parsed.storage.is_none());
        assert_eq!(parsed.concurrency.unwrap().num_workers.unwrap(), 8);
    }

    #[test]
    fn merge_data_dir_overlay_wins() {
        let base = ConfigFile {
            storage: Some(StorageConfig {
                data_dir: Some("/base/data".to_string()),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            storage: Some(StorageConfig {
                data_dir: Some("/overlay/data".to_string()),
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.storage.unwrap().data_dir.unwrap(), "/overlay/data");
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            concurrency: Some(ConcurrencyConfig {
                num_workers: Some(2),
                download_workers: None,
            }),
            ..Default::default()
        };
        let overlay = ConfigFile::default();
        let merged = merge(base, overlay);
        assert_eq!(merged.concurrency.unwrap().num_workers.unwrap(), 2);
    }
}
