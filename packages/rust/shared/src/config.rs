//! Application configuration for servicedata.
//!
//! Project config lives at `./servicedata.toml` next to the site sources.
//! An explicit `--config` path overrides the lookup; a missing file means
//! built-in defaults. Relative paths in the file resolve against the
//! directory containing it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceDataError};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "servicedata.toml";

// ---------------------------------------------------------------------------
// Config structs (matching servicedata.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the services CSV is read from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where provider output is written.
    #[serde(default)]
    pub export: ExportSection,

    /// Verbatim copy of the CSV into the published site.
    #[serde(default)]
    pub passthrough: PassthroughConfig,

    /// Scraper run reports turned into logbooks.
    #[serde(default)]
    pub runs: RunsConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Data directory holding the CSV.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// CSV file name inside `data_dir`.
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
        }
    }
}

fn default_data_dir() -> String {
    "_data".into()
}
fn default_file_name() -> String {
    "services.csv".into()
}

/// `[export]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSection {
    /// Directory the JSON data files are written to.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// File name of the build manifest inside `data_dir`.
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            manifest_file: default_manifest_file(),
        }
    }
}

fn default_manifest_file() -> String {
    "servicesManifest.json".into()
}

/// `[passthrough]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughConfig {
    /// Whether the raw CSV is copied into the site output.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Destination path of the downloadable copy.
    #[serde(default = "default_passthrough_target")]
    pub target: String,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target: default_passthrough_target(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_passthrough_target() -> String {
    "_site/downloads/services.csv".into()
}

/// `[runs]` section.
///
/// Mirrors the artifacts bucket layout on local disk: run reports live under
/// `<artifacts_dir>/<reports_prefix>/`, and the RunLog keys inside a report
/// resolve against `artifacts_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunsConfig {
    /// Whether logbooks are exported at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local copy of the run artifacts.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    /// Directory of run report JSON files inside `artifacts_dir`.
    #[serde(default = "default_reports_prefix")]
    pub reports_prefix: String,

    /// How many of the newest reports are read.
    #[serde(default = "default_report_limit")]
    pub report_limit: usize,

    /// Logbooks file name inside the export directory.
    #[serde(default = "default_logbooks_file")]
    pub logbooks_file: String,

    /// Failing scrapers file name inside the export directory.
    #[serde(default = "default_failing_file")]
    pub failing_file: String,
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artifacts_dir: default_artifacts_dir(),
            reports_prefix: default_reports_prefix(),
            report_limit: default_report_limit(),
            logbooks_file: default_logbooks_file(),
            failing_file: default_failing_file(),
        }
    }
}

fn default_artifacts_dir() -> String {
    "run-artifacts".into()
}
fn default_reports_prefix() -> String {
    "run-reports".into()
}
fn default_report_limit() -> usize {
    10
}
fn default_logbooks_file() -> String {
    "logbooks.json".into()
}
fn default_failing_file() -> String {
    "failing.json".into()
}

// ---------------------------------------------------------------------------
// Export config (runtime, resolved against a base directory)
// ---------------------------------------------------------------------------

/// Runtime export configuration with every path made concrete.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Full path of the source CSV.
    pub csv_path: PathBuf,
    /// Directory receiving `services.json` and friends.
    pub export_dir: PathBuf,
    /// Manifest file name inside `export_dir`.
    pub manifest_file: String,
    /// Passthrough destination, `None` when disabled.
    pub passthrough_target: Option<PathBuf>,
    /// Run report export, `None` when disabled.
    pub runs: Option<RunsExportConfig>,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
}

/// Runtime run-report configuration with concrete paths.
#[derive(Debug, Clone, PartialEq)]
pub struct RunsExportConfig {
    /// Root that RunLog keys resolve against.
    pub artifacts_dir: PathBuf,
    /// Directory holding the run report files.
    pub reports_dir: PathBuf,
    /// How many of the newest reports are read.
    pub report_limit: usize,
    /// Logbooks file name inside the export directory.
    pub logbooks_file: String,
    /// Failing scrapers file name inside the export directory.
    pub failing_file: String,
}

impl RunsExportConfig {
    /// Resolve a [`RunsConfig`] against `base_dir`.
    pub fn resolve(runs: &RunsConfig, base_dir: &Path) -> Self {
        let artifacts_dir = base_dir.join(&runs.artifacts_dir);
        Self {
            reports_dir: artifacts_dir.join(&runs.reports_prefix),
            artifacts_dir,
            report_limit: runs.report_limit,
            logbooks_file: runs.logbooks_file.clone(),
            failing_file: runs.failing_file.clone(),
        }
    }
}

impl ExportConfig {
    /// Resolve an [`AppConfig`] against `base_dir`.
    pub fn resolve(config: &AppConfig, base_dir: &Path) -> Self {
        Self {
            csv_path: config.source.csv_path(base_dir),
            export_dir: base_dir.join(&config.export.data_dir),
            manifest_file: config.export.manifest_file.clone(),
            passthrough_target: config
                .passthrough
                .enabled
                .then(|| base_dir.join(&config.passthrough.target)),
            runs: config
                .runs
                .enabled
                .then(|| RunsExportConfig::resolve(&config.runs, base_dir)),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Full path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.export_dir.join(&self.manifest_file)
    }
}

impl SourceConfig {
    /// Full path of the CSV relative to `base_dir`.
    pub fn csv_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.data_dir).join(&self.file_name)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// A config together with the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed (or default) config.
    pub config: AppConfig,
    /// Base directory for relative paths.
    pub base_dir: PathBuf,
    /// The file the config came from, `None` when defaults were used.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Resolve into a runtime [`ExportConfig`].
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig::resolve(&self.config, &self.base_dir)
    }
}

/// Load config from `explicit` if given, else `<cwd>/servicedata.toml`.
///
/// An explicit path must exist. The implicit path falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ServiceDataError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return load_config_from(path);
    }

    let cwd = std::env::current_dir().map_err(|e| ServiceDataError::io(".", e))?;
    load_config_in(&cwd)
}

/// Load `servicedata.toml` from `dir`, or defaults rooted at `dir`.
pub fn load_config_in(dir: &Path) -> Result<LoadedConfig> {
    let path = dir.join(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(LoadedConfig {
            config: AppConfig::default(),
            base_dir: dir.to_path_buf(),
            path: None,
        });
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<LoadedConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ServiceDataError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ServiceDataError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok(LoadedConfig {
        config,
        base_dir,
        path: Some(path.to_path_buf()),
    })
}

/// Write a default config file into `dir`. Refuses to overwrite.
/// Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(ServiceDataError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| ServiceDataError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ServiceDataError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sd-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("services.csv"));
        assert!(toml_str.contains("servicesManifest.json"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[source]
file_name = "councils.csv"

[passthrough]
enabled = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.data_dir, "_data");
        assert_eq!(config.source.file_name, "councils.csv");
        assert!(!config.passthrough.enabled);
        assert_eq!(config.export.manifest_file, "servicesManifest.json");
    }

    #[test]
    fn export_config_resolves_against_base() {
        let app = AppConfig::default();
        let export = ExportConfig::resolve(&app, Path::new("/srv/site"));
        assert_eq!(export.csv_path, PathBuf::from("/srv/site/_data/services.csv"));
        assert_eq!(export.export_dir, PathBuf::from("/srv/site/_data"));
        assert_eq!(
            export.passthrough_target,
            Some(PathBuf::from("/srv/site/_site/downloads/services.csv"))
        );
        assert_eq!(
            export.manifest_path(),
            PathBuf::from("/srv/site/_data/servicesManifest.json")
        );
    }

    #[test]
    fn runs_paths_resolve_under_artifacts_dir() {
        let app = AppConfig::default();
        let export = ExportConfig::resolve(&app, Path::new("/srv/site"));
        let runs = export.runs.expect("runs enabled by default");
        assert_eq!(runs.artifacts_dir, PathBuf::from("/srv/site/run-artifacts"));
        assert_eq!(
            runs.reports_dir,
            PathBuf::from("/srv/site/run-artifacts/run-reports")
        );
        assert_eq!(runs.report_limit, 10);
        assert_eq!(runs.logbooks_file, "logbooks.json");
        assert_eq!(runs.failing_file, "failing.json");
    }

    #[test]
    fn partial_runs_section_fills_defaults() {
        let toml_str = r#"
[runs]
artifacts_dir = "/var/lgsf"
report_limit = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.runs.enabled);
        assert_eq!(config.runs.report_limit, 3);
        assert_eq!(config.runs.reports_prefix, "run-reports");

        let export = ExportConfig::resolve(&config, Path::new("/srv/site"));
        let runs = export.runs.unwrap();
        // Absolute paths win over the base directory.
        assert_eq!(runs.reports_dir, PathBuf::from("/var/lgsf/run-reports"));
    }

    #[test]
    fn disabled_runs_have_no_config() {
        let mut app = AppConfig::default();
        app.runs.enabled = false;
        assert!(ExportConfig::resolve(&app, Path::new("/srv/site")).runs.is_none());
    }

    #[test]
    fn disabled_passthrough_has_no_target() {
        let mut app = AppConfig::default();
        app.passthrough.enabled = false;
        let export = ExportConfig::resolve(&app, Path::new("/srv/site"));
        assert!(export.passthrough_target.is_none());
    }

    #[test]
    fn missing_file_in_dir_uses_defaults() {
        let tmp = temp_dir();
        let loaded = load_config_in(&tmp).expect("load");
        assert!(loaded.path.is_none());
        assert_eq!(loaded.base_dir, tmp);
        assert_eq!(loaded.config, AppConfig::default());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let tmp = temp_dir();
        let result = load_config(Some(tmp.join("nope.toml").as_path()));
        assert!(result.unwrap_err().to_string().contains("config file not found"));
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn init_then_load() {
        let tmp = temp_dir();
        let path = init_config(&tmp).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.base_dir, tmp);
        assert!(init_config(&tmp).is_err());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let tmp = temp_dir();
        let path = tmp.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[source\nfile_name = 1").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ServiceDataError::Config { .. }));
        std::fs::remove_dir_all(&tmp).ok();
    }
}
