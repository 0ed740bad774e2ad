//! Configuration file (sandpit.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use sandpit_sandbox::{RuntimeAssets, TransformStrategy};
use sandpit_server::{DevServerConfig, ReleasePolicy};
use sandpit_static::ExportConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub runtime: RuntimeAssets,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_dir")]
    pub dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_open")]
    pub open: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct SandboxConfig {
    #[serde(default)]
    pub transform: TransformStrategy,
    /// Release documents this long after loading instead of on outcome
    pub release_delay_ms: Option<u64>,
    #[serde(default)]
    pub minify: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_minify")]
    pub minify: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_source_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: default_open(),
        }
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output: default_output(),
            title: default_title(),
            minify: default_minify(),
        }
    }
}

fn default_source_dir() -> String {
    "generated".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7777
}
fn default_open() -> bool {
    true
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_title() -> String {
    "Component Sandboxes".to_string()
}
fn default_minify() -> bool {
    true
}

impl ConfigFile {
    pub fn source_dir(&self) -> PathBuf {
        PathBuf::from(&self.source.dir)
    }

    pub fn release_policy(&self) -> ReleasePolicy {
        match self.sandbox.release_delay_ms {
            Some(ms) => ReleasePolicy::FixedDelay(Duration::from_millis(ms)),
            None => ReleasePolicy::OnOutcome,
        }
    }

    pub fn server_config(&self) -> DevServerConfig {
        DevServerConfig {
            source_dir: self.source_dir(),
            port: self.server.port,
            host: self.server.host.clone(),
            open: self.server.open,
            transform: self.sandbox.transform,
            release_policy: self.release_policy(),
            assets: self.runtime.clone(),
            minify: self.sandbox.minify,
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            source_dir: self.source_dir(),
            output_dir: PathBuf::from(&self.export.output),
            transform: self.sandbox.transform,
            assets: self.runtime.clone(),
            minify: self.export.minify,
            title: self.export.title.clone(),
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = tempdir().unwrap();
        let config = load(&temp.path().join("sandpit.toml")).unwrap();

        assert_eq!(config.source.dir, "generated");
        assert_eq!(config.server.port, 7777);
        assert_eq!(config.export.output, "dist");
        assert_eq!(config.sandbox.transform, TransformStrategy::Syntax);
        assert_eq!(config.release_policy(), ReleasePolicy::OnOutcome);
        assert_eq!(config.runtime, RuntimeAssets::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sandpit.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9000

[sandbox]
transform = "lexical"
release_delay_ms = 1000

[runtime]
react = "/vendor/react.js"
"#,
        )
        .unwrap();

        let config = load(&path).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.sandbox.transform, TransformStrategy::Lexical);
        assert_eq!(
            config.release_policy(),
            ReleasePolicy::FixedDelay(Duration::from_millis(1000))
        );
        assert_eq!(config.runtime.react, "/vendor/react.js");
        assert_eq!(config.runtime.babel, RuntimeAssets::default().babel);
        assert_eq!(config.source.dir, "generated");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("sandpit.toml");
        fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn builds_server_and_export_configs() {
        let config = ConfigFile::default();

        let server = config.server_config();
        assert_eq!(server.source_dir, PathBuf::from("generated"));
        assert_eq!(server.port, 7777);

        let export = config.export_config();
        assert_eq!(export.output_dir, PathBuf::from("dist"));
        assert!(export.minify);
    }
}
