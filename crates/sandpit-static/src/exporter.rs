//! Static sandbox exporter.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use sandpit_sandbox::{
    DocumentBuilder, PipelineError, RuntimeAssets, SandboxPipeline, SourceDirectory, SourceError,
    TransformStrategy,
};

use crate::assets::AssetPipeline;
use crate::templates::{Context, TemplateEngine};

/// Configuration for an export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory holding the component sources
    pub source_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// How sources are transformed
    pub transform: TransformStrategy,

    /// Runtime scripts loaded by each sandbox document
    pub assets: RuntimeAssets,

    /// Minify CSS output
    pub minify: bool,

    /// Gallery title
    pub title: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("generated"),
            output_dir: PathBuf::from("dist"),
            transform: TransformStrategy::default(),
            assets: RuntimeAssets::default(),
            minify: true,
            title: "Component Sandboxes".to_string(),
        }
    }
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExportStatus {
    Exported,
    Unsupported,
    Failed { message: String },
}

/// One source file and its export outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    /// Source path relative to the source directory
    pub path: String,

    /// Component identity, when the file is a component
    pub identity: Option<String>,

    /// Document path relative to the output directory
    pub output: Option<String>,

    #[serde(flatten)]
    pub status: ExportStatus,
}

/// Result of an export.
#[derive(Debug)]
pub struct ExportResult {
    /// Number of sandbox documents written
    pub exported: usize,

    /// Files that are not components
    pub unsupported: usize,

    /// Components whose document could not be built
    pub failed: usize,

    /// Total export time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,

    pub entries: Vec<ExportEntry>,
}

/// Errors that can occur during export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// A prepared file waiting to be written.
struct Prepared {
    entry: ExportEntry,
    html: Option<String>,
}

/// Writes one sandbox document per component plus a gallery page.
pub struct StaticExporter {
    config: ExportConfig,
    sources: SourceDirectory,
    pipeline: SandboxPipeline,
    templates: TemplateEngine,
}

impl StaticExporter {
    /// Create a new exporter.
    pub fn new(config: ExportConfig) -> Self {
        let pipeline = SandboxPipeline::new(
            config.transform,
            DocumentBuilder::new(config.assets.clone()).with_minify(config.minify),
        );

        Self {
            sources: SourceDirectory::new(&config.source_dir),
            config,
            pipeline,
            templates: TemplateEngine::new(),
        }
    }

    /// Run every source file through the pipeline without writing anything.
    pub fn check(&self) -> Result<Vec<ExportEntry>, ExportError> {
        Ok(self.prepare_all()?.into_iter().map(|p| p.entry).collect())
    }

    /// Export all components.
    pub fn export(&self) -> Result<ExportResult, ExportError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| ExportError::WriteError(e.to_string()))?;

        let prepared = self.prepare_all()?;

        prepared
            .par_iter()
            .filter_map(|p| Some((p.entry.output.as_deref()?, p.html.as_deref()?)))
            .try_for_each(|(output, html)| self.write(output, html))?;

        let entries: Vec<ExportEntry> = prepared.into_iter().map(|p| p.entry).collect();

        self.generate_assets()?;
        self.generate_index(&entries)?;
        self.generate_manifest(&entries)?;

        let count = |f: fn(&ExportStatus) -> bool| entries.iter().filter(|e| f(&e.status)).count();
        let exported = count(|s| matches!(s, ExportStatus::Exported));
        let unsupported = count(|s| matches!(s, ExportStatus::Unsupported));
        let failed = count(|s| matches!(s, ExportStatus::Failed { .. }));

        tracing::debug!(
            "Exported {} components ({} unsupported, {} failed)",
            exported,
            unsupported,
            failed
        );

        Ok(ExportResult {
            exported,
            unsupported,
            failed,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
            entries,
        })
    }

    /// Prepare every listed file in parallel, in path order.
    fn prepare_all(&self) -> Result<Vec<Prepared>, ExportError> {
        let listed = self.sources.list()?;

        listed
            .par_iter()
            .map(|listed| -> Result<Prepared, ExportError> {
                let artifact = self.sources.read(&listed.path)?;

                let prepared = match self.pipeline.prepare(&artifact) {
                    Ok(prepared) => Prepared {
                        entry: ExportEntry {
                            path: listed.path.clone(),
                            identity: Some(prepared.identity),
                            output: Some(format!("{}.html", listed.path)),
                            status: ExportStatus::Exported,
                        },
                        html: Some(prepared.document.html),
                    },
                    Err(PipelineError::Unsupported) => Prepared {
                        entry: ExportEntry {
                            path: listed.path.clone(),
                            identity: None,
                            output: None,
                            status: ExportStatus::Unsupported,
                        },
                        html: None,
                    },
                    Err(e) => {
                        tracing::warn!("Failed to build sandbox for {}: {}", listed.path, e);
                        Prepared {
                            entry: ExportEntry {
                                path: listed.path.clone(),
                                identity: None,
                                output: None,
                                status: ExportStatus::Failed {
                                    message: e.to_string(),
                                },
                            },
                            html: None,
                        }
                    }
                };

                Ok(prepared)
            })
            .collect()
    }

    fn write(&self, relative: &str, content: &str) -> Result<(), ExportError> {
        let path = self.config.output_dir.join(relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ExportError::WriteError(e.to_string()))?;
        }

        fs::write(&path, content).map_err(|e| write_error(&path, e))
    }

    /// Generate static assets.
    fn generate_assets(&self) -> Result<(), ExportError> {
        self.write("assets/main.css", &AssetPipeline::generate_css(self.config.minify))?;
        self.write("assets/main.js", &AssetPipeline::generate_js())
    }

    fn generate_index(&self, entries: &[ExportEntry]) -> Result<(), ExportError> {
        let context = Context {
            title: self.config.title.clone(),
            entries: entries.to_vec(),
            exported: entries
                .iter()
                .filter(|e| e.status == ExportStatus::Exported)
                .count(),
        };

        let html = self
            .templates
            .render_page("index.html", &context)
            .map_err(|e| ExportError::TemplateError(e.to_string()))?;

        self.write("index.html", &html)
    }

    fn generate_manifest(&self, entries: &[ExportEntry]) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ExportError::WriteError(e.to_string()))?;

        self.write("manifest.json", &json)
    }
}

fn write_error(path: &Path, e: std::io::Error) -> ExportError {
    ExportError::WriteError(format!("{}: {}", path.display(), e))
}
