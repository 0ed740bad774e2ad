//! Static export command.

use std::path::PathBuf;

use anyhow::Result;
use sandpit_static::StaticExporter;

use crate::config::ConfigFile;

/// Run the build command.
pub async fn run(config: &ConfigFile, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Exporting component sandboxes...");

    let mut export = config.export_config();
    if let Some(output) = output {
        export.output_dir = output;
    }
    if let Some(minify) = minify {
        export.minify = minify;
    }

    let result = StaticExporter::new(export).export()?;

    tracing::info!(
        "Exported {} components in {}ms",
        result.exported,
        result.duration_ms
    );
    if result.unsupported > 0 {
        tracing::info!("Skipped {} files that are not components", result.unsupported);
    }
    if result.failed > 0 {
        tracing::warn!("{} components could not be exported", result.failed);
    }

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
