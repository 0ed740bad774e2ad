//! Source check command.

use std::path::PathBuf;

use anyhow::Result;
use sandpit_static::{ExportStatus, StaticExporter};

use crate::config::ConfigFile;

/// Run the check command. Fails if any component could not be prepared.
pub async fn run(config: &ConfigFile, dir: Option<PathBuf>) -> Result<()> {
    let mut export = config.export_config();
    if let Some(dir) = dir {
        export.source_dir = dir;
    }

    tracing::info!("Checking {}", export.source_dir.display());

    let entries = StaticExporter::new(export).check()?;
    let mut failed = 0;

    for entry in &entries {
        match &entry.status {
            ExportStatus::Exported => tracing::info!(
                "  ok           {} ({})",
                entry.path,
                entry.identity.as_deref().unwrap_or("Component")
            ),
            ExportStatus::Unsupported => tracing::info!("  unsupported  {}", entry.path),
            ExportStatus::Failed { message } => {
                failed += 1;
                tracing::error!("  failed       {}: {}", entry.path, message);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, entries.len());
    }

    tracing::info!("Checked {} files", entries.len());

    Ok(())
}
