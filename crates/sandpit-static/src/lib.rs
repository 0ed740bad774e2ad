//! Static export of component sandboxes.
//!
//! Renders every component under a source directory to a standalone sandbox
//! document and writes a gallery page that embeds them all.

pub mod assets;
pub mod exporter;
pub mod templates;

pub use exporter::{ExportConfig, ExportEntry, ExportError, ExportResult, ExportStatus, StaticExporter};
