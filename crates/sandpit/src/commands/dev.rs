//! Development server command.

use std::path::PathBuf;

use anyhow::Result;
use sandpit_server::DevServer;

use crate::config::ConfigFile;

/// Run the dev server.
pub async fn run(
    config: &ConfigFile,
    port: Option<u16>,
    dir: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let mut server = config.server_config();
    if let Some(port) = port {
        server.port = port;
    }
    if let Some(dir) = dir {
        server.source_dir = dir;
    }
    server.open = server.open && open;

    tracing::info!("Starting development server on port {}", server.port);

    DevServer::new(server).start().await?;

    Ok(())
}
