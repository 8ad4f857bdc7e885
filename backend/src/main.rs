// sqlsandbox entrypoint
//!
//! Reads JSON-lines requests from stdin and writes one JSON line per request
//! to stdout as each finishes. Usage: `sqlsandbox [CONFIG_PATH]`.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::info;
use sqlsandbox::{lifecycle, logging, runner};
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = env::args().nth(1).map(PathBuf::from);

    let config = match lifecycle::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: Failed to load configuration: {:#}", e);
            std::process::exit(1);
        },
    };

    // Logging before any other side effects
    logging::init_logging(&config.logging)?;
    info!("sqlsandbox v{} starting", env!("CARGO_PKG_VERSION"));

    let app = lifecycle::bootstrap(config).await?;

    let (tx, rx) = mpsc::channel(app.config.pool.max_connections.max(1) * 2);
    let writer = tokio::spawn(runner::write_responses(rx, tokio::io::stdout()));

    let served = runner::serve_lines(Arc::clone(app.engine()), BufReader::new(tokio::io::stdin()), tx).await;
    let written = writer.await?;

    app.shutdown().await;
    served?;
    written?;
    Ok(())
}
