//! `serve` command implementation.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use store::SqliteStore;
use tracing::info;

use super::run::shutdown_signal;
use crate::api;
use crate::cli::ServeArgs;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("Failed to open database {}", args.database.display()))?;

    let addr = SocketAddr::new(args.host, args.port);
    let server = api::start(store, addr).with_context(|| format!("Failed to bind {addr}"))?;
    let handle = server.handle();
    tokio::pin!(server);

    tokio::select! {
        served = &mut server => served.context("Query API failed")?,
        _ = shutdown_signal(None) => {
            handle.stop(true).await;
            server.await.context("Query API failed")?;
        }
    }

    info!("Query API stopped");
    Ok(())
}
