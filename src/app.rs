//! Surface wiring: the HTTP server and the CLI around one wizard.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::info;

use crate::channels::{Channel, run_channel};
use crate::intake::{IntakeRouteState, IntakeWizard, intake_routes};

pub type ServerHandle = JoinHandle<std::io::Result<()>>;

/// Bind the intake routes and serve them on a background task.
pub async fn spawn_http(
    addr: impl ToSocketAddrs,
    wizard: Arc<IntakeWizard>,
) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let app = intake_routes(IntakeRouteState { wizard });
    info!(addr = %local, "HTTP server started");
    let handle = tokio::spawn(async move { axum::serve(listener, app).await });
    Ok((local, handle))
}

/// Run the configured surfaces to completion.
///
/// The end of CLI input only ends the process when there is no HTTP server;
/// otherwise the server keeps running until it fails or `shutdown` resolves.
pub async fn run_surfaces(
    wizard: &IntakeWizard,
    cli: Option<&dyn Channel>,
    output_dir: &Path,
    server: Option<ServerHandle>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    if let Some(cli) = cli {
        run_channel(cli, wizard, output_dir).await?;
        if server.is_none() {
            return Ok(());
        }
        info!("CLI input closed, HTTP server still serving");
    }

    let Some(server) = server else {
        return Ok(());
    };
    tokio::select! {
        result = server => {
            result
                .context("HTTP server task panicked")?
                .context("HTTP server failed")?;
        }
        _ = shutdown => {
            info!("Shutting down");
        }
    }
    Ok(())
}
