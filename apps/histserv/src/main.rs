// [apps/histserv/src/main.rs]
//! Entry point: parses CLI/env configuration, starts a background thread
//! that ingests the histogram wire protocol over TCP, and serves the HTTP
//! front end until `/Stop_Server` is hit (if enabled) or the process is signalled.

use std::net::TcpListener;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reco_histserv::cli::Args;
use reco_histserv::routes;
use reco_histserv::state::AppState;
use reco_infra_histo::receiver::Receiver;
use reco_shared_heimdall::{init_tracing, TracingOverrides};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    let _tracing_guard = init_tracing("histserv", TracingOverrides::default());

    let receiver = Arc::new(Receiver::new());
    let app_state = AppState::new(Arc::clone(&receiver), args.clone());

    spawn_ingest_thread(args.listen_addr.clone(), Arc::clone(&receiver), Arc::clone(&app_state.shutdown))?;

    tokio::runtime::Builder::new_multi_thread().enable_all().build().context("building the HTTP runtime")?.block_on(serve_http(app_state))
}

/// Opens the telemetry TCP listener and spawns the thread that, for each
/// accepted connection, drains it into the shared registry until the
/// shutdown flag is set.
fn spawn_ingest_thread(listen_addr: String, receiver: Arc<Receiver>, shutdown: Arc<std::sync::atomic::AtomicBool>) -> Result<()> {
    let listener = TcpListener::bind(&listen_addr).with_context(|| format!("binding telemetry ingest listener on {listen_addr}"))?;
    listener.set_nonblocking(true).context("setting the ingest listener non-blocking")?;
    info!(addr = %listen_addr, "telemetry ingest listener bound");

    std::thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((mut stream, peer)) => {
                    info!(%peer, "telemetry sender connected");
                    let _ = stream.set_read_timeout(Some(Duration::from_millis(200)));
                    receiver.run_until_cancelled(&mut stream, &shutdown);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    error!(error = %e, "telemetry ingest accept failed");
                    std::thread::sleep(Duration::from_millis(200));
                }
            }
        }
        info!("telemetry ingest thread stopped");
    });

    Ok(())
}

async fn serve_http(state: AppState) -> Result<()> {
    let http_addr = state.args.http_addr.clone();
    let shutdown = Arc::clone(&state.shutdown);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&http_addr).await.with_context(|| format!("binding HTTP listener on {http_addr}"))?;
    info!(addr = %http_addr, "HTTP front end listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            loop {
                if shutdown.load(Ordering::Relaxed) {
                    warn!("shutdown requested via /Stop_Server");
                    return;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
        .await
        .context("serving the HTTP front end")?;

    Ok(())
}
