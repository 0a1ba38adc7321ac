//! Startup and shutdown sequencing (spec §4.7).
//!
//! Startup: open the Store, resume at `stored_height + 1`, wire the bounded
//! channel, spawn Scanner and Storer, start the HTTP listener. Shutdown:
//! cancel the Scanner first, wait for the Storer's "done" signal (which is
//! only sent after it has drained any buffered deltas into one last commit),
//! then close the Store, then stop the HTTP listener.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::api;
use crate::config::AppConfig;
use crate::error::IndexerError;
use crate::node_client::{NodeClient, RpcNodeClient};
use crate::scanner::Scanner;
use crate::store::Store;
use crate::storer::Storer;

pub async fn run(config: AppConfig) -> Result<(), IndexerError> {
    let store = Arc::new(Store::open(&config.store.dir)?);
    let stored_height = store.get_store_height()?;
    tracing::info!(stored_height, "store opened, resuming scan");

    let node: Arc<dyn NodeClient> = Arc::new(RpcNodeClient::new(
        config.rpc.url.clone(),
        config.rpc.user.clone(),
        config.rpc.password.clone(),
    ));

    let (block_tx, block_rx) = mpsc::channel(config.indexer.block_chan_buf);
    let cancel = CancellationToken::new();
    let (done_tx, done_rx) = oneshot::channel();

    let scanner = Scanner::new(Arc::clone(&node), stored_height + 1, block_tx, cancel.clone());
    let scanner_handle = tokio::spawn(scanner.run());

    let storer = Storer::new(Arc::clone(&store), block_rx, config.indexer.batch_size, cancel.clone(), done_tx);
    let storer_handle = tokio::spawn(storer.run());

    let router = api::build_router(Arc::clone(&store), Arc::clone(&node));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, addr = %bind_addr, "failed to bind HTTP listener");
            std::process::exit(1);
        });
    tracing::info!(addr = %bind_addr, "HTTP listener bound");
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server exited with error");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received, cancelling scanner");
    cancel.cancel();

    let _ = scanner_handle.await;
    tracing::info!("scanner stopped, waiting for storer to drain");
    let _ = done_rx.await;
    let _ = storer_handle.await;

    store.close()?;
    server_handle.abort();
    tracing::info!("shutdown complete");
    Ok(())
}
