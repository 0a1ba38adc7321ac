//! Storer (spec §4.5): drains the Scanner's channel, accumulates deltas,
//! and triggers a Mutation Planner + Store commit when the flush policy
//! fires — either the batch has reached `batch_size` inputs+outputs, or the
//! delta that just arrived is the one that caught the scanner up to the
//! node's tip (in which case every subsequent block flushes immediately, to
//! keep the index fresh).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::planner;
use crate::store::Store;
use crate::types::{VinRecord, VoutRecord};

pub struct Storer {
    store: Arc<Store>,
    rx: mpsc::Receiver<crate::types::BlockDelta>,
    batch_size: usize,
    cancel: CancellationToken,
    done_tx: oneshot::Sender<()>,
}

impl Storer {
    pub fn new(
        store: Arc<Store>,
        rx: mpsc::Receiver<crate::types::BlockDelta>,
        batch_size: usize,
        cancel: CancellationToken,
        done_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            store,
            rx,
            batch_size,
            cancel,
            done_tx,
        }
    }

    pub async fn run(mut self) {
        let mut vins_buf: Vec<VinRecord> = Vec::new();
        let mut vouts_buf: Vec<VoutRecord> = Vec::new();
        let mut last_height: i64 = 0;
        let mut blocks_in_batch: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("storer observed cancellation, draining final batch");
                    if !vins_buf.is_empty() || !vouts_buf.is_empty() {
                        self.flush(&mut vins_buf, &mut vouts_buf, last_height, &mut blocks_in_batch).await;
                    }
                    break;
                }
                received = self.rx.recv() => {
                    match received {
                        Some(delta) => {
                            let catch_up = delta.catch_up;
                            last_height = delta.height;
                            blocks_in_batch += 1;
                            vins_buf.extend(delta.vins);
                            vouts_buf.extend(delta.vouts);
                            let over_threshold = vins_buf.len() + vouts_buf.len() >= self.batch_size;
                            if catch_up || over_threshold {
                                self.flush(&mut vins_buf, &mut vouts_buf, last_height, &mut blocks_in_batch).await;
                            }
                        }
                        None => {
                            tracing::info!("scanner channel closed, draining final batch");
                            if !vins_buf.is_empty() || !vouts_buf.is_empty() {
                                self.flush(&mut vins_buf, &mut vouts_buf, last_height, &mut blocks_in_batch).await;
                            }
                            break;
                        }
                    }
                }
            }
        }

        let _ = self.done_tx.send(());
    }

    async fn flush(
        &self,
        vins_buf: &mut Vec<VinRecord>,
        vouts_buf: &mut Vec<VoutRecord>,
        last_height: i64,
        blocks_in_batch: &mut u64,
    ) {
        let store = Arc::clone(&self.store);
        let vins = std::mem::take(vins_buf);
        let vouts = std::mem::take(vouts_buf);
        let n_ops = vins.len() + vouts.len();
        let n_blocks = std::mem::take(blocks_in_batch);

        let timer = crate::metrics::COMMIT_DURATION_SECONDS.start_timer();
        let result = tokio::task::spawn_blocking(move || {
            let write_set = planner::plan(&store, &vins, &vouts, last_height)?;
            store.commit(&write_set)
        })
        .await;
        timer.observe_duration();

        match result {
            Ok(Ok(())) => {
                crate::metrics::BLOCKS_COMMITTED_TOTAL.inc_by(n_blocks);
                crate::metrics::STORE_HEIGHT.set(last_height as f64);
                tracing::info!(height = last_height, ops = n_ops, blocks = n_blocks, "batch committed");
            }
            Ok(Err(e)) => {
                crate::metrics::COMMIT_ERRORS_TOTAL.inc();
                tracing::error!(error = %e, height = last_height, "commit failed, aborting process");
                std::process::exit(1);
            }
            Err(join_err) => {
                crate::metrics::COMMIT_ERRORS_TOTAL.inc();
                tracing::error!(error = %join_err, "flush task panicked, aborting process");
                std::process::exit(1);
            }
        }
    }
}
