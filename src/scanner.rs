//! Scanner (spec §4.4): pulls blocks from the node strictly in ascending
//! height order, decodes every transaction's inputs/outputs into a
//! `BlockDelta`, and pushes the delta onto the bounded channel the Storer
//! drains from.
//!
//! No reorg handling exists here by design (spec §1 Non-goals, §9 open
//! question) — the Scanner trusts that a height once scanned stays final.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::node_client::{NodeClient, RpcBlock};
use crate::script_address::extract_address;
use crate::types::{BlockDelta, VinRecord, VoutRecord};

const MAX_FETCH_ATTEMPTS: u32 = 3;
const TIP_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct Scanner {
    node: Arc<dyn NodeClient>,
    scan_height: i64,
    tx: mpsc::Sender<BlockDelta>,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new(
        node: Arc<dyn NodeClient>,
        start_height: i64,
        tx: mpsc::Sender<BlockDelta>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            node,
            scan_height: start_height,
            tx,
            cancel,
        }
    }

    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("scanner observed cancellation, stopping");
                return;
            }

            let tip = match self.fetch_tip().await {
                Ok(tip) => tip,
                Err(e) => {
                    tracing::error!(error = %e, "failed to fetch node tip, retrying");
                    if self.sleep_or_cancel(TIP_POLL_INTERVAL).await {
                        return;
                    }
                    continue;
                }
            };
            crate::metrics::NODE_HEIGHT.set(tip as f64);

            if self.scan_height > tip {
                if self.sleep_or_cancel(TIP_POLL_INTERVAL).await {
                    return;
                }
                continue;
            }

            for h in self.scan_height..=tip {
                if self.cancel.is_cancelled() {
                    return;
                }
                let delta = match self.scan_block(h, h == tip).await {
                    Ok(delta) => delta,
                    Err(e) => {
                        tracing::error!(height = h, error = %e, "scan failed after retries, will retry this height");
                        break;
                    }
                };
                crate::metrics::BLOCKS_SCANNED_TOTAL.inc();
                if self.tx.send(delta).await.is_err() {
                    tracing::info!("storer channel closed, stopping scanner");
                    return;
                }
                self.scan_height = h + 1;
            }
        }
    }

    /// Returns `true` if cancellation fired while sleeping.
    async fn sleep_or_cancel(&self, dur: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(dur) => false,
            _ = self.cancel.cancelled() => true,
        }
    }

    async fn fetch_tip(&self) -> Result<i64, crate::error::TransientRemoteError> {
        let node = Arc::clone(&self.node);
        tokio::task::spawn_blocking(move || node.get_block_count())
            .await
            .map_err(|e| crate::error::TransientRemoteError::Transport(e.to_string()))?
    }

    async fn scan_block(&self, height: i64, is_tip: bool) -> Result<BlockDelta, crate::error::TransientRemoteError> {
        let mut last_err = None;
        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            match self.fetch_block(height).await {
                Ok(block) => return Ok(Self::decode_block(height, block, is_tip)),
                Err(e) => {
                    tracing::warn!(height, attempt, error = %e, "block fetch attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("at least one attempt recorded an error"))
    }

    async fn fetch_block(&self, height: i64) -> Result<RpcBlock, crate::error::TransientRemoteError> {
        let node = Arc::clone(&self.node);
        tokio::task::spawn_blocking(move || {
            let hash = node.get_block_hash(height)?;
            node.get_block_verbose_tx(&hash)
        })
        .await
        .map_err(|e| crate::error::TransientRemoteError::Transport(e.to_string()))?
    }

    fn decode_block(height: i64, block: RpcBlock, is_tip: bool) -> BlockDelta {
        let mut vins = Vec::new();
        let mut vouts = Vec::new();

        for tx in &block.tx {
            for (vin_index, vin) in tx.vin.iter().enumerate() {
                let is_coinbase = vin.coinbase.is_some();
                let has_prior_txid = vin.txid.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
                if is_coinbase || !has_prior_txid {
                    continue;
                }
                let spent_vout_index = match vin.vout {
                    Some(v) => v,
                    None => continue,
                };
                vins.push(VinRecord {
                    spent_txid: vin.txid.clone().unwrap(),
                    spent_vout_index,
                    spender_txid: tx.txid.clone(),
                    spender_vin_index: vin_index as u32,
                });
            }

            for vout in &tx.vout {
                let script_type = vout.script_pub_key.script_type.as_str();
                match extract_address(script_type, &vout.script_pub_key.hex) {
                    Some(address) if !address.is_empty() => {
                        vouts.push(VoutRecord {
                            txid: tx.txid.clone(),
                            vout_index: vout.n,
                            value: crate::decimal::decimal_from_f64(vout.value),
                            address,
                        });
                    }
                    _ => {
                        tracing::debug!(
                            txid = %tx.txid,
                            n = vout.n,
                            script_type,
                            "unextractable vout skipped"
                        );
                    }
                }
            }
        }

        BlockDelta {
            height,
            vouts,
            vins,
            catch_up: is_tip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_client::{RpcScriptPubKey, RpcTx, RpcVin, RpcVout};

    #[test]
    fn coinbase_input_is_dropped() {
        let block = RpcBlock {
            tx: vec![RpcTx {
                txid: "tx1".to_string(),
                vin: vec![RpcVin {
                    txid: None,
                    vout: None,
                    coinbase: Some("03abcdef".to_string()),
                }],
                vout: vec![],
            }],
        };
        let delta = Scanner::decode_block(1, block, false);
        assert!(delta.vins.is_empty());
    }

    #[test]
    fn nonstandard_and_nulldata_vouts_are_dropped() {
        let block = RpcBlock {
            tx: vec![RpcTx {
                txid: "tx1".to_string(),
                vin: vec![],
                vout: vec![
                    RpcVout {
                        value: 1.0,
                        n: 0,
                        script_pub_key: RpcScriptPubKey {
                            script_type: "nonstandard".to_string(),
                            hex: "51".to_string(),
                        },
                    },
                    RpcVout {
                        value: 0.0,
                        n: 1,
                        script_pub_key: RpcScriptPubKey {
                            script_type: "nulldata".to_string(),
                            hex: "6a00".to_string(),
                        },
                    },
                ],
            }],
        };
        let delta = Scanner::decode_block(1, block, false);
        assert!(delta.vouts.is_empty());
    }

    #[test]
    fn regular_vin_is_kept_with_spender_identity() {
        let block = RpcBlock {
            tx: vec![RpcTx {
                txid: "tx2".to_string(),
                vin: vec![RpcVin {
                    txid: Some("tx1".to_string()),
                    vout: Some(0),
                    coinbase: None,
                }],
                vout: vec![],
            }],
        };
        let delta = Scanner::decode_block(5, block, true);
        assert_eq!(delta.vins.len(), 1);
        assert_eq!(delta.vins[0].spent_txid, "tx1");
        assert_eq!(delta.vins[0].spender_txid, "tx2");
        assert!(delta.catch_up);
    }
}
