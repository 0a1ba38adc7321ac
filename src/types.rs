//! Domain-level types shared by the Scanner, Mutation Planner and Storer.
//!
//! These are distinct from the on-disk protobuf shapes in [`crate::codec`]:
//! everything here is in-memory only and carries `Decimal` amounts rather
//! than the raw `f64` a node hands back.

use rust_decimal::Decimal;

/// One spendable output produced by a transaction in a scanned block.
#[derive(Debug, Clone)]
pub struct VoutRecord {
    pub txid: String,
    pub vout_index: u32,
    pub value: Decimal,
    pub address: String,
}

/// One input consuming a prior output, identified by the outpoint it spends.
#[derive(Debug, Clone)]
pub struct VinRecord {
    pub spent_txid: String,
    pub spent_vout_index: u32,
    pub spender_txid: String,
    pub spender_vin_index: u32,
}

/// The extracted content of a single block: every new output and every
/// spend it introduces. Coinbase inputs and vouts whose script could not be
/// mapped to an address have already been filtered out by the Scanner.
#[derive(Debug, Clone, Default)]
pub struct BlockDelta {
    pub height: i64,
    pub vouts: Vec<VoutRecord>,
    pub vins: Vec<VinRecord>,
    /// Set by the Scanner when this block's height equals the node tip at
    /// scan time. Drives the Storer's flush policy (spec §4.5): a per-block
    /// flush once caught up, a threshold-based flush during historical sync.
    pub catch_up: bool,
}
