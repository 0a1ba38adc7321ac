//! The atomic unit of mutation the Mutation Planner hands to the Store
//! (spec §4.2/§4.3). A `WriteSet` is pure data: the Planner never touches
//! RocksDB directly, and the Store never decides what to write, only how.
//! `address_set_puts` and `balance_puts` already carry the fully-materialized
//! post-commit value for each touched address (spec §4.3 Phase D) — the
//! Store applies them verbatim rather than merging them with prior state.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::codec::UtxoInfo;

/// Everything one `commit()` call must apply together. If any part of this
/// fails to land, none of it may be visible — including `new_height`.
#[derive(Debug, Default)]
pub struct WriteSet {
    /// New or updated UTXO records, keyed by ukey (`"u:" + txid + ":" + index`).
    pub utxo_puts: HashMap<String, UtxoInfo>,
    /// Fully-materialized post-commit balance per touched address.
    pub balance_puts: HashMap<String, Decimal>,
    /// Addresses whose balance fell to exactly zero and should be removed
    /// rather than stored as `"0.00000000"`.
    pub balance_deletes: HashSet<String>,
    /// Fully-materialized post-commit UTXO-set membership per touched
    /// address.
    pub address_set_puts: HashMap<String, HashSet<String>>,
    /// Addresses whose UTXO set became empty and should be removed.
    pub address_set_deletes: HashSet<String>,
    /// The height this WriteSet advances `StoredHeight` to. Always the
    /// height of the last block folded into this batch.
    pub new_height: i64,
}

impl WriteSet {
    pub fn new(new_height: i64) -> Self {
        Self {
            new_height,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utxo_puts.is_empty()
            && self.balance_puts.is_empty()
            && self.balance_deletes.is_empty()
            && self.address_set_puts.is_empty()
            && self.address_set_deletes.is_empty()
    }
}
