//! Mutation Planner (spec §4.3) — the heart of correctness. Given a batch's
//! inputs and outputs plus read-only access to prior state, computes the
//! full [`WriteSet`] the Store must apply atomically.
//!
//! The Planner never touches RocksDB directly: it only calls the Store's
//! read methods, keeping it unit-testable against an ephemeral Store with no
//! network or scanner involved (spec §9, "interface abstraction").

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::codec::{ukey, Spend as WireSpend, UtxoInfo};
use crate::decimal::decimal_from_f64;
use crate::error::IndexerError;
use crate::store::Store;
use crate::types::{VinRecord, VoutRecord};
use crate::write_set::WriteSet;

#[derive(Debug, Clone)]
struct PendingUtxo {
    address: String,
    value: Decimal,
    spend: Option<(String, u32)>,
}

/// Build the WriteSet for a batch spanning `[h_start, h_end]` — the Planner
/// only needs `h_end` (spec §4.3 Phase E: `new_height = h_end`).
pub fn plan(store: &Store, vins: &[VinRecord], vouts: &[VoutRecord], h_end: i64) -> Result<WriteSet, IndexerError> {
    let mut pending_utxo: HashMap<String, PendingUtxo> = HashMap::new();
    let mut added_utxo_by_addr: HashMap<String, HashSet<String>> = HashMap::new();
    let mut removed_utxo_by_addr: HashMap<String, HashSet<String>> = HashMap::new();
    let mut delta_balance: HashMap<String, Decimal> = HashMap::new();
    let mut touched: HashSet<String> = HashSet::new();

    // Phase A — ingest outputs.
    for vout in vouts {
        let key = ukey(&vout.txid, vout.vout_index);
        pending_utxo.insert(
            key.clone(),
            PendingUtxo {
                address: vout.address.clone(),
                value: vout.value,
                spend: None,
            },
        );
        touched.insert(vout.address.clone());
        added_utxo_by_addr
            .entry(vout.address.clone())
            .or_default()
            .insert(key);
        *delta_balance.entry(vout.address.clone()).or_insert(Decimal::ZERO) += vout.value;
    }

    // Phase B — ingest inputs against in-batch outputs; defer the rest.
    let mut deferred: Vec<&VinRecord> = Vec::new();
    for vin in vins {
        let key = ukey(&vin.spent_txid, vin.spent_vout_index);
        if let Some(info) = pending_utxo.get_mut(&key) {
            if info.spend.is_some() {
                panic!(
                    "duplicate spend within batch: {} spent twice (invariant violation, spec §8 scenario 6)",
                    key
                );
            }
            info.spend = Some((vin.spender_txid.clone(), vin.spender_vin_index));
            removed_utxo_by_addr
                .entry(info.address.clone())
                .or_default()
                .insert(key);
            *delta_balance.entry(info.address.clone()).or_insert(Decimal::ZERO) -= info.value;
            touched.insert(info.address.clone());
        } else {
            deferred.push(vin);
        }
    }

    // Phase C — resolve historical spends.
    for vin in deferred {
        let key = ukey(&vin.spent_txid, vin.spent_vout_index);
        if pending_utxo.contains_key(&key) {
            panic!(
                "duplicate spend within batch: {} spent twice (invariant violation, spec §8 scenario 6)",
                key
            );
        }
        match store.get_utxo_info(&key)? {
            Some(prior) => {
                let value = decimal_from_f64(prior.value);
                pending_utxo.insert(
                    key.clone(),
                    PendingUtxo {
                        address: prior.address.clone(),
                        value,
                        spend: Some((vin.spender_txid.clone(), vin.spender_vin_index)),
                    },
                );
                removed_utxo_by_addr
                    .entry(prior.address.clone())
                    .or_default()
                    .insert(key);
                *delta_balance.entry(prior.address.clone()).or_insert(Decimal::ZERO) -= value;
                touched.insert(prior.address);
            }
            None => {
                // Unknown ukey: the creating output was likely discarded at
                // scan time as non-standard. Tolerated silently per spec §9
                // open question / §4.3 Phase C ("log and skip").
                tracing::warn!(ukey = %key, "spend references unknown utxo, skipping");
            }
        }
    }

    // Phase D — merge with persisted per-address state.
    let mut write_set = WriteSet::new(h_end);
    for address in touched {
        let prior_balance = store.get_address_balance(&address)?.unwrap_or(Decimal::ZERO);
        let delta = delta_balance.get(&address).copied().unwrap_or(Decimal::ZERO);
        let new_balance = prior_balance + delta;
        if new_balance.is_zero() {
            write_set.balance_deletes.insert(address.clone());
        } else {
            write_set.balance_puts.insert(address.clone(), new_balance);
        }

        let mut new_set = store.get_address_utxo_set(&address)?.unwrap_or_default();
        if let Some(added) = added_utxo_by_addr.get(&address) {
            new_set.extend(added.iter().cloned());
        }
        if let Some(removed) = removed_utxo_by_addr.get(&address) {
            for key in removed {
                new_set.remove(key);
            }
        }
        if new_set.is_empty() {
            write_set.address_set_deletes.insert(address);
        } else {
            write_set.address_set_puts.insert(address, new_set);
        }
    }

    // Phase E — finalize utxo_puts.
    for (key, pending) in pending_utxo {
        let spend = pending.spend.map(|(txid, index)| WireSpend {
            spender_txid: txid,
            spender_vin_index: index,
        });
        write_set.utxo_puts.insert(
            key,
            UtxoInfo {
                address: pending.address,
                value: pending.value.to_f64().unwrap_or(0.0),
                spend,
            },
        );
    }

    Ok(write_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::format_decimal8;

    fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    fn vout(txid: &str, index: u32, address: &str, value: &str) -> VoutRecord {
        VoutRecord {
            txid: txid.to_string(),
            vout_index: index,
            value: value.parse().unwrap(),
            address: address.to_string(),
        }
    }

    fn vin(spent_txid: &str, spent_index: u32, spender_txid: &str, spender_index: u32) -> VinRecord {
        VinRecord {
            spent_txid: spent_txid.to_string(),
            spent_vout_index: spent_index,
            spender_txid: spender_txid.to_string(),
            spender_vin_index: spender_index,
        }
    }

    #[test]
    fn genesis_style_batch() {
        let (_dir, store) = open_temp();
        let vouts = vec![vout("tx1", 0, "A", "50.0")];
        let ws = plan(&store, &[], &vouts, 1).unwrap();
        store.commit(&ws).unwrap();

        assert_eq!(store.get_store_height().unwrap(), 1);
        assert_eq!(
            format_decimal8(store.get_address_balance("A").unwrap().unwrap()),
            "50.00000000"
        );
        let set = store.get_address_utxo_set("A").unwrap().unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("u:tx1:0"));
        let info = store.get_utxo_info("u:tx1:0").unwrap().unwrap();
        assert_eq!(info.address, "A");
        assert!(info.spend.is_none());
    }

    #[test]
    fn within_batch_spend_never_appears_in_address_set() {
        let (_dir, store) = open_temp();
        let vouts = vec![vout("tx1", 0, "A", "10.0"), vout("tx2", 0, "B", "9.5")];
        let vins = vec![vin("tx1", 0, "tx2", 0)];
        let ws = plan(&store, &vins, &vouts, 2).unwrap();
        store.commit(&ws).unwrap();

        assert!(store.get_address_balance("A").unwrap().is_none());
        assert!(store.get_address_utxo_set("A").unwrap().is_none());
        assert_eq!(
            format_decimal8(store.get_address_balance("B").unwrap().unwrap()),
            "9.50000000"
        );
        let set_b = store.get_address_utxo_set("B").unwrap().unwrap();
        assert!(set_b.contains("u:tx2:0"));
        let spent = store.get_utxo_info("u:tx1:0").unwrap().unwrap();
        assert_eq!(spent.spend.unwrap().spender_txid, "tx2");
    }

    #[test]
    fn cross_batch_spend_resolves_against_prior_commit() {
        let (_dir, store) = open_temp();
        let genesis = plan(&store, &[], &[vout("tx10", 0, "A", "1.0")], 10).unwrap();
        store.commit(&genesis).unwrap();

        let spend_batch = plan(&store, &[vin("tx10", 0, "tx11", 0)], &[], 11).unwrap();
        store.commit(&spend_batch).unwrap();

        assert!(store.get_address_balance("A").unwrap().is_none());
        assert!(store.get_address_utxo_set("A").unwrap().is_none());
        let spent = store.get_utxo_info("u:tx10:0").unwrap().unwrap();
        assert_eq!(spent.spend.unwrap().spender_txid, "tx11");
    }

    #[test]
    fn unknown_ukey_spend_is_skipped_not_fatal() {
        let (_dir, store) = open_temp();
        let ws = plan(&store, &[vin("ghost", 0, "tx1", 0)], &[], 1).unwrap();
        store.commit(&ws).unwrap();
        assert_eq!(store.get_store_height().unwrap(), 1);
    }

    #[test]
    #[should_panic(expected = "duplicate spend within batch")]
    fn duplicate_spend_within_batch_aborts() {
        let (_dir, store) = open_temp();
        let vouts = vec![vout("tx1", 0, "A", "10.0")];
        let vins = vec![vin("tx1", 0, "tx2", 0), vin("tx1", 0, "tx3", 0)];
        let _ = plan(&store, &vins, &vouts, 1);
    }

    #[test]
    fn empty_block_advances_height_without_other_writes() {
        let (_dir, store) = open_temp();
        let ws = plan(&store, &[], &[], 5).unwrap();
        assert!(ws.is_empty());
        store.commit(&ws).unwrap();
        assert_eq!(store.get_store_height().unwrap(), 5);
    }
}
