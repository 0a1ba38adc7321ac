//! Embedded ordered KV wrapper (spec §4.2).
//!
//! Three logical column families back the three key-spaces from spec §3/§6
//! (`utxo`, `balance`, `address_utxo`); `StoredHeight` lives in the `utxo` CF
//! next to the records whose consistency it gates (I1), so a block's UTXO
//! writes and the height advance that makes them visible land in the same
//! `WriteBatch`. RocksDB tuning mirrors the teacher's `main.rs` — the same
//! hundreds-of-thousands-of-blocks write throughput requirement applies here.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use rust_decimal::Decimal;

use crate::codec::{
    address_balance_key, address_utxo_key, be_bytes_to_i64, decode_string_set, decode_utxo_info,
    encode_string_set, encode_utxo_info, i64_to_be_bytes, StringSet, UtxoInfo, STORE_HEIGHT_KEY,
};
use crate::decimal::{format_decimal8, parse_decimal8};
use crate::error::IndexerError;
use crate::write_set::WriteSet;

const CF_UTXO: &str = "utxo";
const CF_BALANCE: &str = "balance";
const CF_ADDRESS_UTXO: &str = "address_utxo";

pub struct Store {
    db: Arc<DB>,
}

impl Store {
    /// Open (creating on first use) the store directory. Idempotent.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, IndexerError> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);
        db_options.set_write_buffer_size(256 * 1024 * 1024);
        db_options.set_max_write_buffer_number(4);
        db_options.set_min_write_buffer_number_to_merge(2);
        db_options.set_target_file_size_base(256 * 1024 * 1024);
        db_options.set_level_zero_file_num_compaction_trigger(8);
        db_options.set_max_background_jobs(8);
        db_options.set_compression_type(rocksdb::DBCompressionType::Lz4);
        db_options.increase_parallelism(8);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_UTXO, Options::default()),
            ColumnFamilyDescriptor::new(CF_BALANCE, Options::default()),
            ColumnFamilyDescriptor::new(CF_ADDRESS_UTXO, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_options, dir, cf_descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf_utxo(&self) -> &ColumnFamily {
        self.db.cf_handle(CF_UTXO).expect("utxo CF missing")
    }

    fn cf_balance(&self) -> &ColumnFamily {
        self.db.cf_handle(CF_BALANCE).expect("balance CF missing")
    }

    fn cf_address_utxo(&self) -> &ColumnFamily {
        self.db
            .cf_handle(CF_ADDRESS_UTXO)
            .expect("address_utxo CF missing")
    }

    /// Returns 0 if no block has been committed yet.
    pub fn get_store_height(&self) -> Result<i64, IndexerError> {
        match self.db.get_cf(self.cf_utxo(), STORE_HEIGHT_KEY)? {
            Some(bytes) => Ok(be_bytes_to_i64(&bytes)?),
            None => Ok(0),
        }
    }

    pub fn get_utxo_info(&self, ukey: &str) -> Result<Option<UtxoInfo>, IndexerError> {
        match self.db.get_cf(self.cf_utxo(), ukey.as_bytes())? {
            Some(bytes) => Ok(Some(decode_utxo_info(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_address_balance(&self, address: &str) -> Result<Option<Decimal>, IndexerError> {
        let key = address_balance_key(address);
        match self.db.get_cf(self.cf_balance(), key.as_bytes())? {
            Some(bytes) => {
                let s = String::from_utf8_lossy(&bytes);
                Ok(Some(parse_decimal8(&s)?))
            }
            None => Ok(None),
        }
    }

    pub fn get_address_utxo_set(&self, address: &str) -> Result<Option<HashSet<String>>, IndexerError> {
        let key = address_utxo_key(address);
        match self.db.get_cf(self.cf_address_utxo(), key.as_bytes())? {
            Some(bytes) => {
                let set: StringSet = decode_string_set(&bytes)?;
                Ok(Some(set.members.into_iter().collect()))
            }
            None => Ok(None),
        }
    }

    /// Atomically applies every put/delete in `write_set` plus the new
    /// `StoredHeight`, in a single RocksDB `WriteBatch`. Either everything in
    /// the batch lands or nothing does — a partial commit here would violate
    /// I1 and is treated as a fatal bug by callers (spec §4.2/§4.5).
    pub fn commit(&self, write_set: &WriteSet) -> Result<(), IndexerError> {
        let mut batch = WriteBatch::default();
        let utxo_cf = self.cf_utxo();
        let balance_cf = self.cf_balance();
        let addr_cf = self.cf_address_utxo();

        for (ukey, info) in &write_set.utxo_puts {
            batch.put_cf(utxo_cf, ukey.as_bytes(), encode_utxo_info(info));
        }
        for (address, balance) in &write_set.balance_puts {
            let key = address_balance_key(address);
            batch.put_cf(balance_cf, key.as_bytes(), format_decimal8(*balance).as_bytes());
        }
        for address in &write_set.balance_deletes {
            let key = address_balance_key(address);
            batch.delete_cf(balance_cf, key.as_bytes());
        }
        for (address, members) in &write_set.address_set_puts {
            let key = address_utxo_key(address);
            let set = StringSet {
                members: members.iter().cloned().collect(),
            };
            batch.put_cf(addr_cf, key.as_bytes(), encode_string_set(&set));
        }
        for address in &write_set.address_set_deletes {
            let key = address_utxo_key(address);
            batch.delete_cf(addr_cf, key.as_bytes());
        }
        batch.put_cf(utxo_cf, STORE_HEIGHT_KEY, i64_to_be_bytes(write_set.new_height));

        self.db
            .write(batch)
            .map_err(|e| crate::error::CommitError(e.to_string()))?;
        Ok(())
    }

    /// Flush pending writes. Resources are released when the last `Arc<DB>`
    /// clone is dropped; callers sharing the Store via `Arc` (Query API,
    /// Storer) may still hold a reference at the moment shutdown calls this.
    pub fn close(&self) -> Result<(), IndexerError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Spend;

    fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn height_defaults_to_zero() {
        let (_dir, store) = open_temp();
        assert_eq!(store.get_store_height().unwrap(), 0);
    }

    #[test]
    fn commit_is_atomic_and_readable() {
        let (_dir, store) = open_temp();
        let mut ws = WriteSet::new(1);
        ws.utxo_puts.insert(
            "u:abc:0".to_string(),
            UtxoInfo {
                address: "A1".to_string(),
                value: 50.0,
                spend: None,
            },
        );
        ws.balance_puts.insert("A1".to_string(), Decimal::new(5000000000, 8));
        ws.address_set_puts
            .insert("A1".to_string(), ["u:abc:0".to_string()].into_iter().collect());
        store.commit(&ws).unwrap();

        assert_eq!(store.get_store_height().unwrap(), 1);
        let info = store.get_utxo_info("u:abc:0").unwrap().unwrap();
        assert_eq!(info.address, "A1");
        assert_eq!(info.spend, None);
        assert_eq!(
            store.get_address_balance("A1").unwrap().unwrap(),
            Decimal::new(5000000000, 8)
        );
        let set = store.get_address_utxo_set("A1").unwrap().unwrap();
        assert!(set.contains("u:abc:0"));
    }

    #[test]
    fn balance_and_set_deletes_remove_rows() {
        let (_dir, store) = open_temp();
        let mut ws = WriteSet::new(1);
        ws.balance_puts.insert("A1".to_string(), Decimal::new(100, 8));
        ws.address_set_puts
            .insert("A1".to_string(), ["u:x:0".to_string()].into_iter().collect());
        store.commit(&ws).unwrap();

        let mut ws2 = WriteSet::new(2);
        ws2.balance_deletes.insert("A1".to_string());
        ws2.address_set_deletes.insert("A1".to_string());
        store.commit(&ws2).unwrap();

        assert!(store.get_address_balance("A1").unwrap().is_none());
        assert!(store.get_address_utxo_set("A1").unwrap().is_none());
    }

    #[test]
    fn spend_stamp_round_trips_through_store() {
        let (_dir, store) = open_temp();
        let mut ws = WriteSet::new(1);
        ws.utxo_puts.insert(
            "u:abc:0".to_string(),
            UtxoInfo {
                address: "A1".to_string(),
                value: 10.0,
                spend: Some(Spend {
                    spender_txid: "def".to_string(),
                    spender_vin_index: 0,
                }),
            },
        );
        store.commit(&ws).unwrap();
        let info = store.get_utxo_info("u:abc:0").unwrap().unwrap();
        assert_eq!(info.spend.unwrap().spender_txid, "def");
    }
}
