//! Pure byte encodings (spec §4.1).
//!
//! Three things live here: the scalar i64 big-endian encoding used for
//! `StoredHeight`, key-string construction for the three logical
//! keyspaces, and thin wrappers around the generated protobuf types
//! (`UtxoInfo`, `StringSet`) so call sites never touch `prost::Message`
//! directly.

use prost::Message;

use crate::error::DecodeError;

include!(concat!(env!("OUT_DIR"), "/utxoindexer.rs"));

pub const UTXO_PREFIX: &str = "u:";
pub const ADDRESS_BALANCE_PREFIX: &str = "ab:";
pub const ADDRESS_UTXO_PREFIX: &str = "au:";
pub const STORE_HEIGHT_KEY: &str = "s:h";

/// The system's canonical string key for a UTXO: `"u:" + hex(txid) + ":" + index`.
pub fn ukey(txid_hex: &str, vout_index: u32) -> String {
    format!("{}{}:{}", UTXO_PREFIX, txid_hex, vout_index)
}

/// Split a ukey back into its (txid_hex, vout_index) parts. Used by the
/// Query API when rendering a page of UTXOs.
pub fn parse_ukey(ukey: &str) -> Result<(String, u32), DecodeError> {
    let rest = ukey
        .strip_prefix(UTXO_PREFIX)
        .ok_or_else(|| DecodeError::Key(format!("missing '{}' prefix: {}", UTXO_PREFIX, ukey)))?;
    let mut parts = rest.rsplitn(2, ':');
    let index_str = parts
        .next()
        .ok_or_else(|| DecodeError::Key(format!("malformed ukey: {}", ukey)))?;
    let txid = parts
        .next()
        .ok_or_else(|| DecodeError::Key(format!("malformed ukey: {}", ukey)))?;
    let index: u32 = index_str
        .parse()
        .map_err(|_| DecodeError::Key(format!("malformed vout index in ukey: {}", ukey)))?;
    Ok((txid.to_string(), index))
}

pub fn address_balance_key(address: &str) -> String {
    format!("{}{}", ADDRESS_BALANCE_PREFIX, address)
}

pub fn address_utxo_key(address: &str) -> String {
    format!("{}{}", ADDRESS_UTXO_PREFIX, address)
}

pub fn i64_to_be_bytes(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

pub fn be_bytes_to_i64(bytes: &[u8]) -> Result<i64, DecodeError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DecodeError::Key(format!("expected 8 bytes for i64, got {}", bytes.len())))?;
    Ok(i64::from_be_bytes(arr))
}

pub fn encode_utxo_info(info: &UtxoInfo) -> Vec<u8> {
    info.encode_to_vec()
}

pub fn decode_utxo_info(bytes: &[u8]) -> Result<UtxoInfo, DecodeError> {
    Ok(UtxoInfo::decode(bytes)?)
}

pub fn encode_string_set(set: &StringSet) -> Vec<u8> {
    set.encode_to_vec()
}

pub fn decode_string_set(bytes: &[u8]) -> Result<StringSet, DecodeError> {
    Ok(StringSet::decode(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ukey_round_trips() {
        let k = ukey("abc123", 7);
        assert_eq!(k, "u:abc123:7");
        let (txid, idx) = parse_ukey(&k).unwrap();
        assert_eq!(txid, "abc123");
        assert_eq!(idx, 7);
    }

    #[test]
    fn i64_be_round_trips() {
        let bytes = i64_to_be_bytes(1234);
        assert_eq!(be_bytes_to_i64(&bytes).unwrap(), 1234);
    }

    #[test]
    fn utxo_info_round_trips() {
        let info = UtxoInfo {
            address: "A1".to_string(),
            value: 50.0,
            spend: None,
        };
        let bytes = encode_utxo_info(&info);
        let decoded = decode_utxo_info(&bytes).unwrap();
        assert_eq!(decoded.address, info.address);
        assert_eq!(decoded.value, info.value);
        assert!(decoded.spend.is_none());
    }

    #[test]
    fn utxo_info_with_spend_round_trips() {
        let info = UtxoInfo {
            address: "A1".to_string(),
            value: 10.0,
            spend: Some(Spend {
                spender_txid: "deadbeef".to_string(),
                spender_vin_index: 3,
            }),
        };
        let bytes = encode_utxo_info(&info);
        let decoded = decode_utxo_info(&bytes).unwrap();
        let spend = decoded.spend.unwrap();
        assert_eq!(spend.spender_txid, "deadbeef");
        assert_eq!(spend.spender_vin_index, 3);
    }

    #[test]
    fn string_set_round_trips() {
        let set = StringSet {
            members: vec!["u:a:0".to_string(), "u:b:1".to_string()],
        };
        let bytes = encode_string_set(&set);
        let decoded = decode_string_set(&bytes).unwrap();
        assert_eq!(decoded.members, set.members);
    }
}
