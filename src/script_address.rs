//! Pure script → address extraction (spec §6), mainnet parameter set.
//!
//! Grounded on the teacher's `script_utils.rs`, which reaches for the same
//! `bitcoin::Address::from_script` helper; the difference here is that
//! `nonstandard`/`nulldata` script types are rejected before extraction is
//! even attempted, matching spec §4.4/§6's discard list.

use bitcoin::{Address, Network, Script};

const DISCARDED_TYPES: [&str; 2] = ["nonstandard", "nulldata"];

/// Returns `None` when the vout should be skipped rather than indexed: a
/// discarded script type, unparseable hex, or a script shape
/// `Address::from_script` doesn't recognize. The caller (Scanner) treats
/// `None` as "log and skip", never as a reason to abort the block.
pub fn extract_address(script_type: &str, script_hex: &str) -> Option<String> {
    if DISCARDED_TYPES.contains(&script_type) {
        return None;
    }
    let bytes = hex::decode(script_hex).ok()?;
    let script = Script::from(bytes);
    Address::from_script(&script, Network::Bitcoin).map(|a| a.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discards_nonstandard_and_nulldata() {
        assert_eq!(extract_address("nonstandard", "6a0102"), None);
        assert_eq!(extract_address("nulldata", "6a0102"), None);
    }

    #[test]
    fn extracts_p2pkh_address() {
        // OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG
        let hex = "76a914000000000000000000000000000000000000000088ac";
        let addr = extract_address("pubkeyhash", hex);
        assert!(addr.is_some());
    }

    #[test]
    fn unparseable_hex_yields_none() {
        assert_eq!(extract_address("pubkeyhash", "zz"), None);
    }
}
