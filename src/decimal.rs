//! Exact fixed-point decimal(8) helpers.
//!
//! Spec §4.1/§4.3: all balance arithmetic must flow through an exact
//! fixed-point type, never `f64`. The node hands us amounts as IEEE-754
//! floats (`vout.value`); those are converted to [`rust_decimal::Decimal`]
//! immediately at the Scanner boundary (see `types::VoutRecord`) and never
//! touched as floats again.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::DecodeError;

pub const SCALE: u32 = 8;

/// Convert a node-supplied `f64` BTC amount to an exact decimal at scale 8.
/// `from_f64_retain` preserves the float's full binary value before we
/// round, so the rounding step below is the only place precision is lost
/// (and it's lost identically to how the node itself prints 8 fractional
/// digits).
pub fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(SCALE)
}

/// Render a decimal as ASCII with exactly 8 fractional digits, trailing
/// zeros preserved (spec §3: "Value strings have 8 fractional digits").
pub fn format_decimal8(value: Decimal) -> String {
    format!("{:.*}", SCALE as usize, value.round_dp(SCALE))
}

/// Parse a previously-stored decimal(8) string back into a `Decimal`.
pub fn parse_decimal8(s: &str) -> Result<Decimal, DecodeError> {
    Decimal::from_str(s).map_err(|e| DecodeError::Decimal(format!("{}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn formats_exactly_eight_fractional_digits() {
        assert_eq!(format_decimal8(Decimal::new(125, 8)), "0.00000125");
        assert_eq!(format_decimal8(Decimal::new(5000000000, 8)), "50.00000000");
    }

    #[test]
    fn round_trip_preserves_exact_value() {
        let original = Decimal::new(950000000, 8); // 9.5
        let s = format_decimal8(original);
        let parsed = parse_decimal8(&s).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn float_conversion_rounds_to_scale() {
        let d = decimal_from_f64(50.0);
        assert_eq!(format_decimal8(d), "50.00000000");
    }
}
