//! # Attribute Value Encoding
//!
//! Credential attributes travel as a `raw` string plus an `encoded` decimal
//! integer string. The encoding rule:
//!
//! - a raw value that parses as a 32-bit signed integer encodes to that
//!   integer's decimal form;
//! - anything else encodes to the decimal value of its SHA-256 digest,
//!   read as a big-endian unsigned integer.
//!
//! A verifier recomputes the encoding from `raw` and rejects presentations
//! whose `encoded` value disagrees.

use sha2::{Digest, Sha256};

const LIMB_BASE: u64 = 1_000_000_000;

/// Encode a raw attribute value.
pub fn encode_attribute_value(raw: &str) -> String {
    if let Ok(n) = raw.parse::<i32>() {
        return n.to_string();
    }
    big_endian_to_decimal(&Sha256::digest(raw.as_bytes()))
}

/// Render big-endian unsigned bytes as a decimal string.
fn big_endian_to_decimal(bytes: &[u8]) -> String {
    // Little-endian limbs of nine decimal digits each.
    let mut limbs: Vec<u64> = vec![0];
    for &byte in bytes {
        let mut carry = u64::from(byte);
        for limb in limbs.iter_mut() {
            let v = *limb * 256 + carry;
            *limb = v % LIMB_BASE;
            carry = v / LIMB_BASE;
        }
        while carry > 0 {
            limbs.push(carry % LIMB_BASE);
            carry /= LIMB_BASE;
        }
    }
    let mut out = limbs.last().map(|l| l.to_string()).unwrap_or_default();
    for limb in limbs.iter().rev().skip(1) {
        out.push_str(&format!("{limb:09}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_encode_to_themselves() {
        assert_eq!(encode_attribute_value("25"), "25");
        assert_eq!(encode_attribute_value("-7"), "-7");
        assert_eq!(encode_attribute_value("0"), "0");
    }

    #[test]
    fn out_of_range_integers_are_hashed() {
        let encoded = encode_attribute_value("4294967296");
        assert_ne!(encoded, "4294967296");
        assert!(encoded.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn strings_encode_to_digest_decimal() {
        let encoded = encode_attribute_value("Alice");
        assert!(encoded.chars().all(|c| c.is_ascii_digit()));
        // A 256-bit value has at most 78 decimal digits.
        assert!(encoded.len() <= 78);
        assert_eq!(encoded, encode_attribute_value("Alice"));
        assert_ne!(encoded, encode_attribute_value("Bob"));
    }

    #[test]
    fn decimal_conversion_known_values() {
        assert_eq!(big_endian_to_decimal(&[]), "0");
        assert_eq!(big_endian_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(big_endian_to_decimal(&[0xff; 8]), "18446744073709551615");
        assert_eq!(
            big_endian_to_decimal(&[0x3b, 0x9a, 0xca, 0x00]),
            "1000000000"
        );
    }

    #[test]
    fn decimal_conversion_of_two_pow_128() {
        let mut bytes = vec![0u8; 17];
        bytes[0] = 1;
        assert_eq!(
            big_endian_to_decimal(&bytes),
            "340282366920938463463374607431768211456"
        );
    }
}
