//! Hex string helpers for the frame tools

use anyhow::{bail, Context, Result};

/// Parse a hex byte string. Accepts an optional `0x` prefix and whitespace,
/// `:` or `-` between bytes, e.g. `"33 01 01"`, `"aa:01"`, `"0x3301"`.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();

    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in '{}'", input);
    }
    if !digits.is_ascii() {
        bail!("invalid hex string '{}'", input);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

/// Space-separated uppercase hex, e.g. `"33 01 01"`
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_separators() {
        assert_eq!(parse_hex("33 01 01").unwrap(), vec![0x33, 0x01, 0x01]);
        assert_eq!(parse_hex("aa:04").unwrap(), vec![0xAA, 0x04]);
        assert_eq!(parse_hex("0x0DFF").unwrap(), vec![0x0D, 0xFF]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn format() {
        assert_eq!(format_hex(&[0x33, 0x01, 0xff]), "33 01 FF");
        assert_eq!(format_hex(&[]), "");
    }
}
