// Display order numbers: `ORD-` followed by a zero-padded sequence

const PREFIX: &str = "ORD-";

/// Format a sequence number as `ORD-####` (at least four digits)
pub fn format_order_number(sequence: u32) -> String {
    format!("{}{:04}", PREFIX, sequence)
}

/// Numeric suffix of an order number, if it has the expected shape
pub fn parse_order_suffix(order_number: &str) -> Option<u32> {
    let digits = order_number.strip_prefix(PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Highest existing suffix plus one; the first sequence is 1
///
/// `None` once the sequence is exhausted at `u32::MAX`.
pub fn next_sequence<'a>(existing: impl IntoIterator<Item = &'a str>) -> Option<u32> {
    existing
        .into_iter()
        .filter_map(parse_order_suffix)
        .max()
        .map_or(Some(1), |highest| highest.checked_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_to_four_digits() {
        assert_eq!(format_order_number(1), "ORD-0001");
        assert_eq!(format_order_number(42), "ORD-0042");
        assert_eq!(format_order_number(12345), "ORD-12345");
    }

    #[test]
    fn test_parse_suffix() {
        assert_eq!(parse_order_suffix("ORD-0007"), Some(7));
        assert_eq!(parse_order_suffix("ORD-12345"), Some(12345));
        assert_eq!(parse_order_suffix("ORD-"), None);
        assert_eq!(parse_order_suffix("ORD-12a"), None);
        assert_eq!(parse_order_suffix("INV-0001"), None);
    }

    #[test]
    fn test_first_sequence_is_one() {
        assert_eq!(next_sequence(Vec::<&str>::new()), Some(1));
        assert_eq!(format_order_number(next_sequence(Vec::<&str>::new()).unwrap()), "ORD-0001");
    }

    #[test]
    fn test_next_after_existing() {
        assert_eq!(format_order_number(next_sequence(["ORD-0007"]).unwrap()), "ORD-0008");
    }

    #[test]
    fn test_next_uses_numeric_maximum_not_insertion_order() {
        let existing = ["ORD-0010", "ORD-0002", "ORD-0009", "legacy-7"];
        assert_eq!(next_sequence(existing), Some(11));
    }

    #[test]
    fn test_exhausted_sequence() {
        assert_eq!(next_sequence(["ORD-4294967295"]), None);
        assert_eq!(next_sequence(["ORD-4294967294"]), Some(u32::MAX));
    }
}
