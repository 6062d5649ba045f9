//! GTIN validation and normalization.
//!
//! A GTIN is valid when its length is 8, 12, 13, or 14 digits and the
//! trailing digit equals the GS1 mod-10 weighted checksum: alternating
//! weights 3/1 from the right, with the rightmost non-check digit
//! weighted 3.

/// Whether a digit count is a recognized GTIN length.
#[must_use]
pub const fn is_gtin_length(len: usize) -> bool {
    matches!(len, 8 | 12 | 13 | 14)
}

/// Check whether a candidate string is a valid GTIN.
#[must_use]
pub fn validate_gtin(candidate: &str) -> bool {
    let digits: Vec<u32> = match candidate
        .trim()
        .chars()
        .map(|c| c.to_digit(10).ok_or(()))
        .collect()
    {
        Ok(d) => d,
        Err(()) => return false,
    };

    if !is_gtin_length(digits.len()) {
        return false;
    }

    let check = digits[digits.len() - 1];
    let sum: u32 = digits[..digits.len() - 1]
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();

    (10 - (sum % 10)) % 10 == check
}

/// Normalize a valid GTIN for comparison by stripping leading zeros.
///
/// A 13-digit and a 14-digit GTIN carrying the same numeric value must
/// compare equal. Returns `None` when the candidate is not a valid GTIN.
#[must_use]
pub fn normalize_gtin(candidate: &str) -> Option<String> {
    if !validate_gtin(candidate) {
        return None;
    }
    let stripped = candidate.trim().trim_start_matches('0');
    // An all-zero GTIN normalizes to "0" rather than the empty string.
    if stripped.is_empty() {
        Some("0".to_string())
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ean13() {
        assert!(validate_gtin("4006381333931"));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        assert!(!validate_gtin("4006381333932"));
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(!validate_gtin("123"));
        assert!(!validate_gtin("40063813339311234"));
    }

    #[test]
    fn test_non_digits_rejected() {
        assert!(!validate_gtin("40063813339a1"));
        assert!(!validate_gtin(""));
    }

    #[test]
    fn test_valid_gtin8() {
        // 9638-5074: check digit 4 per GS1 mod-10.
        assert!(validate_gtin("96385074"));
    }

    #[test]
    fn test_leading_zero_lengths_normalize_equal() {
        // Same article as EAN-13 and as zero-padded GTIN-14.
        let thirteen = normalize_gtin("4006381333931").unwrap();
        let fourteen = normalize_gtin("04006381333931").unwrap();
        assert_eq!(thirteen, fourteen);
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert_eq!(normalize_gtin("123"), None);
    }
}
