//! Content fingerprints for cache keys.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Field delimiter (ASCII unit separator).
const DELIMITER: &[u8] = b"\x1f";

/// Compute a short fingerprint over an ordered list of field values.
///
/// Every field contributes, including empty ones, so that an all-empty
/// snapshot still hashes to a valid fingerprint and shifting a value from one
/// field to the next changes the digest.
pub fn fingerprint<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            hasher.update(DELIMITER);
        }
        hasher.update(field.as_bytes());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(FINGERPRINT_LEN);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_fingerprint(value: &str) -> bool {
        value.len() == FINGERPRINT_LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    #[test]
    fn test_fingerprint_stability() {
        let a = fingerprint(["John Doe", "10", "A", "2024-01-01T10:00:00Z", "2015-06-01T00:00:00Z"]);
        let b = fingerprint(["John Doe", "10", "A", "2024-01-01T10:00:00Z", "2015-06-01T00:00:00Z"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(["John Doe", "10", "A"]);
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(is_fingerprint(&fp));
    }

    #[test]
    fn test_fingerprint_each_field_matters() {
        let base = ["John Doe", "10", "A", "2024-01-01T10:00:00Z", "2015-06-01T00:00:00Z"];
        let reference = fingerprint(base);
        for i in 0..base.len() {
            let mut changed = base;
            changed[i] = "changed";
            assert_ne!(fingerprint(changed), reference, "field {i} did not affect the fingerprint");
        }
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        let left = fingerprint(["ab", "c"]);
        let right = fingerprint(["a", "bc"]);
        assert_ne!(left, right);
    }

    #[test]
    fn test_fingerprint_all_empty() {
        let fp = fingerprint(["", "", "", "", ""]);
        assert!(is_fingerprint(&fp));
        assert_ne!(fp, fingerprint(["", "", ""]));
    }

    #[test]
    fn test_is_fingerprint_rejects_bad_input() {
        assert!(!is_fingerprint("abc"));
        assert!(!is_fingerprint("ABCD1234ABCD1234"));
        assert!(!is_fingerprint("zzzzzzzzzzzzzzzz"));
        assert!(is_fingerprint("abcd1234abcd1234"));
    }
}
