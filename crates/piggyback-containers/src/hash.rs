//! Value hashing

/// Hash of an integer value: the value itself.
#[inline]
pub fn hash_int(value: i64) -> u64 {
    value as u64
}

/// Polynomial string hash (`h = h * 31 + byte`, seeded with 5381).
pub fn hash_str(value: &str) -> u64 {
    value
        .bytes()
        .fold(5381u64, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_str_is_stable() {
        assert_eq!(hash_str(""), 5381);
        assert_eq!(hash_str("a"), 5381 * 31 + 97);
        assert_eq!(hash_str("sales"), hash_str("sales"));
        assert_ne!(hash_str("sales"), hash_str("seals"));
    }

    #[test]
    fn test_hash_int_is_identity() {
        assert_eq!(hash_int(42), 42);
        assert_eq!(hash_int(-1), u64::MAX);
    }
}
