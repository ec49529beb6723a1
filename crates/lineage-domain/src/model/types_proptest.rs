//! Property-based tests for node identity.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{validate_person_hash, NodeKey};

    /// Strategy to generate valid person hashes in mixed case.
    fn person_hash_strategy() -> impl Strategy<Value = String> {
        (any::<bool>(), "[0-9a-fA-F]{64}").prop_map(|(prefixed, digits)| {
            if prefixed {
                format!("0x{digits}")
            } else {
                digits
            }
        })
    }

    proptest! {
        #[test]
        fn test_generated_hashes_are_valid(hash in person_hash_strategy()) {
            prop_assert!(validate_person_hash(&hash).is_ok(), "Failed for hash: {}", hash);
        }

        #[test]
        fn test_key_ignores_hash_case(hash in person_hash_strategy(), version in 1u64..1_000) {
            let upper = NodeKey::new(&hash.to_uppercase(), version);
            let lower = NodeKey::new(&hash.to_lowercase(), version);
            prop_assert_eq!(upper.cache_key(), lower.cache_key());
            prop_assert_eq!(upper, lower);
        }

        #[test]
        fn test_page_key_extends_node_key(hash in person_hash_strategy(), version in 1u64..1_000, offset in 0u64..10_000) {
            let key = NodeKey::new(&hash, version);
            let page_key = key.page_cache_key(offset);
            prop_assert!(page_key.starts_with(&key.cache_key()));
            let suffix = format!(":o:{}", offset);
            prop_assert!(page_key.ends_with(&suffix));
        }

        #[test]
        fn test_short_hashes_are_rejected(digits in "[0-9a-f]{1,63}") {
            prop_assert!(validate_person_hash(&digits).is_err());
        }
    }
}
