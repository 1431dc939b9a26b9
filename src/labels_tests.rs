// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `labels.rs`

#[cfg(test)]
mod tests {
    use crate::constants::MAX_LABEL_VALUE_LEN;
    use crate::labels::{is_label_char, label_key, legalize};
    use proptest::prelude::*;

    #[test]
    fn test_legal_value_is_unchanged() {
        assert_eq!(legalize("my-disk_01"), "my-disk_01");
    }

    #[test]
    fn test_uppercase_is_lowered() {
        assert_eq!(legalize("US-EAST1"), "us-east1");
    }

    #[test]
    fn test_illegal_characters_become_underscores() {
        assert_eq!(legalize("europe.west/1 b:c"), "europe_west_1_b_c");
        assert_eq!(legalize("a@b#c"), "a_b_c");
    }

    #[test]
    fn test_international_letters_are_kept() {
        assert_eq!(legalize("Straße-Ünïcode"), "straße-ünïcode");
        assert_eq!(legalize("東京"), "東京");
    }

    #[test]
    fn test_multi_codepoint_lowercase_stays_idempotent() {
        // 'İ' lower-cases to two code points
        let once = legalize("İstanbul");
        assert!(once.starts_with('i'));
        assert!(once.ends_with("stanbul"));
        assert_eq!(legalize(&once), once);
    }

    #[test]
    fn test_value_is_truncated() {
        let long = "x".repeat(100);
        let legal = legalize(&long);
        assert_eq!(legal.chars().count(), MAX_LABEL_VALUE_LEN);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(legalize(""), "");
    }

    #[test]
    fn test_label_key_with_prefix() {
        assert_eq!(label_key("iris", "zone"), "iris_zone");
    }

    #[test]
    fn test_label_key_without_prefix() {
        assert_eq!(label_key("", "zone"), "zone");
    }

    proptest! {
        #[test]
        fn prop_legalize_output_is_legal(s in any::<String>()) {
            let legal = legalize(&s);
            prop_assert!(legal.chars().count() <= MAX_LABEL_VALUE_LEN);
            prop_assert!(legal.chars().all(is_label_char));
        }

        #[test]
        fn prop_legalize_is_idempotent(s in any::<String>()) {
            let once = legalize(&s);
            prop_assert_eq!(legalize(&once), once);
        }
    }
}
