// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label values and how to make arbitrary strings legal ones.
//!
//! Google Cloud label values may contain only lowercase letters (international
//! letters included), digits, underscores and hyphens, and are limited in length.

use crate::constants::MAX_LABEL_VALUE_LEN;
use std::collections::BTreeMap;

/// Label key to label value.
///
/// A `BTreeMap` keeps keys unique and gives a stable order in request bodies and logs.
pub type LabelMap = BTreeMap<String, String>;

/// Whether `c` may appear in a label value as-is.
#[must_use]
pub fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Turn an arbitrary string into a legal label value.
///
/// Every character is lower-cased; anything that is then not a letter, digit,
/// `_` or `-` becomes `_`. The result is cut to [`MAX_LABEL_VALUE_LEN`] characters.
///
/// Lower-casing happens per character before the charset check, because some
/// characters lower-case into several code points (`İ` becomes `i` plus a
/// combining dot). Checking afterwards keeps the function idempotent.
///
/// # Example
///
/// ```rust
/// use iris::labels::legalize;
///
/// assert_eq!(legalize("My.Bucket/Name"), "my_bucket_name");
/// assert_eq!(legalize(&legalize("US-East1")), legalize("US-East1"));
/// ```
#[must_use]
pub fn legalize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if is_label_char(c) { c } else { '_' })
        .take(MAX_LABEL_VALUE_LEN)
        .collect()
}

/// Build the key for a generated label: `{prefix}_{attribute}`, or just the
/// attribute when the prefix is empty.
#[must_use]
pub fn label_key(prefix: &str, attribute: &str) -> String {
    if prefix.is_empty() {
        attribute.to_string()
    } else {
        format!("{prefix}_{attribute}")
    }
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
