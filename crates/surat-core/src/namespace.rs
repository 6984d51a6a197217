//! Placeholder namespace.
//!
//! Only keys under [`RESERVED_PREFIX`] are trusted to reach the renderer.
//! Everything else a caller sends is dropped without error.

use crate::Mapping;

/// Prefix every placeholder key must carry.
pub const RESERVED_PREFIX: &str = "t.";

/// Whether `key` is in the placeholder namespace.
pub fn is_placeholder(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}

/// The subset of `mapping` whose keys are placeholders.
pub fn filter(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .filter(|(key, _)| is_placeholder(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
