//! Placeholder tag scanner.

use std::collections::BTreeSet;

use crate::package::Package;
use crate::syntax::TAG_RE;

/// Every distinct placeholder tag in the package's templated text.
///
/// Matches are taken over [`Package::text`], so paragraph boundaries separate
/// tokens and tags split across runs are found whole.
pub fn scan(package: &Package) -> BTreeSet<String> {
    scan_text(&package.text())
}

/// Every distinct placeholder tag in `text`.
pub fn scan_text(text: &str) -> BTreeSet<String> {
    TAG_RE
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect()
}
