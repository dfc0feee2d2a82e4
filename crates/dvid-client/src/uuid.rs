//! Uuid comparison under the shared-prefix rule.
//!
//! Node and repository uuids may be abbreviated anywhere a full uuid is
//! expected. Two uuids are compared only on their first `n` characters,
//! where `n` is the length of the shorter one.

use std::cmp::Ordering;

/// Compares two uuids on their shared-length prefix.
///
/// Returns [`Ordering::Equal`] when one uuid is a prefix of the other.
///
/// ```
/// use std::cmp::Ordering;
/// use dvid_client::compare_uuids;
///
/// assert_eq!(compare_uuids("4668abcd", "4668"), Ordering::Equal);
/// assert_eq!(compare_uuids("4669", "4668"), Ordering::Greater);
/// ```
#[must_use]
pub fn compare_uuids(a: &str, b: &str) -> Ordering {
    let len = a.chars().count().min(b.chars().count());
    a.chars().take(len).cmp(b.chars().take(len))
}

/// Returns true if one uuid is a prefix of the other.
#[must_use]
pub fn uuids_equivalent(a: &str, b: &str) -> bool {
    compare_uuids(a, b) == Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_abbreviated_uuid_is_equivalent() {
        assert_eq!(compare_uuids("4668abcd", "4668"), Ordering::Equal);
        assert_eq!(compare_uuids("4668", "4668abcd"), Ordering::Equal);
        assert!(uuids_equivalent("4668abcd", "4668"));
    }

    #[test]
    fn test_ordering_on_shared_prefix() {
        assert_eq!(compare_uuids("4669", "4668"), Ordering::Greater);
        assert_eq!(compare_uuids("4668", "4669ffff"), Ordering::Less);
        assert!(!uuids_equivalent("4669", "4668"));
    }

    #[test]
    fn test_empty_uuid_matches_everything() {
        assert!(uuids_equivalent("", "4668"));
        assert!(uuids_equivalent("", ""));
    }

    proptest! {
        #[test]
        fn prop_equivalence_is_prefix_relation(a in "[0-9a-f]{0,12}", b in "[0-9a-f]{0,12}") {
            let len = a.len().min(b.len());
            let expected = a == b[..len] || b == a[..len];
            prop_assert_eq!(uuids_equivalent(&a, &b), expected);
        }

        #[test]
        fn prop_compare_is_antisymmetric(a in "[0-9a-f]{0,12}", b in "[0-9a-f]{0,12}") {
            prop_assert_eq!(compare_uuids(&a, &b), compare_uuids(&b, &a).reverse());
        }

        #[test]
        fn prop_extension_stays_equivalent(a in "[0-9a-f]{1,12}", suffix in "[0-9a-f]{0,20}") {
            let full = format!("{a}{suffix}");
            prop_assert!(uuids_equivalent(&full, &a));
        }
    }
}
