//! Locale-invariant ordering of base58 renderings.
//!
//! Legacy transactions order accounts of equal signer and writable class by
//! their base58 text. The order compares case-insensitively first, then
//! prefers the lowercase rendering at the first position where the case
//! differs, then falls back to raw scalar order. Base58 text is plain ASCII
//! so no locale tables are involved.
use {crate::Address, core::cmp::Ordering};

/// Total order over addresses by their base58 renderings.
pub fn cmp_base58(a: &Address, b: &Address) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    cmp_collated(&a.to_base58(), &b.to_base58())
}

fn cmp_collated(a: &str, b: &str) -> Ordering {
    let folded = a
        .bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()));
    folded
        .then_with(|| cmp_case(a, b))
        .then_with(|| a.cmp(b))
}

/// Lowercase sorts before uppercase at the first position whose case differs.
fn cmp_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .zip(b.bytes())
        .find_map(|(x, y)| {
            match (x.is_ascii_lowercase(), y.is_ascii_lowercase()) {
                (true, false) if y.is_ascii_uppercase() => Some(Ordering::Less),
                (false, true) if x.is_ascii_uppercase() => Some(Ordering::Greater),
                _ => None,
            }
        })
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use {super::*, core::str::FromStr};

    #[test]
    fn test_digits_before_letters() {
        assert_eq!(cmp_collated("1", "a"), Ordering::Less);
        assert_eq!(cmp_collated("9", "A"), Ordering::Less);
    }

    #[test]
    fn test_case_insensitive_first() {
        assert_eq!(cmp_collated("aZ", "Ab"), Ordering::Greater);
        assert_eq!(cmp_collated("B", "a"), Ordering::Greater);
        assert_eq!(cmp_collated("b", "C"), Ordering::Less);
    }

    #[test]
    fn test_lowercase_wins_ties() {
        assert_eq!(cmp_collated("ab", "Ab"), Ordering::Less);
        assert_eq!(cmp_collated("aB", "ab"), Ordering::Greater);
        assert_eq!(cmp_collated("aB", "Ab"), Ordering::Less);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(cmp_collated("abc", "abcd"), Ordering::Less);
    }

    #[test]
    fn test_cmp_base58_case_variants() {
        let upper = Address::from_str("SysvarRecentB1ockHashes11111111111111111111").unwrap();
        let lower = Address::from_str("SysvarRecentB1ockhashes11111111111111111111").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(cmp_base58(&lower, &upper), Ordering::Less);
        assert_eq!(cmp_base58(&upper, &lower), Ordering::Greater);
        assert_eq!(cmp_base58(&upper, &upper), Ordering::Equal);
    }
}
