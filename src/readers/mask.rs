//! Prefix mask expansion for the prefix-list format
//!
//! A mask describes a set of literal prefixes:
//!
//! | Token      | Matches                         |
//! |------------|---------------------------------|
//! | `A`..`Z`, `0`..`9`, `/` | itself             |
//! | `#`        | any digit                       |
//! | `@`        | any letter                      |
//! | `?`        | any letter or digit             |
//! | `[AB0-3]`  | any listed character or range   |
//!
//! A mask may contain at most one of the wildcard tokens `#`, `@`, `?`.
//! Masks with more are rejected outright rather than partially expanded.
//! Character classes are unrestricted in count but the full expansion is
//! capped at [`MAX_EXPANSION`] literals.

use crate::error::MaskError;

/// Upper bound on the number of literal prefixes one mask may produce
pub const MAX_EXPANSION: usize = 10_000;

const DIGITS: &str = "0123456789";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Expand a single mask into the literal prefixes it denotes
pub fn expand_mask(mask: &str) -> Result<Vec<String>, MaskError> {
    let mask = mask.trim().to_ascii_uppercase();
    if mask.is_empty() {
        return Err(MaskError::Empty);
    }

    let positions = tokenize(&mask)?;

    let total = positions
        .iter()
        .try_fold(1usize, |acc, set| acc.checked_mul(set.len()))
        .unwrap_or(usize::MAX);
    if total > MAX_EXPANSION {
        return Err(MaskError::TooLarge(mask, MAX_EXPANSION));
    }

    let mut out: Vec<String> = vec![String::with_capacity(positions.len())];
    for set in &positions {
        let mut next = Vec::with_capacity(out.len() * set.len());
        for stem in &out {
            for c in set {
                let mut s = stem.clone();
                s.push(*c);
                next.push(s);
            }
        }
        out = next;
    }
    Ok(out)
}

/// Expand a comma-separated list of masks.
///
/// Good masks are expanded; bad ones are returned alongside so the caller can
/// log and skip them.
pub fn expand_mask_list(list: &str) -> (Vec<String>, Vec<MaskError>) {
    let mut prefixes = Vec::new();
    let mut errors = Vec::new();
    for mask in list.split(',').map(str::trim).filter(|m| !m.is_empty()) {
        match expand_mask(mask) {
            Ok(expanded) => prefixes.extend(expanded),
            Err(e) => errors.push(e),
        }
    }
    (prefixes, errors)
}

/// Turn a mask into one candidate character set per position
fn tokenize(mask: &str) -> Result<Vec<Vec<char>>, MaskError> {
    let mut positions: Vec<Vec<char>> = Vec::new();
    let mut wildcards = 0;
    let mut chars = mask.chars();

    while let Some(c) = chars.next() {
        match c {
            '#' | '@' | '?' => {
                wildcards += 1;
                if wildcards > 1 {
                    return Err(MaskError::MultipleWildcards(mask.to_string()));
                }
                let set = match c {
                    '#' => DIGITS.chars().collect(),
                    '@' => LETTERS.chars().collect(),
                    _ => LETTERS.chars().chain(DIGITS.chars()).collect(),
                };
                positions.push(set);
            }
            '[' => {
                let mut body = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    body.push(inner);
                }
                if !closed {
                    return Err(MaskError::UnclosedClass(mask.to_string()));
                }
                positions.push(parse_class(mask, &body)?);
            }
            c if c.is_ascii_alphanumeric() || c == '/' => positions.push(vec![c]),
            other => return Err(MaskError::InvalidChar(mask.to_string(), other)),
        }
    }

    Ok(positions)
}

/// Parse the inside of a `[...]` class, expanding `X-Y` ranges
fn parse_class(mask: &str, body: &str) -> Result<Vec<char>, MaskError> {
    let chars: Vec<char> = body.chars().collect();
    let mut set: Vec<char> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_alphanumeric() {
            return Err(if c == '-' {
                MaskError::BadRange(mask.to_string())
            } else {
                MaskError::InvalidChar(mask.to_string(), c)
            });
        }
        if i + 1 < chars.len() && chars[i + 1] == '-' {
            let end = *chars
                .get(i + 2)
                .ok_or_else(|| MaskError::BadRange(mask.to_string()))?;
            let same_kind = (c.is_ascii_digit() && end.is_ascii_digit())
                || (c.is_ascii_alphabetic() && end.is_ascii_alphabetic());
            if !same_kind || end < c {
                return Err(MaskError::BadRange(mask.to_string()));
            }
            for r in c..=end {
                if !set.contains(&r) {
                    set.push(r);
                }
            }
            i += 3;
        } else {
            if !set.contains(&c) {
                set.push(c);
            }
            i += 1;
        }
    }

    if set.is_empty() {
        return Err(MaskError::EmptyClass(mask.to_string()));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_mask() {
        assert_eq!(expand_mask("kh6").unwrap(), vec!["KH6"]);
        assert_eq!(expand_mask("VP2E").unwrap(), vec!["VP2E"]);
    }

    #[test]
    fn test_digit_wildcard() {
        let out = expand_mask("UA#").unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], "UA0");
        assert_eq!(out[9], "UA9");
    }

    #[test]
    fn test_letter_and_alnum_wildcards() {
        assert_eq!(expand_mask("K@").unwrap().len(), 26);
        let any = expand_mask("3D2?").unwrap();
        assert_eq!(any.len(), 36);
        assert!(any.contains(&"3D2C".to_string()));
        assert!(any.contains(&"3D27".to_string()));
    }

    #[test]
    fn test_class_and_range() {
        assert_eq!(
            expand_mask("K[A-C]4").unwrap(),
            vec!["KA4", "KB4", "KC4"]
        );
        assert_eq!(
            expand_mask("R[18]M").unwrap(),
            vec!["R1M", "R8M"]
        );
        let mixed = expand_mask("UA[0-2X]").unwrap();
        assert_eq!(mixed, vec!["UA0", "UA1", "UA2", "UAX"]);
    }

    #[test]
    fn test_class_with_wildcard_is_exact_product() {
        let out = expand_mask("R[A-B]#").unwrap();
        assert_eq!(out.len(), 20);
        assert_eq!(out.first().map(String::as_str), Some("RA0"));
        assert_eq!(out.last().map(String::as_str), Some("RB9"));
    }

    #[test]
    fn test_multiple_wildcards_rejected() {
        assert_eq!(
            expand_mask("K#@"),
            Err(MaskError::MultipleWildcards("K#@".to_string()))
        );
        assert!(matches!(expand_mask("##"), Err(MaskError::MultipleWildcards(_))));
        assert!(matches!(expand_mask("?A?"), Err(MaskError::MultipleWildcards(_))));
    }

    #[test]
    fn test_malformed_masks() {
        assert!(matches!(expand_mask("K[AB"), Err(MaskError::UnclosedClass(_))));
        assert!(matches!(expand_mask("K[]"), Err(MaskError::EmptyClass(_))));
        assert!(matches!(expand_mask("K[Z-A]"), Err(MaskError::BadRange(_))));
        assert!(matches!(expand_mask("K[A-5]"), Err(MaskError::BadRange(_))));
        assert!(matches!(expand_mask("K[A-]"), Err(MaskError::BadRange(_))));
        assert!(matches!(expand_mask("K*"), Err(MaskError::InvalidChar(_, '*'))));
        assert_eq!(expand_mask("  "), Err(MaskError::Empty));
    }

    #[test]
    fn test_expansion_cap() {
        assert!(matches!(
            expand_mask("[A-Z][A-Z][A-Z]#"),
            Err(MaskError::TooLarge(_, MAX_EXPANSION))
        ));
    }

    #[test]
    fn test_mask_list_keeps_good_masks() {
        let (prefixes, errors) = expand_mask_list("AH2, KH2,K##,NH2");
        assert_eq!(prefixes, vec!["AH2", "KH2", "NH2"]);
        assert_eq!(errors.len(), 1);
    }
}
