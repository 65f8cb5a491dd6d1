//! Callsign normalisation and decomposition
//!
//! A logged callsign may carry a prefix of operation and/or a suffix:
//!
//! | Input          | Body    | Alternate |
//! |----------------|---------|-----------|
//! | `GM3ZZA`       | GM3ZZA  | -         |
//! | `W1AW/4`       | W1AW    | -         |
//! | `W1AW/MM`      | W1AW    | -         |
//! | `KH6/W1AW`     | W1AW    | KH6       |
//! | `W1AW/KH6`     | W1AW    | KH6       |
//! | `DL/W1AW/P`    | W1AW    | DL        |
//!
//! This is the only place callsigns are split; every reader and the resolver
//! share it.

/// Trailing segments that say how, not where, a station operates
pub const NON_GEOGRAPHIC_SUFFIXES: &[&str] = &["MM", "AM", "QRP"];

/// A callsign split into the part that carries the licence and an optional
/// short prefix of operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParts {
    pub body: String,
    pub alternate: Option<String>,
}

/// Uppercase and strip whitespace
pub fn normalize(call: &str) -> String {
    call.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A callsign may only contain letters, digits and `/`
pub fn is_well_formed(call: &str) -> bool {
    !call.is_empty() && call.chars().all(|c| c.is_ascii_alphanumeric() || c == '/')
}

/// Split a normalised callsign into body and alternate.
/// Returns `None` for calls that cannot be decomposed.
pub fn decompose(call: &str) -> Option<CallParts> {
    if !is_well_formed(call) {
        return None;
    }
    let segments: Vec<&str> = call.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        [body] => Some(CallParts {
            body: body.to_string(),
            alternate: None,
        }),
        [first, second] => {
            if second.len() == 1 || NON_GEOGRAPHIC_SUFFIXES.contains(second) {
                Some(CallParts {
                    body: first.to_string(),
                    alternate: None,
                })
            } else {
                Some(longer_and_shorter(first, second))
            }
        }
        // The third segment (usually /P or /M) is ignored
        [first, second, _] => Some(longer_and_shorter(first, second)),
        _ => None,
    }
}

/// The longer segment is the body; on a tie the first segment wins
fn longer_and_shorter(first: &str, second: &str) -> CallParts {
    let (body, alternate) = if first.len() >= second.len() {
        (first, second)
    } else {
        (second, first)
    };
    CallParts {
        body: body.to_string(),
        alternate: Some(alternate.to_string()),
    }
}

/// Leading substrings of `s` from longest (capped at `max_len`) to one char
pub fn prefixes_of(s: &str, max_len: usize) -> impl Iterator<Item = &str> {
    let longest = s.len().min(max_len);
    (1..=longest).rev().map(move |n| &s[..n])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(body: &str, alternate: Option<&str>) -> Option<CallParts> {
        Some(CallParts {
            body: body.to_string(),
            alternate: alternate.map(str::to_string),
        })
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" gm3zza "), "GM3ZZA");
        assert_eq!(normalize("ve1st/na14"), "VE1ST/NA14");
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(decompose("GM3ZZA"), parts("GM3ZZA", None));
    }

    #[test]
    fn test_short_or_non_geographic_suffix_is_dropped() {
        assert_eq!(decompose("W1AW/4"), parts("W1AW", None));
        assert_eq!(decompose("W1AW/P"), parts("W1AW", None));
        assert_eq!(decompose("W1AW/MM"), parts("W1AW", None));
        assert_eq!(decompose("W1AW/AM"), parts("W1AW", None));
        assert_eq!(decompose("G4ABC/QRP"), parts("G4ABC", None));
    }

    #[test]
    fn test_two_segments_longer_is_body() {
        assert_eq!(decompose("KH6/W1AW"), parts("W1AW", Some("KH6")));
        assert_eq!(decompose("W1AW/KH6"), parts("W1AW", Some("KH6")));
        assert_eq!(decompose("VE1ST/NA14"), parts("VE1ST", Some("NA14")));
        // tie: first segment is the body
        assert_eq!(decompose("F5AB/G3AB"), parts("F5AB", Some("G3AB")));
    }

    #[test]
    fn test_three_segments_ignore_third() {
        assert_eq!(decompose("DL/W1AW/P"), parts("W1AW", Some("DL")));
        assert_eq!(decompose("W1AW/VP9/M"), parts("W1AW", Some("VP9")));
    }

    #[test]
    fn test_undecodable() {
        assert_eq!(decompose(""), None);
        assert_eq!(decompose("W1AW/"), None);
        assert_eq!(decompose("/W1AW"), None);
        assert_eq!(decompose("A/B/C/D"), None);
        assert_eq!(decompose("W1-AW"), None);
    }

    #[test]
    fn test_prefixes_of() {
        let all: Vec<&str> = prefixes_of("GM3ZZA", 3).collect();
        assert_eq!(all, vec!["GM3", "GM", "G"]);
        let short: Vec<&str> = prefixes_of("KH6", 10).collect();
        assert_eq!(short, vec!["KH6", "KH", "K"]);
        assert_eq!(prefixes_of("X", 0).count(), 0);
    }
}
