//! UTF-16 code-unit arithmetic.
//!
//! The Docs API addresses every piece of content by UTF-16 code-unit
//! offsets: a BMP character is one unit, a supplementary-plane character
//! (emoji, rare CJK) is two. Rust strings are UTF-8, so every index that
//! crosses the API boundary goes through the helpers in this module.

/// Length of a string in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 code-unit offset into a byte offset.
///
/// Returns `None` if `units` is out of range or would land in the middle
/// of a surrogate pair.
pub fn utf16_to_byte(s: &str, units: usize) -> Option<usize> {
    if units == 0 {
        return Some(0);
    }
    let mut seen = 0usize;
    for (byte_idx, ch) in s.char_indices() {
        if seen == units {
            return Some(byte_idx);
        }
        if seen > units {
            return None;
        }
        seen += ch.len_utf16();
    }
    if seen == units { Some(s.len()) } else { None }
}

/// Slice a string by UTF-16 code-unit offsets.
///
/// Returns `None` if either offset is out of range or splits a surrogate
/// pair.
pub fn utf16_slice(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let b0 = utf16_to_byte(s, start)?;
    let b1 = utf16_to_byte(s, end)?;
    Some(&s[b0..b1])
}

/// Length of the longest common prefix of `a` and `b`, in UTF-16 units.
///
/// The prefix never ends between the two units of a surrogate pair, so
/// the result is always a valid split point in both strings.
pub fn common_prefix(a: &str, b: &str) -> usize {
    let mut units = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        units += ca.len_utf16();
    }
    units
}

/// Length of the longest common suffix of `a` and `b`, in UTF-16 units.
///
/// `limit` caps the suffix so it cannot overlap a prefix already matched
/// on either side.
pub fn common_suffix(a: &str, b: &str, limit: usize) -> usize {
    let mut units = 0;
    for (ca, cb) in a.chars().rev().zip(b.chars().rev()) {
        if ca != cb {
            break;
        }
        let next = units + ca.len_utf16();
        if next > limit {
            break;
        }
        units = next;
    }
    units
}
