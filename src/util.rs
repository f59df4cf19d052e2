//! Small string helpers shared by the option parsers. Splitting must
//! respect parenthesis depth and quoting: `$orderby=Tags(Key='Sku
//! Number')/Value` contains both a space and a parenthesized predicate
//! that a naive split would tear apart.

/// Splits `s` at every occurrence of `sep` that is outside parentheses
/// and outside single- or double-quoted sections.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' if !in_single && !in_double => depth += 1,
            ')' if !in_single && !in_double => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !in_single && !in_double => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Byte index of the first occurrence of `target` outside quoted
/// sections, or `None`.
pub(crate) fn find_outside_quotes(s: &str, target: char) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;
    for (i, c) in s.char_indices() {
        match c {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c == target && !in_single && !in_double => return Some(i),
            _ => {}
        }
    }
    None
}

/// Decodes the `_x0020_` escape used by some producers for spaces in
/// property names (`part_x0020_number` -> `part number`).
pub(crate) fn decode_x0020(s: &str) -> String {
    s.replace("_x0020_", " ")
}

/// Strips one pair of surrounding single quotes, if present.
pub(crate) fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(s)
}
