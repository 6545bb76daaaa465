#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backticked,
    LineComment,
    BlockComment(u32),
    /// Holds the full `$tag$` delimiter.
    DollarQuoted(Vec<u8>),
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Scan a named-placeholder identifier starting at byte `start`.
///
/// Consumes every alphanumeric or underscore character (Unicode included) so that a
/// non-ASCII identifier is reported whole instead of being cut at the first foreign byte.
/// `start` must sit on a char boundary.
pub(super) fn scan_identifier(sql: &str, start: usize) -> (usize, &str) {
    let rest = &sql[start..];
    let len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(rest.len(), |(offset, _)| offset);
    (start + len, &rest[..len])
}

pub(super) fn is_valid_key(ident: &str) -> bool {
    !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
