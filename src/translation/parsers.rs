/// True when `pat` sits in `bytes` starting at `idx`.
pub(super) fn at(bytes: &[u8], idx: usize, pat: &[u8]) -> bool {
    bytes.get(idx..idx + pat.len()) == Some(pat)
}

/// Opening delimiter of a Postgres dollar-quoted block (`$$` or `$tag$`) starting at `start`.
///
/// Tags follow identifier rules: letters and `_`, then also digits. `$1` is therefore a
/// placeholder, not a quote.
pub(super) fn dollar_delimiter(bytes: &[u8], start: usize) -> Option<&[u8]> {
    let tag_len = bytes[start + 1..]
        .iter()
        .enumerate()
        .take_while(|&(n, b)| b.is_ascii_alphabetic() || *b == b'_' || (n > 0 && b.is_ascii_digit()))
        .count();
    let close = start + 1 + tag_len;
    (bytes.get(close) == Some(&b'$')).then(|| &bytes[start..=close])
}
