// Truncate a &str to a byte budget at a char boundary (prefix)
#[inline]
pub fn take_bytes_at_char_boundary(s: &str, maxb: usize) -> &str {
    if s.len() <= maxb {
        return s;
    }
    let mut last_ok = 0;
    for (i, ch) in s.char_indices() {
        let nb = i + ch.len_utf8();
        if nb > maxb {
            break;
        }
        last_ok = nb;
    }
    &s[..last_ok]
}

/// Decode process output for display, replacing invalid UTF-8 and keeping at
/// most `maxb` bytes of the result.
pub fn lossy_prefix(bytes: &[u8], maxb: usize) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    take_bytes_at_char_boundary(&decoded, maxb).to_string()
}

/// Encode a repository identifier as a single path component.
///
/// `/` becomes `__` and `:` becomes `_`, so `owner/name` maps to
/// `owner__name`.
pub fn log_file_stem(identifier: &str) -> String {
    identifier.replace('/', "__").replace(':', "_")
}
