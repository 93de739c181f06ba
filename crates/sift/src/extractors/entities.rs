// ABOUTME: HTML entity unescaping applied to every extracted value.
// ABOUTME: Single-pass decoder over the full HTML5 named table plus decimal and hex references.

use html5ever::data::{C1_REPLACEMENTS, NAMED_ENTITIES};

/// Longest named reference in the HTML5 table, including the trailing `;`.
const MAX_NAMED_LEN: usize = 32;

/// Decodes HTML character references in `s`.
///
/// Named references use the HTML5 table, including the legacy forms that
/// may omit the trailing `;` (`&eacute`, `&amp`). Numeric references may
/// also omit it. Each reference is decoded at most once, so `&amp;lt;`
/// becomes `&lt;`. Malformed or unknown references are copied through.
pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let body = &rest[amp + 1..];
        match decode_reference(body, &mut out) {
            Some(consumed) => rest = &body[consumed..],
            None => {
                out.push('&');
                rest = body;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decodes the reference following an `&`, appending it to `out`.
///
/// Returns the number of bytes of `body` consumed.
fn decode_reference(body: &str, out: &mut String) -> Option<usize> {
    match body.strip_prefix('#') {
        Some(num) => decode_numeric(num, out).map(|n| n + 1),
        None => decode_named(body, out),
    }
}

fn decode_named(body: &str, out: &mut String) -> Option<usize> {
    let name_len = body
        .bytes()
        .take(MAX_NAMED_LEN)
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    if name_len == 0 {
        return None;
    }
    let with_semi = name_len + usize::from(body[name_len..].starts_with(';'));

    // Exact match first, then the longest legacy prefix (`&eacutex` is `éx`).
    let exact = std::iter::once(with_semi);
    let prefixes = (2..with_semi).rev();
    for len in exact.chain(prefixes) {
        if let Some(&(first, second)) = NAMED_ENTITIES.get(&body[..len]) {
            // The table also holds every key prefix, mapped to zero.
            if first == 0 {
                continue;
            }
            out.extend(char::from_u32(first));
            if second != 0 {
                out.extend(char::from_u32(second));
            }
            return Some(len);
        }
    }
    None
}

fn decode_numeric(num: &str, out: &mut String) -> Option<usize> {
    let (radix, prefix) = match num.as_bytes().first() {
        Some(b'x') | Some(b'X') => (16, 1),
        _ => (10, 0),
    };
    let digits = num[prefix..]
        .bytes()
        .take_while(|b| (*b as char).is_digit(radix))
        .count();
    if digits == 0 {
        return None;
    }

    let code = num[prefix..prefix + digits]
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0u32, |acc, d| acc.saturating_mul(radix).saturating_add(d));
    out.push(numeric_char(code));

    let end = prefix + digits;
    Some(end + usize::from(num[end..].starts_with(';')))
}

/// Maps a numeric reference to the character an HTML5 parser would produce.
fn numeric_char(code: u32) -> char {
    match code {
        0x80..=0x9f => C1_REPLACEMENTS[(code - 0x80) as usize]
            .or_else(|| char::from_u32(code))
            .unwrap_or('\u{fffd}'),
        0 => '\u{fffd}',
        _ => char::from_u32(code).unwrap_or('\u{fffd}'),
    }
}
