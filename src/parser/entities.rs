use crate::parser::SourceChar;

/// Longest reference body we look at, e.g. `thetasym` or `#x1F600`
const MAX_REFERENCE_LEN: usize = 10;

/// Decode the character reference starting at `chars[start]` (an `&`).
///
/// Returns the decoded char and the index just past the reference. A reference
/// that decodes to `&` and is directly followed by another reference body is
/// decoded again, so `&amp;nbsp;` yields a single space.
pub fn decode_at(chars: &[SourceChar], start: usize) -> Option<(char, usize)> {
    let (mut decoded, mut end) = decode_body(chars, start + 1)?;
    while decoded == '&' {
        match decode_body(chars, end) {
            Some((next, next_end)) => {
                decoded = next;
                end = next_end;
            }
            None => break,
        }
    }
    Some((plain_char(decoded), end))
}

/// Decode `name;`, `#123;` or `#x7B;` beginning at `chars[start]`
fn decode_body(chars: &[SourceChar], start: usize) -> Option<(char, usize)> {
    let window = chars.get(start..)?;
    let semicolon = window
        .iter()
        .take(MAX_REFERENCE_LEN + 1)
        .position(|c| c.ch == ';')?;
    if semicolon == 0 {
        return None;
    }

    let body: String = window[..semicolon].iter().map(|c| c.ch).collect();
    let well_formed = match body.strip_prefix('#') {
        Some(number) => {
            let digits = number
                .strip_prefix('x')
                .or_else(|| number.strip_prefix('X'))
                .map_or((number, 10), |hex| (hex, 16));
            !digits.0.is_empty() && digits.0.chars().all(|c| c.is_digit(digits.1))
        }
        None => body.chars().all(|c| c.is_ascii_alphanumeric()),
    };
    if !well_formed {
        return None;
    }

    let reference = format!("&{};", body);
    let decoded = html_escape::decode_html_entities(&reference);
    let mut decoded_chars = decoded.chars();
    match (decoded_chars.next(), decoded_chars.next()) {
        (Some(ch), None) if decoded != reference => Some((ch, start + semicolon + 1)),
        _ => None,
    }
}

/// Non-breaking spaces are ordinary spaces in plain text
fn plain_char(ch: char) -> char {
    match ch {
        '\u{a0}' | '\u{202f}' | '\u{2007}' => ' ',
        other => other,
    }
}
