use crate::mapping::SourcePosition;
use crate::parser::{entities, SourceChar};

const URL_SCHEMES: [&str; 6] = ["http://", "https://", "ftp://", "ftps://", "mailto:", "//"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Char(SourceChar),
    /// `[[`
    LinkOpen(SourcePosition),
    /// `]]`
    LinkClose(SourcePosition),
    Pipe(SourcePosition),
    /// `[` directly followed by a URL scheme
    ExternalOpen(SourcePosition),
    /// A lone `]`
    ExternalClose(SourcePosition),
}

impl Token {
    /// The source chars this token was scanned from
    pub fn literal(&self) -> Vec<SourceChar> {
        match *self {
            Token::Char(c) => vec![c],
            Token::LinkOpen(at) => doubled('[', at),
            Token::LinkClose(at) => doubled(']', at),
            Token::Pipe(at) => vec![SourceChar::new('|', at)],
            Token::ExternalOpen(at) => vec![SourceChar::new('[', at)],
            Token::ExternalClose(at) => vec![SourceChar::new(']', at)],
        }
    }
}

fn doubled(ch: char, at: SourcePosition) -> Vec<SourceChar> {
    vec![
        SourceChar::new(ch, at),
        SourceChar::new(ch, SourcePosition::new(at.line, at.column + 1)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Everything: links, external links, references, headings, emphasis, comments
    Full,
    /// Only `[[`, `]]` and `|`; all other markup is plain chars
    LinksOnly,
}

pub fn scan(chars: &[SourceChar], mode: ScanMode) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    let mut at_line_start = true;
    // (closing markers start, line end) of the heading being scanned
    let mut heading_tail: Option<(usize, usize)> = None;

    while i < chars.len() {
        let c = chars[i];

        if at_line_start {
            at_line_start = false;
            if mode == ScanMode::Full {
                if let Some((body_start, tail_start, end)) = heading_bounds(chars, i) {
                    heading_tail = Some((tail_start, end));
                    i = body_start;
                    continue;
                }
            }
        }

        if let Some((tail, end)) = heading_tail {
            if i >= end {
                heading_tail = None;
            } else if i >= tail {
                heading_tail = None;
                i = end;
                continue;
            }
        }

        let next = chars.get(i + 1).map(|n| n.ch);
        match (c.ch, next) {
            ('\n', _) => {
                tokens.push(Token::Char(c));
                at_line_start = true;
                i += 1;
            }
            ('[', Some('[')) => {
                tokens.push(Token::LinkOpen(c.position));
                i += 2;
            }
            (']', Some(']')) => {
                tokens.push(Token::LinkClose(c.position));
                i += 2;
            }
            ('|', _) => {
                tokens.push(Token::Pipe(c.position));
                i += 1;
            }
            _ if mode == ScanMode::LinksOnly => {
                tokens.push(Token::Char(c));
                i += 1;
            }
            ('[', _) if starts_with_scheme(chars, i + 1) => {
                tokens.push(Token::ExternalOpen(c.position));
                i += 1;
            }
            (']', _) => {
                tokens.push(Token::ExternalClose(c.position));
                i += 1;
            }
            ('\'', Some('\'')) => {
                while chars.get(i).is_some_and(|c| c.ch == '\'') {
                    i += 1;
                }
            }
            ('<', Some('!')) if starts_with(chars, i, "<!--") => {
                i = comment_end(chars, i + 4);
            }
            ('&', _) => match entities::decode_at(chars, i) {
                Some((decoded, end)) => {
                    let last = chars[end - 1].position;
                    tokens.push(Token::Char(SourceChar::spanning(decoded, c.position, last)));
                    i = end;
                }
                None => {
                    tokens.push(Token::Char(c));
                    i += 1;
                }
            },
            _ => {
                tokens.push(Token::Char(c));
                i += 1;
            }
        }
    }

    tokens
}

fn starts_with(chars: &[SourceChar], at: usize, needle: &str) -> bool {
    let mut index = at;
    for expected in needle.chars() {
        match chars.get(index) {
            Some(c) if c.ch.to_ascii_lowercase() == expected => index += 1,
            _ => return false,
        }
    }
    true
}

fn starts_with_scheme(chars: &[SourceChar], at: usize) -> bool {
    URL_SCHEMES
        .iter()
        .any(|scheme| starts_with(chars, at, scheme))
}

/// Index just past the `-->` closing a comment whose body starts at `from`
fn comment_end(chars: &[SourceChar], from: usize) -> usize {
    let mut i = from;
    while i < chars.len() {
        if starts_with(chars, i, "-->") {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

fn line_end(chars: &[SourceChar], from: usize) -> usize {
    chars[from..]
        .iter()
        .position(|c| c.ch == '\n')
        .map_or(chars.len(), |offset| from + offset)
}

/// For a heading line like `== Title ==` starting at `start`: the index of the
/// title's first char, the index where the closing markers begin and the line end.
fn heading_bounds(chars: &[SourceChar], start: usize) -> Option<(usize, usize, usize)> {
    if chars[start].ch != '=' {
        return None;
    }
    let eol = line_end(chars, start);
    let mut end = eol;
    while end > start && chars[end - 1].ch.is_whitespace() {
        end -= 1;
    }

    let line = &chars[start..end];
    let leading = line.iter().take_while(|c| c.ch == '=').count();
    let trailing = line.iter().rev().take_while(|c| c.ch == '=').count();
    let level = leading.min(trailing).min(6);
    if level == 0 || line.len() <= level * 2 {
        return None;
    }

    let mut body_start = start + level;
    let mut tail_start = end - level;
    while body_start < tail_start && matches!(chars[body_start].ch, ' ' | '\t') {
        body_start += 1;
    }
    while tail_start > body_start && matches!(chars[tail_start - 1].ch, ' ' | '\t') {
        tail_start -= 1;
    }
    (body_start < tail_start).then_some((body_start, tail_start, eol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::source_chars;

    fn scan_text(text: &str) -> String {
        scan(&source_chars(text), ScanMode::Full)
            .iter()
            .map(|token| match token {
                Token::Char(c) => c.ch.to_string(),
                Token::LinkOpen(_) => "<".to_string(),
                Token::LinkClose(_) => ">".to_string(),
                Token::Pipe(_) => "/".to_string(),
                Token::ExternalOpen(_) => "{".to_string(),
                Token::ExternalClose(_) => "}".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_link_tokens() {
        assert_eq!(scan_text("a [[b|c]] d"), "a <b/c> d");
    }

    #[test]
    fn test_external_link_needs_scheme() {
        assert_eq!(scan_text("[http://x.org y]"), "{http://x.org y}");
        assert_eq!(scan_text("[note]"), "[note}");
    }

    #[test]
    fn test_emphasis_and_comments_are_dropped() {
        assert_eq!(scan_text("''a'' '''b''' it's"), "a b it's");
        assert_eq!(scan_text("a<!-- hidden -->b"), "ab");
        assert_eq!(scan_text("a<!-- never closed"), "a");
    }

    #[test]
    fn test_headings_lose_their_markers() {
        assert_eq!(scan_text("== Beispiele ==\nText"), "Beispiele\nText");
        assert_eq!(scan_text("===Tief=== \n"), "Tief\n");
        assert_eq!(scan_text("a == b ==\n"), "a == b ==\n");
        assert_eq!(scan_text("====\n"), "====\n");
        assert_eq!(scan_text("== A<!--\n-->B ==\nC"), "== AB ==\nC");
    }

    #[test]
    fn test_heading_body_keeps_positions() {
        let tokens = scan(&source_chars("== Ab =="), ScanMode::Full);
        assert_eq!(
            tokens[0],
            Token::Char(SourceChar::new('A', SourcePosition::new(1, 4)))
        );
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_reference_keeps_ampersand_position() {
        let tokens = scan(&source_chars("a&amp;nbsp;b"), ScanMode::Full);
        assert_eq!(
            tokens,
            vec![
                Token::Char(SourceChar::new('a', SourcePosition::new(1, 1))),
                Token::Char(SourceChar::spanning(
                    ' ',
                    SourcePosition::new(1, 2),
                    SourcePosition::new(1, 11)
                )),
                Token::Char(SourceChar::new('b', SourcePosition::new(1, 12))),
            ]
        );
    }

    #[test]
    fn test_links_only_mode_leaves_other_markup() {
        let tokens = scan(&source_chars("''x'' [http://a b] &amp;"), ScanMode::LinksOnly);
        assert!(tokens.iter().all(|t| matches!(t, Token::Char(_))));
        assert_eq!(tokens.len(), 24);
    }

    #[test]
    fn test_literal_roundtrip_of_link_open() {
        let literal = Token::LinkOpen(SourcePosition::new(2, 5)).literal();
        assert_eq!(literal[1].position, SourcePosition::new(2, 6));
    }
}
