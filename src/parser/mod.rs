pub mod entities;
pub mod links;
pub mod scanner;

use crate::config::Config;
use crate::mapping::{PositionMap, PositionMapBuilder, SourcePosition};
use links::{walk, LinkRules, Rendering};
use scanner::{scan, ScanMode};

/// One char of the original markup and where it sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChar {
    pub ch: char,
    pub position: SourcePosition,
    /// Last source char it was read from; differs from `position` for decoded references
    pub last: SourcePosition,
}

impl SourceChar {
    pub fn new(ch: char, position: SourcePosition) -> Self {
        Self {
            ch,
            position,
            last: position,
        }
    }

    /// A char standing for the source chars `position..=last`
    pub fn spanning(ch: char, position: SourcePosition, last: SourcePosition) -> Self {
        Self { ch, position, last }
    }
}

/// Split markup into chars with their 1-indexed line/column.
/// A newline belongs to the line it ends.
pub fn source_chars(markup: &str) -> Vec<SourceChar> {
    let mut chars = Vec::with_capacity(markup.len());
    let mut line = 1;
    let mut column = 1;
    for ch in markup.chars() {
        chars.push(SourceChar::new(ch, SourcePosition::new(line, column)));
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    chars
}

/// Plain text together with the position of every char in the original markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainTextMapping {
    pub plain_text: String,
    pub position_map: PositionMap,
}

/// Converts wiki markup into plain text suitable for language checking.
#[derive(Debug, Clone)]
pub struct MarkupFilter {
    rules: LinkRules,
}

impl Default for MarkupFilter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MarkupFilter {
    pub fn new(config: &Config) -> Self {
        Self {
            rules: LinkRules::new(config),
        }
    }

    /// Filter `markup` into plain text, recording each output char's origin
    pub fn filter(&self, markup: &str) -> PlainTextMapping {
        let chars = source_chars(markup);
        let tokens = scan(&chars, ScanMode::Full);
        let nodes = self.rules.resolve(&tokens, Rendering::PlainText);

        let mut joiner = LineJoiner::default();
        walk(nodes, |c| joiner.push(c));
        let (plain_text, position_map) = joiner.finish();

        tracing::debug!(
            source_chars = chars.len(),
            plain_chars = position_map.len(),
            "filtered markup"
        );
        PlainTextMapping {
            plain_text,
            position_map,
        }
    }

    /// Remove interlanguage and category links and reduce media links to
    /// `[[caption]]`, leaving every other piece of markup as written.
    pub fn strip_links(&self, markup: &str) -> String {
        let chars = source_chars(markup);
        let tokens = scan(&chars, ScanMode::LinksOnly);
        let nodes = self.rules.resolve(&tokens, Rendering::StripLinks);

        let mut out = String::with_capacity(markup.len());
        walk(nodes, |c| out.push(c.ch));
        out
    }
}

/// Joins soft-wrapped lines: one newline becomes a space, a blank line stays a
/// paragraph break (`\n\n`). Whitespace at either end of the text is dropped.
#[derive(Debug, Default)]
struct LineJoiner {
    builder: PositionMapBuilder,
    pending: Vec<SourceChar>,
}

impl LineJoiner {
    fn push(&mut self, c: SourceChar) {
        if c.ch.is_whitespace() {
            self.pending.push(c);
            return;
        }
        self.flush_pending();
        self.builder.push_spanning(c.ch, c.position, c.last);
    }

    fn flush_pending(&mut self) {
        if self.builder.is_empty() {
            self.pending.clear();
            return;
        }

        let newlines: Vec<SourceChar> = self
            .pending
            .iter()
            .filter(|c| c.ch == '\n')
            .copied()
            .collect();

        match newlines.len() {
            0 => {
                for c in self.pending.drain(..) {
                    self.builder.push_spanning(c.ch, c.position, c.last);
                }
            }
            1 => {
                for c in self.pending.drain(..) {
                    match c.ch {
                        '\r' => {}
                        '\n' => self.builder.push(' ', c.position),
                        other => self.builder.push_spanning(other, c.position, c.last),
                    }
                }
            }
            _ => {
                self.builder.push('\n', newlines[0].position);
                self.builder.push('\n', newlines[1].position);
            }
        }
        self.pending.clear();
    }

    fn finish(self) -> (String, PositionMap) {
        self.builder.finish()
    }
}
