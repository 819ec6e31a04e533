use crate::checker::RuleMatch;
use crate::error::{Error, Result};
use crate::mapping::{char_slice, PositionMap, SourcePosition, SourceText};
use std::sync::Arc;

/// Inserted before the matched text in context strings
pub const ERROR_MARKER_START: &str = "<span class=\"error\">";
/// Inserted after the matched text in context strings
pub const ERROR_MARKER_END: &str = "</span>";

/// One rule match combined with one of its suggested replacements (or none).
///
/// The matched plain-text span is projected back onto the original markup, so
/// context snippets show what the author actually wrote.
#[derive(Debug, Clone)]
pub struct RuleMatchApplication {
    original: Arc<SourceText>,
    plain_text: Arc<str>,
    /// Matched span in plain-text chars
    plain_start: usize,
    plain_end: usize,
    /// Char offsets of the matched span in the original text
    error_start: usize,
    error_end: usize,
    error_span: (SourcePosition, SourcePosition),
    replacement: Option<String>,
}

impl RuleMatchApplication {
    pub fn new(
        original: Arc<SourceText>,
        plain_text: Arc<str>,
        position_map: &PositionMap,
        rule_match: &RuleMatch,
        replacement: Option<String>,
    ) -> Result<Self> {
        let len = position_map.len();
        if rule_match.start > rule_match.end || rule_match.end > len {
            return Err(Error::InvalidSpan {
                start: rule_match.start,
                end: rule_match.end,
                len,
            });
        }

        // rule matches are zero-based and half-open, the map is one-based
        let (error_start, error_end, error_span) = if rule_match.start == rule_match.end {
            let at = insertion_point(&original, position_map, rule_match)?;
            let position = original.position_of(at);
            (at, at, (position, position))
        } else {
            let (first, _) = position_map.extent_for(rule_match.start + 1)?;
            let (_, last) = position_map.extent_for(rule_match.end)?;
            let error_start = original_offset(&original, first, rule_match)?;
            let error_end = original_offset(&original, last, rule_match)? + 1;
            (error_start, error_end, (first, last))
        };

        Ok(Self {
            original,
            plain_text,
            plain_start: rule_match.start,
            plain_end: rule_match.end,
            error_start,
            error_end,
            error_span,
            replacement,
        })
    }

    /// Whether this carries an actual correction rather than just marking the error
    pub fn has_real_replacement(&self) -> bool {
        self.real_replacement().is_some()
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Original positions of the first and the last matched char. For an empty
    /// match both are the insertion point.
    pub fn original_error_span(&self) -> (SourcePosition, SourcePosition) {
        self.error_span
    }

    /// The matched original text, marked, with `context_size` chars on each side
    pub fn original_error_context(&self, context_size: usize) -> String {
        let matched = self.original.slice(self.error_start, self.error_end);
        self.context(context_size, matched)
    }

    /// Like [`Self::original_error_context`], with the replacement applied.
    /// Without a real replacement both contexts are identical.
    pub fn corrected_error_context(&self, context_size: usize) -> String {
        match self.real_replacement() {
            Some(text) => self.context(context_size, text),
            None => self.original_error_context(context_size),
        }
    }

    /// The whole plain text with the correction applied and marked
    pub fn text_with_correction(&self) -> String {
        let plain_text: &str = &self.plain_text;
        let corrected = self
            .real_replacement()
            .unwrap_or_else(|| char_slice(plain_text, self.plain_start, self.plain_end));
        format!(
            "{}{}{}{}{}",
            char_slice(plain_text, 0, self.plain_start),
            ERROR_MARKER_START,
            corrected,
            ERROR_MARKER_END,
            char_slice(plain_text, self.plain_end, usize::MAX),
        )
    }

    fn real_replacement(&self) -> Option<&str> {
        self.replacement.as_deref().filter(|text| !text.is_empty())
    }

    fn context(&self, context_size: usize, middle: &str) -> String {
        let before = self
            .original
            .slice(self.error_start.saturating_sub(context_size), self.error_start);
        let after = self
            .original
            .slice(self.error_end, self.error_end.saturating_add(context_size));
        format!("{before}{ERROR_MARKER_START}{middle}{ERROR_MARKER_END}{after}")
    }
}

/// Original char offset an empty match inserts at: before the next plain
/// char, or just after the last one at the end of the text
fn insertion_point(
    original: &SourceText,
    position_map: &PositionMap,
    rule_match: &RuleMatch,
) -> Result<usize> {
    if rule_match.start < position_map.len() {
        let (first, _) = position_map.extent_for(rule_match.start + 1)?;
        return original_offset(original, first, rule_match);
    }
    if position_map.is_empty() {
        return Ok(0);
    }
    let (_, last) = position_map.extent_for(position_map.len())?;
    Ok(original_offset(original, last, rule_match)? + 1)
}
