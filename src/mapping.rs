use crate::error::{Error, Result};

/// Position in the original markup (line and column numbers, both 1-indexed, in chars)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Maps every plain-text character back to the original position it came from.
///
/// Offsets passed to [`PositionMap::position_for`] are 1-based ("character
/// number N"), matching how rule matches are usually reported to users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionMap {
    positions: Vec<SourcePosition>,
    /// Last source position each char was read from
    lasts: Vec<SourcePosition>,
}

impl PositionMap {
    /// Original position of the plain-text character at `plain_offset` (1-based)
    pub fn position_for(&self, plain_offset: usize) -> Result<SourcePosition> {
        if plain_offset == 0 || plain_offset > self.positions.len() {
            return Err(Error::OutOfRange {
                offset: plain_offset,
                len: self.positions.len(),
            });
        }
        Ok(self.positions[plain_offset - 1])
    }

    /// First and last original position the char at `plain_offset` (1-based)
    /// was read from. Both are the same except for decoded character references.
    pub fn extent_for(&self, plain_offset: usize) -> Result<(SourcePosition, SourcePosition)> {
        let first = self.position_for(plain_offset)?;
        Ok((first, self.lasts[plain_offset - 1]))
    }

    /// Reverse lookup: the 1-based plain offset produced at exactly `position`.
    ///
    /// Returns `None` when the character at `position` was dropped by the filter.
    pub fn offset_for(&self, position: SourcePosition) -> Option<usize> {
        self.positions
            .binary_search(&position)
            .ok()
            .map(|index| index + 1)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// `(plain_offset, position)` pairs in plain-text order, offsets 1-based
    pub fn iter(&self) -> impl Iterator<Item = (usize, SourcePosition)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, position)| (index + 1, *position))
    }
}

/// Append-only builder: one record per emitted plain-text character.
#[derive(Debug, Default)]
pub struct PositionMapBuilder {
    text: String,
    positions: Vec<SourcePosition>,
    lasts: Vec<SourcePosition>,
}

impl PositionMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ch: char, position: SourcePosition) {
        self.push_spanning(ch, position, position);
    }

    /// Record a char read from the source chars `position..=last`
    pub fn push_spanning(&mut self, ch: char, position: SourcePosition, last: SourcePosition) {
        debug_assert!(
            self.lasts.last().map_or(true, |previous| *previous < position),
            "positions must be strictly increasing"
        );
        debug_assert!(position <= last);
        self.text.push(ch);
        self.positions.push(position);
        self.lasts.push(last);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn finish(self) -> (String, PositionMap) {
        (
            self.text,
            PositionMap {
                positions: self.positions,
                lasts: self.lasts,
            },
        )
    }
}

/// Line index over the original markup, translating positions to char offsets.
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    /// Char offset of the first char of each line
    line_starts: Vec<usize>,
    char_len: usize,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        let mut char_len = 0;
        for ch in text.chars() {
            char_len += 1;
            if ch == '\n' {
                line_starts.push(char_len);
            }
        }
        Self {
            text,
            line_starts,
            char_len,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Zero-based char offset of `position`, if it lies inside the text
    pub fn char_offset(&self, position: SourcePosition) -> Option<usize> {
        if position.line == 0 || position.column == 0 {
            return None;
        }
        let start = *self.line_starts.get(position.line - 1)?;
        let offset = start + position.column - 1;
        let line_end = self
            .line_starts
            .get(position.line)
            .copied()
            .unwrap_or(self.char_len);
        (offset < line_end).then_some(offset)
    }

    /// Position of the char at zero-based `offset`; `char_len` gives the
    /// position just past the last char
    pub fn position_of(&self, offset: usize) -> SourcePosition {
        let offset = offset.min(self.char_len);
        let line = self.line_starts.partition_point(|start| *start <= offset);
        SourcePosition::new(line, offset - self.line_starts[line - 1] + 1)
    }

    /// Substring between two char offsets, clamped to the text
    pub fn slice(&self, start: usize, end: usize) -> &str {
        char_slice(&self.text, start, end)
    }
}

/// Substring of `text` between char offsets `start..end`, clamped to its length.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |char_offset: usize| {
        text.char_indices()
            .nth(char_offset)
            .map_or(text.len(), |(index, _)| index)
    };
    let start_byte = byte_at(start);
    let end_byte = byte_at(end.max(start));
    &text[start_byte..end_byte]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(text: &str) -> (String, PositionMap) {
        let mut builder = PositionMapBuilder::new();
        for (index, ch) in text.chars().enumerate() {
            builder.push(ch, SourcePosition::new(1, index + 1));
        }
        builder.finish()
    }

    #[test]
    fn test_position_for_is_one_based() {
        let (text, map) = map_of("abc");
        assert_eq!(text, "abc");
        assert_eq!(map.position_for(1).unwrap(), SourcePosition::new(1, 1));
        assert_eq!(map.position_for(3).unwrap(), SourcePosition::new(1, 3));
    }

    #[test]
    fn test_position_for_out_of_range() {
        let (_, map) = map_of("abc");
        assert!(matches!(
            map.position_for(0),
            Err(Error::OutOfRange { offset: 0, len: 3 })
        ));
        assert!(matches!(
            map.position_for(4),
            Err(Error::OutOfRange { offset: 4, len: 3 })
        ));
    }

    #[test]
    fn test_empty_map_rejects_everything() {
        let map = PositionMap::default();
        assert!(map.is_empty());
        assert!(map.position_for(1).is_err());
    }

    #[test]
    fn test_offset_for_reverse_lookup() {
        let mut builder = PositionMapBuilder::new();
        builder.push('a', SourcePosition::new(1, 3));
        builder.push(' ', SourcePosition::new(1, 9));
        builder.push('b', SourcePosition::new(2, 1));
        let (_, map) = builder.finish();

        assert_eq!(map.offset_for(SourcePosition::new(1, 9)), Some(2));
        assert_eq!(map.offset_for(SourcePosition::new(2, 1)), Some(3));
        assert_eq!(map.offset_for(SourcePosition::new(1, 4)), None);
    }

    #[test]
    fn test_extent_of_decoded_reference() {
        let mut builder = PositionMapBuilder::new();
        builder.push('a', SourcePosition::new(1, 1));
        builder.push_spanning(' ', SourcePosition::new(1, 2), SourcePosition::new(1, 11));
        builder.push('b', SourcePosition::new(1, 12));
        let (_, map) = builder.finish();

        assert_eq!(
            map.extent_for(2).unwrap(),
            (SourcePosition::new(1, 2), SourcePosition::new(1, 11))
        );
        assert_eq!(
            map.extent_for(3).unwrap(),
            (SourcePosition::new(1, 12), SourcePosition::new(1, 12))
        );
        assert!(map.extent_for(4).is_err());
    }

    #[test]
    fn test_iter_yields_one_based_offsets() {
        let (_, map) = map_of("xy");
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(
            entries,
            vec![(1, SourcePosition::new(1, 1)), (2, SourcePosition::new(1, 2))]
        );
    }

    #[test]
    fn test_source_text_char_offsets() {
        let source = SourceText::new("ab\ncdé\n\nf");
        assert_eq!(source.char_offset(SourcePosition::new(1, 1)), Some(0));
        assert_eq!(source.char_offset(SourcePosition::new(1, 3)), Some(2)); // the newline
        assert_eq!(source.char_offset(SourcePosition::new(2, 3)), Some(5));
        assert_eq!(source.char_offset(SourcePosition::new(3, 1)), Some(7));
        assert_eq!(source.char_offset(SourcePosition::new(4, 1)), Some(8));
        assert_eq!(source.char_offset(SourcePosition::new(1, 4)), None);
        assert_eq!(source.char_offset(SourcePosition::new(5, 1)), None);
    }

    #[test]
    fn test_source_text_position_of() {
        let source = SourceText::new("ab\ncdé\n\nf");
        assert_eq!(source.position_of(0), SourcePosition::new(1, 1));
        assert_eq!(source.position_of(2), SourcePosition::new(1, 3));
        assert_eq!(source.position_of(5), SourcePosition::new(2, 3));
        assert_eq!(source.position_of(8), SourcePosition::new(4, 1));
        assert_eq!(source.position_of(9), SourcePosition::new(4, 2));
        assert_eq!(source.position_of(42), SourcePosition::new(4, 2));
    }

    #[test]
    fn test_char_slice_handles_multibyte() {
        assert_eq!(char_slice("Gaudí mentre", 3, 7), "dí m");
        assert_eq!(char_slice("abc", 1, 10), "bc");
        assert_eq!(char_slice("abc", 2, 1), "");
    }
}
