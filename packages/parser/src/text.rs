//! Character-offset access to a record's source text.
//!
//! Corpus offsets count characters, while Rust strings are indexed by
//! bytes. `SourceText` translates between the two so that slicing never
//! lands inside a multi-byte character.

use crate::types::Span;

/// Source text of one record, sliceable by character offsets.
#[derive(Debug, Clone)]
pub struct SourceText<'a> {
    text: &'a str,
    /// Byte offset of every character plus the total length; `None` for ASCII.
    boundaries: Option<Vec<usize>>,
}

impl<'a> SourceText<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let boundaries = if text.is_ascii() {
            None
        } else {
            let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
            offsets.push(text.len());
            Some(offsets)
        };

        Self { text, boundaries }
    }

    /// Length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.boundaries {
            Some(offsets) => offsets.len() - 1,
            None => self.text.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text between two character offsets.
    ///
    /// Out-of-range or inverted offsets yield an empty string.
    ///
    /// # Examples
    /// ```
    /// use s2orc_parser::text::SourceText;
    ///
    /// let source = SourceText::new("naïve text");
    /// assert_eq!(source.len(), 10);
    /// assert_eq!(source.slice(0, 5), "naïve");
    /// ```
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let range = match &self.boundaries {
            Some(offsets) => match (offsets.get(start), offsets.get(end)) {
                (Some(&s), Some(&e)) => s..e,
                _ => return "",
            },
            None => start..end,
        };

        self.text.get(range).unwrap_or_default()
    }

    /// Build a span for a character range.
    #[must_use]
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            text: self.slice(start, end).to_string(),
        }
    }
}
