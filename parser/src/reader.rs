//! Character-level access to the input of the scanner.
//!
//! The [`Reader`] is the only component that looks at the input text directly. It keeps track of
//! the current position (index, line and column), offers lookahead, and builds token values
//! through its [`SliceBuilder`](slice::SliceBuilder).
//!
//! Byte streams are turned into text beforehand, with [`decode`].

mod encoding;
mod slice;

use std::{borrow::Cow, sync::Arc};

pub use encoding::{decode, encode, Encoding};

use crate::{
    char_traits::{is_blank_or_breakz, is_breakz, is_printable},
    error::DecodingError,
    token::Marker,
};
use slice::SliceBuilder;

/// The character [`Reader::peek`] returns past the end of the input.
///
/// The reader refuses inputs that contain `\0`, so this can never be mistaken for content.
pub const END_OF_INPUT: char = '\0';

/// The name given to inputs that were not given one.
pub const DEFAULT_SOURCE_NAME: &str = "<input>";

/// Lookahead and position tracking over a validated YAML text.
#[derive(Debug)]
pub struct Reader<'input> {
    /// The name of the source, for error messages.
    name: Arc<str>,
    /// The whole input.
    buffer: &'input str,
    /// The byte offset of the next character in `buffer`.
    pos: usize,
    /// The index (in chars) of the next character.
    index: usize,
    /// The line (0-indexed) of the next character.
    line: usize,
    /// The column (0-indexed) of the next character.
    col: usize,
    /// The encoding the input was decoded from.
    encoding: Encoding,
    /// The value of the token being scanned.
    slice: SliceBuilder<'input>,
}

impl<'input> Reader<'input> {
    /// Create a reader over `buffer`, named [`DEFAULT_SOURCE_NAME`].
    ///
    /// # Errors
    /// Returns an error if `buffer` holds a character YAML does not allow in a stream.
    pub fn new(buffer: &'input str) -> Result<Self, DecodingError> {
        Self::with_name(buffer, DEFAULT_SOURCE_NAME)
    }

    /// Create a reader over `buffer`, naming it `name` in error messages.
    ///
    /// # Errors
    /// Returns an error if `buffer` holds a character YAML does not allow in a stream.
    pub fn with_name(buffer: &'input str, name: impl Into<Arc<str>>) -> Result<Self, DecodingError> {
        let name = name.into();
        if let Some((position, c)) = buffer.chars().enumerate().find(|(_, c)| !is_printable(*c)) {
            return Err(DecodingError::new(
                name,
                position,
                format!(
                    "unacceptable character #x{:04x}: special characters are not allowed",
                    u32::from(c)
                ),
            ));
        }
        Ok(Self::unchecked(buffer, name))
    }

    /// Create a reader over an empty input.
    pub(crate) fn empty() -> Self {
        Self::unchecked("", DEFAULT_SOURCE_NAME.into())
    }

    fn unchecked(buffer: &'input str, name: Arc<str>) -> Self {
        Self {
            name,
            buffer,
            pos: 0,
            index: 0,
            line: 0,
            col: 0,
            encoding: Encoding::Utf8,
            slice: SliceBuilder::new(buffer),
        }
    }

    /// Record the encoding the input was decoded from.
    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Return the encoding the input was decoded from.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Return the name of the source.
    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    /// Return the position of the next character.
    #[must_use]
    pub fn mark(&self) -> Marker {
        Marker::new(self.index, self.line, self.col)
    }

    /// Return the index (in chars) of the next character.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the line (0-indexed) of the next character.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the column (0-indexed) of the next character.
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }

    /// Return whether the whole input has been consumed.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    /// Return the `n`-th next character, or `None` if the input ends before it.
    #[inline]
    #[must_use]
    pub fn peek_opt(&self, n: usize) -> Option<char> {
        self.buffer[self.pos..].chars().nth(n)
    }

    /// Return the next character, or [`END_OF_INPUT`] if there is none.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> char {
        self.buffer[self.pos..].chars().next().unwrap_or(END_OF_INPUT)
    }

    /// Return the `n`-th next character, or [`END_OF_INPUT`] if the input ends before it.
    #[inline]
    #[must_use]
    pub fn peek_nth(&self, n: usize) -> char {
        self.peek_opt(n).unwrap_or(END_OF_INPUT)
    }

    /// Return (at most) the next `n` characters, without consuming them.
    #[must_use]
    pub fn prefix(&self, n: usize) -> &'input str {
        let rest = &self.buffer[self.pos..];
        match rest.char_indices().nth(n) {
            Some((end, _)) => &rest[..end],
            None => rest,
        }
    }

    /// Check whether the next characters are `---` or `...`, followed by a blank or a break.
    #[must_use]
    pub fn next_is_document_indicator(&self) -> bool {
        self.next_is_document_start() || self.next_is_document_end()
    }

    /// Check whether the next characters are `---`, followed by a blank or a break.
    #[must_use]
    pub fn next_is_document_start(&self) -> bool {
        self.prefix(3) == "---" && is_blank_or_breakz(self.peek_nth(3))
    }

    /// Check whether the next characters are `...`, followed by a blank or a break.
    #[must_use]
    pub fn next_is_document_end(&self) -> bool {
        self.prefix(3) == "..." && is_blank_or_breakz(self.peek_nth(3))
    }

    /// Consume the next character.
    ///
    /// Every YAML line break (`\n`, `\r`, `\r\n`, NEL, LS, PS) moves the position to the next
    /// line. A BOM does not take a column.
    pub fn forward(&mut self) {
        let mut rest = self.buffer[self.pos..].chars();
        let Some(c) = rest.next() else {
            return;
        };
        self.pos += c.len_utf8();
        self.index += 1;
        match c {
            '\n' | '\u{85}' | '\u{2028}' | '\u{2029}' => {
                self.line += 1;
                self.col = 0;
            }
            '\r' if rest.next() != Some('\n') => {
                self.line += 1;
                self.col = 0;
            }
            '\u{FEFF}' => {}
            _ => self.col += 1,
        }
    }

    /// Consume the next `n` characters.
    pub fn forward_n(&mut self, n: usize) {
        for _ in 0..n {
            self.forward();
        }
    }

    /// Consume a line break, if there is one.
    ///
    /// `\r\n`, `\r`, `\n` and NEL are returned as `\n`. LS and PS are returned as is.
    pub fn read_break(&mut self) -> Option<char> {
        match self.peek() {
            '\r' if self.peek_nth(1) == '\n' => {
                self.forward_n(2);
                Some('\n')
            }
            '\r' | '\n' | '\u{85}' => {
                self.forward();
                Some('\n')
            }
            c @ ('\u{2028}' | '\u{2029}') => {
                self.forward();
                Some(c)
            }
            _ => None,
        }
    }

    /// Consume characters up to (excluding) the next line break or the end of the input.
    pub fn skip_to_break(&mut self) {
        while !is_breakz(self.peek()) {
            self.forward();
        }
    }

    /// Start building a new token value at the current position.
    pub fn slice_begin(&mut self) {
        self.slice.begin(self.pos);
    }

    /// Consume the next `n` characters, appending them to the token value.
    pub fn slice_take(&mut self, n: usize) {
        for _ in 0..n {
            let from = self.pos;
            self.forward();
            self.slice.push_input(from, self.pos);
        }
    }

    /// Append text that is not the next input to the token value.
    pub fn slice_push_str(&mut self, text: &str) {
        self.slice.push_str(text);
    }

    /// Append a character that is not the next input to the token value.
    pub fn slice_push_char(&mut self, c: char) {
        self.slice.push_char(c);
    }

    /// Return the length (in bytes) of the token value built so far.
    #[must_use]
    pub fn slice_len(&self) -> usize {
        self.slice.len()
    }

    /// Finish the token value.
    pub fn slice_finish(&mut self) -> Cow<'input, str> {
        self.slice.finish()
    }

    /// Start a transaction in the token value. See [`Reader::slice_commit`] and
    /// [`Reader::slice_revert`].
    pub fn slice_begin_transaction(&mut self) {
        self.slice.begin_transaction();
    }

    /// Keep what was appended to the token value since the last transaction started.
    pub fn slice_commit(&mut self) {
        self.slice.commit();
    }

    /// Drop what was appended to the token value since the last transaction started.
    pub fn slice_revert(&mut self) {
        self.slice.revert();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn is_document_start() {
        let reader = Reader::new("---\n").unwrap();
        assert!(reader.next_is_document_start());
        assert!(reader.next_is_document_indicator());
        let reader = Reader::new("---").unwrap();
        assert!(reader.next_is_document_start());
        let reader = Reader::new("--- ").unwrap();
        assert!(reader.next_is_document_start());
        let reader = Reader::new("---a").unwrap();
        assert!(!reader.next_is_document_start());
        let reader = Reader::new("--").unwrap();
        assert!(!reader.next_is_document_start());
    }

    #[test]
    pub fn is_document_end() {
        let reader = Reader::new("...\n").unwrap();
        assert!(reader.next_is_document_end());
        let reader = Reader::new("..").unwrap();
        assert!(!reader.next_is_document_end());
    }

    #[test]
    fn peeking_past_the_end() {
        let reader = Reader::new("ab").unwrap();
        assert_eq!(reader.peek_nth(1), 'b');
        assert_eq!(reader.peek_nth(2), END_OF_INPUT);
        assert_eq!(reader.peek_opt(2), None);
        assert_eq!(reader.prefix(10), "ab");
    }

    #[test]
    fn peeking_twice_is_idempotent() {
        let mut reader = Reader::new("a: \u{e9}t\u{e9}\n").unwrap();
        reader.forward_n(3);
        let first = (reader.peek(), reader.peek_nth(2), reader.prefix(3), reader.mark());
        let second = (reader.peek(), reader.peek_nth(2), reader.prefix(3), reader.mark());
        assert_eq!(first, second);
        assert_eq!(first.2, "\u{e9}t\u{e9}");
    }

    #[test]
    fn line_breaks_move_to_next_line() {
        let mut reader = Reader::new("a\r\nb\rc\u{85}d\u{2028}e").unwrap();
        let mut marks = vec![];
        while !reader.is_end() {
            if reader.read_break().is_none() {
                marks.push((reader.peek(), reader.line(), reader.col()));
                reader.forward();
            }
        }
        assert_eq!(
            marks,
            [('a', 0, 0), ('b', 1, 0), ('c', 2, 0), ('d', 3, 0), ('e', 4, 0)]
        );
        assert_eq!(reader.index(), 10);
    }

    #[test]
    fn rejects_non_printable() {
        let err = Reader::new("a: \u{7}").unwrap_err();
        assert_eq!(err.position(), 3);
        assert!(err.info().starts_with("unacceptable character #x0007"));
        assert!(Reader::new("a\0").is_err());
    }

    #[test]
    fn slices_borrow_when_contiguous() {
        let mut reader = Reader::new("abc def").unwrap();
        reader.slice_begin();
        reader.slice_take(3);
        reader.slice_begin_transaction();
        reader.slice_take(1);
        reader.slice_revert();
        let value = reader.slice_finish();
        assert_eq!(value, "abc");
        assert!(matches!(value, Cow::Borrowed(_)));
        assert_eq!(reader.peek(), 'd');
    }
}
