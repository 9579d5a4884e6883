//! Home to the YAML Scanner.
//!
//! The scanner is the lowest-level parsing utility. It is the lexer / tokenizer, reading input a
//! character at a time and emitting tokens that can later be interpreted by the [`crate::parser`]
//! to check for more context and validity.
//!
//! Due to the grammar of YAML, the scanner has to have some context and is not error-free.
//!
//! Simple keys (mapping keys not introduced by `?`) are the reason the scanner needs lookahead:
//! the `KEY` token has to be emitted before the key, but the scanner only knows it was one when it
//! reaches the `:` that follows it. Each flow level keeps one candidate key, and tokens stay in the
//! queue until every candidate that could still precede them is resolved.

use std::{borrow::Cow, collections::VecDeque};

use crate::{
    char_traits::{
        as_hex, is_alpha, is_blank, is_blank_or_breakz, is_bom, is_break, is_breakz, is_digit,
        is_flow, is_flow_uri_char, is_hex, is_uri_char,
    },
    error::ScanError,
    reader::Reader,
    token::{Marker, ScalarStyle, Span, Token, TokenType},
};

/// How far (in characters) a simple key may be from the `:` that ends it.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

/// A possible simple key.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
struct SimpleKey {
    /// Whether the token this key points to is still a candidate.
    possible: bool,
    /// Whether the key must be one. A required key that cannot be resolved is an error.
    required: bool,
    /// The number of the token (counted from the start of the stream) the key would precede.
    token_number: usize,
    /// Where the key starts.
    mark: Marker,
}

impl SimpleKey {
    fn new() -> SimpleKey {
        SimpleKey {
            possible: false,
            required: false,
            token_number: 0,
            mark: Marker::default(),
        }
    }
}

/// The chomping indicator of a block scalar.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum Chomping {
    /// `-`: drop the final line break and trailing empty lines.
    Strip,
    /// Default: keep the final line break, drop trailing empty lines.
    Clip,
    /// `+`: keep the final line break and trailing empty lines.
    Keep,
}

type ScanResult = Result<(), ScanError>;

/// The YAML scanner.
///
/// This corresponds to the low-level interface when reading YAML. The scanner emits token as they
/// are read (akin to a lexer), but it also holds sufficient context to be able to disambiguate
/// some of the constructs. It has understanding of indentation and whitespace and is able to
/// generate error messages for some invalid YAML constructs.
///
/// It is however not a full parser and needs [`crate::parser::Parser`] to fully detect invalid
/// YAML documents.
#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct Scanner<'input> {
    /// The input source.
    reader: Reader<'input>,
    /// Tokens scanned but not yet handed out.
    tokens: VecDeque<Token<'input>>,
    /// The error that stopped the scanner, if any.
    error: Option<ScanError>,
    /// Whether we have already emitted the `StreamStart` token.
    stream_start_produced: bool,
    /// Whether the `StreamEnd` token was queued.
    stream_end_fetched: bool,
    /// Whether we have already handed out the `StreamEnd` token.
    stream_end_produced: bool,
    /// The number of tokens handed out so far.
    tokens_parsed: usize,
    /// Whether a simple key could start at the current position.
    simple_key_allowed: bool,
    /// Whether the last token of the line is a block indicator (`-`, `?` or `:`).
    ///
    /// Tabs following one separate it from the next token rather than indent it.
    after_block_indicator: bool,
    /// The candidate simple keys, indexed by flow level.
    simple_keys: Vec<SimpleKey>,
    /// The current indentation level, `-1` outside of any block collection.
    indent: isize,
    /// The enclosing indentation levels.
    indents: Vec<isize>,
    /// The number of unclosed `[` and `{`.
    flow_level: usize,
    /// Where the unclosed `[` and `{` are.
    flow_marks: Vec<Marker>,
}

impl<'input> Scanner<'input> {
    /// Create a new scanner reading from the given reader.
    pub fn new(reader: Reader<'input>) -> Scanner<'input> {
        Scanner {
            reader,
            tokens: VecDeque::new(),
            error: None,
            stream_start_produced: false,
            stream_end_fetched: false,
            stream_end_produced: false,
            tokens_parsed: 0,
            simple_key_allowed: true,
            after_block_indicator: false,
            simple_keys: vec![SimpleKey::new()],
            indent: -1,
            indents: Vec::new(),
            flow_level: 0,
            flow_marks: Vec::new(),
        }
    }

    /// Get a copy of the last error that was encountered, if any.
    ///
    /// This does not clear the error state and further calls to [`Self::get_error`] will return
    /// (a clone of) the same error.
    #[inline]
    #[must_use]
    pub fn get_error(&self) -> Option<ScanError> {
        self.error.clone()
    }

    /// Return the current position of the scanner in the input.
    #[must_use]
    pub fn mark(&self) -> Marker {
        self.reader.mark()
    }

    /// Return the reader the scanner reads from.
    #[must_use]
    pub fn reader(&self) -> &Reader<'input> {
        &self.reader
    }

    /// Return the next token, or `None` once the `StreamEnd` token has been handed out.
    ///
    /// # Errors
    /// Returns the error that prevented the next token from being scanned. Once an error has been
    /// returned, every further call returns it again.
    pub fn next_token(&mut self) -> Result<Option<Token<'input>>, ScanError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.stream_end_produced {
            return Ok(None);
        }
        if let Err(error) = self.fetch_more_tokens() {
            self.error = Some(error.clone());
            return Err(error);
        }
        let Some(token) = self.tokens.pop_front() else {
            return Ok(None);
        };
        self.tokens_parsed += 1;
        if let TokenType::StreamEnd = token.1 {
            self.stream_end_produced = true;
        }
        debug_print!(
            "  \x1B[;32m\u{21B3} {:?} \x1B[;36m{:?}\x1B[;m",
            token.1,
            token.0
        );
        Ok(Some(token))
    }

    /// Return the next token without consuming it.
    ///
    /// # Errors
    /// Returns the error that prevented the next token from being scanned.
    pub fn peek_token(&mut self) -> Result<Option<&Token<'input>>, ScanError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.stream_end_produced {
            return Ok(None);
        }
        if let Err(error) = self.fetch_more_tokens() {
            self.error = Some(error.clone());
            return Err(error);
        }
        Ok(self.tokens.front())
    }

    fn error(&self, mark: Marker, info: impl Into<String>) -> ScanError {
        ScanError::new(self.reader.name().clone(), mark, info)
    }

    /// Build an error at the current position that happened within the construct starting at
    /// `context_mark`.
    fn error_in(&self, context: &str, context_mark: Marker, info: impl Into<String>) -> ScanError {
        self.error(self.reader.mark(), info)
            .with_context(context, context_mark)
    }

    /// Fetch tokens until the first one in the queue can no longer be preceded by a `KEY`.
    fn fetch_more_tokens(&mut self) -> ScanResult {
        loop {
            if self.stream_end_fetched {
                break;
            }
            let mut need_more = self.tokens.is_empty();
            if !need_more {
                self.stale_simple_keys()?;
                need_more = self
                    .simple_keys
                    .iter()
                    .any(|sk| sk.possible && sk.token_number == self.tokens_parsed);
            }
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        Ok(())
    }

    fn fetch_next_token(&mut self) -> ScanResult {
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.col_isize());

        if self.reader.is_end() {
            return self.fetch_stream_end();
        }

        let c = self.reader.peek();
        let nc = self.reader.peek_nth(1);
        let at_line_start = self.reader.col() == 0;
        match c {
            '%' if at_line_start => self.fetch_directive(),
            '-' if at_line_start && self.reader.next_is_document_start() => {
                self.fetch_document_indicator(TokenType::DocumentStart)
            }
            '.' if at_line_start && self.reader.next_is_document_end() => {
                self.fetch_document_indicator(TokenType::DocumentEnd)
            }
            '[' => self.fetch_flow_collection_start(TokenType::FlowSequenceStart),
            '{' => self.fetch_flow_collection_start(TokenType::FlowMappingStart),
            ']' => self.fetch_flow_collection_end(TokenType::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenType::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if is_blank_or_breakz(nc) => self.fetch_block_entry(),
            '?' if self.flow_level > 0 || is_blank_or_breakz(nc) => self.fetch_key(),
            ':' if self.flow_level > 0 || is_blank_or_breakz(nc) => self.fetch_value(),
            '*' => self.fetch_anchor(true),
            '&' => self.fetch_anchor(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level == 0 => self.fetch_block_scalar(true),
            '>' if self.flow_level == 0 => self.fetch_block_scalar(false),
            '\'' => self.fetch_flow_scalar(true),
            '"' => self.fetch_flow_scalar(false),
            _ if self.check_plain() => self.fetch_plain_scalar(),
            _ => Err(self.error_in(
                "while scanning for the next token",
                self.reader.mark(),
                format!("found character {c:?} that cannot start any token"),
            )),
        }
    }

    /// Check whether the next character can start a plain scalar.
    fn check_plain(&self) -> bool {
        let c = self.reader.peek();
        let starts_indicator = is_blank_or_breakz(c)
            || matches!(
                c,
                '-' | '?'
                    | ':'
                    | ','
                    | '['
                    | ']'
                    | '{'
                    | '}'
                    | '#'
                    | '&'
                    | '*'
                    | '!'
                    | '|'
                    | '>'
                    | '\''
                    | '"'
                    | '%'
                    | '@'
                    | '`'
            );
        !starts_indicator
            || (!is_blank_or_breakz(self.reader.peek_nth(1))
                && (c == '-' || (self.flow_level == 0 && matches!(c, '?' | ':'))))
    }

    fn col_isize(&self) -> isize {
        isize::try_from(self.reader.col()).unwrap_or(isize::MAX)
    }

    /// Skip whitespace, comments and line breaks up to the next token.
    ///
    /// Tabs are only skipped where they cannot be mistaken for indentation: in flow context,
    /// after a block indicator, or where no simple key may start.
    fn scan_to_next_token(&mut self) -> ScanResult {
        if self.reader.index() == 0 && is_bom(self.reader.peek()) {
            self.reader.forward();
        }
        loop {
            loop {
                match self.reader.peek() {
                    ' ' => self.reader.forward(),
                    '\t' if self.flow_level > 0
                        || self.after_block_indicator
                        || !self.simple_key_allowed =>
                    {
                        self.reader.forward();
                    }
                    _ => break,
                }
            }
            if self.reader.peek() == '#' {
                self.reader.skip_to_break();
            }
            if self.reader.read_break().is_some() {
                self.after_block_indicator = false;
                if self.flow_level == 0 {
                    self.simple_key_allowed = true;
                }
            } else {
                break;
            }
        }
        self.after_block_indicator = false;
        Ok(())
    }

    /// Drop simple key candidates that can no longer be followed by their `:`.
    fn stale_simple_keys(&mut self) -> ScanResult {
        let line = self.reader.line();
        let index = self.reader.index();
        for sk in &mut self.simple_keys {
            if sk.possible
                && (sk.mark.line() < line || sk.mark.index() + MAX_SIMPLE_KEY_LENGTH < index)
            {
                if sk.required {
                    return Err(ScanError::new(
                        self.reader.name().clone(),
                        self.reader.mark(),
                        "could not find expected ':'",
                    )
                    .with_context("while scanning a simple key", sk.mark));
                }
                sk.possible = false;
            }
        }
        Ok(())
    }

    /// Record the next token as a possible simple key.
    fn save_simple_key(&mut self) -> ScanResult {
        if self.simple_key_allowed {
            let required = self.flow_level == 0 && self.indent == self.col_isize();
            let sk = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.reader.mark(),
            };
            self.remove_simple_key()?;
            if let Some(last) = self.simple_keys.last_mut() {
                *last = sk;
            }
        }
        Ok(())
    }

    /// Drop the simple key candidate of the current flow level.
    fn remove_simple_key(&mut self) -> ScanResult {
        let mark = self.reader.mark();
        let name = self.reader.name();
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return Err(ScanError::new(name.clone(), mark, "could not find expected ':'")
                    .with_context("while scanning a simple key", last.mark));
            }
            last.possible = false;
        }
        Ok(())
    }

    /// Open a block collection at column `col` if it is deeper than the current indentation.
    ///
    /// The start token is queued, or inserted before the token numbered `number`.
    fn roll_indent(
        &mut self,
        col: usize,
        number: Option<usize>,
        token: TokenType<'input>,
        mark: Marker,
    ) {
        if self.flow_level > 0 {
            return;
        }
        let col = isize::try_from(col).unwrap_or(isize::MAX);
        if self.indent < col {
            self.indents.push(self.indent);
            self.indent = col;
            let token = Token(Span::empty(mark), token);
            match number {
                Some(n) => self.tokens.insert(n - self.tokens_parsed, token),
                None => self.tokens.push_back(token),
            }
        }
    }

    /// Close the block collections that are deeper than `col`.
    fn unroll_indent(&mut self, col: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > col {
            let mark = self.reader.mark();
            self.tokens
                .push_back(Token(Span::empty(mark), TokenType::BlockEnd));
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark();
        self.indent = -1;
        self.stream_start_produced = true;
        self.simple_key_allowed = true;
        self.tokens.push_back(Token(
            Span::empty(mark),
            TokenType::StreamStart(self.reader.encoding()),
        ));
    }

    fn fetch_stream_end(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        if let Some(&flow_mark) = self.flow_marks.last() {
            return Err(self.error_in(
                "while scanning a flow collection",
                flow_mark,
                "found unexpected end of stream",
            ));
        }
        self.simple_key_allowed = false;
        for sk in &mut self.simple_keys {
            sk.possible = false;
        }
        let mark = self.reader.mark();
        self.tokens
            .push_back(Token(Span::empty(mark), TokenType::StreamEnd));
        self.stream_end_fetched = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        self.reader.forward();

        let name = self.scan_directive_name(start_mark)?;
        let kind = match name.as_ref() {
            "YAML" => {
                let (major, minor) = self.scan_version_directive_value(start_mark)?;
                TokenType::VersionDirective(major, minor)
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
                TokenType::TagDirective(handle, prefix)
            }
            _ => {
                self.reader.skip_to_break();
                TokenType::ReservedDirective(name)
            }
        };
        let end_mark = self.reader.mark();
        self.scan_directive_ignored_line(start_mark)?;
        Ok(Token(Span::new(start_mark, end_mark), kind))
    }

    fn scan_directive_name(&mut self, start_mark: Marker) -> Result<Cow<'input, str>, ScanError> {
        self.reader.slice_begin();
        while is_alpha(self.reader.peek()) {
            self.reader.slice_take(1);
        }
        let c = self.reader.peek();
        if self.reader.slice_len() == 0 || !is_blank_or_breakz(c) {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected alphabetic or numeric character, but found {c:?}"),
            ));
        }
        Ok(self.reader.slice_finish())
    }

    fn skip_blanks(&mut self) {
        while is_blank(self.reader.peek()) {
            self.reader.forward();
        }
    }

    fn scan_version_directive_value(&mut self, start_mark: Marker) -> Result<(u32, u32), ScanError> {
        self.skip_blanks();
        let major = self.scan_version_directive_number(start_mark)?;
        if self.reader.peek() != '.' {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected a digit or '.', but found {:?}", self.reader.peek()),
            ));
        }
        self.reader.forward();
        let minor = self.scan_version_directive_number(start_mark)?;
        if !is_blank_or_breakz(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected a digit or ' ', but found {:?}", self.reader.peek()),
            ));
        }
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Marker) -> Result<u32, ScanError> {
        let mut value: u32 = 0;
        let mut length = 0;
        while let Some(digit) = self.reader.peek().to_digit(10) {
            length += 1;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    self.error_in(
                        "while scanning a directive",
                        start_mark,
                        "found extremely long version number",
                    )
                })?;
            self.reader.forward();
        }
        if length == 0 {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected a digit, but found {:?}", self.reader.peek()),
            ));
        }
        Ok(value)
    }

    fn scan_tag_directive_value(
        &mut self,
        start_mark: Marker,
    ) -> Result<(Cow<'input, str>, Cow<'input, str>), ScanError> {
        self.skip_blanks();
        let handle = self.scan_tag_handle(true, start_mark)?;
        if !is_blank(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected ' ', but found {:?}", self.reader.peek()),
            ));
        }
        self.skip_blanks();
        let prefix = self.scan_tag_uri(true, true, start_mark)?;
        if !is_blank_or_breakz(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!("expected ' ', but found {:?}", self.reader.peek()),
            ));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start_mark: Marker) -> ScanResult {
        self.skip_blanks();
        if self.reader.peek() == '#' {
            self.reader.skip_to_break();
        }
        if !is_breakz(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a directive",
                start_mark,
                format!(
                    "expected a comment or a line break, but found {:?}",
                    self.reader.peek()
                ),
            ));
        }
        self.reader.read_break();
        Ok(())
    }

    /// Scan a tag handle: `!`, `!!` or `!name!`.
    ///
    /// Outside of a directive, this is only called when the handle is known to end with a `!`.
    fn scan_tag_handle(
        &mut self,
        directive: bool,
        start_mark: Marker,
    ) -> Result<Cow<'input, str>, ScanError> {
        let context = if directive {
            "while scanning a directive"
        } else {
            "while scanning a tag"
        };
        if self.reader.peek() != '!' {
            return Err(self.error_in(
                context,
                start_mark,
                format!("expected '!', but found {:?}", self.reader.peek()),
            ));
        }
        self.reader.slice_begin();
        self.reader.slice_take(1);
        if !is_blank(self.reader.peek()) {
            while is_alpha(self.reader.peek()) {
                self.reader.slice_take(1);
            }
            if self.reader.peek() == '!' {
                self.reader.slice_take(1);
            } else if directive && self.reader.slice_len() > 1 {
                return Err(self.error_in(
                    context,
                    start_mark,
                    format!("expected '!', but found {:?}", self.reader.peek()),
                ));
            }
        }
        Ok(self.reader.slice_finish())
    }

    /// Scan a tag suffix or a tag prefix, decoding `%` escapes.
    fn scan_tag_uri(
        &mut self,
        directive: bool,
        verbatim: bool,
        start_mark: Marker,
    ) -> Result<Cow<'input, str>, ScanError> {
        let context = if directive {
            "while parsing a directive"
        } else {
            "while parsing a tag"
        };
        let in_flow = self.flow_level > 0 && !verbatim;
        self.reader.slice_begin();
        loop {
            let c = self.reader.peek();
            if c == '%' {
                self.scan_uri_escapes(context, start_mark)?;
            } else if (in_flow && is_flow_uri_char(c)) || (!in_flow && is_uri_char(c)) {
                self.reader.slice_take(1);
            } else {
                break;
            }
        }
        if self.reader.slice_len() == 0 {
            return Err(self.error_in(
                context,
                start_mark,
                format!("expected URI, but found {:?}", self.reader.peek()),
            ));
        }
        Ok(self.reader.slice_finish())
    }

    /// Decode a run of `%XX` escapes as UTF-8 into the token value.
    fn scan_uri_escapes(&mut self, context: &str, start_mark: Marker) -> ScanResult {
        let mut bytes = Vec::new();
        while self.reader.peek() == '%' {
            self.reader.forward();
            let (Some(hi), Some(lo)) = (
                as_hex(self.reader.peek()),
                as_hex(self.reader.peek_nth(1)),
            ) else {
                return Err(self.error_in(
                    context,
                    start_mark,
                    format!(
                        "expected URI escape sequence of 2 hexadecimal numbers, but found {:?}",
                        self.reader.prefix(2)
                    ),
                ));
            };
            // Both are hexadecimal digits, the result fits in a byte.
            #[allow(clippy::cast_possible_truncation)]
            bytes.push((hi * 16 + lo) as u8);
            self.reader.forward_n(2);
        }
        match String::from_utf8(bytes) {
            Ok(decoded) => {
                self.reader.slice_push_str(&decoded);
                Ok(())
            }
            Err(_) => Err(self.error_in(
                context,
                start_mark,
                "found invalid UTF-8 in URI escape sequence",
            )),
        }
    }

    fn fetch_document_indicator(&mut self, token: TokenType<'input>) -> ScanResult {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark();
        self.reader.forward_n(3);
        self.tokens
            .push_back(Token(Span::new(start_mark, self.reader.mark()), token));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, token: TokenType<'input>) -> ScanResult {
        self.save_simple_key()?;
        let start_mark = self.reader.mark();
        self.increase_flow_level(start_mark);
        self.simple_key_allowed = true;
        self.reader.forward();
        self.tokens
            .push_back(Token(Span::new(start_mark, self.reader.mark()), token));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, token: TokenType<'input>) -> ScanResult {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark();
        self.reader.forward();
        self.tokens
            .push_back(Token(Span::new(start_mark, self.reader.mark()), token));
        Ok(())
    }

    fn increase_flow_level(&mut self, mark: Marker) {
        self.simple_keys.push(SimpleKey::new());
        self.flow_marks.push(mark);
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
            self.flow_marks.pop();
        }
    }

    fn fetch_flow_entry(&mut self) -> ScanResult {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark();
        self.reader.forward();
        self.tokens.push_back(Token(
            Span::new(start_mark, self.reader.mark()),
            TokenType::FlowEntry,
        ));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> ScanResult {
        let mark = self.reader.mark();
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error(mark, "sequence entries are not allowed here"));
            }
            self.roll_indent(self.reader.col(), None, TokenType::BlockSequenceStart, mark);
        }
        self.simple_key_allowed = true;
        self.remove_simple_key()?;
        self.reader.forward();
        self.after_block_indicator = self.flow_level == 0;
        self.tokens.push_back(Token(
            Span::new(mark, self.reader.mark()),
            TokenType::BlockEntry,
        ));
        Ok(())
    }

    fn fetch_key(&mut self) -> ScanResult {
        let mark = self.reader.mark();
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(self.error(mark, "mapping keys are not allowed here"));
            }
            self.roll_indent(self.reader.col(), None, TokenType::BlockMappingStart, mark);
        }
        self.simple_key_allowed = self.flow_level == 0;
        self.remove_simple_key()?;
        self.reader.forward();
        self.after_block_indicator = self.flow_level == 0;
        self.tokens
            .push_back(Token(Span::new(mark, self.reader.mark()), TokenType::Key));
        Ok(())
    }

    fn fetch_value(&mut self) -> ScanResult {
        let mark = self.reader.mark();
        let sk = self.simple_keys.last().copied().unwrap_or_else(SimpleKey::new);
        if sk.possible {
            // The candidate key is a key after all: insert a `KEY` in front of it.
            self.tokens.insert(
                sk.token_number - self.tokens_parsed,
                Token(Span::empty(sk.mark), TokenType::Key),
            );
            self.roll_indent(
                sk.mark.col(),
                Some(sk.token_number),
                TokenType::BlockMappingStart,
                sk.mark,
            );
            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(self.error(mark, "mapping values are not allowed here"));
                }
                self.roll_indent(self.reader.col(), None, TokenType::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
            self.remove_simple_key()?;
        }
        self.reader.forward();
        self.after_block_indicator = self.flow_level == 0;
        self.tokens
            .push_back(Token(Span::new(mark, self.reader.mark()), TokenType::Value));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> ScanResult {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        self.reader.forward();
        self.reader.slice_begin();
        while is_alpha(self.reader.peek()) {
            self.reader.slice_take(1);
        }
        let c = self.reader.peek();
        let ends_properly = is_blank_or_breakz(c)
            || matches!(c, '?' | ':' | ',' | ']' | '}' | '%' | '@' | '`');
        if self.reader.slice_len() == 0 || !ends_properly {
            let context = if alias {
                "while scanning an alias"
            } else {
                "while scanning an anchor"
            };
            return Err(self.error_in(
                context,
                start_mark,
                format!("expected alphabetic or numeric character, but found {c:?}"),
            ));
        }
        let name = self.reader.slice_finish();
        let kind = if alias {
            TokenType::Alias(name)
        } else {
            TokenType::Anchor(name)
        };
        Ok(Token(Span::new(start_mark, self.reader.mark()), kind))
    }

    fn fetch_tag(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_tag(&mut self) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        let nc = self.reader.peek_nth(1);
        let (handle, suffix) = if nc == '<' {
            // Verbatim tag: `!<tag:yaml.org,2002:str>`.
            self.reader.forward_n(2);
            let suffix = self.scan_tag_uri(false, true, start_mark)?;
            if self.reader.peek() != '>' {
                return Err(self.error_in(
                    "while scanning a tag",
                    start_mark,
                    format!("expected '>', but found {:?}", self.reader.peek()),
                ));
            }
            self.reader.forward();
            (Cow::Borrowed(""), suffix)
        } else if is_blank_or_breakz(nc) || (self.flow_level > 0 && is_flow(nc)) {
            // The non-specific tag `!`.
            self.reader.forward();
            (Cow::Borrowed(""), Cow::Borrowed("!"))
        } else {
            let mut length = 1;
            let mut use_handle = false;
            loop {
                let c = self.reader.peek_nth(length);
                if is_blank_or_breakz(c) || (self.flow_level > 0 && is_flow(c)) {
                    break;
                }
                if c == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
            }
            let handle = if use_handle {
                self.scan_tag_handle(false, start_mark)?
            } else {
                self.reader.forward();
                Cow::Borrowed("!")
            };
            let suffix = self.scan_tag_uri(false, false, start_mark)?;
            (handle, suffix)
        };

        let c = self.reader.peek();
        if !is_blank_or_breakz(c) && !(self.flow_level > 0 && is_flow(c)) {
            return Err(self.error_in(
                "while scanning a tag",
                start_mark,
                format!("expected ' ', but found {c:?}"),
            ));
        }
        Ok(Token(
            Span::new(start_mark, self.reader.mark()),
            TokenType::Tag(handle, suffix),
        ))
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> ScanResult {
        self.simple_key_allowed = true;
        self.remove_simple_key()?;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        self.reader.forward();

        let (chomping, increment) = self.scan_block_scalar_indicators(start_mark)?;

        // Eat whitespaces and comments to the end of the line.
        self.skip_blanks();
        if self.reader.peek() == '#' {
            self.reader.skip_to_break();
        }
        if !is_breakz(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a block scalar",
                start_mark,
                format!(
                    "expected a comment or a line break, but found {:?}",
                    self.reader.peek()
                ),
            ));
        }
        self.reader.read_break();

        let min_indent = usize::try_from(self.indent + 1).unwrap_or(0).max(1);
        let mut breaks = String::new();
        let (indent, mut end_mark) = if let Some(increment) = increment {
            let indent = min_indent + increment - 1;
            (indent, self.scan_block_scalar_breaks(indent, &mut breaks))
        } else {
            let (max_indent, end_mark) = self.scan_block_scalar_indentation(&mut breaks);
            (min_indent.max(max_indent), end_mark)
        };

        self.reader.slice_begin();
        let mut line_break = None;
        while self.reader.col() == indent && !self.reader.is_end() {
            self.reader.slice_push_str(&breaks);
            breaks.clear();
            let leading_non_space = !is_blank(self.reader.peek());
            while !is_breakz(self.reader.peek()) {
                self.reader.slice_take(1);
            }
            line_break = self.reader.read_break();
            end_mark = self.scan_block_scalar_breaks(indent, &mut breaks);
            if self.reader.col() == indent && !self.reader.is_end() {
                // A single line break between two non-indented lines of a folded scalar becomes a
                // space. Empty lines in between are kept as they are.
                if !literal
                    && line_break == Some('\n')
                    && leading_non_space
                    && !is_blank(self.reader.peek())
                {
                    if breaks.is_empty() {
                        self.reader.slice_push_char(' ');
                    }
                } else if let Some(line_break) = line_break {
                    self.reader.slice_push_char(line_break);
                }
            } else {
                break;
            }
        }

        match chomping {
            Chomping::Strip => {}
            Chomping::Clip => {
                if let Some(line_break) = line_break {
                    self.reader.slice_push_char(line_break);
                }
            }
            Chomping::Keep => {
                if let Some(line_break) = line_break {
                    self.reader.slice_push_char(line_break);
                }
                self.reader.slice_push_str(&breaks);
            }
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(Token(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(style, self.reader.slice_finish()),
        ))
    }

    /// Scan the chomping and indentation indicators of a block scalar, in either order.
    fn scan_block_scalar_indicators(
        &mut self,
        start_mark: Marker,
    ) -> Result<(Chomping, Option<usize>), ScanError> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;

        let chomping_of = |c| match c {
            '+' => Some(Chomping::Keep),
            '-' => Some(Chomping::Strip),
            _ => None,
        };

        if let Some(c) = chomping_of(self.reader.peek()) {
            chomping = c;
            self.reader.forward();
            if is_digit(self.reader.peek()) {
                increment = Some(self.scan_block_scalar_increment(start_mark)?);
            }
        } else if is_digit(self.reader.peek()) {
            increment = Some(self.scan_block_scalar_increment(start_mark)?);
            if let Some(c) = chomping_of(self.reader.peek()) {
                chomping = c;
                self.reader.forward();
            }
        }

        if !is_blank_or_breakz(self.reader.peek()) {
            return Err(self.error_in(
                "while scanning a block scalar",
                start_mark,
                format!(
                    "expected chomping or indentation indicators, but found {:?}",
                    self.reader.peek()
                ),
            ));
        }
        Ok((chomping, increment))
    }

    fn scan_block_scalar_increment(&mut self, start_mark: Marker) -> Result<usize, ScanError> {
        match self.reader.peek().to_digit(10) {
            Some(digit @ 1..=9) => {
                self.reader.forward();
                Ok(digit as usize)
            }
            _ => Err(self.error_in(
                "while scanning a block scalar",
                start_mark,
                "expected indentation indicator in the range 1-9, but found 0",
            )),
        }
    }

    /// Skip the leading empty lines of a block scalar without an indentation indicator.
    ///
    /// Return the deepest indentation seen and the position after the last line break.
    fn scan_block_scalar_indentation(&mut self, breaks: &mut String) -> (usize, Marker) {
        let mut max_indent = 0;
        let mut end_mark = self.reader.mark();
        loop {
            let c = self.reader.peek();
            if c == ' ' {
                self.reader.forward();
                max_indent = max_indent.max(self.reader.col());
            } else if let Some(line_break) = self.reader.read_break() {
                breaks.push(line_break);
                end_mark = self.reader.mark();
            } else {
                break;
            }
        }
        (max_indent, end_mark)
    }

    /// Skip the indentation and empty lines of a block scalar, collecting the line breaks.
    fn scan_block_scalar_breaks(&mut self, indent: usize, breaks: &mut String) -> Marker {
        let mut end_mark = self.reader.mark();
        loop {
            while self.reader.col() < indent && self.reader.peek() == ' ' {
                self.reader.forward();
            }
            match self.reader.read_break() {
                Some(line_break) => {
                    breaks.push(line_break);
                    end_mark = self.reader.mark();
                }
                None => break,
            }
        }
        end_mark
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> ScanResult {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    /// Scan a quoted scalar.
    ///
    /// Line folding is applied and `''` is collapsed. Escape sequences of double-quoted scalars
    /// are kept verbatim for the parser to expand, except for escaped line breaks.
    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        let quote = self.reader.peek();
        self.reader.forward();
        self.reader.slice_begin();
        loop {
            self.scan_flow_scalar_non_spaces(single, start_mark)?;
            if self.reader.peek() == quote {
                break;
            }
            self.scan_flow_scalar_spaces(start_mark)?;
        }
        self.reader.forward();

        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token(
            Span::new(start_mark, self.reader.mark()),
            TokenType::Scalar(style, self.reader.slice_finish()),
        ))
    }

    fn scan_flow_scalar_non_spaces(&mut self, single: bool, start_mark: Marker) -> ScanResult {
        loop {
            loop {
                let c = self.reader.peek();
                if matches!(c, '\'' | '"' | '\\') || is_blank_or_breakz(c) {
                    break;
                }
                self.reader.slice_take(1);
            }
            let c = self.reader.peek();
            let nc = self.reader.peek_nth(1);
            match c {
                '\'' if single && nc == '\'' => {
                    self.reader.slice_take(1);
                    self.reader.forward();
                }
                '\'' if !single => self.reader.slice_take(1),
                '"' | '\\' if single => self.reader.slice_take(1),
                '\\' if is_break(nc) => {
                    // An escaped line break: the break and the indentation that follows vanish.
                    self.reader.forward();
                    self.reader.read_break();
                    let mut breaks = String::new();
                    self.scan_flow_scalar_breaks(start_mark, &mut breaks)?;
                    self.reader.slice_push_str(&breaks);
                }
                '\\' if self.reader.peek_opt(1).is_none() => self.reader.slice_take(1),
                '\\' => self.reader.slice_take(2),
                _ => return Ok(()),
            }
        }
    }

    fn scan_flow_scalar_spaces(&mut self, start_mark: Marker) -> ScanResult {
        self.reader.slice_begin_transaction();
        while is_blank(self.reader.peek()) {
            self.reader.slice_take(1);
        }
        if self.reader.is_end() {
            self.reader.slice_commit();
            return Err(self.error_in(
                "while scanning a quoted scalar",
                start_mark,
                "found unexpected end of stream",
            ));
        }
        if is_break(self.reader.peek()) {
            // Trailing whitespace is not part of the value.
            self.reader.slice_revert();
            let line_break = self.reader.read_break().unwrap_or('\n');
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start_mark, &mut breaks)?;
            if line_break != '\n' {
                self.reader.slice_push_char(line_break);
            } else if breaks.is_empty() {
                self.reader.slice_push_char(' ');
            }
            self.reader.slice_push_str(&breaks);
        } else {
            self.reader.slice_commit();
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(&mut self, start_mark: Marker, breaks: &mut String) -> ScanResult {
        loop {
            if self.reader.col() == 0 && self.reader.next_is_document_indicator() {
                return Err(self.error_in(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document separator",
                ));
            }
            self.skip_blanks();
            match self.reader.read_break() {
                Some(line_break) => breaks.push(line_break),
                None => return Ok(()),
            }
        }
    }

    fn fetch_plain_scalar(&mut self) -> ScanResult {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    /// Scan a plain scalar.
    ///
    /// The whitespace between two chunks of the scalar is written in a transaction which is only
    /// committed if another chunk follows.
    fn scan_plain_scalar(&mut self) -> Result<Token<'input>, ScanError> {
        let start_mark = self.reader.mark();
        let mut end_mark = start_mark;
        let indent = self.indent + 1;
        let mut pending_spaces = false;

        self.reader.slice_begin();
        loop {
            if self.reader.peek() == '#' {
                break;
            }
            let mut found_chunk = false;
            loop {
                let c = self.reader.peek();
                if is_blank_or_breakz(c) {
                    break;
                }
                if c == ':' {
                    let nc = self.reader.peek_nth(1);
                    if is_blank_or_breakz(nc) || (self.flow_level > 0 && is_flow(nc)) {
                        break;
                    }
                }
                if self.flow_level > 0 && matches!(c, ',' | '?' | '[' | ']' | '{' | '}') {
                    break;
                }
                if !found_chunk {
                    if pending_spaces {
                        self.reader.slice_commit();
                        pending_spaces = false;
                    }
                    found_chunk = true;
                }
                self.reader.slice_take(1);
            }
            if !found_chunk {
                break;
            }
            self.simple_key_allowed = false;
            end_mark = self.reader.mark();

            self.reader.slice_begin_transaction();
            pending_spaces = true;
            if !self.scan_plain_spaces(start_mark, indent)?
                || self.reader.peek() == '#'
                || (self.flow_level == 0 && self.col_isize() < indent)
            {
                break;
            }
        }
        if pending_spaces {
            self.reader.slice_revert();
        }

        Ok(Token(
            Span::new(start_mark, end_mark),
            TokenType::Scalar(ScalarStyle::Plain, self.reader.slice_finish()),
        ))
    }

    /// Scan the whitespace and line breaks following a chunk of a plain scalar.
    ///
    /// Return whether the scalar may continue after them.
    fn scan_plain_spaces(&mut self, start_mark: Marker, indent: isize) -> Result<bool, ScanError> {
        self.reader.slice_begin_transaction();
        let mut whitespace = false;
        while is_blank(self.reader.peek()) {
            self.reader.slice_take(1);
            whitespace = true;
        }
        if !is_break(self.reader.peek()) {
            self.reader.slice_commit();
            return Ok(whitespace);
        }

        // Folded line: the whitespace before the break is not part of the value.
        self.reader.slice_revert();
        let line_break = self.reader.read_break().unwrap_or('\n');
        self.simple_key_allowed = true;
        if self.reader.next_is_document_indicator() {
            return Ok(false);
        }
        let mut breaks = String::new();
        loop {
            match self.reader.peek() {
                ' ' => self.reader.forward(),
                '\t' => {
                    if self.flow_level == 0 && self.col_isize() < indent {
                        return Err(self.error_in(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        ));
                    }
                    self.reader.forward();
                }
                c if is_break(c) => {
                    if let Some(extra) = self.reader.read_break() {
                        breaks.push(extra);
                    }
                    if self.reader.next_is_document_indicator() {
                        return Ok(false);
                    }
                }
                _ => break,
            }
        }
        if line_break != '\n' {
            self.reader.slice_push_char(line_break);
        } else if breaks.is_empty() {
            self.reader.slice_push_char(' ');
        }
        self.reader.slice_push_str(&breaks);
        Ok(true)
    }
}

impl<'input> Iterator for Scanner<'input> {
    type Item = Result<Token<'input>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        self.next_token().transpose()
    }
}
