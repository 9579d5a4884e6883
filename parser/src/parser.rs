//! Home to the YAML Parser.
//!
//! The parser takes input from the [`crate::scanner::Scanner`], performs final checks for YAML
//! compliance, and emits a stream of YAML events. This stream can for instance be used to create
//! YAML objects.
//!
//! The grammar is driven by an explicit stack of [`State`]s rather than by recursion, so that
//! arbitrarily deep documents do not grow the call stack.

use std::borrow::Cow;

use hashlink::LinkedHashMap;

use crate::{
    char_traits::is_hex,
    error::{Error, ParseError},
    event::{CollectionStyle, Event, TagDirective, Version, DEFAULT_TAGS},
    reader::Reader,
    scanner::Scanner,
    token::{Marker, ScalarStyle, Span, Token, TokenType},
};

#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

type ParseResult<'input> = Result<(Event<'input>, Span), Error>;

/// A YAML parser.
///
/// The parser pulls tokens from its scanner as it needs them and produces one event at a time.
/// It can be used as an iterator of `(Event, Span)`, or feed an [`EventReceiver`] /
/// [`SpannedEventReceiver`] through [`Parser::load`].
#[derive(Debug)]
pub struct Parser<'input> {
    /// The underlying scanner from which we pull tokens.
    scanner: Scanner<'input>,
    /// The stack of _previous_ states we were in.
    ///
    /// States are pushed in the context of subobjects to this stack. The top-most element is the
    /// state in which to come back to when exiting the current state.
    states: Vec<State>,
    /// The state in which we currently are.
    state: State,
    /// Where the collections we are in started, for error messages.
    marks: Vec<Marker>,
    /// The next event, if it was peeked.
    current: Option<(Event<'input>, Span)>,
    /// The tag handles in effect in the current document, declared ones first.
    tag_handles: LinkedHashMap<Cow<'input, str>, Cow<'input, str>>,
    /// The error that stopped the parser, if any.
    error: Option<Error>,
    /// Whether the iterator has handed out the end of the stream or an error.
    finished: bool,
    /// Stands for the token after the end of the stream.
    stream_end: Token<'static>,
}

/// Trait to be implemented in order to use the low-level parsing API.
///
/// The low-level parsing API is event-based (a push parser), calling [`EventReceiver::on_event`]
/// for each YAML [`Event`] that occurs.
/// The [`EventReceiver`] trait only receives events. In order to receive both events and their
/// location in the source, use [`SpannedEventReceiver`]. Note that [`EventReceiver`]s
/// implement [`SpannedEventReceiver`] automatically.
///
/// # Event hierarchy
/// The event stream starts with an [`Event::StreamStart`] event followed by an
/// [`Event::DocumentStart`] event. If the YAML document starts with a mapping (an object), an
/// [`Event::MappingStart`] event is emitted. If it starts with a sequence (an array), an
/// [`Event::SequenceStart`] event is emitted. Otherwise, an [`Event::Scalar`] event is emitted.
///
/// In a mapping, key-values are sent as consecutive events. The first event after an
/// [`Event::MappingStart`] will be the key, and following its value. If the mapping contains no
/// sub-mapping or sub-sequence, then even events (starting from 0) will always be keys and odd
/// ones will always be values. The mapping ends when an [`Event::MappingEnd`] event is received.
///
/// In a sequence, values are sent consecutively until the [`Event::SequenceEnd`] event.
///
/// If a value is a sub-mapping or a sub-sequence, an [`Event::MappingStart`] or
/// [`Event::SequenceStart`] event will be sent respectively. Following events until the
/// associated [`Event::MappingEnd`] or [`Event::SequenceEnd`] (beware of nested mappings or
/// sequences) will be part of the value and not another key-value pair or element in the
/// sequence.
///
/// For instance, the following yaml:
/// ```yaml
/// a: b
/// c:
///   d: e
/// f:
///   - g
///   - h
/// ```
/// will emit (indented and commented for lisibility):
/// ```text
/// StreamStart, DocumentStart, MappingStart,
///   Scalar("a", ..), Scalar("b", ..)
///   Scalar("c", ..), MappingStart, Scalar("d", ..), Scalar("e", ..), MappingEnd,
///   Scalar("f", ..), SequenceStart, Scalar("g", ..), Scalar("h", ..), SequenceEnd,
/// MappingEnd, DocumentEnd, StreamEnd
/// ```
pub trait EventReceiver<'input> {
    /// Handler called for each YAML event that is emitted by the parser.
    fn on_event(&mut self, ev: Event<'input>);
}

/// Trait to be implemented for using the low-level parsing API.
///
/// Functionally similar to [`EventReceiver`], but receives a [`Span`] as well as the event.
pub trait SpannedEventReceiver<'input> {
    /// Handler called for each event that occurs.
    fn on_event(&mut self, ev: Event<'input>, span: Span);
}

impl<'input, R: EventReceiver<'input>> SpannedEventReceiver<'input> for R {
    fn on_event(&mut self, ev: Event<'input>, _span: Span) {
        self.on_event(ev);
    }
}

impl<'input> Parser<'input> {
    /// Create a new instance of a parser from a `&str`.
    ///
    /// If the string holds characters YAML does not allow, the error is returned by the first
    /// call to [`Parser::next_event`].
    #[must_use]
    pub fn new_from_str(input: &'input str) -> Self {
        match Reader::new(input) {
            Ok(reader) => Parser::new(reader),
            Err(error) => {
                let mut parser = Parser::new(Reader::empty());
                parser.error = Some(error.into());
                parser
            }
        }
    }

    /// Create a new instance of a parser from the given reader.
    #[must_use]
    pub fn new(reader: Reader<'input>) -> Parser<'input> {
        Parser {
            scanner: Scanner::new(reader),
            states: Vec::new(),
            state: State::StreamStart,
            marks: Vec::new(),
            current: None,
            tag_handles: LinkedHashMap::new(),
            error: None,
            finished: false,
            stream_end: Token(Span::default(), TokenType::StreamEnd),
        }
    }

    /// Try to load the next event and return it, but do not consuming it from `self`.
    ///
    /// Any subsequent call to [`Parser::peek`] will return the same value, until a call to
    /// [`Iterator::next`] or [`Parser::load`].
    ///
    /// # Errors
    /// Returns the error that stopped the scanner or the parser.
    pub fn peek(&mut self) -> Option<Result<&(Event<'input>, Span), Error>> {
        if self.current.is_none() {
            match self.next_event()? {
                Ok(current) => self.current = Some(current),
                Err(error) => return Some(Err(error)),
            }
        }
        self.current.as_ref().map(Ok)
    }

    /// Try to load the next event and return it, consuming it from `self`.
    ///
    /// Returns `None` once the [`Event::StreamEnd`] event or an error has been returned.
    ///
    /// # Errors
    /// Returns the error that stopped the scanner or the parser.
    pub fn next_event(&mut self) -> Option<ParseResult<'input>> {
        if let Some(current) = self.current.take() {
            return Some(Ok(current));
        }
        if self.finished {
            return None;
        }
        let result = self.next_event_impl();
        if matches!(result, Ok((Event::StreamEnd, _)) | Err(_)) {
            self.finished = true;
        }
        Some(result)
    }

    /// Implementation function for [`Self::next_event`] without the `Option`.
    ///
    /// [`Self::next_event`] should conform to the expectations of an [`Iterator`] and return an
    /// option. This burdens the parser code. This function is used internally when an option is
    /// undesirable.
    fn next_event_impl(&mut self) -> ParseResult<'input> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if let Some(current) = self.current.take() {
            return Ok(current);
        }
        match self.state_machine() {
            Ok(event) => {
                debug_print!("\x1B[;32m\u{21B3} {:?} \x1B[;36m{:?}\x1B[;m", event.0, event.1);
                Ok(event)
            }
            Err(error) => {
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Load the YAML from the stream in `self`, pushing events into `recv`.
    ///
    /// If `multi` is set to `true`, the parser will parse all documents of the stream. Otherwise,
    /// it stops after the end of the first document.
    ///
    /// # Errors
    /// Returns the error that stopped the scanner or the parser. Events that came before it have
    /// already been pushed into `recv`.
    pub fn load<R: SpannedEventReceiver<'input>>(
        &mut self,
        recv: &mut R,
        multi: bool,
    ) -> Result<(), Error> {
        loop {
            let (event, span) = self.next_event_impl()?;
            let stop = match event {
                Event::StreamEnd => true,
                Event::DocumentEnd { .. } => !multi,
                _ => false,
            };
            recv.on_event(event, span);
            if stop {
                return Ok(());
            }
        }
    }

    fn error(&self, mark: Marker, info: impl Into<String>) -> ParseError {
        ParseError::new(self.scanner.reader().name().clone(), mark, info)
    }

    /// Where the innermost collection started.
    fn last_mark(&self) -> Marker {
        self.marks.last().copied().unwrap_or_default()
    }

    fn peek_token(&mut self) -> Result<&Token<'input>, Error> {
        Ok(self.scanner.peek_token()?.unwrap_or(&self.stream_end))
    }

    fn fetch_token(&mut self) -> Result<Token<'input>, Error> {
        Ok(self
            .scanner
            .next_token()?
            .unwrap_or_else(|| self.stream_end.clone()))
    }

    /// Consume the next token if `accept` holds for it.
    fn fetch_if(
        &mut self,
        accept: impl FnOnce(&TokenType<'input>) -> bool,
    ) -> Result<Option<Token<'input>>, Error> {
        if accept(&self.peek_token()?.1) {
            Ok(Some(self.fetch_token()?))
        } else {
            Ok(None)
        }
    }

    fn skip(&mut self) -> Result<(), Error> {
        self.scanner.next_token()?;
        Ok(())
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(State::End);
    }

    fn push_state(&mut self, state: State) {
        self.states.push(state);
    }

    fn state_machine(&mut self) -> ParseResult<'input> {
        debug_print!("\n\x1B[;33mParser state: {:?} \x1B[;0m", self.state);
        match self.state {
            State::StreamStart => self.stream_start(),

            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),

            State::BlockNode => self.parse_node(true, false),

            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),

            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),

            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),

            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),

            State::End => Ok((Event::StreamEnd, Span::empty(self.scanner.mark()))),
        }
    }

    fn stream_start(&mut self) -> ParseResult<'input> {
        let Token(span, kind) = self.fetch_token()?;
        if let TokenType::StreamStart(_) = kind {
            self.state = State::ImplicitDocumentStart;
            Ok((Event::StreamStart, span))
        } else {
            Err(self
                .error(
                    span.start,
                    format!("expected '<stream start>', but found {}", kind.name()),
                )
                .into())
        }
    }

    fn document_start(&mut self, implicit: bool) -> ParseResult<'input> {
        if !implicit {
            while let TokenType::DocumentEnd = self.peek_token()?.1 {
                self.skip()?;
            }
        }

        let token = self.peek_token()?;
        let span = token.0;
        match token.1 {
            TokenType::StreamEnd => {
                self.skip()?;
                self.state = State::End;
                Ok((Event::StreamEnd, span))
            }
            TokenType::VersionDirective(..)
            | TokenType::TagDirective(..)
            | TokenType::ReservedDirective(_)
            | TokenType::DocumentStart => self.explicit_document_start(),
            _ if implicit => {
                self.set_tag_handles(&[]);
                self.push_state(State::DocumentEnd);
                self.state = State::BlockNode;
                Ok((
                    Event::DocumentStart {
                        explicit: false,
                        version: None,
                        tags: Vec::new(),
                    },
                    Span::empty(span.start),
                ))
            }
            ref other => {
                let found = other.name();
                Err(self
                    .error(
                        span.start,
                        format!("expected '<document start>', but found {found}"),
                    )
                    .into())
            }
        }
    }

    fn explicit_document_start(&mut self) -> ParseResult<'input> {
        let start = self.peek_token()?.0.start;
        let (version, tags) = self.process_directives()?;
        let token = self.peek_token()?;
        let span = token.0;
        if token.1 != TokenType::DocumentStart {
            let found = token.1.name();
            return Err(self
                .error(
                    span.start,
                    format!("expected '<document start>', but found {found}"),
                )
                .into());
        }
        self.skip()?;
        self.push_state(State::DocumentEnd);
        self.state = State::DocumentContent;
        Ok((
            Event::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            Span::new(start, span.end),
        ))
    }

    /// Read the directives of a document and install its tag handles.
    #[allow(clippy::type_complexity)]
    fn process_directives(
        &mut self,
    ) -> Result<(Option<Version>, Vec<TagDirective<'input>>), Error> {
        let mut version = None;
        let mut tags: Vec<TagDirective<'input>> = Vec::new();
        loop {
            let is_directive = matches!(
                self.peek_token()?.1,
                TokenType::VersionDirective(..)
                    | TokenType::TagDirective(..)
                    | TokenType::ReservedDirective(_)
            );
            if !is_directive {
                break;
            }
            let Token(span, kind) = self.fetch_token()?;
            match kind {
                TokenType::VersionDirective(major, minor) => {
                    if version.is_some() {
                        return Err(self.error(span.start, "Duplicate YAML directive").into());
                    }
                    if major != 1 {
                        return Err(self
                            .error(span.start, "Incompatible document (version 1.x is required)")
                            .into());
                    }
                    version = Some(Version { major, minor });
                }
                TokenType::TagDirective(handle, prefix) => {
                    if tags.iter().any(|tag| tag.handle == handle) {
                        return Err(self
                            .error(span.start, format!("Duplicate tag handle: {handle}"))
                            .into());
                    }
                    tags.push(TagDirective { handle, prefix });
                }
                _ => debug_print!("ignoring reserved directive {kind:?}"),
            }
        }
        self.set_tag_handles(&tags);
        Ok((version, tags))
    }

    /// Reset the tag handles to the defaults, overridden by `tags`.
    fn set_tag_handles(&mut self, tags: &[TagDirective<'input>]) {
        self.tag_handles.clear();
        for tag in tags {
            self.tag_handles
                .insert(tag.handle.clone(), tag.prefix.clone());
        }
        for (handle, prefix) in DEFAULT_TAGS {
            if !self.tag_handles.contains_key(handle) {
                self.tag_handles
                    .insert(Cow::Borrowed(handle), Cow::Borrowed(prefix));
            }
        }
    }

    fn document_content(&mut self) -> ParseResult<'input> {
        let token = self.peek_token()?;
        if matches!(
            token.1,
            TokenType::VersionDirective(..)
                | TokenType::TagDirective(..)
                | TokenType::ReservedDirective(_)
                | TokenType::DocumentStart
                | TokenType::DocumentEnd
                | TokenType::StreamEnd
        ) {
            let mark = token.0.start;
            self.pop_state();
            Ok((Event::empty_scalar(), Span::empty(mark)))
        } else {
            self.parse_node(true, false)
        }
    }

    fn document_end(&mut self) -> ParseResult<'input> {
        let token = self.peek_token()?;
        let span = token.0;
        let (explicit, span) = if token.1 == TokenType::DocumentEnd {
            self.skip()?;
            (true, span)
        } else {
            (false, Span::empty(span.start))
        };
        self.state = State::DocumentStart;
        Ok((Event::DocumentEnd { explicit }, span))
    }

    #[allow(clippy::too_many_lines)]
    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> ParseResult<'input> {
        if let Some(Token(span, TokenType::Alias(name))) =
            self.fetch_if(|kind| matches!(kind, TokenType::Alias(_)))?
        {
            self.pop_state();
            return Ok((Event::Alias(name), span));
        }

        let mut anchor = None;
        let mut tag_parts = None;
        let mut start_mark = None;
        let mut end_mark = None;
        let mut tag_mark = Marker::default();
        loop {
            let (has_anchor, has_tag) = (anchor.is_some(), tag_parts.is_some());
            let Some(Token(span, kind)) = self.fetch_if(|kind| match kind {
                TokenType::Anchor(_) => !has_anchor,
                TokenType::Tag(..) => !has_tag,
                _ => false,
            })?
            else {
                break;
            };
            start_mark.get_or_insert(span.start);
            end_mark = Some(span.end);
            match kind {
                TokenType::Anchor(name) => anchor = Some(name),
                TokenType::Tag(handle, suffix) => {
                    tag_mark = span.start;
                    tag_parts = Some((handle, suffix));
                }
                _ => {}
            }
        }

        let next_span = self.peek_token()?.0;
        let start = start_mark.unwrap_or(next_span.start);
        let end = end_mark.unwrap_or(next_span.start);
        let tag = match tag_parts {
            Some((handle, suffix)) => Some(self.resolve_tag(handle, suffix, tag_mark, start)?),
            None => None,
        };
        let implicit = tag.as_deref().map_or(true, |tag| tag == "!");

        if let Some(Token(span, TokenType::Scalar(style, value))) =
            self.fetch_if(|kind| matches!(kind, TokenType::Scalar(..)))?
        {
            let implicit =
                (style == ScalarStyle::Plain && tag.is_none()) || tag.as_deref() == Some("!");
            let value = if style == ScalarStyle::DoubleQuoted {
                self.unescape(value, span)?
            } else {
                value
            };
            self.pop_state();
            return Ok((
                Event::Scalar {
                    anchor,
                    tag,
                    implicit,
                    value,
                    style,
                },
                Span::new(start, span.end),
            ));
        }

        let token = self.peek_token()?;
        let span = token.0;
        let (style, is_mapping, state) = match token.1 {
            TokenType::BlockEntry if indentless_sequence => (
                CollectionStyle::Block,
                false,
                State::IndentlessSequenceEntry,
            ),
            TokenType::FlowSequenceStart => {
                (CollectionStyle::Flow, false, State::FlowSequenceFirstEntry)
            }
            TokenType::FlowMappingStart => {
                (CollectionStyle::Flow, true, State::FlowMappingFirstKey)
            }
            TokenType::BlockSequenceStart if block => (
                CollectionStyle::Block,
                false,
                State::BlockSequenceFirstEntry,
            ),
            TokenType::BlockMappingStart if block => {
                (CollectionStyle::Block, true, State::BlockMappingFirstKey)
            }
            _ if anchor.is_some() || tag.is_some() => {
                // A node with properties but no content is an empty scalar.
                self.pop_state();
                return Ok((
                    Event::Scalar {
                        anchor,
                        tag,
                        implicit,
                        value: Cow::Borrowed(""),
                        style: ScalarStyle::Plain,
                    },
                    Span::new(start, end),
                ));
            }
            ref other => {
                let found = other.name();
                let context = if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                };
                return Err(self
                    .error(
                        span.start,
                        format!("expected the node content, but found {found}"),
                    )
                    .with_context(context, start)
                    .into());
            }
        };

        self.state = state;
        let event = if is_mapping {
            Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            }
        } else {
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            }
        };
        Ok((event, Span::new(start, span.end)))
    }

    /// Expand a tag from its handle and suffix, using the tag handles of the document.
    fn resolve_tag(
        &self,
        handle: Cow<'input, str>,
        suffix: Cow<'input, str>,
        tag_mark: Marker,
        node_mark: Marker,
    ) -> Result<Cow<'input, str>, Error> {
        if handle.is_empty() {
            return Ok(suffix);
        }
        match self.tag_handles.get(handle.as_ref()) {
            Some(prefix) => Ok(Cow::Owned(format!("{prefix}{suffix}"))),
            None => Err(self
                .error(tag_mark, format!("found undefined tag handle {handle:?}"))
                .with_context("while parsing a node", node_mark)
                .into()),
        }
    }

    /// Expand the escape sequences of a double-quoted scalar.
    fn unescape(&self, raw: Cow<'input, str>, span: Span) -> Result<Cow<'input, str>, Error> {
        if !raw.contains('\\') {
            return Ok(raw);
        }
        let error = |info: String| -> Error {
            self.error(span.start, info)
                .with_context("while parsing a quoted scalar", span.start)
                .into()
        };

        let mut value = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                value.push(c);
                continue;
            }
            let Some(escape) = chars.next() else {
                break;
            };
            let expanded = match escape {
                '0' => '\0',
                'a' => '\x07',
                'b' => '\x08',
                't' | '\t' => '\t',
                'n' => '\n',
                'v' => '\x0b',
                'f' => '\x0c',
                'r' => '\r',
                'e' => '\x1b',
                ' ' => ' ',
                '"' => '"',
                '/' => '/',
                '\\' => '\\',
                'N' => '\u{85}',
                '_' => '\u{a0}',
                'L' => '\u{2028}',
                'P' => '\u{2029}',
                'x' | 'u' | 'U' => {
                    let length = match escape {
                        'x' => 2,
                        'u' => 4,
                        _ => 8,
                    };
                    let digits: String = chars.by_ref().take(length).collect();
                    if digits.chars().count() != length || !digits.chars().all(is_hex) {
                        return Err(error(format!(
                            "expected escape sequence of {length} hexadecimal numbers, but found {digits:?}"
                        )));
                    }
                    u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| {
                            error(format!("found invalid Unicode character escape code {digits}"))
                        })?
                }
                other => return Err(error(format!("found unknown escape character {other:?}"))),
            };
            value.push(expanded);
        }
        Ok(Cow::Owned(value))
    }

    fn block_sequence_entry(&mut self, first: bool) -> ParseResult<'input> {
        if first {
            let mark = self.peek_token()?.0.start;
            self.marks.push(mark);
            self.skip()?;
        }
        let token = self.peek_token()?;
        let span = token.0;
        match token.1 {
            TokenType::BlockEntry => {
                self.skip()?;
                if matches!(
                    self.peek_token()?.1,
                    TokenType::BlockEntry | TokenType::BlockEnd
                ) {
                    self.state = State::BlockSequenceEntry;
                    Ok((Event::empty_scalar(), Span::empty(span.end)))
                } else {
                    self.push_state(State::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenType::BlockEnd => {
                self.skip()?;
                self.pop_state();
                self.marks.pop();
                Ok((Event::SequenceEnd, span))
            }
            ref other => {
                let found = other.name();
                Err(self
                    .error(span.start, format!("expected <block end>, but found {found}"))
                    .with_context("while parsing a block collection", self.last_mark())
                    .into())
            }
        }
    }

    fn indentless_sequence_entry(&mut self) -> ParseResult<'input> {
        let token = self.peek_token()?;
        let span = token.0;
        if token.1 != TokenType::BlockEntry {
            self.pop_state();
            return Ok((Event::SequenceEnd, Span::empty(span.start)));
        }
        self.skip()?;
        if matches!(
            self.peek_token()?.1,
            TokenType::BlockEntry | TokenType::Key | TokenType::Value | TokenType::BlockEnd
        ) {
            self.state = State::IndentlessSequenceEntry;
            Ok((Event::empty_scalar(), Span::empty(span.end)))
        } else {
            self.push_state(State::IndentlessSequenceEntry);
            self.parse_node(true, false)
        }
    }

    fn block_mapping_key(&mut self, first: bool) -> ParseResult<'input> {
        if first {
            let mark = self.peek_token()?.0.start;
            self.marks.push(mark);
            self.skip()?;
        }
        let token = self.peek_token()?;
        let span = token.0;
        match token.1 {
            TokenType::Key => {
                self.skip()?;
                if matches!(
                    self.peek_token()?.1,
                    TokenType::Key | TokenType::Value | TokenType::BlockEnd
                ) {
                    self.state = State::BlockMappingValue;
                    Ok((Event::empty_scalar(), Span::empty(span.end)))
                } else {
                    self.push_state(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            // A value with no key: the key is empty.
            TokenType::Value => {
                self.state = State::BlockMappingValue;
                Ok((Event::empty_scalar(), Span::empty(span.start)))
            }
            TokenType::BlockEnd => {
                self.skip()?;
                self.pop_state();
                self.marks.pop();
                Ok((Event::MappingEnd, span))
            }
            ref other => {
                let found = other.name();
                Err(self
                    .error(span.start, format!("expected <block end>, but found {found}"))
                    .with_context("while parsing a block mapping", self.last_mark())
                    .into())
            }
        }
    }

    fn block_mapping_value(&mut self) -> ParseResult<'input> {
        let token = self.peek_token()?;
        let span = token.0;
        if token.1 != TokenType::Value {
            self.state = State::BlockMappingKey;
            return Ok((Event::empty_scalar(), Span::empty(span.start)));
        }
        self.skip()?;
        if matches!(
            self.peek_token()?.1,
            TokenType::Key | TokenType::Value | TokenType::BlockEnd
        ) {
            self.state = State::BlockMappingKey;
            Ok((Event::empty_scalar(), Span::empty(span.end)))
        } else {
            self.push_state(State::BlockMappingKey);
            self.parse_node(true, true)
        }
    }

    fn flow_sequence_entry(&mut self, first: bool) -> ParseResult<'input> {
        if first {
            let mark = self.peek_token()?.0.start;
            self.marks.push(mark);
            self.skip()?;
        }
        if self.peek_token()?.1 != TokenType::FlowSequenceEnd {
            if !first {
                let token = self.peek_token()?;
                let span = token.0;
                if token.1 == TokenType::FlowEntry {
                    self.skip()?;
                } else {
                    let found = token.1.name();
                    return Err(self
                        .error(
                            span.start,
                            format!("expected ',' or ']', but found {found}"),
                        )
                        .with_context("while parsing a flow sequence", self.last_mark())
                        .into());
                }
            }
            let token = self.peek_token()?;
            let span = token.0;
            match token.1 {
                TokenType::Key => {
                    // A single pair mapping: `[a: b]`.
                    self.state = State::FlowSequenceEntryMappingKey;
                    return Ok((
                        Event::MappingStart {
                            anchor: None,
                            tag: None,
                            implicit: true,
                            style: CollectionStyle::Flow,
                        },
                        span,
                    ));
                }
                TokenType::FlowSequenceEnd => {}
                _ => {
                    self.push_state(State::FlowSequenceEntry);
                    return self.parse_node(false, false);
                }
            }
        }
        let span = self.fetch_token()?.0;
        self.pop_state();
        self.marks.pop();
        Ok((Event::SequenceEnd, span))
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> ParseResult<'input> {
        let span = self.fetch_token()?.0;
        if matches!(
            self.peek_token()?.1,
            TokenType::Value | TokenType::FlowEntry | TokenType::FlowSequenceEnd
        ) {
            self.state = State::FlowSequenceEntryMappingValue;
            Ok((Event::empty_scalar(), Span::empty(span.end)))
        } else {
            self.push_state(State::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> ParseResult<'input> {
        let token = self.peek_token()?;
        let span = token.0;
        if token.1 != TokenType::Value {
            self.state = State::FlowSequenceEntryMappingEnd;
            return Ok((Event::empty_scalar(), Span::empty(span.start)));
        }
        self.skip()?;
        if matches!(
            self.peek_token()?.1,
            TokenType::FlowEntry | TokenType::FlowSequenceEnd
        ) {
            self.state = State::FlowSequenceEntryMappingEnd;
            Ok((Event::empty_scalar(), Span::empty(span.end)))
        } else {
            self.push_state(State::FlowSequenceEntryMappingEnd);
            self.parse_node(false, false)
        }
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> ParseResult<'input> {
        let mark = self.peek_token()?.0.start;
        self.state = State::FlowSequenceEntry;
        Ok((Event::MappingEnd, Span::empty(mark)))
    }

    fn flow_mapping_key(&mut self, first: bool) -> ParseResult<'input> {
        if first {
            let mark = self.peek_token()?.0.start;
            self.marks.push(mark);
            self.skip()?;
        }
        if self.peek_token()?.1 != TokenType::FlowMappingEnd {
            if !first {
                let token = self.peek_token()?;
                let span = token.0;
                if token.1 == TokenType::FlowEntry {
                    self.skip()?;
                } else {
                    let found = token.1.name();
                    return Err(self
                        .error(
                            span.start,
                            format!("expected ',' or '}}', but found {found}"),
                        )
                        .with_context("while parsing a flow mapping", self.last_mark())
                        .into());
                }
            }
            let token = self.peek_token()?;
            let span = token.0;
            match token.1 {
                TokenType::Key => {
                    self.skip()?;
                    if matches!(
                        self.peek_token()?.1,
                        TokenType::Value | TokenType::FlowEntry | TokenType::FlowMappingEnd
                    ) {
                        self.state = State::FlowMappingValue;
                        return Ok((Event::empty_scalar(), Span::empty(span.end)));
                    }
                    self.push_state(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                TokenType::FlowMappingEnd => {}
                _ => {
                    // A key with no `:`, its value is empty.
                    self.push_state(State::FlowMappingEmptyValue);
                    return self.parse_node(false, false);
                }
            }
        }
        let span = self.fetch_token()?.0;
        self.pop_state();
        self.marks.pop();
        Ok((Event::MappingEnd, span))
    }

    fn flow_mapping_value(&mut self, empty: bool) -> ParseResult<'input> {
        let token = self.peek_token()?;
        let span = token.0;
        if empty || token.1 != TokenType::Value {
            self.state = State::FlowMappingKey;
            return Ok((Event::empty_scalar(), Span::empty(span.start)));
        }
        self.skip()?;
        if matches!(
            self.peek_token()?.1,
            TokenType::FlowEntry | TokenType::FlowMappingEnd
        ) {
            self.state = State::FlowMappingKey;
            Ok((Event::empty_scalar(), Span::empty(span.end)))
        } else {
            self.push_state(State::FlowMappingKey);
            self.parse_node(false, false)
        }
    }
}

impl<'input> Iterator for Parser<'input> {
    type Item = Result<(Event<'input>, Span), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

#[cfg(test)]
mod test {
    use super::{Event, Parser};

    #[test]
    fn test_peek_eq_parse() {
        let s = "
a0 bb: val
a1: &x
    b1: 4
    b2: d
a2: 4
a3: [1, 2, 3]
a4:
    - [a1, a2]
    - 2
a5: *x
";
        let mut p = Parser::new_from_str(s);
        loop {
            let event_peek = p.peek().unwrap().unwrap().clone();
            let event = p.next_event().unwrap().unwrap();
            assert_eq!(event, event_peek);
            if event.0 == Event::StreamEnd {
                break;
            }
        }
        assert!(p.next_event().is_none());
    }

    #[test]
    fn test_keep_tags_across_multiple_documents() {
        let text = r#"
%TAG !t! tag:test,2024:
--- !t!1 &1
foo: "bar"
--- !t!2 &2
baz: "qux"
"#;
        let mut parser = Parser::new_from_str(text);
        let tags: Vec<_> = parser
            .by_ref()
            .filter_map(|event| match event.unwrap().0 {
                Event::MappingStart { tag, .. } => tag.map(|tag| tag.into_owned()),
                _ => None,
            })
            .take(1)
            .collect();
        assert_eq!(tags, ["tag:test,2024:1"]);
        let error = parser.find_map(Result::err).unwrap();
        assert_eq!(error.info(), "found undefined tag handle \"!t!\"");
        assert_eq!(error.marker().unwrap().line(), 4);
    }

    #[test]
    fn test_decoding_error_is_reported_first() {
        let mut parser = Parser::new_from_str("a: \u{1}");
        let error = parser.next_event().unwrap().unwrap_err();
        assert!(error.info().starts_with("unacceptable character #x0001"));
        assert!(parser.next_event().is_none());
    }
}
