//! Positions and tokens exchanged between the scanner and the parser.

use std::{borrow::Cow, fmt};

use crate::reader::Encoding;

/// A location in the input stream.
///
/// Lines and columns are 0-based. They are displayed 1-based.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub struct Marker {
    /// The index (in chars) in the input string.
    index: usize,
    /// The line (0-indexed).
    line: usize,
    /// The column (0-indexed).
    col: usize,
}

impl Marker {
    /// Create a new [`Marker`] at the given position.
    #[must_use]
    pub fn new(index: usize, line: usize, col: usize) -> Marker {
        Marker { index, line, col }
    }

    /// Return the index (in chars) of the marker in the source.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the line of the marker in the source (0-indexed).
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Return the column of the marker in the source (0-indexed).
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}

/// A range of locations in the input stream.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub struct Span {
    /// The start (inclusive) of the range.
    pub start: Marker,
    /// The end (exclusive) of the range.
    pub end: Marker,
}

impl Span {
    /// Create a new [`Span`] for the given range.
    #[must_use]
    pub fn new(start: Marker, end: Marker) -> Span {
        Span { start, end }
    }

    /// Create an empty [`Span`] at a given location.
    ///
    /// An empty span doesn't contain any characters, but its position may still be meaningful.
    /// For example, for an indented sequence [`SequenceEnd`] has a location but an empty span.
    ///
    /// [`SequenceEnd`]: crate::Event::SequenceEnd
    #[must_use]
    pub fn empty(mark: Marker) -> Span {
        Span {
            start: mark,
            end: mark,
        }
    }

    /// Return the length of the span (in characters).
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.index - self.start.index
    }

    /// Return whether the [`Span`] has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The style in which a scalar is (or is to be) written.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default, Hash)]
pub enum ScalarStyle {
    /// Let the emitter pick a style. Never produced by the parser.
    #[default]
    Any,
    /// A YAML plain scalar.
    Plain,
    /// A YAML single quoted scalar.
    SingleQuoted,
    /// A YAML double quoted scalar.
    DoubleQuoted,
    /// A YAML literal block (`|` block).
    Literal,
    /// A YAML folded block (`>` block).
    Folded,
}

/// The contents of a scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum TokenType<'input> {
    /// The start of the stream. Sent first, before even [`TokenType::DocumentStart`].
    StreamStart(Encoding),
    /// The end of the stream, EOF.
    StreamEnd,
    /// A YAML version directive (`%YAML major.minor`).
    VersionDirective(
        /// Major
        u32,
        /// Minor
        u32,
    ),
    /// A YAML tag directive (e.g.: `!!str`, `!foo!bar`, ...).
    TagDirective(
        /// Handle
        Cow<'input, str>,
        /// Prefix
        Cow<'input, str>,
    ),
    /// A directive with a name YAML 1.1 does not define. Its parameters are not kept.
    ReservedDirective(Cow<'input, str>),
    /// The start of a YAML document (`---`).
    DocumentStart,
    /// The end of a YAML document (`...`).
    DocumentEnd,
    /// The start of a sequence block.
    ///
    /// Sequence blocks are arrays starting with a `-`.
    BlockSequenceStart,
    /// The start of a sequence mapping.
    ///
    /// Sequence mappings are "dictionaries" with "key: value" entries.
    BlockMappingStart,
    /// End of the corresponding `BlockSequenceStart` or `BlockMappingStart`.
    BlockEnd,
    /// Start of an inline sequence (`[ a, b ]`).
    FlowSequenceStart,
    /// End of an inline sequence.
    FlowSequenceEnd,
    /// Start of an inline mapping (`{ a: b, c: d }`).
    FlowMappingStart,
    /// End of an inline mapping.
    FlowMappingEnd,
    /// An entry in a block sequence (c.f.: [`TokenType::BlockSequenceStart`]).
    BlockEntry,
    /// An entry in a flow sequence (c.f.: [`TokenType::FlowSequenceStart`]).
    FlowEntry,
    /// A key in a mapping.
    Key,
    /// A value in a mapping.
    Value,
    /// A reference to an anchor.
    Alias(Cow<'input, str>),
    /// A YAML anchor (`&`/`*`).
    Anchor(Cow<'input, str>),
    /// A YAML tag (starting with bangs `!`).
    ///
    /// The handle is empty for verbatim tags (`!<...>`) and for the non-specific tag `!`.
    Tag(
        /// The handle of the tag.
        Cow<'input, str>,
        /// The suffix of the tag.
        Cow<'input, str>,
    ),
    /// A regular YAML scalar.
    ///
    /// The value of a double-quoted scalar still holds its escape sequences. They are expanded by
    /// the parser.
    Scalar(ScalarStyle, Cow<'input, str>),
}

impl TokenType<'_> {
    /// Return the name of the token kind, as used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::StreamStart(_) => "<stream start>",
            TokenType::StreamEnd => "<stream end>",
            TokenType::VersionDirective(..)
            | TokenType::TagDirective(..)
            | TokenType::ReservedDirective(_) => "<directive>",
            TokenType::DocumentStart => "<document start>",
            TokenType::DocumentEnd => "<document end>",
            TokenType::BlockSequenceStart => "<block sequence start>",
            TokenType::BlockMappingStart => "<block mapping start>",
            TokenType::BlockEnd => "<block end>",
            TokenType::FlowSequenceStart => "'['",
            TokenType::FlowSequenceEnd => "']'",
            TokenType::FlowMappingStart => "'{'",
            TokenType::FlowMappingEnd => "'}'",
            TokenType::BlockEntry => "'-'",
            TokenType::FlowEntry => "','",
            TokenType::Key => "'?'",
            TokenType::Value => "':'",
            TokenType::Alias(_) => "<alias>",
            TokenType::Anchor(_) => "<anchor>",
            TokenType::Tag(..) => "<tag>",
            TokenType::Scalar(..) => "<scalar>",
        }
    }
}

/// A scanner token.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct Token<'input>(pub Span, pub TokenType<'input>);
