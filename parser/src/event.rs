//! Events exchanged between the parser and its consumers, and between producers and the emitter.

use std::borrow::Cow;

use crate::token::ScalarStyle;

/// The tag directives every document starts with.
///
/// `%TAG` directives of a document may override them.
pub const DEFAULT_TAGS: [(&str, &str); 2] = [("!", "!"), ("!!", "tag:yaml.org,2002:")];

/// The `%YAML` directive of a document.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub struct Version {
    /// The major version. Only `1` is supported.
    pub major: u32,
    /// The minor version.
    pub minor: u32,
}

/// A `%TAG` directive: `handle` abbreviates `prefix` in the tags of the document.
#[derive(Clone, PartialEq, Debug, Eq)]
pub struct TagDirective<'input> {
    /// The handle, `!`, `!!` or `!name!`.
    pub handle: Cow<'input, str>,
    /// The prefix the handle expands to.
    pub prefix: Cow<'input, str>,
}

impl TagDirective<'_> {
    /// Detach the directive from the input it was read from.
    #[must_use]
    pub fn into_owned(self) -> TagDirective<'static> {
        TagDirective {
            handle: Cow::Owned(self.handle.into_owned()),
            prefix: Cow::Owned(self.prefix.into_owned()),
        }
    }
}

/// The style in which a collection is (or is to be) written.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default, Hash)]
pub enum CollectionStyle {
    /// Let the emitter pick a style. Never produced by the parser.
    #[default]
    Any,
    /// An indented collection (`- a` or `a: b`).
    Block,
    /// An inline collection (`[a]` or `{a: b}`).
    Flow,
}

/// An event generated by the YAML parser.
///
/// Events are used in the low-level event-based API (push parser). The API entrypoint is the
/// [`EventReceiver`] trait.
///
/// Tags are held fully expanded (e.g.: `tag:yaml.org,2002:str` for `!!str`). A tag of `!` is the
/// non-specific tag.
///
/// [`EventReceiver`]: crate::EventReceiver
#[derive(Clone, PartialEq, Debug, Eq)]
pub enum Event<'input> {
    /// Event generated at the very beginning of parsing.
    StreamStart,
    /// Last event that will be generated by the parser. Signals EOF.
    StreamEnd,
    /// The start of a YAML document.
    DocumentStart {
        /// Whether the document starts with `---`.
        explicit: bool,
        /// The `%YAML` directive of the document.
        version: Option<Version>,
        /// The `%TAG` directives declared for the document, in order. The default handles are not
        /// listed unless the document redeclares them.
        tags: Vec<TagDirective<'input>>,
    },
    /// The YAML end document directive.
    DocumentEnd {
        /// Whether the document ends with `...`.
        explicit: bool,
    },
    /// A YAML Alias.
    Alias(
        /// The name of the anchor it refers to.
        Cow<'input, str>,
    ),
    /// Value, style, anchor and tag.
    Scalar {
        /// The anchor of the node.
        anchor: Option<Cow<'input, str>>,
        /// The tag of the node.
        tag: Option<Cow<'input, str>>,
        /// Whether the tag may be left out when writing the node.
        implicit: bool,
        /// The value of the scalar, with escapes expanded and lines folded.
        value: Cow<'input, str>,
        /// How the scalar was (or should be) written.
        style: ScalarStyle,
    },
    /// The start of a YAML sequence (array).
    SequenceStart {
        /// The anchor of the node.
        anchor: Option<Cow<'input, str>>,
        /// The tag of the node.
        tag: Option<Cow<'input, str>>,
        /// Whether the tag may be left out when writing the node.
        implicit: bool,
        /// How the sequence was (or should be) written.
        style: CollectionStyle,
    },
    /// The end of a YAML sequence (array).
    SequenceEnd,
    /// The start of a YAML mapping (object, hash).
    MappingStart {
        /// The anchor of the node.
        anchor: Option<Cow<'input, str>>,
        /// The tag of the node.
        tag: Option<Cow<'input, str>>,
        /// Whether the tag may be left out when writing the node.
        implicit: bool,
        /// How the mapping was (or should be) written.
        style: CollectionStyle,
    },
    /// The end of a YAML mapping (object, hash).
    MappingEnd,
}

impl<'input> Event<'input> {
    /// An empty plain scalar, standing for a node with no content.
    #[must_use]
    pub fn empty_scalar() -> Self {
        Event::Scalar {
            anchor: None,
            tag: None,
            implicit: true,
            value: Cow::Borrowed(""),
            style: ScalarStyle::Plain,
        }
    }

    /// A plain scalar with no anchor and no tag, for producers feeding the emitter.
    #[must_use]
    pub fn plain(value: impl Into<Cow<'input, str>>) -> Self {
        Event::Scalar {
            anchor: None,
            tag: None,
            implicit: true,
            value: value.into(),
            style: ScalarStyle::Plain,
        }
    }

    /// Return the name of the kind of the event, as used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Event::StreamStart => "StreamStart",
            Event::StreamEnd => "StreamEnd",
            Event::DocumentStart { .. } => "DocumentStart",
            Event::DocumentEnd { .. } => "DocumentEnd",
            Event::Alias(_) => "Alias",
            Event::Scalar { .. } => "Scalar",
            Event::SequenceStart { .. } => "SequenceStart",
            Event::SequenceEnd => "SequenceEnd",
            Event::MappingStart { .. } => "MappingStart",
            Event::MappingEnd => "MappingEnd",
        }
    }

    /// Detach the event from the input it was read from.
    #[must_use]
    pub fn into_owned(self) -> Event<'static> {
        fn own(value: Option<Cow<'_, str>>) -> Option<Cow<'static, str>> {
            value.map(|v| Cow::Owned(v.into_owned()))
        }

        match self {
            Event::StreamStart => Event::StreamStart,
            Event::StreamEnd => Event::StreamEnd,
            Event::DocumentStart {
                explicit,
                version,
                tags,
            } => Event::DocumentStart {
                explicit,
                version,
                tags: tags.into_iter().map(TagDirective::into_owned).collect(),
            },
            Event::DocumentEnd { explicit } => Event::DocumentEnd { explicit },
            Event::Alias(name) => Event::Alias(Cow::Owned(name.into_owned())),
            Event::Scalar {
                anchor,
                tag,
                implicit,
                value,
                style,
            } => Event::Scalar {
                anchor: own(anchor),
                tag: own(tag),
                implicit,
                value: Cow::Owned(value.into_owned()),
                style,
            },
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            } => Event::SequenceStart {
                anchor: own(anchor),
                tag: own(tag),
                implicit,
                style,
            },
            Event::SequenceEnd => Event::SequenceEnd,
            Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            } => Event::MappingStart {
                anchor: own(anchor),
                tag: own(tag),
                implicit,
                style,
            },
            Event::MappingEnd => Event::MappingEnd,
        }
    }
}
