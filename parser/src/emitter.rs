//! Serialization of an event stream into YAML text.
//!
//! The [`Emitter`] is the mirror of the [`Parser`]: it is fed [`Event`]s and writes the text
//! that would parse back into them. Styles requested by the events are honored when the value
//! allows it; otherwise the emitter falls back to a style that can represent it.
//!
//! [`Parser`]: crate::Parser

mod analysis;
mod writer;

use std::{
    collections::BTreeMap,
    fmt::{self, Write as _},
};

use arraydeque::ArrayDeque;

pub use crate::reader::{encode, Encoding};
use crate::{
    char_traits::is_alpha,
    error::EmitError,
    event::{CollectionStyle, Event, Version, DEFAULT_TAGS},
    token::ScalarStyle,
};
use analysis::ScalarAnalysis;
use writer::ScalarWriter;

/// A convenience alias for emitter functions that may fail without returning a value.
pub type EmitResult = Result<(), EmitError>;

/// The tag plain scalars resolve to when nothing else matches.
const STR_TAG: &str = "tag:yaml.org,2002:str";

/// Keys longer than this (in characters, anchor and tag included) are written with `?`.
const MAX_SIMPLE_KEY_LENGTH: usize = 128;

/// Check whether the character is a line break the emitter keeps as is in scalars.
///
/// `\r` is not one of them: it is escaped.
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// The line break written at the end of lines.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default)]
pub enum LineBreak {
    /// `\n`.
    #[default]
    Lf,
    /// `\r\n`.
    CrLf,
    /// `\r`.
    Cr,
}

impl LineBreak {
    /// Return the line break native to the platform the crate is built for.
    #[must_use]
    pub fn platform() -> Self {
        if cfg!(windows) {
            LineBreak::CrLf
        } else {
            LineBreak::Lf
        }
    }

    /// Return the characters of the line break.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
            LineBreak::Cr => "\r",
        }
    }
}

/// The knobs of the [`Emitter`].
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct EmitterConfig {
    /// Write every tag, double-quote every scalar and use flow collections only.
    pub canonical: bool,
    /// The number of spaces per indentation level. Values outside `2..=9` stand for 2.
    pub indent: usize,
    /// The column after which lines are folded where possible. Values not larger than twice the
    /// indentation stand for 80.
    pub width: usize,
    /// The line break to write.
    pub line_break: LineBreak,
    /// Write non-ASCII characters as they are. If `false`, they are escaped in double quotes.
    pub allow_unicode: bool,
    /// Start every document with `---`.
    pub explicit_start: bool,
    /// End every document with `...`.
    pub explicit_end: bool,
    /// The encoding the text is meant to be stored in. Only decides whether a BOM is written.
    pub encoding: Encoding,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            canonical: false,
            indent: 2,
            width: 80,
            line_break: LineBreak::platform(),
            allow_unicode: true,
            explicit_start: false,
            explicit_end: false,
            encoding: Encoding::Utf8,
        }
    }
}

impl EmitterConfig {
    /// Return the indentation in use.
    #[must_use]
    pub fn best_indent(&self) -> usize {
        if (2..=9).contains(&self.indent) {
            self.indent
        } else {
            2
        }
    }

    /// Return the line width in use.
    #[must_use]
    pub fn best_width(&self) -> usize {
        if self.width > self.best_indent() * 2 {
            self.width
        } else {
            80
        }
    }
}

/// What the emitter expects next.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum EmitState {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    FirstFlowSequenceItem,
    FlowSequenceItem,
    FirstFlowMappingKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    FirstBlockSequenceItem,
    BlockSequenceItem,
    FirstBlockMappingKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    End,
}

/// Where the node being written stands.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
enum Context {
    /// The top node of a document.
    Root,
    /// An item of a sequence.
    Sequence,
    /// A complex key or a value of a mapping.
    Mapping,
    /// A key of a mapping, written without `?`.
    MappingSimpleKey,
}

/// Writes YAML text from a stream of [`Event`]s.
///
/// Events are fed one by one through [`Emitter::emit`]. Some are held back until enough of the
/// following ones are known (e.g.: whether a sequence is empty decides its style). All text is
/// written by the time [`Event::StreamEnd`] has been emitted.
///
/// The events must form a valid stream, as the [`Parser`] produces them. Otherwise, an
/// [`EmitError::Event`] is returned.
///
/// ```
/// # use yamlkit::{Emitter, Event, CollectionStyle};
/// let mut out = String::new();
/// let mut emitter = Emitter::new(&mut out);
/// for event in [
///     Event::StreamStart,
///     Event::DocumentStart { explicit: false, version: None, tags: vec![] },
///     Event::SequenceStart { anchor: None, tag: None, implicit: true, style: CollectionStyle::Any },
///     Event::plain("a"),
///     Event::plain("b"),
///     Event::SequenceEnd,
///     Event::DocumentEnd { explicit: false },
///     Event::StreamEnd,
/// ] {
///     emitter.emit(event).unwrap();
/// }
/// drop(emitter);
/// assert_eq!(out, "- a\n- b\n");
/// ```
///
/// [`Parser`]: crate::Parser
pub struct Emitter<'a> {
    /// The output for serialized YAML.
    writer: &'a mut dyn fmt::Write,
    config: EmitterConfig,
    /// Events waiting for their followers to be known.
    events: ArrayDeque<Event<'a>, 4>,
    state: EmitState,
    states: Vec<EmitState>,
    /// The indentation of the current collection. `None` before the root node.
    indent: Option<usize>,
    indents: Vec<Option<usize>>,
    flow_level: usize,
    context: Context,
    /// The current line (0-indexed).
    line: usize,
    /// The current column (0-indexed).
    column: usize,
    /// Whether the last character written is a whitespace or a line break.
    whitespace: bool,
    /// Whether nothing but indentation and `-`/`?`/`:` indicators is on the line.
    indention: bool,
    /// Whether the document may need a `...` before the next directives.
    open_ended: bool,
    /// Tag prefixes of the current document, mapped to their handle.
    tag_prefixes: BTreeMap<String, String>,
}

impl<'a> Emitter<'a> {
    /// Create a new emitter serializing into `writer`.
    pub fn new(writer: &'a mut dyn fmt::Write) -> Self {
        Self::with_config(writer, EmitterConfig::default())
    }

    /// Create a new emitter serializing into `writer` with the given configuration.
    pub fn with_config(writer: &'a mut dyn fmt::Write, config: EmitterConfig) -> Self {
        Self {
            writer,
            config,
            events: ArrayDeque::new(),
            state: EmitState::StreamStart,
            states: Vec::new(),
            indent: None,
            indents: Vec::new(),
            flow_level: 0,
            context: Context::Root,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            tag_prefixes: default_tag_prefixes(),
        }
    }

    /// Return the configuration of the emitter.
    #[must_use]
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Set canonical output on or off.
    ///
    /// Canonical output writes every tag, double-quotes scalars and uses only flow collections.
    pub fn canonical(&mut self, canonical: bool) {
        self.config.canonical = canonical;
    }

    /// Set the number of spaces per indentation level.
    ///
    /// Values outside `2..=9` are replaced with 2.
    pub fn indent(&mut self, indent: usize) {
        self.config.indent = indent;
    }

    /// Set the preferred line width.
    pub fn width(&mut self, width: usize) {
        self.config.width = width;
    }

    /// Set the line break to write.
    pub fn line_break(&mut self, line_break: LineBreak) {
        self.config.line_break = line_break;
    }

    /// Set whether non-ASCII characters may be written as they are.
    pub fn allow_unicode(&mut self, allow_unicode: bool) {
        self.config.allow_unicode = allow_unicode;
    }

    /// Set whether every document starts with `---`.
    pub fn explicit_start(&mut self, explicit_start: bool) {
        self.config.explicit_start = explicit_start;
    }

    /// Set whether every document ends with `...`.
    pub fn explicit_end(&mut self, explicit_end: bool) {
        self.config.explicit_end = explicit_end;
    }

    /// Set the encoding the output is meant for.
    ///
    /// UTF-16 and UTF-32 outputs start with a byte order mark.
    pub fn encoding(&mut self, encoding: Encoding) {
        self.config.encoding = encoding;
    }

    /// Return the line (0-indexed) the emitter is writing on.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Feed an event to the emitter.
    ///
    /// # Errors
    /// Returns an error if the event cannot follow the previous ones, if one of its anchor, tag
    /// or directives cannot be written, or if the writer fails.
    pub fn emit(&mut self, event: Event<'a>) -> EmitResult {
        debug_print!("emitter <- {event:?}");
        self.events
            .push_back(event)
            .map_err(|_| EmitError::Invalid("too many events held back"))?;
        while !self.need_more_events() {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            self.state_machine(&event)?;
        }
        Ok(())
    }

    /// Check whether the event at the front of the queue needs its followers to be written.
    fn need_more_events(&self) -> bool {
        let Some(front) = self.events.front() else {
            return true;
        };
        let count = match front {
            Event::DocumentStart { .. } => 1,
            Event::SequenceStart { .. } => 2,
            Event::MappingStart { .. } => 3,
            _ => return false,
        };
        let mut level = 0_isize;
        for event in self.events.iter().skip(1) {
            match event {
                Event::StreamStart
                | Event::DocumentStart { .. }
                | Event::SequenceStart { .. }
                | Event::MappingStart { .. } => level += 1,
                Event::DocumentEnd { .. } | Event::SequenceEnd | Event::MappingEnd => level -= 1,
                Event::StreamEnd => level = -1,
                Event::Alias(_) | Event::Scalar { .. } => {}
            }
            if level < 0 {
                return false;
            }
        }
        self.events.len() < count + 1
    }

    fn state_machine(&mut self, event: &Event<'a>) -> EmitResult {
        match self.state {
            EmitState::StreamStart => self.expect_stream_start(event),
            EmitState::FirstDocumentStart => self.expect_document_start(event, true),
            EmitState::DocumentStart => self.expect_document_start(event, false),
            EmitState::DocumentContent => {
                self.states.push(EmitState::DocumentEnd);
                self.expect_node(event, Context::Root)
            }
            EmitState::DocumentEnd => self.expect_document_end(event),
            EmitState::FirstFlowSequenceItem => self.expect_flow_sequence_item(event, true),
            EmitState::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            EmitState::FirstFlowMappingKey => self.expect_flow_mapping_key(event, true),
            EmitState::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            EmitState::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(event),
            EmitState::FlowMappingValue => self.expect_flow_mapping_value(event),
            EmitState::FirstBlockSequenceItem => self.expect_block_sequence_item(event, true),
            EmitState::BlockSequenceItem => self.expect_block_sequence_item(event, false),
            EmitState::FirstBlockMappingKey => self.expect_block_mapping_key(event, true),
            EmitState::BlockMappingKey => self.expect_block_mapping_key(event, false),
            EmitState::BlockMappingSimpleValue => self.expect_block_mapping_simple_value(event),
            EmitState::BlockMappingValue => self.expect_block_mapping_value(event),
            EmitState::End => Err(unexpected("nothing", event)),
        }
    }

    fn pop_state(&mut self) -> EmitState {
        self.states.pop().unwrap_or(EmitState::End)
    }

    fn pop_indent(&mut self) {
        self.indent = self.indents.pop().flatten();
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        let best_indent = self.config.best_indent();
        self.indent = match self.indent {
            None if flow => Some(best_indent),
            None => Some(0),
            Some(indent) if indentless => Some(indent),
            Some(indent) => Some(indent + best_indent),
        };
    }

    fn expect_stream_start(&mut self, event: &Event<'a>) -> EmitResult {
        let Event::StreamStart = event else {
            return Err(unexpected("StreamStart", event));
        };
        if self.config.encoding.needs_bom() {
            self.writer.write_char('\u{feff}')?;
        }
        self.state = EmitState::FirstDocumentStart;
        Ok(())
    }

    fn expect_document_start(&mut self, event: &Event<'a>, first: bool) -> EmitResult {
        match event {
            Event::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                if (version.is_some() || !tags.is_empty()) && self.open_ended {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                if let Some(version) = version {
                    let version = prepare_version(*version)?;
                    self.write_directive(&format!("%YAML {version}"))?;
                }
                self.tag_prefixes = default_tag_prefixes();
                for directive in tags {
                    let handle = prepare_tag_handle(&directive.handle)?;
                    let prefix = prepare_tag_prefix(&directive.prefix)?;
                    self.tag_prefixes
                        .insert(directive.prefix.to_string(), directive.handle.to_string());
                    self.write_directive(&format!("%TAG {handle} {prefix}"))?;
                }
                let implicit = first
                    && !explicit
                    && !self.config.explicit_start
                    && !self.config.canonical
                    && version.is_none()
                    && tags.is_empty()
                    && !self.check_empty_document();
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                    if self.config.canonical {
                        self.write_indent()?;
                    }
                }
                self.state = EmitState::DocumentContent;
                Ok(())
            }
            Event::StreamEnd => {
                if self.open_ended {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                self.state = EmitState::End;
                Ok(())
            }
            _ => Err(unexpected("DocumentStart", event)),
        }
    }

    fn expect_document_end(&mut self, event: &Event<'a>) -> EmitResult {
        let Event::DocumentEnd { explicit } = event else {
            return Err(unexpected("DocumentEnd", event));
        };
        self.write_indent()?;
        if *explicit || self.config.explicit_end {
            self.write_indicator("...", true, false, false)?;
            self.write_indent()?;
        }
        self.state = EmitState::DocumentStart;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn expect_node(&mut self, event: &Event<'a>, context: Context) -> EmitResult {
        self.context = context;
        match event {
            Event::Alias(name) => {
                let anchor = prepare_anchor(name)?;
                self.write_indicator(&format!("*{anchor}"), true, false, false)?;
                self.state = self.pop_state();
                Ok(())
            }
            Event::Scalar {
                anchor,
                tag,
                implicit,
                value,
                style,
            } => {
                self.process_anchor(anchor.as_deref())?;
                let analysis = ScalarAnalysis::analyze(value, self.config.allow_unicode);
                // A tag written out makes resolution irrelevant.
                let style = self.choose_scalar_style(*style, *implicit || tag.is_some(), analysis);
                self.process_scalar_tag(tag.as_deref(), *implicit, style)?;
                self.increase_indent(true, false);
                ScalarWriter::new(self, value, context != Context::MappingSimpleKey).write(style)?;
                self.pop_indent();
                self.state = self.pop_state();
                Ok(())
            }
            Event::SequenceStart {
                anchor,
                tag,
                implicit,
                style,
            } => {
                self.process_anchor(anchor.as_deref())?;
                self.process_collection_tag(tag.as_deref(), *implicit)?;
                if self.flow_level > 0
                    || self.config.canonical
                    || *style == CollectionStyle::Flow
                    || self.check_empty_sequence()
                {
                    self.write_indicator("[", true, true, false)?;
                    self.flow_level += 1;
                    self.increase_indent(true, false);
                    self.state = EmitState::FirstFlowSequenceItem;
                } else {
                    let indentless = matches!(context, Context::Mapping | Context::MappingSimpleKey)
                        && !self.indention;
                    self.increase_indent(false, indentless);
                    self.state = EmitState::FirstBlockSequenceItem;
                }
                Ok(())
            }
            Event::MappingStart {
                anchor,
                tag,
                implicit,
                style,
            } => {
                self.process_anchor(anchor.as_deref())?;
                self.process_collection_tag(tag.as_deref(), *implicit)?;
                if self.flow_level > 0
                    || self.config.canonical
                    || *style == CollectionStyle::Flow
                    || self.check_empty_mapping()
                {
                    self.write_indicator("{", true, true, false)?;
                    self.flow_level += 1;
                    self.increase_indent(true, false);
                    self.state = EmitState::FirstFlowMappingKey;
                } else {
                    self.increase_indent(false, false);
                    self.state = EmitState::FirstBlockMappingKey;
                }
                Ok(())
            }
            _ => Err(unexpected("a node", event)),
        }
    }

    fn expect_flow_sequence_item(&mut self, event: &Event<'a>, first: bool) -> EmitResult {
        if let Event::SequenceEnd = event {
            self.pop_indent();
            self.flow_level -= 1;
            if self.config.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.config.canonical || self.column > self.config.best_width() {
            self.write_indent()?;
        }
        self.states.push(EmitState::FlowSequenceItem);
        self.expect_node(event, Context::Sequence)
    }

    fn expect_flow_mapping_key(&mut self, event: &Event<'a>, first: bool) -> EmitResult {
        if let Event::MappingEnd = event {
            self.pop_indent();
            self.flow_level -= 1;
            if self.config.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.config.canonical || self.column > self.config.best_width() {
            self.write_indent()?;
        }
        if !self.config.canonical && self.check_simple_key(event)? {
            self.states.push(EmitState::FlowMappingSimpleValue);
            self.expect_node(event, Context::MappingSimpleKey)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitState::FlowMappingValue);
            self.expect_node(event, Context::Mapping)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self, event: &Event<'a>) -> EmitResult {
        self.write_indicator(":", false, false, false)?;
        self.states.push(EmitState::FlowMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_flow_mapping_value(&mut self, event: &Event<'a>) -> EmitResult {
        if self.config.canonical || self.column > self.config.best_width() {
            self.write_indent()?;
        }
        self.write_indicator(":", true, false, false)?;
        self.states.push(EmitState::FlowMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_block_sequence_item(&mut self, event: &Event<'a>, first: bool) -> EmitResult {
        if !first && matches!(event, Event::SequenceEnd) {
            self.pop_indent();
            self.state = self.pop_state();
            return Ok(());
        }
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitState::BlockSequenceItem);
        self.expect_node(event, Context::Sequence)
    }

    fn expect_block_mapping_key(&mut self, event: &Event<'a>, first: bool) -> EmitResult {
        if !first && matches!(event, Event::MappingEnd) {
            self.pop_indent();
            self.state = self.pop_state();
            return Ok(());
        }
        self.write_indent()?;
        if self.check_simple_key(event)? {
            self.states.push(EmitState::BlockMappingSimpleValue);
            self.expect_node(event, Context::MappingSimpleKey)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitState::BlockMappingValue);
            self.expect_node(event, Context::Mapping)
        }
    }

    fn expect_block_mapping_simple_value(&mut self, event: &Event<'a>) -> EmitResult {
        self.write_indicator(":", false, false, false)?;
        self.states.push(EmitState::BlockMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_block_mapping_value(&mut self, event: &Event<'a>) -> EmitResult {
        self.write_indent()?;
        self.write_indicator(":", true, false, true)?;
        self.states.push(EmitState::BlockMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn check_empty_sequence(&self) -> bool {
        matches!(self.events.front(), Some(Event::SequenceEnd))
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(self.events.front(), Some(Event::MappingEnd))
    }

    /// Check whether the document about to start holds nothing but an empty plain scalar.
    fn check_empty_document(&self) -> bool {
        matches!(
            self.events.front(),
            Some(Event::Scalar {
                anchor: None,
                tag: None,
                implicit: true,
                value,
                ..
            }) if value.is_empty()
        )
    }

    /// Check whether `event` can be written as a key without `?`.
    fn check_simple_key(&self, event: &Event<'a>) -> Result<bool, EmitError> {
        let mut length = 0;
        let simple = match event {
            Event::Alias(name) => {
                length += name.chars().count();
                true
            }
            Event::Scalar {
                anchor, tag, value, ..
            } => {
                length += self.properties_length(anchor.as_deref(), tag.as_deref())?;
                length += value.chars().count();
                let analysis = ScalarAnalysis::analyze(value, self.config.allow_unicode);
                !analysis.is_empty() && !analysis.is_multiline()
            }
            Event::SequenceStart { anchor, tag, .. } => {
                length += self.properties_length(anchor.as_deref(), tag.as_deref())?;
                self.check_empty_sequence()
            }
            Event::MappingStart { anchor, tag, .. } => {
                length += self.properties_length(anchor.as_deref(), tag.as_deref())?;
                self.check_empty_mapping()
            }
            _ => false,
        };
        Ok(simple && length < MAX_SIMPLE_KEY_LENGTH)
    }

    fn properties_length(&self, anchor: Option<&str>, tag: Option<&str>) -> Result<usize, EmitError> {
        let mut length = 0;
        if let Some(anchor) = anchor {
            length += prepare_anchor(anchor)?.chars().count();
        }
        if let Some(tag) = tag {
            length += self.prepare_tag(tag)?.chars().count();
        }
        Ok(length)
    }

    fn process_anchor(&mut self, anchor: Option<&str>) -> EmitResult {
        let Some(anchor) = anchor else {
            return Ok(());
        };
        let anchor = prepare_anchor(anchor)?;
        self.write_indicator(&format!("&{anchor}"), true, false, false)
    }

    /// Write the tag of a scalar, unless resolution would give it back.
    fn process_scalar_tag(&mut self, tag: Option<&str>, implicit: bool, style: ScalarStyle) -> EmitResult {
        let Some(tag) = tag else {
            return Ok(());
        };
        if !self.config.canonical {
            let implied = if style == ScalarStyle::Plain {
                implicit
            } else {
                tag == STR_TAG
            };
            if implied {
                return Ok(());
            }
        }
        let tag = self.prepare_tag(tag)?;
        self.write_indicator(&tag, true, false, false)
    }

    fn process_collection_tag(&mut self, tag: Option<&str>, implicit: bool) -> EmitResult {
        let Some(tag) = tag else {
            return Ok(());
        };
        if implicit && !self.config.canonical {
            return Ok(());
        }
        let tag = self.prepare_tag(tag)?;
        self.write_indicator(&tag, true, false, false)
    }

    /// Pick the style a scalar is written in.
    ///
    /// `plain_allowed` tells whether reading the scalar back as plain gives the right tag.
    fn choose_scalar_style(
        &self,
        requested: ScalarStyle,
        plain_allowed: bool,
        analysis: ScalarAnalysis,
    ) -> ScalarStyle {
        let simple_key = self.context == Context::MappingSimpleKey;
        if requested == ScalarStyle::DoubleQuoted || self.config.canonical {
            return ScalarStyle::DoubleQuoted;
        }
        if matches!(requested, ScalarStyle::Any | ScalarStyle::Plain)
            && plain_allowed
            && !(simple_key && (analysis.is_empty() || analysis.is_multiline()))
            && if self.flow_level > 0 {
                analysis.allow_flow_plain()
            } else {
                analysis.allow_block_plain()
            }
        {
            return ScalarStyle::Plain;
        }
        if matches!(requested, ScalarStyle::Literal | ScalarStyle::Folded)
            && self.flow_level == 0
            && !simple_key
            && analysis.allow_block()
        {
            return requested;
        }
        if matches!(
            requested,
            ScalarStyle::Any | ScalarStyle::Plain | ScalarStyle::SingleQuoted
        ) && analysis.allow_single_quoted()
            && !(simple_key && analysis.is_multiline())
        {
            return ScalarStyle::SingleQuoted;
        }
        debug_assert!(analysis.allow_double_quoted());
        ScalarStyle::DoubleQuoted
    }

    /// Shorten `tag` with the handles of the document, or write it verbatim.
    fn prepare_tag(&self, tag: &str) -> Result<String, EmitError> {
        if tag.is_empty() {
            return Err(EmitError::Invalid("tag must not be empty"));
        }
        if tag == "!" {
            return Ok(tag.to_owned());
        }
        let mut handle = None;
        let mut suffix = tag;
        // The map is sorted: the last match is the most specific prefix.
        for (prefix, prefix_handle) in &self.tag_prefixes {
            if tag.starts_with(prefix.as_str()) && (prefix == "!" || prefix.len() < tag.len()) {
                handle = Some(prefix_handle.as_str());
                suffix = &tag[prefix.len()..];
            }
        }
        let mut text = String::with_capacity(tag.len());
        for c in suffix.chars() {
            let keep = is_alpha(c)
                || "-;/?:@&=+$._~*'()".contains(c)
                || (c == '!' && handle != Some("!"))
                || (handle.is_none() && "[],".contains(c));
            if keep {
                text.push(c);
            } else {
                percent_encode(c, &mut text);
            }
        }
        Ok(match handle {
            Some(handle) => format!("{handle}{text}"),
            None => format!("!<{text}>"),
        })
    }

    fn write_directive(&mut self, directive: &str) -> EmitResult {
        self.write_raw(directive)?;
        self.write_line_break(None)
    }

    /// Write `data`, which holds no line break.
    fn write_raw(&mut self, data: &str) -> EmitResult {
        self.column += data.chars().count();
        self.writer.write_str(data)?;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) -> EmitResult {
        if need_whitespace && !self.whitespace {
            self.write_raw(" ")?;
        }
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
        self.open_ended = false;
        self.write_raw(indicator)
    }

    /// Move to the indentation of the current collection, breaking the line if needed.
    fn write_indent(&mut self) -> EmitResult {
        let indent = self.indent.unwrap_or(0);
        if !self.indention || self.column > indent || (self.column == indent && !self.whitespace) {
            self.write_line_break(None)?;
        }
        if self.column < indent {
            self.whitespace = true;
            write!(self.writer, "{:width$}", "", width = indent - self.column)?;
            self.column = indent;
        }
        Ok(())
    }

    /// Write a line break: `c` if given, the configured one otherwise.
    fn write_line_break(&mut self, c: Option<char>) -> EmitResult {
        match c {
            Some(c) => self.writer.write_char(c)?,
            None => self.writer.write_str(self.config.line_break.as_str())?,
        }
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
        Ok(())
    }
}

fn unexpected(expected: &'static str, event: &Event<'_>) -> EmitError {
    EmitError::Event {
        expected,
        found: event.name(),
    }
}

/// The tag prefixes every document starts with, mapped to their handle.
fn default_tag_prefixes() -> BTreeMap<String, String> {
    DEFAULT_TAGS
        .iter()
        .map(|(handle, prefix)| ((*prefix).to_owned(), (*handle).to_owned()))
        .collect()
}

fn prepare_version(version: Version) -> Result<String, EmitError> {
    if version.major != 1 {
        return Err(EmitError::Invalid("unsupported YAML version"));
    }
    Ok(format!("{}.{}", version.major, version.minor))
}

fn prepare_tag_handle(handle: &str) -> Result<&str, EmitError> {
    if handle.is_empty() {
        return Err(EmitError::Invalid("tag handle must not be empty"));
    }
    if !handle.starts_with('!') || !handle.ends_with('!') {
        return Err(EmitError::Invalid("tag handle must start and end with '!'"));
    }
    if handle.len() > 2 && !handle[1..handle.len() - 1].chars().all(is_alpha) {
        return Err(EmitError::Invalid("invalid character in the tag handle"));
    }
    Ok(handle)
}

fn prepare_tag_prefix(prefix: &str) -> Result<String, EmitError> {
    if prefix.is_empty() {
        return Err(EmitError::Invalid("tag prefix must not be empty"));
    }
    let mut text = String::with_capacity(prefix.len());
    for (index, c) in prefix.chars().enumerate() {
        if (index == 0 && c == '!') || is_alpha(c) || "-;/?!:@&=+$,_.~*'()[]".contains(c) {
            text.push(c);
        } else {
            percent_encode(c, &mut text);
        }
    }
    Ok(text)
}

fn prepare_anchor(anchor: &str) -> Result<&str, EmitError> {
    if anchor.is_empty() {
        return Err(EmitError::Invalid("anchor must not be empty"));
    }
    if !anchor.chars().all(is_alpha) {
        return Err(EmitError::Invalid("invalid character in the anchor"));
    }
    Ok(anchor)
}

/// Append the `%XX` escapes of the UTF-8 bytes of `c` to `text`.
fn percent_encode(c: char, text: &mut String) {
    let mut bytes = [0; 4];
    for byte in c.encode_utf8(&mut bytes).bytes() {
        // Writing to a `String` cannot fail.
        let _ = write!(text, "%{byte:02X}");
    }
}
