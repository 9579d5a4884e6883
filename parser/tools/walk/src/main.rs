use std::sync::Arc;

use hashlink::LinkedHashMap;
use miette::{bail, Diagnostic, NamedSource, Result, SourceSpan};
use rustyline::{error::ReadlineError, DefaultEditor};
use thiserror::Error;
use yamlkit::{decode, Event, Marker, NodeKind, Parser, Reader, Resolver, ScalarStyle, Span};

/// A REPL to step through the events of a YAML stream, showing the source of each.
///
/// See [`read_action`] for commands.
fn main() -> Result<()> {
    let args: Vec<_> = std::env::args().collect();
    let [_, filename] = args.as_slice() else {
        eprintln!("Usage: walk <file.yaml>");
        return Ok(());
    };
    let bytes = std::fs::read(filename).map_err(|e| miette::miette!("{filename}: {e}"))?;
    let name: Arc<str> = filename.as_str().into();
    let (contents, encoding) = decode(&bytes, &name).map_err(|e| miette::miette!("{e}"))?;
    let reader = Reader::with_name(&contents, name)
        .map_err(|e| miette::miette!("{e}"))?
        .with_encoding(encoding);

    let mut events = vec![];
    for event in Parser::new(reader) {
        match event {
            Ok(event) => events.push(event),
            Err(e) => {
                let mark = e.marker().copied().unwrap_or_default();
                return Err(WalkError {
                    message: e.to_string(),
                    src: NamedSource::new(filename, contents.to_string()),
                    span: source_span(&contents, Span::new(mark, mark)),
                }
                .into());
            }
        }
    }
    walk(filename, &contents, &events)
}

struct Walker<'a, 'input> {
    events: &'a [(Event<'input>, Span)],
    /// The index of the current event.
    current: usize,
    /// The event index of every anchored node, by anchor name.
    anchors: LinkedHashMap<&'a str, usize>,
    resolver: Resolver,
}

fn walk(filename: &str, contents: &str, events: &[(Event<'_>, Span)]) -> Result<()> {
    let mut walker = Walker {
        events,
        current: 0,
        anchors: LinkedHashMap::new(),
        resolver: Resolver::default(),
    };
    for (index, (event, _)) in events.iter().enumerate() {
        if let Some(anchor) = anchor_of(event) {
            walker.anchors.insert(anchor, index);
        }
    }
    let mut io = DefaultEditor::new().map_err(|e| miette::miette!("{e}"))?;

    print(filename, contents, &walker);
    loop {
        let res = match read_action(&mut io) {
            Action::Next => walker.next(),
            Action::Prev => walker.prev(),
            Action::SkipNode => walker.skip_node(),
            Action::Fin => walker.fin(),
            Action::Alias => walker.follow_alias(),
            Action::Anchors => {
                for (name, index) in &walker.anchors {
                    println!("&{name} -> event {index}");
                }
                continue;
            }
            Action::Stop => break,
        };

        match res {
            Ok(()) => {
                io.clear_screen().map_err(|e| miette::miette!("{e}"))?;
                print(filename, contents, &walker);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn anchor_of<'a>(event: &'a Event<'_>) -> Option<&'a str> {
    match event {
        Event::Scalar { anchor, .. }
        | Event::SequenceStart { anchor, .. }
        | Event::MappingStart { anchor, .. } => anchor.as_deref(),
        _ => None,
    }
}

/// Describe the event, with the tag a resolver gives to its node.
fn describe(event: &Event<'_>, resolver: &Resolver) -> String {
    match event {
        Event::Scalar {
            tag,
            implicit,
            value,
            style,
            ..
        } => {
            let tag = match tag {
                Some(tag) => tag.to_string(),
                None => {
                    let implicit = *implicit && *style == ScalarStyle::Plain;
                    resolver.resolve(NodeKind::Scalar, value, implicit).to_owned()
                }
            };
            format!("Scalar {value:?} ({style:?}, {tag})")
        }
        Event::SequenceStart { tag, .. } => format!(
            "SequenceStart ({})",
            tag.as_deref()
                .unwrap_or(resolver.resolve(NodeKind::Sequence, "", false))
        ),
        Event::MappingStart { tag, .. } => format!(
            "MappingStart ({})",
            tag.as_deref()
                .unwrap_or(resolver.resolve(NodeKind::Mapping, "", false))
        ),
        Event::Alias(name) => format!("Alias *{name}"),
        other => other.name().to_string(),
    }
}

impl Walker<'_, '_> {
    fn next(&mut self) -> Result<()> {
        if self.current + 1 >= self.events.len() {
            bail!("Reached the end of the stream");
        }
        self.current += 1;
        Ok(())
    }

    fn prev(&mut self) -> Result<()> {
        if self.current == 0 {
            bail!("Already at the beginning of the stream");
        }
        self.current -= 1;
        Ok(())
    }

    /// Move to the event that follows the current node.
    fn skip_node(&mut self) -> Result<()> {
        let mut depth = 0_usize;
        for (index, (event, _)) in self.events.iter().enumerate().skip(self.current) {
            match event {
                Event::SequenceStart { .. } | Event::MappingStart { .. } => depth += 1,
                Event::SequenceEnd | Event::MappingEnd => {
                    if depth == 0 {
                        bail!("Not on a node");
                    }
                    depth -= 1;
                }
                Event::Scalar { .. } | Event::Alias(_) => {}
                _ => bail!("Not on a node"),
            }
            if depth == 0 {
                if index + 1 >= self.events.len() {
                    bail!("Reached the end of the stream");
                }
                self.current = index + 1;
                return Ok(());
            }
        }
        bail!("Unterminated collection");
    }

    /// Move to the start of the collection holding the current event.
    fn fin(&mut self) -> Result<()> {
        let mut depth = 0_usize;
        for index in (0..self.current).rev() {
            match self.events[index].0 {
                Event::SequenceEnd | Event::MappingEnd => depth += 1,
                Event::SequenceStart { .. } | Event::MappingStart { .. } => {
                    if depth == 0 {
                        self.current = index;
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        bail!("Already at the top-level");
    }

    fn follow_alias(&mut self) -> Result<()> {
        let Event::Alias(name) = &self.events[self.current].0 else {
            bail!("Not on an alias");
        };
        match self.anchors.get(&**name) {
            Some(&index) => {
                self.current = index;
                Ok(())
            }
            None => bail!("Unknown anchor &{name}"),
        }
    }
}

/// Convert a span of character positions into a span of byte offsets.
fn source_span(contents: &str, span: Span) -> SourceSpan {
    let offset = |mark: Marker| {
        contents
            .char_indices()
            .nth(mark.index())
            .map_or(contents.len(), |(offset, _)| offset)
    };
    let start = offset(span.start);
    (start, offset(span.end) - start).into()
}

fn print(filename: &str, contents: &str, walker: &Walker<'_, '_>) {
    let (event, span) = &walker.events[walker.current];
    eprintln!(
        "{:?}",
        miette::Error::new(CurrentEvent {
            src: NamedSource::new(filename, contents.to_string()),
            span: source_span(contents, *span),
            description: describe(event, &walker.resolver),
        })
    );
}

#[derive(Error, Debug, Diagnostic)]
#[error("event {description}")]
#[diagnostic()]
pub struct CurrentEvent {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    description: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
#[diagnostic()]
pub struct WalkError {
    message: String,
    #[source_code]
    src: NamedSource<String>,
    #[label("error")]
    span: SourceSpan,
}

enum Action {
    Next,
    Prev,
    SkipNode,
    Fin,
    Alias,
    Anchors,
    Stop,
}

/// Read a command:
///
///   - `n`, `next`: move to the next event
///   - `p`, `prev`: move to the previous event
///   - `s`, `skip`: move past the current node
///   - `fin`, `up`: move to the start of the enclosing collection
///   - `a`, `alias`: move to the node the current alias refers to
///   - `anchors`: list the anchors of the stream
///   - `q`, `quit`: leave
fn read_action(io: &mut DefaultEditor) -> Action {
    loop {
        match io.readline(">> ") {
            Ok(line) => match line.as_str() {
                "q" | "quit" => return Action::Stop,
                "n" | "next" | "" => return Action::Next,
                "p" | "prev" => return Action::Prev,
                "s" | "skip" => return Action::SkipNode,
                "fin" | "out" | "up" => return Action::Fin,
                "a" | "alias" => return Action::Alias,
                "anchors" => return Action::Anchors,
                _ => {}
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Action::Stop,
            Err(e) => {
                eprintln!("{e}");
                return Action::Stop;
            }
        }
    }
}
