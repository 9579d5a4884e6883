//! Runs the parser over every `.yaml` file in `tests/event-suite`.
//!
//! A case is either a `.events` file, listing the events the input produces in the yaml-test-suite
//! notation, or a `.error` file, holding a substring of the error the input must fail with. The
//! events of the passing cases are also written back through the emitter, and the output must
//! read as the same events.

use std::{fs, path::Path, sync::Arc};

use libtest_mimic::{Arguments, Failed, Trial};

use yamlkit::{
    decode, CollectionStyle, Emitter, EmitterConfig, Event, LineBreak, Parser, Reader, ScalarStyle,
};

type Result<T, E = Box<dyn std::error::Error>> = std::result::Result<T, E>;

enum Expected {
    Events(String),
    Error(String),
}

struct EventCase {
    name: Arc<str>,
    yaml: Vec<u8>,
    expected: Expected,
}

fn main() -> Result<()> {
    let arguments = Arguments::from_args();
    let mut trials = vec![];
    for entry in fs::read_dir("tests/event-suite")? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "yaml") {
            continue;
        }
        let case = load_case(&path)?;
        trials.push(Trial::test(case.name.to_string(), move || run_case(&case)));
    }
    trials.sort_by(|a, b| a.name().cmp(b.name()));

    libtest_mimic::run(&arguments, trials).exit();
}

fn load_case(path: &Path) -> Result<EventCase> {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| format!("{}: not a file", path.display()))?;
    let events_path = path.with_extension("events");
    let error_path = path.with_extension("error");
    let expected = if events_path.exists() {
        Expected::Events(fs::read_to_string(events_path)?)
    } else if error_path.exists() {
        Expected::Error(fs::read_to_string(error_path)?)
    } else {
        return Err(format!("{}: no .events or .error file", path.display()).into());
    };
    Ok(EventCase {
        name: name.into(),
        yaml: fs::read(path)?,
        expected,
    })
}

fn run_case(case: &EventCase) -> Result<(), Failed> {
    match &case.expected {
        Expected::Events(expected) => {
            let events = parse(&case.yaml, &case.name)
                .map_err(|e| failure(case, &format!("unexpected error: {e}")))?;
            let actual = notation_of(&events, false);
            if actual != expected.trim_end() {
                return Err(failure(case, &format!("events differ, got:\n{actual}")));
            }

            let out = emit(&events).map_err(|e| failure(case, &format!("emitter failed: {e}")))?;
            let reread = parse(out.as_bytes(), &case.name)
                .map_err(|e| failure(case, &format!("emitted text failed: {e}\n{out}")))?;
            if notation_of(&reread, true) != notation_of(&events, true) {
                return Err(failure(case, &format!("emitted text reads differently:\n{out}")));
            }
            Ok(())
        }
        Expected::Error(expected) => match parse(&case.yaml, &case.name) {
            Ok(events) => Err(failure(
                case,
                &format!("no error when expected, got:\n{}", notation_of(&events, false)),
            )),
            Err(e) if e.contains(expected.trim()) => Ok(()),
            Err(e) => Err(failure(case, &format!("unexpected error: {e}"))),
        },
    }
}

// Enrich the message with the failing input.
fn failure(case: &EventCase, msg: &str) -> Failed {
    let visual = String::from_utf8_lossy(&case.yaml)
        .replace('\t', "»")
        .replace(' ', "␣");
    Failed::from(format!("{msg}\n### Input:\n{visual}\n### End"))
}

fn parse(yaml: &[u8], name: &Arc<str>) -> Result<Vec<Event<'static>>, String> {
    let (text, encoding) = decode(yaml, name).map_err(|e| e.to_string())?;
    let reader = Reader::with_name(&text, name.clone())
        .map_err(|e| e.to_string())?
        .with_encoding(encoding);
    Parser::new(reader)
        .map(|x| x.map(|(event, _)| event.into_owned()).map_err(|e| e.to_string()))
        .collect()
}

fn emit(events: &[Event<'_>]) -> Result<String, yamlkit::EmitError> {
    let mut out = String::new();
    {
        let mut emitter = Emitter::with_config(
            &mut out,
            EmitterConfig {
                line_break: LineBreak::Lf,
                ..EmitterConfig::default()
            },
        );
        for event in events {
            emitter.emit(event.clone())?;
        }
    }
    Ok(out)
}

fn notation_of(events: &[Event<'_>], presentation_free: bool) -> String {
    events
        .iter()
        .map(|ev| notation(ev, presentation_free))
        .collect::<Vec<_>>()
        .join("\n")
}

fn properties(anchor: Option<&str>, tag: Option<&str>) -> String {
    let mut text = String::new();
    if let Some(anchor) = anchor {
        text.push_str(" &");
        text.push_str(anchor);
    }
    if let Some(tag) = tag {
        text.push_str(" <");
        text.push_str(tag);
        text.push('>');
    }
    text
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Write the event in the yaml-test-suite notation.
///
/// When `presentation_free` is set, document markers, scalar styles and collection styles are
/// left out, as the emitter is free to pick its own.
fn notation(ev: &Event<'_>, presentation_free: bool) -> String {
    match ev {
        Event::StreamStart => "+STR".into(),
        Event::StreamEnd => "-STR".into(),
        Event::DocumentStart { explicit, .. } => {
            if *explicit && !presentation_free {
                "+DOC ---".into()
            } else {
                "+DOC".into()
            }
        }
        Event::DocumentEnd { explicit } => {
            if *explicit && !presentation_free {
                "-DOC ...".into()
            } else {
                "-DOC".into()
            }
        }
        Event::Alias(name) => format!("=ALI *{name}"),
        Event::Scalar {
            anchor,
            tag,
            value,
            style,
            ..
        } => {
            let indicator = match style {
                _ if presentation_free => ':',
                ScalarStyle::Any | ScalarStyle::Plain => ':',
                ScalarStyle::SingleQuoted => '\'',
                ScalarStyle::DoubleQuoted => '"',
                ScalarStyle::Literal => '|',
                ScalarStyle::Folded => '>',
            };
            format!(
                "=VAL{} {indicator}{}",
                properties(anchor.as_deref(), tag.as_deref()),
                escape(value)
            )
        }
        Event::SequenceStart {
            anchor, tag, style, ..
        } => {
            let flow = if *style == CollectionStyle::Flow && !presentation_free {
                " []"
            } else {
                ""
            };
            format!("+SEQ{flow}{}", properties(anchor.as_deref(), tag.as_deref()))
        }
        Event::SequenceEnd => "-SEQ".into(),
        Event::MappingStart {
            anchor, tag, style, ..
        } => {
            let flow = if *style == CollectionStyle::Flow && !presentation_free {
                " {}"
            } else {
                ""
            };
            format!("+MAP{flow}{}", properties(anchor.as_deref(), tag.as_deref()))
        }
        Event::MappingEnd => "-MAP".into(),
    }
}
