use std::{env, fs, process::ExitCode, sync::Arc};

use yamlkit::{
    decode, CollectionStyle, Event, Parser, Reader, ScalarStyle, Span, SpannedEventReceiver,
};

/// Prints the events it receives in the yaml-test-suite notation.
struct EventSink {
    /// Whether to print the span of each event after it.
    spans: bool,
}

impl<'a> SpannedEventReceiver<'a> for EventSink {
    fn on_event(&mut self, ev: Event<'a>, span: Span) {
        if self.spans {
            println!("{:<40} \x1B[;34m{}-{}\x1B[;m", notation(&ev), span.start, span.end);
        } else {
            println!("{}", notation(&ev));
        }
    }
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
    let mut text = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => text.push_str("\\\\"),
            '\0' => text.push_str("\\0"),
            '\x08' => text.push_str("\\b"),
            '\n' => text.push_str("\\n"),
            '\r' => text.push_str("\\r"),
            '\t' => text.push_str("\\t"),
            c => text.push(c),
        }
    }
    text
}

fn notation(ev: &Event<'_>) -> String {
    match ev {
        Event::StreamStart => "+STR".into(),
        Event::StreamEnd => "-STR".into(),
        Event::DocumentStart { explicit, .. } => {
            if *explicit {
                "+DOC ---".into()
            } else {
                "+DOC".into()
            }
        }
        Event::DocumentEnd { explicit } => {
            if *explicit {
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
            let flow = if *style == CollectionStyle::Flow { " []" } else { "" };
            format!("+SEQ{flow}{}", properties(anchor.as_deref(), tag.as_deref()))
        }
        Event::SequenceEnd => "-SEQ".into(),
        Event::MappingStart {
            anchor, tag, style, ..
        } => {
            let flow = if *style == CollectionStyle::Flow { " {}" } else { "" };
            format!("+MAP{flow}{}", properties(anchor.as_deref(), tag.as_deref()))
        }
        Event::MappingEnd => "-MAP".into(),
    }
}

fn main() -> ExitCode {
    let args: Vec<_> = env::args().collect();
    let (filename, spans) = match args.as_slice() {
        [_, filename] => (filename, false),
        [_, flag, filename] if flag == "--spans" => (filename, true),
        _ => {
            eprintln!("Usage: dump_events [--spans] <file.yaml>");
            return ExitCode::FAILURE;
        }
    };

    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{filename}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let name: Arc<str> = filename.as_str().into();
    let (text, encoding) = match decode(&bytes, &name) {
        Ok(decoded) => decoded,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let reader = match Reader::with_name(&text, name) {
        Ok(reader) => reader.with_encoding(encoding),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut sink = EventSink { spans };
    if let Err(e) = Parser::new(reader).load(&mut sink, true) {
        eprintln!("\x1B[;31m{e}\x1B[;m");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
