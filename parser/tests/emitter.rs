use std::borrow::Cow;

use yamlkit::{
    decode, encode, CollectionStyle, EmitError, Emitter, EmitterConfig, Encoding, Event,
    LineBreak, Parser, ScalarStyle, Span,
};

fn config() -> EmitterConfig {
    EmitterConfig {
        line_break: LineBreak::Lf,
        ..EmitterConfig::default()
    }
}

fn emit_events(events: Vec<Event<'_>>, config: EmitterConfig) -> Result<String, EmitError> {
    let mut out = String::new();
    {
        let mut emitter = Emitter::with_config(&mut out, config);
        for event in events {
            emitter.emit(event)?;
        }
    }
    Ok(out)
}

fn parse(text: &str) -> Vec<Event<'_>> {
    Parser::new_from_str(text)
        .map(|x| x.unwrap().0)
        .collect()
}

/// Parse the text, emit its events, and check the output parses into the same events.
fn roundtrip(text: &str, config: EmitterConfig) -> String {
    let events = parse(text);
    let out = emit_events(events.clone(), config).unwrap();
    assert_eq!(parse(&out), events, "{out}");
    out
}

fn document(content: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut events = vec![
        Event::StreamStart,
        Event::DocumentStart {
            explicit: false,
            version: None,
            tags: vec![],
        },
    ];
    events.extend(content);
    events.extend([Event::DocumentEnd { explicit: false }, Event::StreamEnd]);
    events
}

fn scalar(value: &str, style: ScalarStyle) -> Event<'_> {
    Event::Scalar {
        anchor: None,
        tag: None,
        implicit: true,
        value: Cow::Borrowed(value),
        style,
    }
}

/// Emit a lone scalar and return the style it is read back with.
fn written_style(value: &str, requested: ScalarStyle) -> ScalarStyle {
    let out = emit_events(document(vec![scalar(value, requested)]), config()).unwrap();
    let events = parse(&out);
    let Event::Scalar {
        value: read, style, ..
    } = &events[2]
    else {
        panic!("expected a scalar in {out:?}");
    };
    assert_eq!(read, value, "{out:?}");
    *style
}

#[test]
fn test_empty_value() {
    let events = document(vec![
        Event::MappingStart {
            anchor: None,
            tag: None,
            implicit: true,
            style: CollectionStyle::Any,
        },
        Event::plain("key"),
        Event::empty_scalar(),
        Event::MappingEnd,
    ]);
    let out = emit_events(events.clone(), config()).unwrap();
    assert_eq!(out, "key: \n");
    let config = EmitterConfig {
        explicit_start: true,
        ..config()
    };
    assert_eq!(emit_events(events, config).unwrap(), "---\nkey: \n");
}

#[test]
fn test_root_scalars() {
    assert_eq!(
        emit_events(document(vec![Event::plain("a")]), config()).unwrap(),
        "a\n...\n"
    );
    assert_eq!(
        emit_events(document(vec![scalar("a", ScalarStyle::SingleQuoted)]), config()).unwrap(),
        "'a'\n"
    );
}

#[test]
fn test_style_fallbacks() {
    for value in [" a", "a ", "- a", "a: b", "#a", "a #b", "---", "[a]", "&a"] {
        let style = written_style(value, ScalarStyle::Plain);
        assert_eq!(style, ScalarStyle::SingleQuoted, "{value:?}");
        let style = written_style(value, ScalarStyle::Literal);
        assert_ne!(style, ScalarStyle::Plain, "{value:?}");
    }
    assert_eq!(written_style(" a", ScalarStyle::Literal), ScalarStyle::Literal);
    assert_ne!(written_style("a ", ScalarStyle::Folded), ScalarStyle::Folded);
    assert_eq!(
        written_style("a\t\nb", ScalarStyle::SingleQuoted),
        ScalarStyle::DoubleQuoted
    );
    assert_eq!(
        written_style("a\u{1}b", ScalarStyle::Any),
        ScalarStyle::DoubleQuoted
    );
    assert_eq!(written_style("line\n", ScalarStyle::Literal), ScalarStyle::Literal);
    assert_eq!(written_style("a\nb", ScalarStyle::Plain), ScalarStyle::SingleQuoted);
}

#[test]
fn test_line_breaks_in_every_style() {
    let values = [
        "a\nb",
        "a\u{85}b",
        "a\u{2028}b",
        "a\u{2029}b",
        "a\r\nb",
        "\na",
        "a\n\n",
        "a\n b",
    ];
    for requested in [
        ScalarStyle::Literal,
        ScalarStyle::Folded,
        ScalarStyle::SingleQuoted,
    ] {
        for value in values {
            written_style(value, requested);
        }
    }
    for requested in [
        ScalarStyle::Any,
        ScalarStyle::Literal,
        ScalarStyle::Folded,
        ScalarStyle::SingleQuoted,
    ] {
        assert_eq!(
            written_style("a\u{85}b", requested),
            ScalarStyle::DoubleQuoted,
            "{requested:?}"
        );
    }
    assert_eq!(
        written_style("a\u{2028}b", ScalarStyle::Literal),
        ScalarStyle::Literal
    );
    assert_eq!(written_style("a\n b", ScalarStyle::Folded), ScalarStyle::Folded);
}

#[test]
fn test_roundtrip_block_document() {
    let s = "key: value
list:
- a
- 'b c'
- \"d\\te\"
nested:
  inner: [1, 2, {x: y}]
text: |
  line one
  line two
folded: >
  some folded
  text
anchors:
- &a one
- *a
tagged: !!str 42
empty:
";
    let out = roundtrip(s, config());
    assert!(out.starts_with("key: value\nlist:\n- a\n- 'b c'\n"), "{out}");
    assert!(out.contains("  inner: [1, 2, {x: y}]\n"), "{out}");
    assert!(out.contains("text: |\n  line one\n  line two\n"), "{out}");
    assert!(out.contains("- &a one\n- *a\n"), "{out}");
    assert!(out.contains("tagged: !!str 42\n"), "{out}");
}

#[test]
fn test_roundtrip_multiple_documents() {
    let s = "a\n--- b\n...\n";
    assert_eq!(roundtrip(s, config()), s);
    roundtrip("%YAML 1.1\n--- !!map\n? [a, b]\n: c\n", config());
    roundtrip("- ? complex\n  : key\n- {}\n- []\n", config());
}

#[test]
fn test_canonical() {
    let text = "a: 1";
    let config = EmitterConfig {
        canonical: true,
        ..config()
    };
    let out = emit_events(parse(text), config).unwrap();
    assert_eq!(out, "---\n{\n  ? \"a\"\n  : \"1\",\n}\n");
    let values: Vec<_> = parse(&out)
        .into_iter()
        .filter_map(|event| match event {
            Event::Scalar { value, style, .. } => Some((value.into_owned(), style)),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        [
            ("a".to_owned(), ScalarStyle::DoubleQuoted),
            ("1".to_owned(), ScalarStyle::DoubleQuoted)
        ]
    );
}

#[test]
fn test_indent_and_line_break() {
    let text = "a:\n  b: c\n  d:\n  - e\n";
    let out = roundtrip(
        text,
        EmitterConfig {
            indent: 4,
            ..config()
        },
    );
    assert_eq!(out, "a:\n    b: c\n    d:\n    - e\n");

    let out = emit_events(
        parse("- a\n- b\n"),
        EmitterConfig {
            line_break: LineBreak::CrLf,
            ..config()
        },
    )
    .unwrap();
    assert_eq!(out, "- a\r\n- b\r\n");
}

#[test]
fn test_width() {
    let value = ["word"; 20].join(" ");
    let text = format!("- {value}\n- '{value}'\n- \"{value}\"\n");
    let out = roundtrip(
        &text,
        EmitterConfig {
            width: 20,
            ..config()
        },
    );
    assert!(out.lines().count() > 3, "{out}");
    assert!(out.lines().all(|line| line.chars().count() < 30), "{out}");
}

#[test]
fn test_unicode() {
    let events = document(vec![Event::plain("café")]);
    let out = emit_events(events.clone(), config()).unwrap();
    assert_eq!(out, "café\n...\n");
    let out = emit_events(
        events,
        EmitterConfig {
            allow_unicode: false,
            ..config()
        },
    )
    .unwrap();
    assert_eq!(out, "\"caf\\xE9\"\n");
    assert_eq!(parse(&out)[2], scalar_dq("café"));
}

fn scalar_dq(value: &str) -> Event<'_> {
    Event::Scalar {
        anchor: None,
        tag: None,
        implicit: false,
        value: Cow::Borrowed(value),
        style: ScalarStyle::DoubleQuoted,
    }
}

#[test]
fn test_encoding_bom() {
    let config = EmitterConfig {
        encoding: Encoding::Utf16Le,
        ..config()
    };
    let out = emit_events(parse("- ü\n"), config).unwrap();
    assert!(out.starts_with('\u{feff}'));
    let bytes = encode(&out, Encoding::Utf16Le);
    assert_eq!(&bytes[..2], b"\xFF\xFE");

    let (text, encoding) = decode(&bytes, &"<bytes>".into()).unwrap();
    assert_eq!(encoding, Encoding::Utf16Le);
    assert_eq!(text, "- ü\n");
}

#[test]
fn test_invalid_streams() {
    let err = emit_events(vec![Event::plain("a")], config()).unwrap_err();
    assert_eq!(
        err,
        EmitError::Event {
            expected: "StreamStart",
            found: "Scalar"
        }
    );

    let err = emit_events(
        document(vec![Event::SequenceEnd, Event::SequenceEnd]),
        config(),
    )
    .unwrap_err();
    assert!(matches!(err, EmitError::Event { .. }), "{err}");

    let anchored = Event::Scalar {
        anchor: Some("".into()),
        tag: None,
        implicit: true,
        value: "a".into(),
        style: ScalarStyle::Any,
    };
    let err = emit_events(document(vec![anchored]), config()).unwrap_err();
    assert_eq!(err, EmitError::Invalid("anchor must not be empty"));
}

#[test]
fn test_line() {
    let mut out = String::new();
    let mut emitter = Emitter::with_config(&mut out, config());
    for event in document(vec![
        Event::SequenceStart {
            anchor: None,
            tag: None,
            implicit: true,
            style: CollectionStyle::Block,
        },
        Event::plain("a"),
        Event::plain("b"),
        Event::plain("c"),
        Event::SequenceEnd,
    ]) {
        emitter.emit(event).unwrap();
    }
    assert_eq!(emitter.line(), 3);
}

#[test]
fn test_flow_sequence_from_parser() {
    let events: Vec<(Event<'_>, Span)> = Parser::new_from_str("[a, b]")
        .map(Result::unwrap)
        .collect();
    let out = emit_events(events.into_iter().map(|(event, _)| event).collect(), config()).unwrap();
    assert_eq!(out, "[a, b]\n");
}
