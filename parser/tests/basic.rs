#![allow(clippy::bool_assert_comparison)]

use std::borrow::Cow;

use yamlkit::{
    CollectionStyle, Error, Event, EventReceiver, Parser, ScalarStyle, TagDirective, Version,
};

/// Run the parser through the string, dropping the spans.
fn run_parser(input: &str) -> Result<Vec<Event<'_>>, Error> {
    let mut events = vec![];
    for x in Parser::new_from_str(input) {
        events.push(x?.0);
    }
    Ok(events)
}

fn doc_start(explicit: bool) -> Event<'static> {
    Event::DocumentStart {
        explicit,
        version: None,
        tags: vec![],
    }
}

fn doc_end(explicit: bool) -> Event<'static> {
    Event::DocumentEnd { explicit }
}

fn block_mapping() -> Event<'static> {
    Event::MappingStart {
        anchor: None,
        tag: None,
        implicit: true,
        style: CollectionStyle::Block,
    }
}

fn block_sequence() -> Event<'static> {
    Event::SequenceStart {
        anchor: None,
        tag: None,
        implicit: true,
        style: CollectionStyle::Block,
    }
}

fn scalar(value: &str, style: ScalarStyle) -> Event<'_> {
    Event::Scalar {
        anchor: None,
        tag: None,
        implicit: style == ScalarStyle::Plain,
        value: Cow::Borrowed(value),
        style,
    }
}

fn tag_of(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Scalar { tag, .. }
        | Event::SequenceStart { tag, .. }
        | Event::MappingStart { tag, .. } => tag.as_deref().map(str::to_owned),
        _ => None,
    }
}

#[test]
fn test_key_value() {
    assert_eq!(
        run_parser("key: value").unwrap(),
        [
            Event::StreamStart,
            doc_start(false),
            block_mapping(),
            Event::plain("key"),
            Event::plain("value"),
            Event::MappingEnd,
            doc_end(false),
            Event::StreamEnd,
        ]
    );
}

#[test]
fn test_block_sequence() {
    assert_eq!(
        run_parser("- 1\n- 2\n").unwrap(),
        [
            Event::StreamStart,
            doc_start(false),
            block_sequence(),
            Event::plain("1"),
            Event::plain("2"),
            Event::SequenceEnd,
            doc_end(false),
            Event::StreamEnd,
        ]
    );
}

#[test]
fn test_fail() {
    let error = run_parser("key: [1, 2]]").unwrap_err();
    assert!(error.info().starts_with("expected <block end>"), "{error}");
    assert!(run_parser("key: [1, 2").is_err());
}

#[test]
fn test_empty_doc() {
    assert_eq!(run_parser("").unwrap(), [Event::StreamStart, Event::StreamEnd]);
    assert_eq!(
        run_parser("---").unwrap(),
        [
            Event::StreamStart,
            doc_start(true),
            Event::empty_scalar(),
            doc_end(false),
            Event::StreamEnd,
        ]
    );
    assert_eq!(
        run_parser("--- #comment\n...\n").unwrap(),
        [
            Event::StreamStart,
            doc_start(true),
            Event::empty_scalar(),
            doc_end(true),
            Event::StreamEnd,
        ]
    );
}

#[test]
fn test_utf() {
    assert_eq!(
        run_parser("a: 你好").unwrap()[4],
        Event::plain("你好")
    );
}

#[test]
fn test_comments() {
    let s = "
# This is a comment
key: value # trailing comment
# Another one
";
    assert_eq!(run_parser(s).unwrap(), run_parser("key: value").unwrap());
}

#[test]
fn test_quoting() {
    let s = "
- plain
- 'single ''quoted'''
- \"double\\tquoted\"
- |
  literal
  text
- >
  folded
  text
";
    let events = run_parser(s).unwrap();
    assert_eq!(
        &events[3..8],
        [
            scalar("plain", ScalarStyle::Plain),
            scalar("single 'quoted'", ScalarStyle::SingleQuoted),
            scalar("double\tquoted", ScalarStyle::DoubleQuoted),
            scalar("literal\ntext\n", ScalarStyle::Literal),
            scalar("folded text\n", ScalarStyle::Folded),
        ]
    );
}

#[test]
fn test_multi_doc() {
    let s = "
a scalar
---
a scalar
---
a scalar
...
";
    let events = run_parser(s).unwrap();
    let starts = events
        .iter()
        .filter(|ev| matches!(ev, Event::DocumentStart { .. }))
        .count();
    assert_eq!(starts, 3);
    assert_eq!(events[1], doc_start(false));
    assert_eq!(events[4], doc_start(true));
    assert_eq!(events[events.len() - 2], doc_end(true));
}

#[test]
fn test_bare_document_after_the_first() {
    let error = run_parser("a\n...\nb\n").unwrap_err();
    assert_eq!(error.info(), "expected '<document start>', but found <scalar>");
}

#[test]
fn test_properties_without_content() {
    assert_eq!(
        run_parser("&a").unwrap()[2],
        Event::Scalar {
            anchor: Some("a".into()),
            tag: None,
            implicit: true,
            value: "".into(),
            style: ScalarStyle::Plain,
        }
    );
    let events = run_parser("key: !!str\n").unwrap();
    assert_eq!(
        events[4],
        Event::Scalar {
            anchor: None,
            tag: Some("tag:yaml.org,2002:str".into()),
            implicit: false,
            value: "".into(),
            style: ScalarStyle::Plain,
        }
    );
}

#[test]
fn test_anchors_and_aliases() {
    let events = run_parser("- &x [a]\n- *x\n").unwrap();
    assert_eq!(
        events[3],
        Event::SequenceStart {
            anchor: Some("x".into()),
            tag: None,
            implicit: true,
            style: CollectionStyle::Flow,
        }
    );
    assert_eq!(events[6], Event::Alias("x".into()));
}

#[test]
fn test_bad_hyphen() {
    // See: https://github.com/chyh1990/yaml-rust/issues/23
    assert!(run_parser("{-").is_err());
}

#[test]
fn test_escapes() {
    let events = run_parser(r#""\x41\u00e9\U0001F600 \N\_\L\P\0\e\/\ ""#).unwrap();
    assert_eq!(
        events[2],
        scalar(
            "A\u{e9}\u{1f600} \u{85}\u{a0}\u{2028}\u{2029}\0\x1b/ ",
            ScalarStyle::DoubleQuoted
        )
    );

    let error = run_parser(r#""\q""#).unwrap_err();
    assert_eq!(error.info(), "found unknown escape character 'q'");
    assert_eq!(error.context().unwrap().0, "while parsing a quoted scalar");

    let error = run_parser(r#""\x4""#).unwrap_err();
    assert_eq!(
        error.info(),
        "expected escape sequence of 2 hexadecimal numbers, but found \"4\""
    );
}

#[test]
fn test_escaped_line_break() {
    assert_eq!(
        run_parser("\"folded \\\n  line\"").unwrap()[2],
        scalar("folded line", ScalarStyle::DoubleQuoted)
    );
}

#[test]
fn test_tags() {
    let events = run_parser("- !!str a\n- ! b\n- !<tag:x,2000:c> c\n- !local d\n").unwrap();
    let tags: Vec<_> = events.iter().filter_map(tag_of).collect();
    assert_eq!(
        tags,
        ["tag:yaml.org,2002:str", "!", "tag:x,2000:c", "!local"]
    );
    let Event::Scalar { implicit, .. } = &events[4] else {
        panic!("expected a scalar, got {:?}", events[4]);
    };
    assert_eq!(*implicit, true);
    let Event::Scalar { implicit, .. } = &events[3] else {
        panic!("expected a scalar, got {:?}", events[3]);
    };
    assert_eq!(*implicit, false);
}

#[test]
fn test_tag_directives() {
    let s = "%YAML 1.1\n%TAG !e! tag:example.com,2000:\n--- !e!foo a\n";
    let events = run_parser(s).unwrap();
    assert_eq!(
        events[1],
        Event::DocumentStart {
            explicit: true,
            version: Some(Version { major: 1, minor: 1 }),
            tags: vec![TagDirective {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into(),
            }],
        }
    );
    assert_eq!(tag_of(&events[2]).unwrap(), "tag:example.com,2000:foo");

    let error = run_parser("!u!x a").unwrap_err();
    assert_eq!(error.info(), "found undefined tag handle \"!u!\"");
    assert_eq!(error.context().unwrap().0, "while parsing a node");
}

#[test]
fn test_directive_errors() {
    let error = run_parser("%YAML 1.1\n%YAML 1.1\n---\nx\n").unwrap_err();
    assert_eq!(error.info(), "Duplicate YAML directive");

    let error = run_parser("%YAML 2.0\n--- x\n").unwrap_err();
    assert_eq!(error.info(), "Incompatible document (version 1.x is required)");

    let error = run_parser("%TAG !e! a:\n%TAG !e! b:\n--- x\n").unwrap_err();
    assert_eq!(error.info(), "Duplicate tag handle: !e!");

    let error = run_parser("%YAML 1.1\nx\n").unwrap_err();
    assert!(
        error.info().starts_with("expected '<document start>'"),
        "{error}"
    );
}

#[test]
fn test_reserved_directives_are_ignored() {
    let events = run_parser("%FOO bar baz\n--- x\n").unwrap();
    assert_eq!(events[1], doc_start(true));
    assert_eq!(events[2], Event::plain("x"));
}

#[test]
fn test_large_block_scalar_indent() {
    assert_eq!(
        run_parser("a: |2\n   x\n").unwrap()[4],
        scalar(" x\n", ScalarStyle::Literal)
    );
    assert_eq!(
        run_parser("a: |-\n  x\n\n").unwrap()[4],
        scalar("x", ScalarStyle::Literal)
    );
    assert_eq!(
        run_parser("a: |+\n  x\n\n").unwrap()[4],
        scalar("x\n\n", ScalarStyle::Literal)
    );
}

#[test]
fn test_bad_docstart() {
    assert_eq!(
        run_parser("---This used to cause an infinite loop").unwrap()[2],
        Event::plain("---This used to cause an infinite loop")
    );
    assert_eq!(run_parser("----").unwrap()[2], Event::plain("----"));
    assert_eq!(run_parser("--- #here goes a comment").unwrap()[1], doc_start(true));
    assert_eq!(run_parser("---- #here goes a comment").unwrap()[2], Event::plain("----"));
}

#[test]
fn test_indentation_equality() {
    let four_spaces = run_parser(
        r"
hash:
    with:
        indentations
",
    )
    .unwrap();

    let two_spaces = run_parser(
        r"
hash:
  with:
    indentations
",
    )
    .unwrap();

    let one_space = run_parser(
        r"
hash:
 with:
  indentations
",
    )
    .unwrap();

    let mixed_spaces = run_parser(
        r"
hash:
     with:
               indentations
",
    )
    .unwrap();

    assert_eq!(four_spaces, two_spaces);
    assert_eq!(two_spaces, one_space);
    assert_eq!(four_spaces, mixed_spaces);
}

#[test]
fn test_indentless_sequence() {
    let events = run_parser("key:\n- a\n- b\nother: c\n").unwrap();
    assert_eq!(
        &events[2..10],
        [
            block_mapping(),
            Event::plain("key"),
            block_sequence(),
            Event::plain("a"),
            Event::plain("b"),
            Event::SequenceEnd,
            Event::plain("other"),
            Event::plain("c"),
        ]
    );
}

#[test]
fn test_explicit_keys() {
    let events = run_parser("? a\n: b\n? c\n").unwrap();
    assert_eq!(
        &events[3..7],
        [
            Event::plain("a"),
            Event::plain("b"),
            Event::plain("c"),
            Event::empty_scalar(),
        ]
    );
}

#[test]
fn test_tabs_after_block_indicators() {
    assert_eq!(
        run_parser("a:\tb\n").unwrap(),
        [
            Event::StreamStart,
            doc_start(false),
            block_mapping(),
            Event::plain("a"),
            Event::plain("b"),
            Event::MappingEnd,
            doc_end(false),
            Event::StreamEnd,
        ]
    );
    assert_eq!(
        run_parser("- \tb\n").unwrap(),
        [
            Event::StreamStart,
            doc_start(false),
            block_sequence(),
            Event::plain("b"),
            Event::SequenceEnd,
            doc_end(false),
            Event::StreamEnd,
        ]
    );
    assert_eq!(
        run_parser("? \ta\n:\tb\n").unwrap()[2..6],
        [block_mapping(), Event::plain("a"), Event::plain("b"), Event::MappingEnd]
    );

    // Tabs never indent.
    let error = run_parser("\t- b\n").unwrap_err();
    assert_eq!(error.info(), "found character '\\t' that cannot start any token");
    assert!(run_parser("- \n\tb\n").is_err());
    assert!(run_parser("- a\n\t- b\n").is_err());
}

#[test]
fn test_deep_nesting() {
    let s = "[".repeat(1_000) + &"]".repeat(1_000);
    let events = run_parser(&s).unwrap();
    assert_eq!(events.len(), 2_004);

    let s = "{a: ".repeat(1_000) + "b" + &"}".repeat(1_000);
    assert!(run_parser(&s).is_ok());
}

#[derive(Default)]
struct Collector {
    events: Vec<Event<'static>>,
}

impl<'a> EventReceiver<'a> for Collector {
    fn on_event(&mut self, ev: Event<'a>) {
        self.events.push(ev.into_owned());
    }
}

#[test]
fn test_load() {
    let s = "a\n--- b\n";
    let mut collector = Collector::default();
    Parser::new_from_str(s).load(&mut collector, false).unwrap();
    assert_eq!(collector.events.last(), Some(&doc_end(false)));
    assert_eq!(collector.events.len(), 4);

    let mut collector = Collector::default();
    Parser::new_from_str(s).load(&mut collector, true).unwrap();
    assert_eq!(collector.events.last(), Some(&Event::StreamEnd));
    assert_eq!(collector.events.len(), 8);

    let mut collector = Collector::default();
    let error = Parser::new_from_str("- a\n- [b\n")
        .load(&mut collector, true)
        .unwrap_err();
    assert!(matches!(error, Error::Scan(_)));
    assert_eq!(collector.events[3], Event::plain("a"));
}

#[test]
fn test_fused_after_error() {
    let mut parser = Parser::new_from_str("a: b: c");
    assert!(parser.by_ref().any(|x| x.is_err()));
    assert!(parser.next().is_none());
}
