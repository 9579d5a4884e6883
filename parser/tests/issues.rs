use std::borrow::Cow;

use yamlkit::{CollectionStyle, Error, Event, Parser, ScalarStyle};

/// Run the parser through the string.
///
/// # Returns
/// This function returns the events if parsing succeeds, the error the parser returned otherwise.
fn run_parser(input: &str) -> Result<Vec<Event<'_>>, Error> {
    let mut events = vec![];
    for x in Parser::new_from_str(input) {
        events.push(x?.0);
    }
    Ok(events)
}

fn flow_sequence() -> Event<'static> {
    Event::SequenceStart {
        anchor: None,
        tag: None,
        implicit: true,
        style: CollectionStyle::Flow,
    }
}

fn flow_mapping() -> Event<'static> {
    Event::MappingStart {
        anchor: None,
        tag: None,
        implicit: true,
        style: CollectionStyle::Flow,
    }
}

fn quoted(value: &str, style: ScalarStyle) -> Event<'_> {
    Event::Scalar {
        anchor: None,
        tag: None,
        implicit: false,
        value: Cow::Borrowed(value),
        style,
    }
}

/// Return the events between the document start and end.
fn body(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let len = events.len();
    events.into_iter().skip(2).take(len - 4).collect()
}

#[test]
fn test_single_pair_mappings_in_flow_sequences() {
    let expected = [
        flow_sequence(),
        flow_mapping(),
        Event::plain("a"),
        flow_sequence(),
        Event::plain("42"),
        Event::SequenceEnd,
        Event::MappingEnd,
        Event::SequenceEnd,
    ];
    assert_eq!(body(run_parser("[{a: [42]}]").unwrap()), expected);
    assert_eq!(body(run_parser("[a: [42]]").unwrap()), expected);
}

#[test]
fn test_flow_sequence_as_a_key() {
    assert_eq!(
        body(run_parser("[foo: [bar]]: baz").unwrap()),
        [
            Event::MappingStart {
                anchor: None,
                tag: None,
                implicit: true,
                style: CollectionStyle::Block,
            },
            flow_sequence(),
            flow_mapping(),
            Event::plain("foo"),
            flow_sequence(),
            Event::plain("bar"),
            Event::SequenceEnd,
            Event::MappingEnd,
            Event::SequenceEnd,
            Event::plain("baz"),
            Event::MappingEnd,
        ]
    );
}

#[test]
fn test_quoted_key_in_flow() {
    assert_eq!(
        body(run_parser(r#"["a":[]]"#).unwrap()),
        [
            flow_sequence(),
            flow_mapping(),
            quoted("a", ScalarStyle::DoubleQuoted),
            flow_sequence(),
            Event::SequenceEnd,
            Event::MappingEnd,
            Event::SequenceEnd,
        ]
    );
}

#[test]
fn test_flow_pair_with_missing_value() {
    assert_eq!(
        body(run_parser("[a: , b]").unwrap()),
        [
            flow_sequence(),
            flow_mapping(),
            Event::plain("a"),
            Event::empty_scalar(),
            Event::MappingEnd,
            Event::plain("b"),
            Event::SequenceEnd,
        ]
    );
}

#[test]
fn test_literal_in_sequence() {
    assert_eq!(
        run_parser("---\n- |\n  a").unwrap()[3],
        quoted("a", ScalarStyle::Literal)
    );
    assert_eq!(
        run_parser("---\n- |\n  a\n").unwrap()[3],
        quoted("a\n", ScalarStyle::Literal)
    );
}

#[test]
fn test_unclosed_flow_collections() {
    for s in ["{---", "{...", "[a, b", "{a: [b"] {
        let Err(error) = run_parser(s) else {
            panic!("{s:?} should not parse")
        };
        assert!(matches!(error, Error::Scan(_)), "{s:?}: {error}");
        assert_eq!(error.info(), "found unexpected end of stream");
        assert_eq!(error.context().unwrap().0, "while scanning a flow collection");
    }
}

#[test]
fn test_dots_inside_plain_scalars() {
    assert_eq!(
        body(run_parser("comment: hello ... world").unwrap())[2],
        Event::plain("hello ... world")
    );
}

#[test]
fn test_plain_continuation_lines() {
    assert_eq!(
        body(run_parser("foo: bar\n  baz\n").unwrap())[2],
        Event::plain("bar baz")
    );
    assert_eq!(
        body(run_parser("key: 'a\n\n  b'").unwrap())[2],
        quoted("a\nb", ScalarStyle::SingleQuoted)
    );
}

#[test]
fn test_simple_key_length_limit() {
    let key = "a".repeat(1000);
    let input = format!("{key}: b");
    let events = run_parser(&input).unwrap();
    assert_eq!(events[3], Event::plain(key.as_str()));

    let key = "a".repeat(1100);
    let error = run_parser(&format!("{key}: b")).unwrap_err();
    assert_eq!(error.info(), "mapping values are not allowed here");
}

#[test]
fn test_multi_line_simple_keys() {
    assert!(run_parser("a\nb: c").is_err());
    assert!(run_parser("{a\nb: c}").is_err());
    assert!(run_parser("\"a\nb\": c").is_err());
}

#[test]
fn test_required_simple_key() {
    let error = run_parser("a: 1\nb\nc: 2\n").unwrap_err();
    assert_eq!(error.info(), "could not find expected ':'");
    assert_eq!(error.context().unwrap().0, "while scanning a simple key");
}

#[test]
fn test_tabs() {
    let error = run_parser("\ta: b").unwrap_err();
    assert_eq!(error.info(), "found character '\\t' that cannot start any token");
    assert_eq!(
        body(run_parser("[a,\tb]").unwrap()),
        [flow_sequence(), Event::plain("a"), Event::plain("b"), Event::SequenceEnd]
    );
    assert_eq!(body(run_parser("a: b\t").unwrap())[2], Event::plain("b"));
}

#[test]
fn test_block_entries_in_mappings() {
    let error = run_parser("a: b\n- c\n").unwrap_err();
    assert!(error.info().starts_with("expected <block end>"), "{error}");
}

#[test]
fn test_alias_with_properties() {
    assert!(run_parser("&a *b").is_err());
}
