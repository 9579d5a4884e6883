//! Implicit tag resolution of untagged nodes.
//!
//! The parser leaves the tag of a plain scalar unset when the text does not give one. What the
//! value stands for (an integer, a boolean, `null`, ...) is decided afterwards by a
//! [`Resolver`], from the value alone.

use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;

/// The tag of scalars no implicit resolver matches.
pub const DEFAULT_SCALAR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag of untagged sequences.
pub const DEFAULT_SEQUENCE_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag of untagged mappings.
pub const DEFAULT_MAPPING_TAG: &str = "tag:yaml.org,2002:map";

/// The kind of node a tag is resolved for.
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub enum NodeKind {
    /// A scalar.
    Scalar,
    /// A sequence.
    Sequence,
    /// A mapping.
    Mapping,
}

/// A tag and the values that resolve to it.
#[derive(Clone, Debug)]
struct ImplicitResolver {
    tag: String,
    regex: Regex,
}

/// Picks the tag of nodes that were not given one.
///
/// Implicit resolvers are looked up by the first character of the value, then in the order they
/// were added. The first one whose pattern matches the whole value gives the tag.
///
/// ```
/// # use yamlkit::{NodeKind, Resolver};
/// let resolver = Resolver::default();
/// assert_eq!(resolver.resolve(NodeKind::Scalar, "0x1F", true), "tag:yaml.org,2002:int");
/// assert_eq!(resolver.resolve(NodeKind::Scalar, "0x1F", false), "tag:yaml.org,2002:str");
/// assert_eq!(resolver.resolve(NodeKind::Scalar, "", true), "tag:yaml.org,2002:null");
/// ```
#[derive(Clone, Debug)]
pub struct Resolver {
    /// Resolvers keyed by the first character of the values they may match.
    by_first_char: HashMap<char, Vec<ImplicitResolver>>,
    /// Resolvers matching the empty value.
    empty: Vec<ImplicitResolver>,
    /// Resolvers tried for any value.
    wildcard: Vec<ImplicitResolver>,
}

impl Default for Resolver {
    /// Create a resolver with the YAML 1.1 implicit types.
    fn default() -> Self {
        let mut resolver = Self::new();
        for (tag, regex, first_chars) in yaml_1_1_resolvers() {
            resolver.add_implicit_resolver(tag, regex.clone(), Some(*first_chars));
        }
        resolver
    }
}

impl Resolver {
    /// Create a resolver without implicit resolvers: every scalar resolves to `str`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_first_char: HashMap::new(),
            empty: Vec::new(),
            wildcard: Vec::new(),
        }
    }

    /// Add an implicit resolver, giving `tag` to plain scalars `regex` matches.
    ///
    /// `regex` must be anchored (`^...$`) to match whole values. `first_chars` lists the
    /// characters a matching value may start with; `None` has the resolver tried for every value.
    /// A resolver whose pattern matches the empty string is also tried for empty values.
    pub fn add_implicit_resolver(&mut self, tag: &str, regex: Regex, first_chars: Option<&str>) {
        let resolver = ImplicitResolver {
            tag: tag.to_owned(),
            regex,
        };
        if resolver.regex.is_match("") {
            self.empty.push(resolver.clone());
        }
        match first_chars {
            Some(chars) => {
                for c in chars.chars() {
                    self.by_first_char
                        .entry(c)
                        .or_default()
                        .push(resolver.clone());
                }
            }
            None => self.wildcard.push(resolver),
        }
    }

    /// Return the tag of a node of the given kind.
    ///
    /// `implicit` tells whether the value of a scalar may be looked at (it is `false` for quoted
    /// scalars and tagged nodes). Nodes that do not resolve get the default tag of their kind.
    #[must_use]
    pub fn resolve(&self, kind: NodeKind, value: &str, implicit: bool) -> &str {
        match kind {
            NodeKind::Scalar if implicit => {
                let candidates = match value.chars().next() {
                    None => self.empty.as_slice(),
                    Some(c) => self.by_first_char.get(&c).map_or(&[][..], Vec::as_slice),
                };
                candidates
                    .iter()
                    .chain(&self.wildcard)
                    .find(|resolver| resolver.regex.is_match(value))
                    .map_or(DEFAULT_SCALAR_TAG, |resolver| resolver.tag.as_str())
            }
            NodeKind::Scalar => DEFAULT_SCALAR_TAG,
            NodeKind::Sequence => DEFAULT_SEQUENCE_TAG,
            NodeKind::Mapping => DEFAULT_MAPPING_TAG,
        }
    }
}

/// The YAML 1.1 implicit types, compiled once.
fn yaml_1_1_resolvers() -> &'static [(&'static str, Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(&str, Regex, &str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        YAML_1_1_RESOLVERS
            .iter()
            .filter_map(|&(tag, pattern, first_chars)| {
                let regex = Regex::new(&format!("^(?:{pattern})$"));
                debug_assert!(regex.is_ok(), "invalid pattern for {tag}");
                Some((tag, regex.ok()?, first_chars))
            })
            .collect()
    })
}

/// The YAML 1.1 implicit types: tag, pattern and the characters values may start with.
const YAML_1_1_RESOLVERS: [(&str, &str, &str); 8] = [
    (
        "tag:yaml.org,2002:bool",
        "yes|Yes|YES|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF",
        "yYnNtTfFoO",
    ),
    (
        "tag:yaml.org,2002:float",
        r"[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+][0-9]+)?|\.[0-9][0-9_]*(?:[eE][-+][0-9]+)?|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN)",
        "-+0123456789.",
    ),
    (
        "tag:yaml.org,2002:int",
        "[-+]?0b[0-1_]+|[-+]?0[0-7_]+|[-+]?(?:0|[1-9][0-9_]*)|[-+]?0x[0-9a-fA-F_]+|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+",
        "-+0123456789",
    ),
    ("tag:yaml.org,2002:merge", "<<", "<"),
    ("tag:yaml.org,2002:null", "~|null|Null|NULL|", "~nN"),
    (
        "tag:yaml.org,2002:timestamp",
        r"[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?",
        "0123456789",
    ),
    ("tag:yaml.org,2002:value", "=", "="),
    ("tag:yaml.org,2002:yaml", r"!|&|\*", "!&*"),
];

#[cfg(test)]
mod test {
    use super::*;

    fn scalar(value: &str) -> String {
        Resolver::default()
            .resolve(NodeKind::Scalar, value, true)
            .to_owned()
    }

    #[test]
    fn built_in_patterns_compile() {
        let compiled = yaml_1_1_resolvers();
        assert_eq!(compiled.len(), YAML_1_1_RESOLVERS.len());
        assert!(std::ptr::eq(compiled, yaml_1_1_resolvers()));
    }

    #[test]
    fn yaml_1_1_types() {
        for (value, tag) in [
            ("yes", "bool"),
            ("Off", "bool"),
            ("y", "str"),
            ("1.5", "float"),
            ("-.inf", "float"),
            (".NaN", "float"),
            ("1_000", "int"),
            ("0b101", "int"),
            ("0x1F", "int"),
            ("017", "int"),
            ("190:20:30", "int"),
            ("<<", "merge"),
            ("~", "null"),
            ("", "null"),
            ("NULL", "null"),
            ("2001-12-14", "timestamp"),
            ("2001-12-14t21:59:43.10-05:00", "timestamp"),
            ("=", "value"),
            ("!", "yaml"),
            ("hello", "str"),
            ("12 monkeys", "str"),
        ] {
            assert_eq!(scalar(value), format!("tag:yaml.org,2002:{tag}"), "{value:?}");
        }
    }

    #[test]
    fn explicit_nodes_keep_their_default() {
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve(NodeKind::Scalar, "1", false), DEFAULT_SCALAR_TAG);
        assert_eq!(resolver.resolve(NodeKind::Sequence, "", true), DEFAULT_SEQUENCE_TAG);
        assert_eq!(resolver.resolve(NodeKind::Mapping, "", true), DEFAULT_MAPPING_TAG);
    }

    #[test]
    fn user_resolvers() {
        let mut resolver = Resolver::new();
        assert_eq!(resolver.resolve(NodeKind::Scalar, "1", true), DEFAULT_SCALAR_TAG);
        resolver.add_implicit_resolver("!dice", Regex::new(r"^\d+d\d+$").unwrap(), Some("0123456789"));
        resolver.add_implicit_resolver("!shout", Regex::new(r"^[A-Z]+!$").unwrap(), None);
        assert_eq!(resolver.resolve(NodeKind::Scalar, "3d6", true), "!dice");
        assert_eq!(resolver.resolve(NodeKind::Scalar, "HEY!", true), "!shout");
        assert_eq!(resolver.resolve(NodeKind::Scalar, "d6", true), DEFAULT_SCALAR_TAG);
    }

    #[test]
    fn first_match_wins() {
        let mut resolver = Resolver::new();
        resolver.add_implicit_resolver("!first", Regex::new("^a.*$").unwrap(), Some("a"));
        resolver.add_implicit_resolver("!second", Regex::new("^ab$").unwrap(), Some("a"));
        assert_eq!(resolver.resolve(NodeKind::Scalar, "ab", true), "!first");
    }
}
