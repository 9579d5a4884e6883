//! Holds functions to determine if a character belongs to a specific character set.
//!
//! YAML 1.1 recognizes more line breaks than `\r` and `\n`: NEL (`\u{85}`), LS (`\u{2028}`) and
//! PS (`\u{2029}`) are breaks as well.

/// Check whether the character is nil (`\0`).
///
/// The reader uses `\0` as its end-of-input sentinel.
#[inline]
#[must_use]
pub fn is_z(c: char) -> bool {
    c == '\0'
}

/// Check whether the character is a line break (`\r`, `\n`, NEL, LS or PS).
#[inline]
#[must_use]
pub fn is_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Check whether the character is nil or a line break.
#[inline]
#[must_use]
pub fn is_breakz(c: char) -> bool {
    is_break(c) || is_z(c)
}

/// Check whether the character is a whitespace (` ` or `\t`).
#[inline]
#[must_use]
pub fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Check whether the character is nil, a linebreak or a whitespace.
#[inline]
#[must_use]
pub fn is_blank_or_breakz(c: char) -> bool {
    is_blank(c) || is_breakz(c)
}

/// Check whether the character is nil, a linebreak or a space (tabs excluded).
#[inline]
#[must_use]
pub fn is_space_or_breakz(c: char) -> bool {
    c == ' ' || is_breakz(c)
}

/// Check whether the character is an ascii digit.
#[inline]
#[must_use]
pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Check whether the character is a digit, letter, `_` or `-`.
///
/// This is the character set of anchors, aliases, directive names and named tag handles.
#[inline]
#[must_use]
pub fn is_alpha(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='z' | 'A'..='Z' | '_' | '-')
}

/// Check whether the character is a hexadecimal character (case insensitive).
#[inline]
#[must_use]
pub fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Convert the hexadecimal digit to an integer.
///
/// Returns `None` if `c` is not a hexadecimal digit.
#[inline]
#[must_use]
pub fn as_hex(c: char) -> Option<u32> {
    c.to_digit(16)
}

/// Check whether the character is a YAML flow character (one of `,[]{}`).
#[inline]
#[must_use]
pub fn is_flow(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

/// Check whether the character is the BOM character.
#[inline]
#[must_use]
pub fn is_bom(c: char) -> bool {
    c == '\u{FEFF}'
}

/// Check whether the character may appear in a YAML 1.1 stream.
///
/// This is the `c-printable` production: tab, line feed, carriage return, printable ASCII, NEL
/// and the non-surrogate, non-special parts of the Basic Multilingual Plane and beyond.
#[inline]
#[must_use]
pub fn is_printable(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\x20'..='\x7E' | '\u{85}'
            | '\u{A0}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Check whether the character is allowed in a tag URI (the `ns-uri-char` set, without `%`).
///
/// `%` starts an escape and is handled by the scanner separately.
#[inline]
#[must_use]
pub fn is_uri_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | ';'
                | '/'
                | '?'
                | ':'
                | '@'
                | '&'
                | '='
                | '+'
                | '$'
                | ','
                | '_'
                | '.'
                | '!'
                | '~'
                | '*'
                | '\''
                | '('
                | ')'
                | '['
                | ']'
        )
}

/// Check whether the character is allowed in a tag suffix written inside a flow collection.
///
/// Flow indicators would otherwise swallow the end of the collection.
#[inline]
#[must_use]
pub fn is_flow_uri_char(c: char) -> bool {
    is_uri_char(c) && !is_flow(c)
}
