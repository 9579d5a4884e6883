//! What a scalar contains, and hence in which styles it can be written.

use super::is_line_break;
use crate::char_traits::is_blank_or_breakz;

/// The result of the analysis of a scalar.
///
/// The properties are stored as bits of a single byte:
///
///   - `EMPTY`: the scalar is the empty string
///   - `MULTILINE`: the scalar holds a line break
///   - `ALLOW_*`: the scalar can be written in that style
#[derive(Clone, Copy, PartialEq, Debug, Eq)]
pub(crate) struct ScalarAnalysis {
    bits: u8,
}

impl ScalarAnalysis {
    const EMPTY: u8 = 1 << 0;
    const MULTILINE: u8 = 1 << 1;
    const ALLOW_FLOW_PLAIN: u8 = 1 << 2;
    const ALLOW_BLOCK_PLAIN: u8 = 1 << 3;
    const ALLOW_SINGLE_QUOTED: u8 = 1 << 4;
    const ALLOW_DOUBLE_QUOTED: u8 = 1 << 5;
    const ALLOW_BLOCK: u8 = 1 << 6;

    const ALLOW_ALL: u8 = Self::ALLOW_FLOW_PLAIN
        | Self::ALLOW_BLOCK_PLAIN
        | Self::ALLOW_SINGLE_QUOTED
        | Self::ALLOW_DOUBLE_QUOTED
        | Self::ALLOW_BLOCK;

    /// Analyze `scalar`.
    ///
    /// Without `allow_unicode`, non-ASCII characters can only be written escaped, in double
    /// quotes.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn analyze(scalar: &str, allow_unicode: bool) -> Self {
        if scalar.is_empty() {
            return ScalarAnalysis {
                bits: Self::EMPTY
                    | Self::ALLOW_BLOCK_PLAIN
                    | Self::ALLOW_SINGLE_QUOTED
                    | Self::ALLOW_DOUBLE_QUOTED,
            };
        }

        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;

        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;

        if scalar.starts_with("---") || scalar.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }

        let chars: Vec<char> = scalar.chars().collect();
        let last = chars.len() - 1;
        let mut preceded_by_whitespace = true;
        let mut previous_space = false;
        let mut previous_break = false;

        for (index, &c) in chars.iter().enumerate() {
            let followed_by_whitespace = chars
                .get(index + 1)
                .map_or(true, |&next| is_blank_or_breakz(next));

            if index == 0 {
                match c {
                    '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\''
                    | '"' | '%' | '@' | '`' => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '?' | ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '-' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            } else {
                match c {
                    ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }

            if is_line_break(c) {
                line_breaks = true;
            }
            // NEL is read back as `\n` unless it is escaped.
            if !(c == '\n' || ('\x20'..='\x7e').contains(&c)) {
                let printable_unicode = (('\u{a0}'..='\u{d7ff}').contains(&c)
                    || ('\u{e000}'..='\u{fffd}').contains(&c)
                    || c >= '\u{10000}')
                    && c != '\u{feff}';
                if !printable_unicode || !allow_unicode {
                    special_characters = true;
                }
            }

            if c == ' ' {
                if index == 0 {
                    leading_space = true;
                }
                if index == last {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if is_line_break(c) {
                if index == 0 {
                    leading_break = true;
                }
                if index == last {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }

            preceded_by_whitespace = is_blank_or_breakz(c);
        }

        let mut bits = Self::ALLOW_ALL;
        if leading_space || leading_break || trailing_space || trailing_break {
            bits &= !(Self::ALLOW_FLOW_PLAIN | Self::ALLOW_BLOCK_PLAIN);
        }
        if trailing_space {
            bits &= !Self::ALLOW_BLOCK;
        }
        if break_space {
            bits &= !(Self::ALLOW_FLOW_PLAIN | Self::ALLOW_BLOCK_PLAIN | Self::ALLOW_SINGLE_QUOTED);
        }
        if space_break || special_characters {
            bits &= !(Self::ALLOW_FLOW_PLAIN
                | Self::ALLOW_BLOCK_PLAIN
                | Self::ALLOW_SINGLE_QUOTED
                | Self::ALLOW_BLOCK);
        }
        if line_breaks {
            bits &= !(Self::ALLOW_FLOW_PLAIN | Self::ALLOW_BLOCK_PLAIN);
            bits |= Self::MULTILINE;
        }
        if flow_indicators {
            bits &= !Self::ALLOW_FLOW_PLAIN;
        }
        if block_indicators {
            bits &= !Self::ALLOW_BLOCK_PLAIN;
        }
        ScalarAnalysis { bits }
    }

    fn has(self, mask: u8) -> bool {
        self.bits & mask != 0
    }

    pub(crate) fn is_empty(self) -> bool {
        self.has(Self::EMPTY)
    }

    pub(crate) fn is_multiline(self) -> bool {
        self.has(Self::MULTILINE)
    }

    pub(crate) fn allow_flow_plain(self) -> bool {
        self.has(Self::ALLOW_FLOW_PLAIN)
    }

    pub(crate) fn allow_block_plain(self) -> bool {
        self.has(Self::ALLOW_BLOCK_PLAIN)
    }

    pub(crate) fn allow_single_quoted(self) -> bool {
        self.has(Self::ALLOW_SINGLE_QUOTED)
    }

    /// Always `true`: any scalar can be written double-quoted.
    pub(crate) fn allow_double_quoted(self) -> bool {
        self.has(Self::ALLOW_DOUBLE_QUOTED)
    }

    pub(crate) fn allow_block(self) -> bool {
        self.has(Self::ALLOW_BLOCK)
    }
}
