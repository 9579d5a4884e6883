//! Character-level writing of a scalar in a given style.

use super::{is_line_break, Context, EmitResult, Emitter};
use crate::token::ScalarStyle;

/// Writes one scalar through its [`Emitter`], folding long lines where the style permits.
pub(super) struct ScalarWriter<'e, 'a> {
    emitter: &'e mut Emitter<'a>,
    text: Vec<char>,
    /// Whether lines may be folded. They may not in simple keys.
    split: bool,
}

impl<'e, 'a> ScalarWriter<'e, 'a> {
    pub(super) fn new(emitter: &'e mut Emitter<'a>, text: &str, split: bool) -> Self {
        Self {
            emitter,
            text: text.chars().collect(),
            split,
        }
    }

    pub(super) fn write(mut self, style: ScalarStyle) -> EmitResult {
        match style {
            ScalarStyle::Any | ScalarStyle::Plain => self.write_plain(),
            ScalarStyle::SingleQuoted => self.write_single_quoted(),
            ScalarStyle::DoubleQuoted => self.write_double_quoted(),
            ScalarStyle::Literal => self.write_literal(),
            ScalarStyle::Folded => self.write_folded(),
        }
    }

    fn at(&self, index: usize) -> Option<char> {
        self.text.get(index).copied()
    }

    /// Write `text[start..end]`, which holds no line break.
    fn write_run(&mut self, start: usize, end: usize) -> EmitResult {
        if start >= end {
            return Ok(());
        }
        let run: String = self.text[start..end].iter().collect();
        self.emitter.write_raw(&run)
    }

    /// Write the line breaks of `text[start..end]`.
    fn write_breaks(&mut self, start: usize, end: usize) -> EmitResult {
        for index in start..end {
            match self.text[index] {
                '\n' => self.emitter.write_line_break(None)?,
                c => self.emitter.write_line_break(Some(c))?,
            }
        }
        Ok(())
    }

    fn past_width(&self) -> bool {
        self.emitter.column > self.emitter.config.best_width()
    }

    fn write_plain(&mut self) -> EmitResult {
        let root = self.emitter.context == Context::Root;
        if root {
            self.emitter.open_ended = true;
        }
        if self.text.is_empty() {
            // Keep a space after the indicator, so that the node reads as present but empty.
            if !root && !self.emitter.whitespace {
                self.emitter.write_raw(" ")?;
            }
            return Ok(());
        }
        if !self.emitter.whitespace {
            self.emitter.write_raw(" ")?;
        }
        self.emitter.whitespace = false;
        self.emitter.indention = false;

        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        for end in 0..=self.text.len() {
            let ch = self.at(end);
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.past_width() && self.split {
                        self.emitter.write_indent()?;
                        self.emitter.whitespace = false;
                        self.emitter.indention = false;
                    } else {
                        self.write_run(start, end)?;
                    }
                    start = end;
                }
            } else if breaks {
                if !ch.is_some_and(is_line_break) {
                    if self.text[start] == '\n' {
                        self.emitter.write_line_break(None)?;
                    }
                    self.write_breaks(start, end)?;
                    self.emitter.write_indent()?;
                    self.emitter.whitespace = false;
                    self.emitter.indention = false;
                    start = end;
                }
            } else if ch.map_or(true, |c| c == ' ' || is_line_break(c)) {
                self.write_run(start, end)?;
                start = end;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_line_break(c);
            }
        }
        Ok(())
    }

    fn write_single_quoted(&mut self) -> EmitResult {
        self.emitter.write_indicator("'", true, false, false)?;
        let len = self.text.len();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        for end in 0..=len {
            let ch = self.at(end);
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.past_width()
                        && self.split
                        && start != 0
                        && end != len
                    {
                        self.emitter.write_indent()?;
                    } else {
                        self.write_run(start, end)?;
                    }
                    start = end;
                }
            } else if breaks {
                if !ch.is_some_and(is_line_break) {
                    if self.text[start] == '\n' {
                        self.emitter.write_line_break(None)?;
                    }
                    self.write_breaks(start, end)?;
                    self.emitter.write_indent()?;
                    start = end;
                }
            } else if ch.map_or(true, |c| c == ' ' || c == '\'' || is_line_break(c)) {
                self.write_run(start, end)?;
                start = end;
            }
            if ch == Some('\'') {
                self.emitter.write_raw("''")?;
                start = end + 1;
            }
            if let Some(c) = ch {
                spaces = c == ' ';
                breaks = is_line_break(c);
            }
        }
        self.emitter.write_indicator("'", false, false, false)
    }

    /// Check whether the character cannot appear as is between double quotes.
    fn needs_escape(&self, c: char) -> bool {
        let printable = ('\x20'..='\x7e').contains(&c)
            || (self.emitter.config.allow_unicode
                && (('\u{a0}'..='\u{d7ff}').contains(&c)
                    || ('\u{e000}'..='\u{fffd}').contains(&c)
                    || c >= '\u{10000}'));
        matches!(c, '"' | '\\' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{feff}') || !printable
    }

    fn write_double_quoted(&mut self) -> EmitResult {
        self.emitter.write_indicator("\"", true, false, false)?;
        let len = self.text.len();
        let mut start = 0;
        for end in 0..=len {
            let ch = self.at(end);
            if ch.map_or(true, |c| self.needs_escape(c)) {
                self.write_run(start, end)?;
                start = end;
                if let Some(c) = ch {
                    self.emitter.write_raw(&escape(c))?;
                    start = end + 1;
                }
            }
            // Fold at a space, or right after an escape.
            if end > 0
                && end + 1 < len
                && (ch == Some(' ') || start >= end)
                && self.emitter.column + end > self.emitter.config.best_width() + start
                && self.split
            {
                if start < end {
                    self.write_run(start, end)?;
                    start = end;
                }
                self.emitter.write_raw("\\")?;
                self.emitter.write_indent()?;
                self.emitter.whitespace = false;
                self.emitter.indention = false;
                if self.at(start) == Some(' ') {
                    self.emitter.write_raw("\\")?;
                }
            }
        }
        self.emitter.write_indicator("\"", false, false, false)
    }

    /// Return the indentation and chomping indicators of a block scalar.
    fn block_hints(&self) -> String {
        let mut hints = String::new();
        let (Some(&first), Some(&last)) = (self.text.first(), self.text.last()) else {
            return hints;
        };
        if first == ' ' || is_line_break(first) {
            hints.push_str(&self.emitter.config.best_indent().to_string());
        }
        if !is_line_break(last) {
            hints.push('-');
        } else if self.text.len() == 1 || is_line_break(self.text[self.text.len() - 2]) {
            hints.push('+');
        }
        hints
    }

    fn write_block_header(&mut self, indicator: char) -> EmitResult {
        let hints = self.block_hints();
        self.emitter
            .write_indicator(&format!("{indicator}{hints}"), true, false, false)?;
        if hints.ends_with('+') {
            self.emitter.open_ended = true;
        }
        self.emitter.write_line_break(None)
    }

    fn write_folded(&mut self) -> EmitResult {
        self.write_block_header('>')?;
        let mut leading_space = true;
        let mut spaces = false;
        let mut breaks = true;
        let mut start = 0;
        for end in 0..=self.text.len() {
            let ch = self.at(end);
            if breaks {
                if !ch.is_some_and(is_line_break) {
                    if !leading_space
                        && ch.is_some_and(|c| c != ' ')
                        && self.text[start] == '\n'
                    {
                        self.emitter.write_line_break(None)?;
                    }
                    leading_space = ch == Some(' ');
                    self.write_breaks(start, end)?;
                    if ch.is_some() {
                        self.emitter.write_indent()?;
                    }
                    start = end;
                }
            } else if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.past_width() {
                        self.emitter.write_indent()?;
                    } else {
                        self.write_run(start, end)?;
                    }
                    start = end;
                }
            } else if ch.map_or(true, |c| c == ' ' || is_line_break(c)) {
                self.write_run(start, end)?;
                if ch.is_none() {
                    self.emitter.write_line_break(None)?;
                }
                start = end;
            }
            if let Some(c) = ch {
                breaks = is_line_break(c);
                spaces = c == ' ';
            }
        }
        Ok(())
    }

    fn write_literal(&mut self) -> EmitResult {
        self.write_block_header('|')?;
        let mut breaks = true;
        let mut start = 0;
        for end in 0..=self.text.len() {
            let ch = self.at(end);
            if breaks {
                if !ch.is_some_and(is_line_break) {
                    self.write_breaks(start, end)?;
                    if ch.is_some() {
                        self.emitter.write_indent()?;
                    }
                    start = end;
                }
            } else if ch.map_or(true, is_line_break) {
                self.write_run(start, end)?;
                if ch.is_none() {
                    self.emitter.write_line_break(None)?;
                }
                start = end;
            }
            if let Some(c) = ch {
                breaks = is_line_break(c);
            }
        }
        Ok(())
    }
}

/// Return the double-quoted escape sequence of `c`.
fn escape(c: char) -> String {
    let short = match c {
        '\0' => '0',
        '\x07' => 'a',
        '\x08' => 'b',
        '\t' => 't',
        '\n' => 'n',
        '\x0b' => 'v',
        '\x0c' => 'f',
        '\r' => 'r',
        '\x1b' => 'e',
        '"' => '"',
        '\\' => '\\',
        '\u{85}' => 'N',
        '\u{a0}' => '_',
        '\u{2028}' => 'L',
        '\u{2029}' => 'P',
        _ => {
            let code = u32::from(c);
            return if code <= 0xff {
                format!("\\x{code:02X}")
            } else if code <= 0xffff {
                format!("\\u{code:04X}")
            } else {
                format!("\\U{code:08X}")
            };
        }
    };
    format!("\\{short}")
}

#[cfg(test)]
mod test {
    use super::escape;

    #[test]
    fn escapes() {
        assert_eq!(escape('\n'), "\\n");
        assert_eq!(escape('"'), "\\\"");
        assert_eq!(escape('\u{1}'), "\\x01");
        assert_eq!(escape('\u{feff}'), "\\uFEFF");
        assert_eq!(escape('\u{1f600}'), "\\U0001F600");
        assert_eq!(escape('\u{2029}'), "\\P");
    }
}
