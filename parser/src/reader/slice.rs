//! Accumulation of scalar values while they are scanned.

use std::borrow::Cow;

use arraydeque::{ArrayDeque, Saturating};

/// How deeply transactions can nest.
const MAX_TRANSACTIONS: usize = 4;

/// Builds the value of a token out of the input it is scanned from.
///
/// As long as everything written to the builder is a contiguous run of the input, the result
/// borrows from the input. The first write that is not (a folded line break, a collapsed quote,
/// text after skipped indentation, ...) copies what was accumulated so far into an owned buffer.
///
/// Transactions mark a point the builder can be rolled back to. They are used to write content
/// tentatively, for instance trailing whitespace that is only kept if more content follows it.
#[derive(Debug)]
pub struct SliceBuilder<'input> {
    /// The whole input.
    input: &'input str,
    /// Byte offset in `input` where the slice starts.
    start: usize,
    /// Byte offset in `input` where the borrowed slice ends.
    end: usize,
    /// The value, once it stopped being a contiguous part of the input.
    owned: Option<String>,
    /// Lengths of the value when the pending transactions started.
    transactions: ArrayDeque<usize, MAX_TRANSACTIONS, Saturating>,
}

impl<'input> SliceBuilder<'input> {
    /// Create a builder over the given input.
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            start: 0,
            end: 0,
            owned: None,
            transactions: ArrayDeque::new(),
        }
    }

    /// Start a new slice at byte offset `at` in the input.
    ///
    /// Anything accumulated before and any pending transaction are dropped.
    pub fn begin(&mut self, at: usize) {
        self.start = at;
        self.end = at;
        self.owned = None;
        self.transactions.clear();
    }

    /// Append the input range `from..to` (byte offsets) to the slice.
    pub fn push_input(&mut self, from: usize, to: usize) {
        match &mut self.owned {
            None if from == self.end => self.end = to,
            None => {
                let mut owned = String::with_capacity(self.end - self.start + to - from + 16);
                owned.push_str(&self.input[self.start..self.end]);
                owned.push_str(&self.input[from..to]);
                self.owned = Some(owned);
            }
            Some(owned) => owned.push_str(&self.input[from..to]),
        }
    }

    /// Append text that does not come from the input at the current position.
    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.make_owned().push_str(text);
    }

    /// Append a character that does not come from the input at the current position.
    pub fn push_char(&mut self, c: char) {
        self.make_owned().push(c);
    }

    /// Return the length (in bytes) of what was accumulated so far.
    pub fn len(&self) -> usize {
        match &self.owned {
            Some(owned) => owned.len(),
            None => self.end - self.start,
        }
    }

    /// Return whether nothing was accumulated so far.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finish the slice and return its value.
    pub fn finish(&mut self) -> Cow<'input, str> {
        self.transactions.clear();
        match self.owned.take() {
            Some(owned) => Cow::Owned(owned),
            None => Cow::Borrowed(&self.input[self.start..self.end]),
        }
    }

    /// Start a transaction at the current length.
    ///
    /// At most [`MAX_TRANSACTIONS`] transactions nest; the scanner nests two. Past that, the
    /// new transaction is not recorded and its `commit` or `revert` applies to the enclosing one.
    pub fn begin_transaction(&mut self) {
        let len = self.len();
        let pushed = self.transactions.push_back(len);
        debug_assert!(pushed.is_ok(), "too many nested slice transactions");
    }

    /// Keep what was written since the last transaction started.
    pub fn commit(&mut self) {
        self.transactions.pop_back();
    }

    /// Drop what was written since the last transaction started.
    pub fn revert(&mut self) {
        if let Some(len) = self.transactions.pop_back() {
            match &mut self.owned {
                Some(owned) => owned.truncate(len),
                None => self.end = self.start + len,
            }
        }
    }

    fn make_owned(&mut self) -> &mut String {
        let (input, start, end) = (self.input, self.start, self.end);
        self.owned
            .get_or_insert_with(|| input[start..end].to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn contiguous_input_is_borrowed() {
        let input = "key: value";
        let mut builder = SliceBuilder::new(input);
        builder.begin(5);
        builder.push_input(5, 7);
        builder.push_input(7, 10);
        let value = builder.finish();
        assert_eq!(value, "value");
        assert!(matches!(value, Cow::Borrowed(_)));
    }

    #[test]
    fn gaps_are_copied() {
        let input = "'it''s'";
        let mut builder = SliceBuilder::new(input);
        builder.begin(1);
        builder.push_input(1, 4);
        builder.push_input(5, 6);
        let value = builder.finish();
        assert_eq!(value, "it's");
        assert!(matches!(value, Cow::Owned(_)));
    }

    #[test]
    fn transactions_nest() {
        let input = "a  b";
        let mut builder = SliceBuilder::new(input);
        builder.begin(0);
        builder.push_input(0, 1);
        builder.begin_transaction();
        builder.push_input(1, 3);
        builder.begin_transaction();
        builder.push_char('\n');
        builder.revert();
        assert_eq!(builder.len(), 3);
        builder.commit();
        builder.begin_transaction();
        builder.push_str("xyz");
        builder.revert();
        assert_eq!(builder.finish(), "a  ");
    }

    #[test]
    fn transactions_nest_up_to_the_limit() {
        let input = "abcdef";
        let mut builder = SliceBuilder::new(input);
        builder.begin(0);
        for i in 0..MAX_TRANSACTIONS {
            builder.begin_transaction();
            builder.push_input(i, i + 1);
        }
        builder.revert();
        assert_eq!(builder.len(), 3);
        builder.commit();
        builder.revert();
        assert_eq!(builder.len(), 1);
        builder.revert();
        assert_eq!(builder.finish(), "");
    }

    #[test]
    fn revert_without_transaction_is_a_no_op() {
        let mut builder = SliceBuilder::new("abc");
        builder.begin(0);
        builder.push_input(0, 3);
        builder.revert();
        assert_eq!(builder.finish(), "abc");
    }
}
