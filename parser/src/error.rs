//! Errors reported by the reader, the scanner, the parser and the emitter.
//!
//! Reading errors carry the name of the source they were found in, a primary [`Marker`] and,
//! where it helps, a labelled secondary [`Marker`] giving context (e.g.: where the construct that
//! failed started). They format as `message: name:line:col (label: name:line:col)`.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::token::Marker;

/// Defines a positioned error type with an optional context location.
macro_rules! define_marked_error {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Debug, Eq)]
        pub struct $name {
            source_name: Arc<str>,
            mark: Marker,
            info: String,
            context: Option<(String, Marker)>,
        }

        impl $name {
            /// Create a new error from a location and an error string.
            #[must_use]
            pub fn new(source_name: Arc<str>, mark: Marker, info: impl Into<String>) -> Self {
                Self {
                    source_name,
                    mark,
                    info: info.into(),
                    context: None,
                }
            }

            /// Attach a labelled secondary location to the error.
            #[must_use]
            pub fn with_context(mut self, label: impl Into<String>, mark: Marker) -> Self {
                self.context = Some((label.into(), mark));
                self
            }

            /// Return the marker pointing to the error in the source.
            #[must_use]
            pub fn marker(&self) -> &Marker {
                &self.mark
            }

            /// Return the information string describing the error that happened.
            #[must_use]
            pub fn info(&self) -> &str {
                self.info.as_ref()
            }

            /// Return the label and location of the construct the error happened in, if any.
            #[must_use]
            pub fn context(&self) -> Option<(&str, &Marker)> {
                self.context.as_ref().map(|(label, mark)| (label.as_str(), mark))
            }

            /// Return the name of the source the error was found in.
            #[must_use]
            pub fn source_name(&self) -> &str {
                &self.source_name
            }
        }

        impl std::error::Error for $name {}

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "{}: {}:{}", self.info, self.source_name, self.mark)?;
                if let Some((label, mark)) = &self.context {
                    write!(formatter, " ({label}: {}:{mark})", self.source_name)?;
                }
                Ok(())
            }
        }
    };
}

define_marked_error!(
    /// An error that occurred while scanning tokens: bad indentation, unresolved simple keys or
    /// malformed indicators.
    ScanError
);

define_marked_error!(
    /// An error that occurred while assembling tokens into events: grammar violations and
    /// directive or tag misuse.
    ParseError
);

/// The input could not be decoded, or it contains characters YAML does not allow.
#[derive(Clone, PartialEq, Debug, Eq, Error)]
#[error("{info}: {source_name}, position {position}")]
pub struct DecodingError {
    source_name: Arc<str>,
    position: usize,
    info: String,
}

impl DecodingError {
    /// Create a new decoding error at the given position.
    ///
    /// The position is a byte offset for malformed code units, and a character offset for
    /// characters that are not printable.
    #[must_use]
    pub fn new(source_name: Arc<str>, position: usize, info: impl Into<String>) -> Self {
        Self {
            source_name,
            position,
            info: info.into(),
        }
    }

    /// Return the position of the offending input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Return the information string describing the error that happened.
    #[must_use]
    pub fn info(&self) -> &str {
        &self.info
    }
}

/// Any error that can stop the reading pipeline.
#[derive(Clone, PartialEq, Debug, Eq, Error)]
pub enum Error {
    /// The input bytes or characters are not acceptable.
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    /// The scanner could not produce the next token.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// The token stream does not follow the YAML grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    /// Return the location of the error, if it has one.
    #[must_use]
    pub fn marker(&self) -> Option<&Marker> {
        match self {
            Error::Decoding(_) => None,
            Error::Scan(e) => Some(e.marker()),
            Error::Parse(e) => Some(e.marker()),
        }
    }

    /// Return the information string describing the error that happened.
    #[must_use]
    pub fn info(&self) -> &str {
        match self {
            Error::Decoding(e) => e.info(),
            Error::Scan(e) => e.info(),
            Error::Parse(e) => e.info(),
        }
    }

    /// Return the label and location of the construct the error happened in, if any.
    #[must_use]
    pub fn context(&self) -> Option<(&str, &Marker)> {
        match self {
            Error::Decoding(_) => None,
            Error::Scan(e) => e.context(),
            Error::Parse(e) => e.context(),
        }
    }
}

/// An error that occurred while emitting events.
///
/// Apart from [`EmitError::Fmt`], these denote a programming error in the producer of the events.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Error)]
pub enum EmitError {
    /// The underlying writer failed.
    #[error("failed to write the emitted text")]
    Fmt(#[from] fmt::Error),
    /// The event is not valid in the state the emitter is in.
    #[error("expected {expected}, but got {found}")]
    Event {
        /// What the emitter was waiting for.
        expected: &'static str,
        /// The kind of event it received.
        found: &'static str,
    },
    /// An anchor, tag, tag directive or version cannot be written.
    #[error("{0}")]
    Invalid(&'static str),
}
