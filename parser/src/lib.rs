// Copyright 2015, Yuheng Chen.
// Copyright 2023, Ethiraric.
// See the LICENSE file at the top-level directory of this distribution.

//! A streaming YAML 1.1 reader and writer in pure Rust.
//!
//! This crate turns YAML text into a stream of low-level events, and events back into YAML text.
//! It does not build documents: loading into a tree, or serializing one, is left to consumers of
//! the event stream.
//!
//! Reading goes through three stages, each pulling from the previous one:
//!
//!   - the [`Reader`] validates the text and tracks positions;
//!   - the [`Scanner`] cuts it into [`Token`]s;
//!   - the [`Parser`] checks the grammar and produces [`Event`]s.
//!
//! Byte inputs in UTF-8, UTF-16 or UTF-32 are first turned into text with [`decode`]. Values are
//! borrowed from the input whenever they appear verbatim in it.
//!
//! Writing is done by the [`Emitter`], which picks for each scalar a style that can represent it.
//! A [`Resolver`] gives the tag of the nodes the text did not tag.
//!
//! # Usage
//!
//! ```
//! use yamlkit::{Event, Parser};
//!
//! let events = Parser::new_from_str("key: value")
//!     .map(|event| event.map(|(event, _span)| event))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(events[3], Event::plain("key"));
//! assert_eq!(events[4], Event::plain("value"));
//! ```
//!
//! # Features
//! **Note:** This crate's MSRV is `1.70.0`.
//!
//! #### `debug_prints`
//! Enables the `debug` module and usage of debug prints in the scanner, the parser and the
//! emitter. Prints only happen when the `YAMLKIT_DEBUG` environment variable is set. Do not
//! enable if you are consuming the crate rather than working on it as this can significantly
//! decrease performance.

#![warn(missing_docs, clippy::pedantic)]

mod char_traits;
#[macro_use]
mod debug;
pub mod emitter;
mod error;
mod event;
mod parser;
pub mod reader;
mod resolver;
mod scanner;
mod token;

pub use crate::emitter::{EmitResult, Emitter, EmitterConfig, LineBreak};
pub use crate::error::{DecodingError, EmitError, Error, ParseError, ScanError};
pub use crate::event::{CollectionStyle, Event, TagDirective, Version, DEFAULT_TAGS};
pub use crate::parser::{EventReceiver, Parser, SpannedEventReceiver};
pub use crate::reader::{decode, encode, Encoding, Reader};
pub use crate::resolver::{
    NodeKind, Resolver, DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG,
};
pub use crate::scanner::Scanner;
pub use crate::token::{Marker, ScalarStyle, Span, Token, TokenType};
