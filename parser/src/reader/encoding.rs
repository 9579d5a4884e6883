//! Detection and decoding of the encoding of a YAML byte stream.
//!
//! A YAML 1.1 stream is UTF-8, UTF-16 or UTF-32. The encoding is given by the byte order mark if
//! there is one, and guessed from the position of null bytes otherwise (a YAML stream starts with
//! an ASCII character).

use std::{borrow::Cow, fmt, sync::Arc};

use encoding_rs::{Decoder, DecoderResult};

use crate::error::DecodingError;

/// The encodings a YAML stream may be written in.
#[derive(Clone, Copy, PartialEq, Debug, Eq, Default, Hash)]
pub enum Encoding {
    /// UTF-8, the default.
    #[default]
    Utf8,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
    /// UTF-32, little endian.
    Utf32Le,
    /// UTF-32, big endian.
    Utf32Be,
}

impl Encoding {
    /// Return the byte order mark of the encoding.
    #[must_use]
    pub fn bom(self) -> &'static [u8] {
        match self {
            Encoding::Utf8 => b"\xEF\xBB\xBF",
            Encoding::Utf16Le => b"\xFF\xFE",
            Encoding::Utf16Be => b"\xFE\xFF",
            Encoding::Utf32Le => b"\xFF\xFE\x00\x00",
            Encoding::Utf32Be => b"\x00\x00\xFE\xFF",
        }
    }

    /// Return whether a stream in this encoding starts with a byte order mark when emitted.
    #[must_use]
    pub fn needs_bom(self) -> bool {
        self != Encoding::Utf8
    }

    /// Detect the encoding of `input`.
    ///
    /// Return the encoding and the length of the byte order mark that was found (0 if none).
    #[must_use]
    pub fn detect(input: &[u8]) -> (Encoding, usize) {
        // UTF-32LE's BOM starts with UTF-16LE's. Check the longer ones first.
        for encoding in [Encoding::Utf32Le, Encoding::Utf32Be] {
            if input.starts_with(encoding.bom()) {
                return (encoding, 4);
            }
        }
        if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(input) {
            let encoding = if encoding == encoding_rs::UTF_16LE {
                Encoding::Utf16Le
            } else if encoding == encoding_rs::UTF_16BE {
                Encoding::Utf16Be
            } else {
                Encoding::Utf8
            };
            return (encoding, bom_len);
        }
        (detect_endianness(input), 0)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        })
    }
}

/// Guess the encoding of a stream without a BOM from where its null bytes are.
fn detect_endianness(b: &[u8]) -> Encoding {
    match b {
        [0, 0, 0, c, ..] if *c != 0 => Encoding::Utf32Be,
        [c, 0, 0, 0, ..] if *c != 0 => Encoding::Utf32Le,
        [0, c, ..] if *c != 0 => Encoding::Utf16Be,
        [c, 0, ..] if *c != 0 => Encoding::Utf16Le,
        _ => Encoding::Utf8,
    }
}

/// Decode a YAML byte stream into text.
///
/// The byte order mark, if any, is not part of the returned text. UTF-8 input is borrowed rather
/// than copied.
///
/// # Errors
/// Returns a [`DecodingError`] naming the byte offset of the first malformed code unit sequence.
pub fn decode<'input>(
    input: &'input [u8],
    source_name: &Arc<str>,
) -> Result<(Cow<'input, str>, Encoding), DecodingError> {
    let (encoding, bom_len) = Encoding::detect(input);
    let body = &input[bom_len..];
    let text = match encoding {
        Encoding::Utf8 => decode_with(encoding_rs::UTF_8, body, bom_len, source_name)?,
        Encoding::Utf16Le => decode_with(encoding_rs::UTF_16LE, body, bom_len, source_name)?,
        Encoding::Utf16Be => decode_with(encoding_rs::UTF_16BE, body, bom_len, source_name)?,
        Encoding::Utf32Le => Cow::Owned(decode_utf32(body, u32::from_le_bytes, bom_len, source_name)?),
        Encoding::Utf32Be => Cow::Owned(decode_utf32(body, u32::from_be_bytes, bom_len, source_name)?),
    };
    Ok((text, encoding))
}

/// Encode emitted text into bytes of the given encoding.
///
/// The text is expected to already hold its byte order mark character if one is wanted.
#[must_use]
pub fn encode(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        Encoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        Encoding::Utf32Le => text.chars().flat_map(|c| u32::from(c).to_le_bytes()).collect(),
        Encoding::Utf32Be => text.chars().flat_map(|c| u32::from(c).to_be_bytes()).collect(),
    }
}

fn decode_with<'input>(
    encoding: &'static encoding_rs::Encoding,
    body: &'input [u8],
    offset: usize,
    source_name: &Arc<str>,
) -> Result<Cow<'input, str>, DecodingError> {
    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => Ok(text),
        None => {
            let mut decoder = encoding.new_decoder_without_bom_handling();
            Err(locate_malformation(body, &mut decoder, offset, source_name))
        }
    }
}

/// Run the decoder over an input known to be malformed and report where it fails.
fn locate_malformation(
    input: &[u8],
    decoder: &mut Decoder,
    offset: usize,
    source_name: &Arc<str>,
) -> DecodingError {
    let mut output = String::with_capacity(input.len());
    let mut total_bytes_read = 0;

    loop {
        match decoder.decode_to_string_without_replacement(&input[total_bytes_read..], &mut output, true)
        {
            (DecoderResult::InputEmpty, _) => {
                break DecodingError::new(
                    source_name.clone(),
                    offset + input.len(),
                    "invalid character sequence at end of input",
                );
            }
            // The output is reserved to the size of the input. Grow it slowly.
            (DecoderResult::OutputFull, bytes_read) => {
                total_bytes_read += bytes_read;
                output.reserve(input.len() / 10 + 4);
            }
            (DecoderResult::Malformed(malformed_len, bytes_after_malformed), bytes_read) => {
                total_bytes_read += bytes_read;
                let malformed_len = malformed_len as usize;
                let byte_idx = total_bytes_read - (malformed_len + bytes_after_malformed as usize);
                let malformed_sequence = &input[byte_idx..byte_idx + malformed_len];
                break DecodingError::new(
                    source_name.clone(),
                    offset + byte_idx,
                    format!("invalid character sequence {malformed_sequence:?}"),
                );
            }
        }
    }
}

fn decode_utf32(
    body: &[u8],
    from_bytes: fn([u8; 4]) -> u32,
    offset: usize,
    source_name: &Arc<str>,
) -> Result<String, DecodingError> {
    let mut output = String::with_capacity(body.len() / 4);
    let mut units = body.chunks_exact(4);
    for (i, unit) in units.by_ref().enumerate() {
        let code = from_bytes([unit[0], unit[1], unit[2], unit[3]]);
        match char::from_u32(code) {
            Some(c) => output.push(c),
            None => {
                return Err(DecodingError::new(
                    source_name.clone(),
                    offset + i * 4,
                    format!("invalid UTF-32 code unit {code:#x}"),
                ))
            }
        }
    }
    if units.remainder().is_empty() {
        Ok(output)
    } else {
        Err(DecodingError::new(
            source_name.clone(),
            offset + body.len() - units.remainder().len(),
            "truncated UTF-32 code unit",
        ))
    }
}
