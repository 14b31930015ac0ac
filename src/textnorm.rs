//! Charset and line-ending normalization
//!
//! Documents live in memory as UTF-8 with LF line endings. This module
//! converts between that canonical form and whatever the file on disk
//! uses:
//! - line-ending detection and conversion (LF, CR, CRLF)
//! - charset detection (statistical, via chardetng)
//! - transcoding with a bounded fallback: a byte sequence that is illegal
//!   in the chosen charset is retried as ISO-8859-1, which accepts any
//!   byte sequence, so decoding terminates in at most two attempts.

use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::{ErrorCategory, ErrorKind, InkvaultError, Result};

/// Charset used when nothing is recorded and detection has nothing to go on
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Last-resort charset; every byte sequence decodes under it
pub const FALLBACK_CHARSET: &str = "ISO-8859-1";

/// Line-ending convention of a document on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    pub fn name(self) -> &'static str {
        match self {
            LineEnding::Lf => "LF",
            LineEnding::Cr => "CR",
            LineEnding::CrLf => "CRLF",
        }
    }
}

/// Classify a document's line-ending convention by its first terminator.
///
/// Text without any terminator counts as LF.
pub fn detect_line_ending(bytes: &[u8]) -> LineEnding {
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => return LineEnding::Lf,
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    return LineEnding::CrLf;
                }
                return LineEnding::Cr;
            }
            _ => {}
        }
    }
    LineEnding::Lf
}

/// Convert all line terminators (CR, CRLF) to LF. Idempotent.
pub fn normalize_to_lf(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\r' {
            out.push(b'\n');
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 1;
            }
        } else {
            out.push(bytes[i]);
        }
        i += 1;
    }
    out
}

/// Convert LF-normalized text to the target line-ending convention.
pub fn apply_line_ending(text: &str, ending: LineEnding) -> Cow<'_, str> {
    match ending {
        LineEnding::Lf => Cow::Borrowed(text),
        LineEnding::Cr => Cow::Owned(text.replace('\n', "\r")),
        LineEnding::CrLf => Cow::Owned(text.replace('\n', "\r\n")),
    }
}

/// Guess the charset of undeclared text.
///
/// Valid UTF-8 is reported as UTF-8 without consulting the detector;
/// chardetng tends to label pure-ASCII input windows-1252, which would
/// stick to the document and survive into saves. Returns `None` when
/// there is nothing to go on.
pub fn detect_charset(bytes: &[u8]) -> Option<&'static str> {
    if bytes.is_empty() {
        return None;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Some("UTF-8");
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    Some(detector.guess(None, true).name())
}

/// Decode raw text bytes to UTF-8 with the bounded two-candidate fallback.
///
/// The charset tried first is `recorded` when present (a user or session
/// override always wins), otherwise the detection result, otherwise the
/// default. If that charset rejects the bytes, ISO-8859-1 is tried and
/// always succeeds. Returns the text together with the charset that
/// actually decoded it, which the caller records on the document.
pub fn decode_text(bytes: &[u8], recorded: Option<&str>) -> Result<(String, String)> {
    let chosen = match recorded {
        Some(charset) => charset.to_string(),
        None => detect_charset(bytes).unwrap_or(DEFAULT_CHARSET).to_string(),
    };

    if bytes.is_empty() {
        return Ok((String::new(), chosen));
    }

    for candidate in [chosen.as_str(), FALLBACK_CHARSET] {
        let Some(encoding) = Encoding::for_label(candidate.as_bytes()) else {
            // Unknown recorded label; the fallback round picks it up.
            continue;
        };
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok((text.into_owned(), candidate.to_string()));
        }
    }

    // ISO-8859-1 accepts any byte sequence, so the loop cannot fall
    // through it.
    Err(InkvaultError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::CharsetConversion,
        format!("unable to decode text as '{}' or '{}'", chosen, FALLBACK_CHARSET),
    ))
}

/// Encode UTF-8 text into the target charset's byte form.
///
/// Fails when the charset is unknown, cannot be used as an on-disk
/// encoding, or cannot represent some character of the text; the error
/// message names the charset so the caller can surface it.
pub fn encode_text(text: &str, charset: &str) -> Result<Vec<u8>> {
    let encoding = Encoding::for_label(charset.as_bytes()).ok_or_else(|| {
        InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::CharsetConversion,
            format!("unknown charset '{}'", charset),
        )
    })?;

    // encoding_rs silently substitutes UTF-8 output for encodings it
    // cannot encode to (the UTF-16 family); reject those instead of
    // writing bytes in the wrong charset.
    if encoding.output_encoding() != encoding {
        return Err(InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::CharsetConversion,
            format!("can't convert codeset to '{}'", charset),
        ));
    }

    let (bytes, _, had_unmappable) = encoding.encode(text);
    if had_unmappable {
        return Err(InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::CharsetConversion,
            format!("can't convert codeset to '{}'", charset),
        ));
    }

    Ok(bytes.into_owned())
}
