//! Header and date decoding
//!
//! Header values may mix RFC 2047 encoded words
//! (`=?charset?B?...?=` or `=?charset?Q?...?=`) with plain text.
//! [`decode_header`] turns such a value into display text and never
//! fails: an unknown charset falls back to lossy UTF-8 and a malformed
//! encoded word is kept verbatim.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, NaiveDateTime};
use encoding_rs::Encoding;

/// Format of a normalised date, e.g. `2024-01-01 12:00:00`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Mail user agents are sloppy about base64 padding in encoded words.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// One segment of a header value.
#[derive(Debug, PartialEq, Eq)]
enum HeaderPart<'a> {
    /// An encoded word, already transfer-decoded to raw bytes.
    Encoded { charset: &'a str, bytes: Vec<u8> },
    /// Text outside any encoded word.
    Plain(&'a str),
}

/// Decode a header value into plain display text.
///
/// Every encoded word is decoded with its declared charset and all
/// parts are concatenated in their original order. Whitespace that
/// only separates two encoded words is dropped (RFC 2047 section 6.2).
///
/// ```
/// use imap_sender_check::decode_header;
///
/// let subject = "=?UTF-8?B?SGVsbG8g?= =?ISO-8859-1?Q?W=F6rld?=";
/// assert_eq!(decode_header(subject), "Hello Wörld");
/// assert_eq!(decode_header(""), "");
/// ```
#[must_use]
pub fn decode_header(value: &str) -> String {
    let parts = split_parts(value);
    let mut decoded = String::with_capacity(value.len());

    for (i, part) in parts.iter().enumerate() {
        match part {
            HeaderPart::Encoded { charset, bytes } => {
                decoded.push_str(&decode_charset(charset, bytes));
            }
            HeaderPart::Plain(text) => {
                let is_encoded =
                    |p: Option<&HeaderPart<'_>>| matches!(p, Some(HeaderPart::Encoded { .. }));
                let between_words = text.trim().is_empty()
                    && is_encoded(i.checked_sub(1).and_then(|prev| parts.get(prev)))
                    && is_encoded(parts.get(i + 1));
                if !between_words {
                    decoded.push_str(text);
                }
            }
        }
    }

    decoded
}

/// Normalise an RFC 2822 date header to `YYYY-MM-DD HH:MM:SS`.
///
/// The timestamp is rendered in the offset the header carries. The
/// leading weekday is not checked against the date, and a date without
/// a zone is taken as written. If the header cannot be parsed the raw
/// string is returned unchanged.
#[must_use]
pub fn parse_date(raw: &str) -> String {
    parse_rfc2822(raw).map_or_else(
        || raw.to_string(),
        |date| date.format(DATE_FORMAT).to_string(),
    )
}

/// `01 Jan 2024 12:00:00`, for headers that omit the zone.
const ZONELESS_FORMAT: &str = "%d %b %Y %H:%M:%S";

fn parse_rfc2822(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    // e.g. "Mon, 1 Jan 2024 10:00:00 +0000 (UTC)"
    [Some(trimmed), strip_trailing_comment(trimmed)]
        .into_iter()
        .flatten()
        .map(strip_weekday)
        .find_map(|value| {
            DateTime::parse_from_rfc2822(value)
                .map(|date| date.naive_local())
                .or_else(|_| NaiveDateTime::parse_from_str(value, ZONELESS_FORMAT))
                .ok()
        })
}

fn strip_trailing_comment(value: &str) -> Option<&str> {
    let inner = value.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    Some(inner[..open].trim_end())
}

/// Drop a leading `Mon,` so a wrong weekday does not reject the date.
fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest)) if day.len() == 3 && day.bytes().all(|b| b.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => value,
    }
}

fn split_parts(value: &str) -> Vec<HeaderPart<'_>> {
    let mut parts = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while let Some(offset) = value[pos..].find("=?") {
        let start = pos + offset;
        if let Some((word, len)) = encoded_word(&value[start..]) {
            if start > plain_start {
                parts.push(HeaderPart::Plain(&value[plain_start..start]));
            }
            parts.push(word);
            pos = start + len;
            plain_start = pos;
        } else {
            pos = start + 2;
        }
    }

    if plain_start < value.len() {
        parts.push(HeaderPart::Plain(&value[plain_start..]));
    }
    parts
}

/// Parse an encoded word at the start of `s`, returning it together
/// with the number of bytes it spans.
fn encoded_word(s: &str) -> Option<(HeaderPart<'_>, usize)> {
    let inner = s.strip_prefix("=?")?;
    let (charset, rest) = inner.split_once('?')?;
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let mut chars = rest.chars();
    let encoding = chars.next()?;
    let rest = chars.as_str().strip_prefix('?')?;
    let end = rest.find("?=")?;
    let text = &rest[..end];

    let bytes = match encoding {
        'B' | 'b' => LENIENT_BASE64.decode(text.trim()).ok()?,
        'Q' | 'q' => decode_q(text),
        _ => return None,
    };

    let len = 2 + charset.len() + 1 + encoding.len_utf8() + 1 + end + 2;
    Some((HeaderPart::Encoded { charset, bytes }, len))
}

/// The "Q" encoding: quoted-printable with `_` standing for a space.
fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' => {
                if let Some(byte) = bytes.get(i + 1..i + 3).and_then(hex_pair) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

fn hex_pair(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

/// Decode bytes in the declared charset, falling back to lossy UTF-8
/// when the charset is unknown or the bytes are invalid in it.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 allows a language suffix: "utf-8*en"
    let label = charset.split('*').next().unwrap_or(charset).trim();

    Encoding::for_label(label.as_bytes())
        .and_then(|encoding| encoding.decode_without_bom_handling_and_without_replacement(bytes))
        .map_or_else(
            || String::from_utf8_lossy(bytes).into_owned(),
            std::borrow::Cow::into_owned,
        )
}
