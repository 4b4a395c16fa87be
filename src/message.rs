//! Search result records
//!
//! A [`SearchResult`] is built from the raw RFC 2822 bytes returned by
//! a FETCH. Messages that cannot be fetched or parsed become a
//! [`MessageOutcome::Skipped`] instead, so one bad message never
//! aborts a batch.

use crate::decode::{decode_header, parse_date};
use crate::error::{Error, Result};
use mailparse::MailHeaderMap;

/// One message matching a sender search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Server-assigned message identifier (the IMAP UID).
    pub id: String,
    /// Decoded `Subject` header.
    pub subject: String,
    /// Decoded `From` header, display name included.
    pub from: String,
    /// `Date` header as `YYYY-MM-DD HH:MM:SS`, or the raw header when
    /// it could not be parsed.
    pub date: String,
    /// `Date` header exactly as sent.
    pub raw_date: String,
}

impl SearchResult {
    /// Build a result from a fetched message.
    ///
    /// Only the header block is inspected. Missing headers yield empty
    /// strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the header block is malformed.
    pub fn from_message(id: impl Into<String>, raw: &[u8]) -> Result<Self> {
        let (headers, _) =
            mailparse::parse_headers(raw).map_err(|e| Error::Parse(e.to_string()))?;

        let header = |name: &str| {
            headers
                .get_first_header(name)
                .map(|h| unfold(h.get_value_raw()))
                .unwrap_or_default()
        };

        let raw_date = header("Date");

        Ok(Self {
            id: id.into(),
            subject: decode_header(&header("Subject")),
            from: decode_header(&header("From")),
            date: parse_date(&raw_date),
            raw_date,
        })
    }
}

/// Join folded header lines back into a single line.
fn unfold(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace("\r\n", "")
        .replace('\n', "")
        .trim()
        .to_string()
}

/// A message id that was found by the search but produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMessage {
    pub id: String,
    pub reason: String,
}

/// What happened to a single message id during a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Found(SearchResult),
    Skipped(SkippedMessage),
}

/// The aggregated outcome of a sender search, in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub skipped: Vec<SkippedMessage>,
}

impl SearchReport {
    pub fn push(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Found(result) => self.results.push(result),
            MessageOutcome::Skipped(skipped) => self.skipped.push(skipped),
        }
    }

    /// Number of ids the server returned for the search.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.results.len() + self.skipped.len()
    }
}

impl FromIterator<MessageOutcome> for SearchReport {
    fn from_iter<I: IntoIterator<Item = MessageOutcome>>(iter: I) -> Self {
        let mut report = Self::default();
        for outcome in iter {
            report.push(outcome);
        }
        report
    }
}
