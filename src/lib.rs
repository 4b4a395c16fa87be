//! IMAP sender search library
//!
//! Logs into an IMAP mailbox and finds messages from one sender within
//! a recent time window. Each match is reported as a [`SearchResult`]
//! with its subject and sender decoded from RFC 2047 and its date
//! normalised.
//!
//! The server is either given explicitly or looked up from the
//! address's domain with [`ServerProfile`]. Connections use implicit
//! TLS, STARTTLS, or plaintext, see [`Security`].

mod config;
mod connection;
mod decode;
mod error;
mod message;
mod provider;
mod session;

pub use config::{AccountConfig, AccountOverrides, SavedConfig, Security};
pub use decode::{DATE_FORMAT, decode_header, parse_date};
pub use error::{Error, Result};
pub use message::{MessageOutcome, SearchReport, SearchResult, SkippedMessage};
pub use provider::{IMAPS_PORT, ServerProfile, server_for_address};
pub use session::Session;
