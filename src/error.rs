//! Error types for imap-sender-check

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Message parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Not connected to the IMAP server")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, Error>;
