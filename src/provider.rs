//! Well-known IMAP endpoints
//!
//! Maps the domain of an email address to the provider's IMAP server.
//! Unknown domains fall back to `imap.<domain>` on port 993.

use crate::error::{Error, Result};

/// Implicit-TLS IMAP port.
pub const IMAPS_PORT: u16 = 993;

const KNOWN_SERVERS: &[(&str, &str)] = &[
    ("gmail.com", "imap.gmail.com"),
    ("outlook.com", "outlook.office365.com"),
    ("hotmail.com", "outlook.office365.com"),
    ("live.com", "outlook.office365.com"),
    ("yahoo.com", "imap.mail.yahoo.com"),
    ("icloud.com", "imap.mail.me.com"),
    ("aol.com", "imap.aol.com"),
];

/// Host and port of an IMAP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProfile {
    pub host: String,
    pub port: u16,
}

impl ServerProfile {
    /// Look up the server for a mail domain (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use imap_sender_check::ServerProfile;
    ///
    /// let gmail = ServerProfile::for_domain("Gmail.com");
    /// assert_eq!(gmail.host, "imap.gmail.com");
    ///
    /// let other = ServerProfile::for_domain("example.net");
    /// assert_eq!(other.host, "imap.example.net");
    /// assert_eq!(other.port, 993);
    /// ```
    #[must_use]
    pub fn for_domain(domain: &str) -> Self {
        let domain = domain.trim().to_lowercase();
        let host = KNOWN_SERVERS
            .iter()
            .find(|(known, _)| *known == domain)
            .map_or_else(|| format!("imap.{domain}"), |(_, host)| (*host).to_string());

        Self {
            host,
            port: IMAPS_PORT,
        }
    }
}

/// Look up the server for the domain of an email address.
///
/// # Errors
///
/// Returns [`Error::Config`] if the address has no domain part.
pub fn server_for_address(email_address: &str) -> Result<ServerProfile> {
    let domain = email_address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .ok_or_else(|| {
            Error::Config(format!("Invalid email address '{email_address}': missing domain"))
        })?;

    Ok(ServerProfile::for_domain(domain))
}
