//! Sender search over a single IMAP connection

use crate::config::AccountConfig;
use crate::connection::{self, ImapSession};
use crate::error::{Error, Result};
use crate::message::{MessageOutcome, SearchReport, SearchResult, SkippedMessage};
use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

/// An IMAP session that searches one mailbox for mail from a sender.
///
/// The connection exists only between a successful
/// [`connect`](Self::connect) and [`disconnect`](Self::disconnect).
/// Commands are issued strictly one after another.
pub struct Session {
    config: AccountConfig,
    imap: Option<ImapSession>,
}

impl Session {
    #[must_use]
    pub const fn new(config: AccountConfig) -> Self {
        Self { config, imap: None }
    }

    #[must_use]
    pub const fn config(&self) -> &AccountConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.imap.is_some()
    }

    /// Connect and log in. Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection, TLS setup, or LOGIN
    /// fails. The session stays disconnected in that case.
    pub async fn connect(&mut self) -> Result<()> {
        if self.imap.is_none() {
            self.imap = Some(connection::connect(&self.config).await?);
        }
        Ok(())
    }

    /// Find messages from `sender` received in the last `days_back`
    /// days.
    ///
    /// Never fails: when not connected, or when SELECT or SEARCH is
    /// rejected, the error is logged and an empty list returned.
    /// Messages that cannot be fetched or parsed are logged and left
    /// out.
    pub async fn search_from_sender(
        &mut self,
        sender: &str,
        days_back: u32,
        mailbox: &str,
    ) -> Vec<SearchResult> {
        match self.try_search_from_sender(sender, days_back, mailbox).await {
            Ok(report) => report.results,
            Err(e) => {
                error!("Search error: {}", e);
                Vec::new()
            }
        }
    }

    /// Like [`search_from_sender`](Self::search_from_sender), but
    /// reports failures and skipped messages to the caller.
    ///
    /// Matching on `FROM` is done by the server; no client-side
    /// filtering is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before a successful connect, or
    /// an IMAP error if SELECT or SEARCH fails.
    pub async fn try_search_from_sender(
        &mut self,
        sender: &str,
        days_back: u32,
        mailbox: &str,
    ) -> Result<SearchReport> {
        let session = self.imap.as_mut().ok_or(Error::NotConnected)?;
        connection::select(session, mailbox).await?;

        let since = cutoff_date(Local::now().date_naive(), days_back);
        let query = search_query(sender, since);
        debug!("UID SEARCH {}", query);

        let uids = session
            .uid_search(&query)
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        // async-imap returns a set, so the server's order is gone.
        // Ascending UIDs rebuild the order servers normally use.
        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();

        info!(
            "Found {} messages from {} in the last {} days",
            uid_list.len(),
            sender,
            days_back
        );

        let mut report = SearchReport::default();
        for uid in uid_list {
            report.push(fetch_outcome(session, uid).await);
        }
        Ok(report)
    }

    /// Log out and drop the connection.
    ///
    /// Safe to call any number of times; only the first call on a
    /// connected session talks to the server.
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.imap.take() {
            if let Err(e) = session.logout().await {
                debug!("Logout failed: {}", e);
            }
            info!("Disconnected from {}", self.config.host);
        }
    }
}

async fn fetch_outcome(session: &mut ImapSession, uid: u32) -> MessageOutcome {
    match fetch_message(session, uid).await {
        Ok(result) => MessageOutcome::Found(result),
        Err(e) => {
            warn!("Error processing UID {}: {}", uid, e);
            MessageOutcome::Skipped(SkippedMessage {
                id: uid.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

async fn fetch_message(session: &mut ImapSession, uid: u32) -> Result<SearchResult> {
    let mut messages = session
        .uid_fetch(uid.to_string(), "(BODY.PEEK[])")
        .await
        .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

    // Drain the whole response so the next command starts clean.
    let mut body = None;
    let mut failure = None;
    while let Some(item) = messages.next().await {
        match item {
            Ok(fetch) => {
                if body.is_none() {
                    body = fetch.body().map(<[u8]>::to_vec);
                }
            }
            Err(e) => {
                failure.get_or_insert_with(|| Error::Imap(format!("Fetch error: {e}")));
            }
        }
    }
    drop(messages);

    match (body, failure) {
        (Some(body), _) => SearchResult::from_message(uid.to_string(), &body),
        (None, Some(e)) => Err(e),
        (None, None) => Err(Error::Imap(format!("No body found for UID {uid}"))),
    }
}

/// First day of the search window: `days_back` days before `today`,
/// but never before 1 January 1970.
fn cutoff_date(today: NaiveDate, days_back: u32) -> NaiveDate {
    let earliest = NaiveDateTime::UNIX_EPOCH.date();
    today
        .checked_sub_days(Days::new(u64::from(days_back)))
        .map_or(earliest, |date| date.max(earliest))
}

/// `FROM "<sender>" SINCE <d-Mon-yyyy>`
///
/// IMAP SINCE compares against the internal date and is inclusive.
fn search_query(sender: &str, since: NaiveDate) -> String {
    format!(
        "FROM {} SINCE {}",
        quote(sender),
        since.format("%-d-%b-%Y")
    )
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
