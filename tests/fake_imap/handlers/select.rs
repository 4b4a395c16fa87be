//! SELECT command handler.
//!
//! Opens a folder and responds with the metadata RFC 3501 requires:
//! FLAGS, EXISTS, RECENT, UIDVALIDITY, UIDNEXT and PERMANENTFLAGS.
//! A missing folder gets a tagged `NO`.
//!
//! Returns the selected folder name (or `None` if not found).

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the SELECT command. Returns the selected folder name.
pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} NO Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return None;
    };

    let uidnext = folder
        .emails
        .iter()
        .map(|e| e.uid)
        .max()
        .map_or(1, |max| max + 1);

    let lines = [
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1]\r\n".to_string(),
        format!("* OK [UIDNEXT {uidnext}]\r\n"),
        "* OK [PERMANENTFLAGS ()] Read-only test store\r\n".to_string(),
        format!("{tag} OK [READ-WRITE] SELECT completed\r\n"),
    ];
    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return None;
        }
    }

    Some(folder_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    fn make_raw_email() -> Vec<u8> {
        b"From: a@b.com\r\nSubject: Test\r\n\r\nBody".to_vec()
    }

    async fn run(tag: &str, folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        let selected = handle_select(tag, folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn selects_existing_folder() {
        let raw = make_raw_email();
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, &raw)
            .email(2, &raw)
            .build();

        let (output, selected) = run("A1", "INBOX", &mailbox).await;

        assert_eq!(selected, Some("INBOX".to_string()));
        assert!(output.contains("* 2 EXISTS"));
        assert!(output.contains("UIDVALIDITY"));
        assert!(output.ends_with("A1 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn returns_none_for_missing_folder() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let (output, selected) = run("A1", "NoSuchFolder", &mailbox).await;

        assert!(selected.is_none());
        assert_eq!(output, "A1 NO Folder not found\r\n");
    }

    #[tokio::test]
    async fn uidnext_follows_highest_uid() {
        let raw = make_raw_email();
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(5, &raw)
            .email(10, &raw)
            .build();
        let (output, _) = run("A1", "INBOX", &mailbox).await;
        assert!(output.contains("* OK [UIDNEXT 11]"));
    }

    #[tokio::test]
    async fn uidnext_is_1_for_empty_folder() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let (output, _) = run("A1", "INBOX", &mailbox).await;
        assert!(output.contains("* 0 EXISTS"));
        assert!(output.contains("* OK [UIDNEXT 1]"));
    }
}
