//! Write helpers for the fake IMAP server.
//!
//! Every write is flushed immediately so responses reach the client
//! in the order the handlers produce them.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a protocol line (caller supplies the CRLF) and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    write_bytes(stream, line.as_bytes()).await
}

/// Write raw bytes, e.g. a literal message body, and flush.
pub async fn write_bytes<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    data: &[u8],
) -> std::io::Result<()> {
    stream.get_mut().write_all(data).await?;
    stream.get_mut().flush().await
}
