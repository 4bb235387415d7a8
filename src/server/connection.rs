//! Connection Handling
//!
//! Per-client loop: read a line, dispatch it, write the reply. Commands on a
//! connection are processed strictly in order.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::protocol::{CommandHandler, Response, MAX_LINE_LENGTH};

/// Serves one client until it disconnects or an I/O error occurs.
///
/// Parse and validation failures are answered and the loop continues; only
/// socket errors and oversized lines close the connection.
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, handler: CommandHandler) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut buf)
            .await;

        match read {
            Ok(0) => {
                debug!(%peer, "Client closed connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%peer, error = %e, "Read error");
                break;
            }
        }

        let too_long = buf.len() >= MAX_LINE_LENGTH && buf.last() != Some(&b'\n');
        let response = if too_long {
            Response::Error("Line too long".to_string())
        } else {
            handler.handle_line(&buf).await
        };

        if let Err(e) = writer.write_all(&response.encode()).await {
            warn!(%peer, error = %e, "Write error");
            break;
        }

        if too_long {
            warn!(%peer, "Request line exceeded limit, closing connection");
            break;
        }
    }
}
