//! Per-connection task (§6): reads newline-terminated requests, validates
//! arity against the registry, builds the `Payload` the directory expects
//! (folding `keys`-namespace commands onto the `"keys"` sentinel key per
//! §4.3), and writes back whatever the addressed actor replies with.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::directory::DirectoryHandle;
use crate::payload::Payload;
use crate::registry;
use crate::reply;

pub async fn handle(socket: TcpStream, peer: std::net::SocketAddr, directory: DirectoryHandle) {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();

    let (to_client, mut from_actors) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    debug!(%peer, "connection closed");
                    return;
                };
                let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
                if tokens.is_empty() {
                    continue;
                }
                let cmd = tokens[0].to_ascii_lowercase();
                if !registry::arity_ok(&cmd, tokens.len()) {
                    let _ = to_client.send(reply::ERR_ARITY.to_string());
                    continue;
                }

                let payload = if registry::is_keys_category(&cmd) {
                    Payload::new(cmd, "keys", tokens[1..].to_vec()).with_client(to_client.clone())
                } else {
                    Payload::new(cmd, tokens[1].clone(), tokens[2..].to_vec()).with_client(to_client.clone())
                };
                directory.route(payload);
            }
            Some(text) = from_actors.recv() => {
                if writer.write_all(text.as_bytes()).await.is_err() {
                    return;
                }
                if writer.write_all(b"\n").await.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::net::{TcpListener, TcpStream as ClientStream};
    use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader as ClientBufReader};

    #[tokio::test]
    async fn set_then_get_over_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let directory = crate::directory::spawn(&Config::default());

        tokio::spawn(async move {
            let (socket, peer) = listener.accept().await.unwrap();
            handle(socket, peer, directory).await;
        });

        let stream = ClientStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = ClientBufReader::new(read_half).lines();

        write_half.write_all(b"set greeting hello\n").await.unwrap();
        let line = reader.next_line().await.unwrap().unwrap();
        assert_eq!(line, "OK");

        write_half.write_all(b"get greeting\n").await.unwrap();
        let line = reader.next_line().await.unwrap().unwrap();
        assert_eq!(line, "hello");
    }

    #[tokio::test]
    async fn malformed_arity_is_rejected_before_routing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let directory = crate::directory::spawn(&Config::default());

        tokio::spawn(async move {
            let (socket, peer) = listener.accept().await.unwrap();
            handle(socket, peer, directory).await;
        });

        let stream = ClientStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = ClientBufReader::new(read_half).lines();

        write_half.write_all(b"get\n").await.unwrap();
        let line = reader.next_line().await.unwrap().unwrap();
        assert_eq!(line, reply::ERR_ARITY);
    }
}
