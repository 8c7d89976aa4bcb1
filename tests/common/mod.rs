//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Render a raw HTTP/1.1 response. Header pairs are written in order, duplicates included.
pub fn raw_response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

/// Start a mock backend on an ephemeral port.
///
/// Every connection is answered with `reply()`; the raw request text (head and body)
/// is sent on the returned channel.
pub async fn start_programmable_backend<F>(reply: F) -> (SocketAddr, mpsc::UnboundedReceiver<String>)
where
    F: Fn() -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let reply = std::sync::Arc::new(reply);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Ok(request) = read_request(&mut socket).await {
                    let _ = tx.send(request);
                }
                let _ = socket.write_all(reply().as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Backend that answers every request with the same canned response.
pub async fn start_mock_backend(response: String) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    start_programmable_backend(move || response.clone()).await
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(socket);
    let mut head = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line == "\r\n" {
            break;
        }
        head.push_str(&line);
    }

    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = vec![0; length];
    reader.read_exact(&mut body).await?;

    Ok(format!("{}\r\n{}", head, String::from_utf8_lossy(&body)))
}
