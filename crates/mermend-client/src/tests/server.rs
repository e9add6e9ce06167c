//! One-shot HTTP/1.1 server answering each connection with a canned response.

use crate::{ApiClient, ClientConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
        }
    }

    pub fn bytes(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct Recorded {
    /// `METHOD /path?query`
    pub target: String,
    pub head: String,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub async fn serve(responses: Vec<Canned>) -> (ApiClient, JoinHandle<Vec<Recorded>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut socket).await);
            let head = format!(
                "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                canned.status,
                canned.content_type,
                canned.body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&canned.body).await.unwrap();
            let _ = socket.shutdown().await;
        }
        seen
    });
    let client = ApiClient::new(ClientConfig::new(&base).unwrap()).unwrap();
    (client, handle)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) {
    let mut chunk = [0u8; 4096];
    let n = socket.read(&mut chunk).await.unwrap();
    assert!(n > 0, "client closed the connection mid-request");
    buf.extend_from_slice(&chunk[..n]);
}

async fn read_request(socket: &mut TcpStream) -> Recorded {
    let mut buf = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        read_more(socket, &mut buf).await;
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let lower = head.to_ascii_lowercase();
    let content_length = lower
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    let mut body = buf[header_end..].to_vec();
    match content_length {
        Some(len) => {
            while body.len() < len {
                read_more(socket, &mut body).await;
            }
        }
        None if lower.contains("transfer-encoding: chunked") => {
            while !body.ends_with(b"0\r\n\r\n") {
                read_more(socket, &mut body).await;
            }
        }
        None => {}
    }
    let target = head
        .lines()
        .next()
        .and_then(|line| line.rsplit_once(' '))
        .map(|(target, _version)| target.to_string())
        .unwrap_or_default();
    Recorded { target, head, body }
}
