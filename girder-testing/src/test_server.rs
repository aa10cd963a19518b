// Socket-level test server

use girder_core::{Application, Dispatcher, Error};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// An [`Application`] bound to an ephemeral local port.
///
/// The server task is aborted when the value is dropped.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(dispatcher: Dispatcher) -> Result<Self, Error> {
        Self::start_shared(Arc::new(dispatcher)).await
    }

    pub async fn start_shared(dispatcher: Arc<Dispatcher>) -> Result<Self, Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Application::from_shared(dispatcher);
        let handle = tokio::spawn(async move {
            // Only a listener failure ends the loop; tests see it as refused connections.
            let _ = app.serve(listener).await;
        });
        Ok(Self { addr, handle })
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    /// Send one HTTP/1.1 request on a fresh connection.
    pub async fn request(
        &self,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<RawResponse, Error> {
        let mut head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
            method,
            target,
            self.addr,
            body.len()
        );
        for (name, value) in headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");

        let mut stream = TcpStream::connect(self.addr).await?;
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(body).await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        RawResponse::parse(&raw)
    }

    pub async fn get(&self, target: &str) -> Result<RawResponse, Error> {
        self.request("GET", target, &[], &[]).await
    }

    /// POST an urlencoded body
    pub async fn post_form(&self, target: &str, body: &str) -> Result<RawResponse, Error> {
        self.request(
            "POST",
            target,
            &[("Content-Type", "application/x-www-form-urlencoded")],
            body.as_bytes(),
        )
        .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A response read off the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Header names lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    /// Parse a non-chunked HTTP/1.1 response.
    pub fn parse(raw: &[u8]) -> Result<Self, Error> {
        let text = String::from_utf8_lossy(raw);
        let (head, body) = text
            .split_once("\r\n\r\n")
            .ok_or_else(|| Error::Internal("response has no header terminator".into()))?;

        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| Error::Internal(format!("malformed status line in {:?}", head)))?;

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();

        Ok(Self {
            status,
            headers,
            body: body.to_string(),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_response() {
        let raw = b"HTTP/1.1 405 Method Not Allowed\r\nAllow: GET, DELETE\r\ncontent-length: 2\r\n\r\nno";
        let response = RawResponse::parse(raw).unwrap();
        assert_eq!(response.status, 405);
        assert_eq!(response.header("allow"), Some("GET, DELETE"));
        assert_eq!(response.body, "no");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RawResponse::parse(b"nonsense").is_err());
        assert!(RawResponse::parse(b"HTTP/1.1 abc\r\n\r\n").is_err());
    }
}
