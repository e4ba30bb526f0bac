use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use poll_static_server::server::HttpServer;
use poll_static_server::server::config::ServerConfig;
use poll_static_server::server::event_loop::EventLoop;
use tempfile::TempDir;

const INDEX: &str = "<html><body>Hello there</body></html>";
const NOT_FOUND: &str = "<h1>404 Not Found</h1>";
const NOT_ALLOWED: &str = "<h1>405 Method Not Allowed</h1>";

struct Site {
    dir: TempDir,
    server: HttpServer,
}

impl Site {
    fn new() -> Self {
        Self::with_chunk_size(4096)
    }

    fn with_chunk_size(chunk_size: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("www");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("index.html"), INDEX).unwrap();
        fs::write(dir.path().join("404.html"), NOT_FOUND).unwrap();
        fs::write(dir.path().join("405.html"), NOT_ALLOWED).unwrap();

        let config = ServerConfig {
            port: 0,
            backlog: 16,
            document_root: root,
            not_found_page: dir.path().join("404.html"),
            not_allowed_page: dir.path().join("405.html"),
            poll_timeout_ms: Some(200),
            chunk_size,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(&config).unwrap();
        Site { dir, server }
    }

    fn event_loop(&mut self) -> &mut EventLoop {
        self.server.event_loop()
    }

    fn connect(&mut self) -> TcpStream {
        let addr = self.event_loop().listener().local_addr().unwrap();
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn turn_until(&mut self, mut done: impl FnMut(&EventLoop) -> bool) {
        for _ in 0..200 {
            if done(self.event_loop()) {
                return;
            }
            self.event_loop().turn().unwrap();
        }
        assert!(done(self.event_loop()), "event loop never reached the condition");
    }

    /// Sends `request` on a fresh connection and returns everything the
    /// server wrote before closing.
    fn exchange(&mut self, request: &str) -> Vec<u8> {
        let mut client = self.connect();
        client.write_all(request.as_bytes()).unwrap();

        self.turn_until(|l| l.registry().len() == 1);
        self.turn_until(|l| l.registry().is_empty());
        assert!(self.event_loop().registry().is_synchronized());

        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        response
    }
}

fn split(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has no header terminator")
        + 4;
    (
        String::from_utf8(response[..end].to_vec()).unwrap(),
        response[end..].to_vec(),
    )
}

#[test]
fn test_get_existing_file() {
    let mut site = Site::new();
    assert_eq!(INDEX.len(), 37);

    let response = site.exchange("GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/html\r\n"));
    assert!(head.contains("Content-Length: 37\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(body, INDEX.as_bytes());
}

#[test]
fn test_root_serves_index() {
    let mut site = Site::new();
    let response = site.exchange("GET / HTTP/1.1\r\n\r\n");
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, INDEX.as_bytes());
}

#[test]
fn test_missing_file_gets_not_found_page() {
    let mut site = Site::new();
    let response = site.exchange("GET /missing.html HTTP/1.1\r\n\r\n");
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", NOT_FOUND.len())));
    assert_eq!(body, NOT_FOUND.as_bytes());
}

#[test]
fn test_other_method_gets_not_allowed_page() {
    let mut site = Site::new();
    let response = site.exchange("POST /anything HTTP/1.1\r\nContent-Length: 0\r\n\r\n");
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", NOT_ALLOWED.len())));
    assert_eq!(body, NOT_ALLOWED.as_bytes());
}

#[test]
fn test_alias_redirects_without_body() {
    let mut site = Site::new();
    let response = site.exchange("GET /oldpage.html HTTP/1.1\r\n\r\n");
    let (head, body) = split(&response);

    assert!(head.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(head.contains("Location: /index.html\r\n"));
    assert!(head.contains("Content-Length: 0\r\n"));
    assert!(!head.contains("Content-Type"));
    assert!(body.is_empty());
}

#[test]
fn test_large_file_streams_through_small_chunks() {
    let mut site = Site::with_chunk_size(7);
    let contents: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(site.dir.path().join("www/blob.bin"), &contents).unwrap();

    let mut client = site.connect();
    client
        .write_all(b"GET /blob.bin HTTP/1.1\r\n\r\n")
        .unwrap();

    // The client must drain concurrently or the socket buffers fill up.
    let reader = std::thread::spawn(move || {
        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        response
    });

    site.turn_until(|l| l.registry().len() == 1);
    for _ in 0..1_000_000 {
        if site.event_loop().registry().is_empty() {
            break;
        }
        site.event_loop().turn().unwrap();
    }
    assert!(site.event_loop().registry().is_empty());

    let response = reader.join().unwrap();
    let (head, body) = split(&response);
    assert!(head.contains("Content-Type: application/octet-stream\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", contents.len())));
    assert_eq!(body, contents);
}

#[test]
fn test_peer_close_before_request_removes_connection() {
    let mut site = Site::new();
    let client = site.connect();
    site.turn_until(|l| l.registry().len() == 1);

    drop(client);
    site.turn_until(|l| l.registry().is_empty());
    assert!(site.event_loop().registry().is_synchronized());
}

#[test]
fn test_many_clients_are_multiplexed() {
    let mut site = Site::new();
    let mut clients: Vec<TcpStream> = (0..8).map(|_| site.connect()).collect();
    site.turn_until(|l| l.registry().len() == 8);
    assert!(site.event_loop().registry().is_synchronized());

    for (i, client) in clients.iter_mut().enumerate() {
        let path = if i % 2 == 0 { "/index.html" } else { "/nope" };
        client
            .write_all(format!("GET {} HTTP/1.1\r\n\r\n", path).as_bytes())
            .unwrap();
    }
    site.turn_until(|l| l.registry().is_empty());

    for (i, mut client) in clients.into_iter().enumerate() {
        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        let (head, body) = split(&response);
        if i % 2 == 0 {
            assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
            assert_eq!(body, INDEX.as_bytes());
        } else {
            assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
            assert_eq!(body, NOT_FOUND.as_bytes());
        }
    }
}
