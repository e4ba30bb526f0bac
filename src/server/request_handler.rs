use log::{debug, error, info, warn};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use super::config::{Redirect, ServerConfig};
use super::connection::{Connection, ConnectionState};
use super::http_status::HttpStatus;
use super::mime;
use super::net::{is_would_block, Transport};
use super::request_parser::{contains_double_newline, parse_request_line};
use super::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Nothing to act on yet; keep reading.
    Pending,
    /// The peer closed its side before a request was handled.
    Closed,
    /// A response is attached and the connection is sending its header.
    Prepared,
}

/// Turns an inbound request into a prepared response.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    document_root: PathBuf,
    index: String,
    not_found_page: PathBuf,
    not_allowed_page: PathBuf,
    redirects: Vec<Redirect>,
}

impl RequestHandler {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            document_root: config.document_root.clone(),
            index: config.index.clone(),
            not_found_page: config.not_found_page.clone(),
            not_allowed_page: config.not_allowed_page.clone(),
            redirects: config.redirects.clone(),
        }
    }

    /// Reads what the socket has into the connection's receive buffer and,
    /// once a request head is complete, the buffer is full, or the peer has
    /// stopped sending, prepares the response for it.
    pub fn on_readable<S: Transport>(&self, conn: &mut Connection<S>) -> io::Result<ReadOutcome> {
        if conn.state() != ConnectionState::ReadingRequest {
            return Ok(ReadOutcome::Pending);
        }

        let fd = conn.fd;
        let peer_done = match conn.stream.read(&mut conn.request_buffer[conn.request_len..]) {
            Ok(0) if conn.request_len == 0 => {
                debug!("Connection closed by client on fd {}", fd);
                return Ok(ReadOutcome::Closed);
            }
            Ok(0) => {
                debug!(
                    "Client half-closed on fd {} after {} request bytes",
                    fd, conn.request_len
                );
                true
            }
            Ok(n) => {
                debug!("Read {} bytes from fd {}", n, fd);
                conn.request_len += n;
                false
            }
            Err(e) if is_would_block(&e) => return Ok(ReadOutcome::Pending),
            Err(e) => return Err(e),
        };

        let request = &conn.request_buffer[..conn.request_len];
        if !peer_done
            && !contains_double_newline(request)
            && conn.request_len < conn.request_buffer.len()
        {
            return Ok(ReadOutcome::Pending);
        }

        let response = self.respond(request, fd)?;
        info!(
            "{} fd {} -> {} {}",
            conn.peer,
            fd,
            response.status.code(),
            response.status.text()
        );
        conn.attach(response);
        Ok(ReadOutcome::Prepared)
    }

    /// Chooses the response for a raw request head.
    pub fn respond(&self, request: &[u8], fd: i32) -> io::Result<Response> {
        let Some(line) = parse_request_line(request) else {
            warn!("Malformed request line on fd {}", fd);
            return Ok(Response::empty(HttpStatus::BadRequest));
        };

        let path = match strip_query(line.path) {
            "/" => format!("/{}", self.index),
            p => p.to_string(),
        };
        debug!(
            "Request on fd {}: {} {} {}",
            fd, line.method, path, line.version
        );

        if line.method != "GET" {
            return self.error_page(HttpStatus::MethodNotAllowed, &self.not_allowed_page);
        }

        if let Some(redirect) = self.redirects.iter().find(|r| r.from == path) {
            debug!("Redirecting {} to {} on fd {}", path, redirect.to, fd);
            return Ok(Response::redirect(&redirect.to));
        }

        let Some(file_path) = resolve_path(&self.document_root, &path) else {
            warn!("Rejected path on fd {}: {}", fd, path);
            return self.error_page(HttpStatus::NotFound, &self.not_found_page);
        };

        match open_regular_file(&file_path) {
            Some(file) => Response::file(HttpStatus::Ok, mime::content_type(&file_path), file)
                .inspect_err(|e| error!("Cannot size {:?}: {}", file_path, e)),
            None => {
                info!("File not found: {:?}", file_path);
                self.error_page(HttpStatus::NotFound, &self.not_found_page)
            }
        }
    }

    fn error_page(&self, status: HttpStatus, page: &Path) -> io::Result<Response> {
        let file = File::open(page).inspect_err(|e| {
            error!("Cannot open {} page {:?}: {}", status.code(), page, e);
        })?;
        Response::file(status, mime::content_type(page), file)
    }
}

fn open_regular_file(path: &Path) -> Option<File> {
    let file = File::open(path).ok()?;
    let metadata = file.metadata().ok()?;
    metadata.is_file().then_some(file)
}

/// Request path without its query string and fragment.
pub fn strip_query(request_path: &str) -> &str {
    request_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
}

/// Maps a request path onto `document_root`; any `..` segment rejects it.
pub fn resolve_path(document_root: &Path, path: &str) -> Option<PathBuf> {
    let mut resolved = document_root.to_path_buf();
    for component in Path::new(path).components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(segment) => resolved.push(segment),
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }

    (resolved != document_root).then_some(resolved)
}
