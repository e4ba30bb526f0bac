use std::fs::File;
use std::io::{self, Seek, SeekFrom};

use super::http_status::HttpStatus;

/// A prepared response: status line inputs plus an optional file body.
#[derive(Debug)]
pub struct Response {
    pub status: HttpStatus,
    pub content_type: Option<&'static str>,
    pub location: Option<String>,
    pub body: Option<File>,
    pub content_length: u64,
}

impl Response {
    /// Response whose body is the whole of `file`. The size is measured by
    /// seeking to the end and back to the start.
    pub fn file(status: HttpStatus, content_type: &'static str, mut file: File) -> io::Result<Self> {
        let content_length = file_size(&mut file)?;
        Ok(Self {
            status,
            content_type: Some(content_type),
            location: None,
            body: Some(file),
            content_length,
        })
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: HttpStatus::Found,
            content_type: None,
            location: Some(location.to_string()),
            body: None,
            content_length: 0,
        }
    }

    pub fn empty(status: HttpStatus) -> Self {
        Self {
            status,
            content_type: Some("text/html"),
            location: None,
            body: None,
            content_length: 0,
        }
    }

    pub fn header_block(&self) -> Vec<u8> {
        let mut headers = self.status.as_response_line();
        if let Some(location) = &self.location {
            headers.push_str(&format!("Location: {}\r\n", location));
        }
        if let Some(content_type) = self.content_type {
            headers.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        headers.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.content_length
        ));
        headers.into_bytes()
    }
}

fn file_size(file: &mut File) -> io::Result<u64> {
    let size = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(size)
}
