//! Request-line scanning and request-head detection.

const MAX_METHOD_LEN: usize = 15;
const MAX_PATH_LEN: usize = 255;
const MAX_VERSION_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

/// Scans the first line of `buffer` into `METHOD PATH VERSION`.
///
/// Returns `None` when the line is not valid UTF-8, does not hold exactly
/// three tokens, a token exceeds its bound, or the path is not absolute.
pub fn parse_request_line(buffer: &[u8]) -> Option<RequestLine<'_>> {
    let end = buffer
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(buffer.len());
    let line = std::str::from_utf8(&buffer[..end]).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut parts = line.split_ascii_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    let version = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    if method.len() > MAX_METHOD_LEN
        || path.len() > MAX_PATH_LEN
        || version.len() > MAX_VERSION_LEN
        || !path.starts_with('/')
        || !version.starts_with("HTTP/")
    {
        return None;
    }

    Some(RequestLine {
        method,
        path,
        version,
    })
}

/// Whether `buffer` holds a complete request head (blank-line terminated).
pub fn contains_double_newline(buffer: &[u8]) -> bool {
    buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.windows(2).any(|w| w == b"\n\n")
}
