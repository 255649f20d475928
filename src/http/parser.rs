use thiserror::Error;

use crate::http::request::{MAX_PATH_LENGTH, Method, Request};

/// Longest method token, `POST`.
const MAX_METHOD_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("unknown request method")]
    UnknownMethod,
    #[error("malformed request line")]
    Malformed,
    #[error("request path longer than {} bytes", MAX_PATH_LENGTH)]
    PathTooLong,
}

/// Parses the request line at the start of `buf`.
///
/// Only the method and path are read. Headers are skipped; for POST the
/// bytes after the first blank line become the body, uninterpreted.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let first = *buf.first().ok_or(ParseError::Empty)?;

    if !matches!(first, b'G' | b'P') {
        return Err(ParseError::UnknownMethod);
    }

    let token_end = buf
        .iter()
        .take(MAX_METHOD_LENGTH + 1)
        .position(|&b| b == b' ')
        .ok_or(ParseError::UnknownMethod)?;
    let method = std::str::from_utf8(&buf[..token_end])
        .ok()
        .and_then(Method::from_str)
        .ok_or(ParseError::UnknownMethod)?;

    // method token plus the separating space
    let path_start = token_end + 1;
    let path = parse_path(&buf[path_start..])?;

    Ok(match method {
        Method::GET => Request::get(path),
        Method::POST => Request::post(
            path,
            find_headers_end(buf)
                .map(|end| buf[end + 4..].to_vec())
                .unwrap_or_default(),
        ),
    })
}

/// Reads the path up to the next space. The scan never leaves `rest` and
/// gives up at the end of the request line.
fn parse_path(rest: &[u8]) -> Result<String, ParseError> {
    let end = rest
        .iter()
        .position(|&b| matches!(b, b' ' | b'\r' | b'\n'))
        .ok_or(ParseError::Malformed)?;

    if rest[end] != b' ' || end == 0 {
        return Err(ParseError::Malformed);
    }
    if end > MAX_PATH_LENGTH {
        return Err(ParseError::PathTooLong);
    }

    let path = &rest[..end];
    if path.iter().any(|&b| b == 0 || !b.is_ascii()) {
        return Err(ParseError::Malformed);
    }

    // ASCII checked above
    Ok(path.iter().map(|&b| b as char).collect())
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let parsed = parse_request(req).unwrap();

        assert_eq!(parsed.method, Method::GET);
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.body, None);
    }

    #[test]
    fn scan_stops_at_buffer_end() {
        assert_eq!(parse_request(b"GET /abc"), Err(ParseError::Malformed));
    }

    #[test]
    fn path_at_limit_is_accepted() {
        let path = format!("/{}", "a".repeat(MAX_PATH_LENGTH - 1));
        let req = format!("GET {} HTTP/1.1\r\n\r\n", path);

        assert_eq!(parse_request(req.as_bytes()).unwrap().path, path);
    }
}
