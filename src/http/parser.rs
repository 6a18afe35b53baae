use crate::http::request::ParsedRequest;

/// Longest request line the tokenizer will look at
pub const MAX_REQUEST_LINE: usize = 1024;

/// Classifies a raw request buffer.
///
/// Only the first line is examined, at most [`MAX_REQUEST_LINE`] bytes of it.
/// Tokens are separated by ASCII whitespace; the first is the method, the
/// second the path, anything after (the version) is ignored. Never fails:
/// anything that does not produce two UTF-8 tokens is marked invalid.
pub fn parse_request(buf: &[u8]) -> ParsedRequest {
    let line = request_line(buf);

    let mut tokens = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let (Some(method), Some(path)) = (tokens.next(), tokens.next()) else {
        return ParsedRequest::malformed();
    };

    match (std::str::from_utf8(method), std::str::from_utf8(path)) {
        (Ok(method), Ok(path)) => ParsedRequest::new(method, path),
        _ => ParsedRequest::malformed(),
    }
}

/// Returns true once the buffer holds a complete request line.
pub fn has_request_line(buf: &[u8]) -> bool {
    buf.contains(&b'\n')
}

fn request_line(buf: &[u8]) -> &[u8] {
    let bounded = &buf[..buf.len().min(MAX_REQUEST_LINE)];
    let end = bounded
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(bounded.len());
    &bounded[..end]
}
