//! Decoder for `Transfer-Encoding: chunked` message bodies.
//!
//! Shared by the request parser and the upstream response reader. Chunk
//! extensions and trailer fields are consumed and discarded.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkedError {
    #[error("invalid chunk size line")]
    InvalidSize,
    #[error("chunk data not terminated by CRLF")]
    MissingTerminator,
}

/// Decodes a complete chunked body from the start of `buf`.
///
/// Returns `Ok(None)` while more bytes are needed, otherwise the decoded
/// body and the number of bytes consumed (including trailers).
pub fn decode(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, ChunkedError> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let Some(line_len) = find_crlf(&buf[pos..]) else {
            return Ok(None);
        };
        let size = parse_size(&buf[pos..pos + line_len])?;
        pos += line_len + 2;

        if size == 0 {
            // Trailer section ends with an empty line.
            loop {
                let Some(len) = find_crlf(&buf[pos..]) else {
                    return Ok(None);
                };
                pos += len + 2;
                if len == 0 {
                    return Ok(Some((body, pos)));
                }
            }
        }

        let data_end = pos.checked_add(size).ok_or(ChunkedError::InvalidSize)?;
        if buf.len() < data_end + 2 {
            return Ok(None);
        }

        body.extend_from_slice(&buf[pos..data_end]);
        if &buf[data_end..data_end + 2] != b"\r\n" {
            return Err(ChunkedError::MissingTerminator);
        }
        pos = data_end + 2;
    }
}

fn parse_size(line: &[u8]) -> Result<usize, ChunkedError> {
    let line = std::str::from_utf8(line).map_err(|_| ChunkedError::InvalidSize)?;
    let size = line.split(';').next().unwrap_or_default().trim();
    if size.is_empty() {
        return Err(ChunkedError::InvalidSize);
    }
    usize::from_str_radix(size, 16).map_err(|_| ChunkedError::InvalidSize)
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multiple_chunks() {
        let raw = b"5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\n\r\nNEXT";
        let (body, consumed) = decode(raw).unwrap().unwrap();

        assert_eq!(body, b"hello world");
        assert_eq!(&raw[consumed..], b"NEXT");
    }

    #[test]
    fn skips_trailers() {
        let raw = b"3\r\nabc\r\n0\r\nX-Checksum: 1\r\n\r\n";
        let (body, consumed) = decode(raw).unwrap().unwrap();

        assert_eq!(body, b"abc");
        assert_eq!(consumed, raw.len());
    }

    #[test]
    fn partial_input_needs_more() {
        assert_eq!(decode(b"5\r\nhel").unwrap(), None);
        assert_eq!(decode(b"0\r\n").unwrap(), None);
    }

    #[test]
    fn rejects_garbage_size() {
        assert_eq!(decode(b"zz\r\n"), Err(ChunkedError::InvalidSize));
        assert_eq!(decode(b"2\r\nabX\r\n"), Err(ChunkedError::MissingTerminator));
    }
}
