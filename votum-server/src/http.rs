//! Minimal HTTP/1.1 request/response codec for the submission endpoint
//!
//! The endpoint speaks one request-response exchange per connection,
//! so only the subset needed for that exchange is implemented: request
//! line, headers, content-length bodies, `Connection: close` replies.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_HEADERS: usize = 64;
const MAX_LINE_LEN: usize = 8 * 1024;
const MAX_BODY_LEN: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed request line")]
    BadRequestLine,

    #[error("malformed header")]
    BadHeader,

    #[error("too many headers")]
    TooManyHeaders,

    #[error("header line too long")]
    LineTooLong,

    #[error("invalid content-length")]
    BadContentLength,

    #[error("request body too large")]
    BodyTooLarge,

    #[error("connection error")]
    Io(#[from] tokio::io::Error),
}

#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// Reads one CRLF-terminated line, refusing lines past `MAX_LINE_LEN`
/// without buffering the remainder
async fn read_bounded_line<S>(stream: &mut S) -> Result<String, HttpError>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut bounded = stream.take((MAX_LINE_LEN + 1) as u64);
    bounded.read_line(&mut line).await?;

    if line.len() > MAX_LINE_LEN {
        return Err(HttpError::LineTooLong);
    }

    Ok(line)
}

pub async fn read_request<S>(stream: &mut S) -> Result<Request, HttpError>
where
    S: AsyncBufRead + Unpin,
{
    let line = read_bounded_line(stream).await?;

    let mut parts = line.split_whitespace();
    let method = parts.next().ok_or(HttpError::BadRequestLine)?.to_owned();
    let path = parts.next().ok_or(HttpError::BadRequestLine)?.to_owned();
    let version = parts.next().ok_or(HttpError::BadRequestLine)?;

    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::BadRequestLine);
    }

    let mut content_length = 0usize;

    for _ in 0..MAX_HEADERS {
        let header = read_bounded_line(stream).await?;
        let header = header.trim_end();

        if header.is_empty() {
            let mut body = vec![0u8; content_length];
            stream.read_exact(&mut body).await?;

            return Ok(Request { method, path, body });
        }

        let (name, value) = header.split_once(':').ok_or(HttpError::BadHeader)?;

        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| HttpError::BadContentLength)?;

            if content_length > MAX_BODY_LEN {
                return Err(HttpError::BodyTooLarge);
            }
        }
    }

    Err(HttpError::TooManyHeaders)
}

/// Writes a response carrying the permissive CORS headers every reply
/// includes, then flushes. `None` sends an empty body.
pub async fn write_response<S>(
    stream: &mut S,
    status: u16,
    body: Option<&str>,
) -> Result<(), HttpError>
where
    S: AsyncWrite + Unpin,
{
    let body = body.unwrap_or("");

    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: POST\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        status,
        reason(status),
        body.len(),
    );

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body.as_bytes()).await?;
    stream.flush().await?;

    Ok(())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn parses_a_post_with_body() {
        let raw = b"POST /vote HTTP/1.1\r\nHost: x\r\nContent-Length: 4\r\n\r\nabcd";
        let mut reader = BufReader::new(&raw[..]);

        let request = read_request(&mut reader).await.unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/vote");
        assert_eq!(request.body, b"abcd");
    }

    #[tokio::test]
    async fn parses_an_options_preflight_without_body() {
        let raw = b"OPTIONS / HTTP/1.1\r\nHost: x\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let request = read_request(&mut reader).await.unwrap();

        assert_eq!(request.method, "OPTIONS");
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn rejects_a_garbage_request_line() {
        let raw = b"nonsense\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let result = read_request(&mut reader).await;
        assert!(matches!(result, Err(HttpError::BadRequestLine)));
    }

    #[tokio::test]
    async fn rejects_oversized_bodies_before_reading_them() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 1048576\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let result = read_request(&mut reader).await;
        assert!(matches!(result, Err(HttpError::BodyTooLarge)));
    }

    #[tokio::test]
    async fn rejects_an_oversized_request_line() {
        let raw = format!("POST /{} HTTP/1.1\r\n\r\n", "a".repeat(9 * 1024));
        let mut reader = BufReader::new(raw.as_bytes());

        let result = read_request(&mut reader).await;
        assert!(matches!(result, Err(HttpError::LineTooLong)));
    }

    #[tokio::test]
    async fn rejects_an_oversized_header_line() {
        let raw = format!(
            "POST / HTTP/1.1\r\nX-Filler: {}\r\n\r\n",
            "b".repeat(9 * 1024)
        );
        let mut reader = BufReader::new(raw.as_bytes());

        let result = read_request(&mut reader).await;
        assert!(matches!(result, Err(HttpError::LineTooLong)));
    }

    #[tokio::test]
    async fn responses_carry_cors_headers_and_content_length() {
        let mut out: Vec<u8> = Vec::new();

        write_response(&mut out, 200, Some(r#"{"status":"success"}"#))
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(text.contains("Access-Control-Allow-Methods: POST\r\n"));
        assert!(text.contains("Access-Control-Allow-Headers: Content-Type\r\n"));
        assert!(text.contains("Content-Length: 20\r\n"));
        assert!(text.ends_with(r#"{"status":"success"}"#));
    }
}
