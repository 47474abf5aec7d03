//! Line and literal framing over a byte stream.
//!
//! Server output is read one logical response at a time: a line ending in
//! LF (normally CRLF) plus, when the line ends with `{n}`, the n literal
//! bytes and the rest of the response after them.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Maximum line length.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Maximum literal size.
const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered IMAP transport.
pub struct Transport<S> {
    reader: BufReader<S>,
    write_buffer: BytesMut,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, stream),
            write_buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Reads one response, including any literals it announces.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = Vec::new();

        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(literal_len) = parse_literal_length(&line) else {
                break;
            };
            if literal_len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {literal_len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let mut literal = vec![0u8; literal_len];
            self.reader.read_exact(&mut literal).await?;
            response.extend_from_slice(&literal);
        }

        Ok(response)
    }

    /// Reads a single line up to and including its LF.
    ///
    /// The CR before the LF is kept when the server sends one.
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }

            if let Some(end) = find_lf(buf) {
                line.extend_from_slice(&buf[..=end]);
                self.reader.consume(end + 1);
                break;
            }

            let len = buf.len();
            line.extend_from_slice(buf);
            self.reader.consume(len);

            if line.len() > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }

        Ok(line)
    }

    /// Writes `<tag> SP <text> CRLF` and flushes.
    pub async fn write_command(&mut self, tag: &str, text: &str) -> Result<()> {
        self.write_buffer.clear();
        self.write_buffer.put_slice(tag.as_bytes());
        self.write_buffer.put_u8(b' ');
        self.write_buffer.put_slice(text.as_bytes());
        self.write_buffer.put_slice(b"\r\n");

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buffer).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Writes raw bytes and flushes.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;

        Ok(())
    }

    /// Gets a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Consumes the transport and returns the inner stream.
    ///
    /// Buffered input is lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

fn find_lf(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Parses `{123}` or `{123+}` at the end of a line, before CRLF or LF.
fn parse_literal_length(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\n")?;
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(digits).ok()?.parse().ok()
}
