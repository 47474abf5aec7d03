//! Error types for the IMAP library.

use std::borrow::Cow;
use std::time::Duration;

use thiserror::Error;

use crate::types::Status;
use crate::utf7::Utf7Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations, including the peer closing the
    /// stream before a command completed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Opening the connection took longer than the configured timeout.
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Response data could not be tokenized.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// Malformed line shape or unexpected server behavior.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The server completed the command with NO, BAD or BYE.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Malformed Modified UTF-7 mailbox name.
    #[error("Mailbox name error: {0}")]
    Codec(#[from] Utf7Error),
}

impl Error {
    /// Returns true if the error means the connection can no longer be used.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Timeout(_)
        )
    }

    /// Returns the status error, if the server rejected the command.
    #[must_use]
    pub const fn as_status(&self) -> Option<&StatusError> {
        match self {
            Self::Status(err) => Some(err),
            _ => None,
        }
    }
}

/// A well-formed tagged completion reporting NO, BAD or BYE.
///
/// Displays as the raw completion line. The untagged responses received
/// before the completion are kept for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("{line}")]
pub struct StatusError {
    /// The completion status.
    pub status: Status,
    /// The raw completion line, without its CRLF.
    pub line: String,
    /// Responses received before the completion.
    pub responses: Vec<Vec<u8>>,
}

impl StatusError {
    /// Returns the responses received before the completion as text.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        crate::connection::join_responses(&self.responses)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_raw_line() {
        let err = Error::from(StatusError {
            status: Status::No,
            line: "A3 NO auth failed".to_string(),
            responses: vec![b"* OK [ALERT] try later\r\n".to_vec()],
        });

        assert_eq!(err.to_string(), "A3 NO auth failed");
        assert!(!err.is_transport());
        assert_eq!(
            err.as_status().map(|s| s.text().into_owned()),
            Some("* OK [ALERT] try later\r\n".to_string())
        );
    }

    #[test]
    fn test_transport_errors() {
        let eof = Error::from(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(eof.is_transport());
        assert!(eof.as_status().is_none());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!Error::Protocol("bad line".to_string()).is_transport());
    }

    #[test]
    fn test_codec_error_converts() {
        let err: Error = crate::utf7::decode("&AOk").unwrap_err().into();
        assert!(matches!(err, Error::Codec(Utf7Error::Unterminated(0))));
        assert!(err.to_string().starts_with("Mailbox name error"));
    }
}
