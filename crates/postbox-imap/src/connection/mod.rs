//! IMAP connection management.
//!
//! This module provides:
//! - Configuration (host, port, security mode, tag prefix)
//! - TLS/plaintext stream abstraction
//! - Line and literal framing
//! - The command engine ([`Session`]) and the verb client ([`Client`])

mod client;
mod config;
mod session;
mod stream;
mod transport;

use std::borrow::Cow;

pub use client::{Client, connect};
pub use config::{Config, ConfigBuilder, Security};
pub use session::{Greeting, Outcome, Reply, Session};
pub use stream::{ImapStream, connect_plain, connect_tls, create_tls_connector};
pub use transport::Transport;

/// Concatenates collected responses into one string, replacing invalid
/// UTF-8.
pub(crate) fn join_responses(responses: &[Vec<u8>]) -> Cow<'_, str> {
    match responses {
        [] => Cow::Borrowed(""),
        [single] => String::from_utf8_lossy(single),
        many => Cow::Owned(String::from_utf8_lossy(&many.concat()).into_owned()),
    }
}
