//! # postbox-imap
//!
//! A small client-side IMAP4 engine: tagged command execution, response
//! collection, literal continuations and Modified UTF-7 mailbox names.
//!
//! ## Layers
//!
//! - [`utf7`]: Modified UTF-7 mailbox name codec
//! - [`command`]: command rendering and the tag generator
//! - [`parser`]: line classification and response tokenizers
//! - [`connection`]: streams, framing, the command engine ([`Session`]) and
//!   the verb client ([`Client`])
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_imap::{Config, connect};
//!
//! #[tokio::main]
//! async fn main() -> postbox_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let mut client = connect(&config).await?;
//!
//!     client.login("user@example.com", "password").await?;
//!     for entry in client.list("", "*").await? {
//!         println!("{}", entry.mailbox);
//!     }
//!
//!     let info = client.select("Entwürfe").await?;
//!     println!("{} messages", info.exists);
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! A NO, BAD or BYE completion is an [`Error::Status`] that displays as the
//! raw completion line. A closed or failing stream is an [`Error::Io`]; see
//! [`Error::is_transport`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;
pub mod utf7;

pub use command::{Command, TagGenerator};
pub use connection::{
    Client, Config, ConfigBuilder, Greeting, ImapStream, Outcome, Reply, Security, Session,
    connect,
};
pub use error::{Error, Result, StatusError};
pub use parser::{Completion, Line, ResponseParser, UnknownStatus};
pub use types::{Flag, ListResponse, Mailbox, MailboxAttribute, SelectInfo, Status};
pub use utf7::Utf7Error;
