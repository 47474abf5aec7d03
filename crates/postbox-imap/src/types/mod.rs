//! Core IMAP types.

mod flag;
mod mailbox;
mod status;

pub use flag::Flag;
pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, SelectInfo};
pub use status::Status;
