//! IMAP command builder.
//!
//! Commands are rendered as command text without the tag; the session
//! prepends the tag and appends CRLF when it writes the line.

mod serialize;
mod tag_generator;

use crate::Result;
use crate::types::{Flag, Mailbox};

pub use tag_generator::TagGenerator;

use serialize::{write_astring, write_flag_list, write_mailbox, write_raw};

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// CAPABILITY command.
    Capability,
    /// NOOP command.
    Noop,
    /// LOGOUT command.
    Logout,
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: Mailbox,
    },
    /// EXAMINE command (read-only SELECT).
    Examine {
        /// Mailbox to examine.
        mailbox: Mailbox,
    },
    /// CREATE command.
    Create {
        /// Mailbox to create.
        mailbox: Mailbox,
    },
    /// DELETE command.
    Delete {
        /// Mailbox to delete.
        mailbox: Mailbox,
    },
    /// RENAME command.
    Rename {
        /// Current mailbox name.
        from: Mailbox,
        /// New mailbox name.
        to: Mailbox,
    },
    /// SUBSCRIBE command.
    Subscribe {
        /// Mailbox to subscribe.
        mailbox: Mailbox,
    },
    /// UNSUBSCRIBE command.
    Unsubscribe {
        /// Mailbox to unsubscribe.
        mailbox: Mailbox,
    },
    /// LIST command.
    List {
        /// Reference name.
        reference: Mailbox,
        /// Mailbox pattern, may contain `*` and `%`.
        pattern: Mailbox,
    },
    /// LSUB command.
    Lsub {
        /// Reference name.
        reference: Mailbox,
        /// Mailbox pattern, may contain `*` and `%`.
        pattern: Mailbox,
    },
    /// STATUS command.
    Status {
        /// Mailbox name.
        mailbox: Mailbox,
        /// Status items to request, e.g. `MESSAGES`.
        items: Vec<String>,
    },
    /// APPEND command, announcing a synchronizing literal.
    Append {
        /// Target mailbox.
        mailbox: Mailbox,
        /// Flags to set on the appended message.
        flags: Vec<Flag>,
        /// Size of the message literal in bytes.
        size: usize,
    },
    /// SEARCH command.
    Search {
        /// Search criteria; empty means `ALL`.
        criteria: String,
    },
    /// SEARCH command whose last argument is a UTF-8 literal.
    SearchLiteral {
        /// Criteria preceding the literal, e.g. `SUBJECT`.
        criteria: String,
        /// Size of the literal in bytes.
        size: usize,
    },
    /// FETCH command.
    Fetch {
        /// Sequence set, e.g. `1:4,7`.
        set: String,
        /// Data items, e.g. `(BODY.PEEK[])`.
        items: String,
    },
    /// STORE command.
    Store {
        /// Sequence set.
        set: String,
        /// Data item, e.g. `+FLAGS.SILENT`.
        item: String,
        /// Flags to store.
        flags: Vec<Flag>,
    },
    /// EXPUNGE command.
    Expunge,
}

impl Command {
    /// Renders the command text, without tag and CRLF.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if an argument contains CR, LF or NUL.
    pub fn to_text(&self) -> Result<String> {
        let mut buf = String::new();

        match self {
            Self::Capability => buf.push_str("CAPABILITY"),
            Self::Noop => buf.push_str("NOOP"),
            Self::Logout => buf.push_str("LOGOUT"),
            Self::Expunge => buf.push_str("EXPUNGE"),

            Self::Login { username, password } => {
                buf.push_str("LOGIN ");
                write_astring(&mut buf, username)?;
                buf.push(' ');
                write_astring(&mut buf, password)?;
            }

            Self::Select { mailbox } => write_verb_mailbox(&mut buf, "SELECT", mailbox)?,
            Self::Examine { mailbox } => write_verb_mailbox(&mut buf, "EXAMINE", mailbox)?,
            Self::Create { mailbox } => write_verb_mailbox(&mut buf, "CREATE", mailbox)?,
            Self::Delete { mailbox } => write_verb_mailbox(&mut buf, "DELETE", mailbox)?,
            Self::Subscribe { mailbox } => write_verb_mailbox(&mut buf, "SUBSCRIBE", mailbox)?,
            Self::Unsubscribe { mailbox } => {
                write_verb_mailbox(&mut buf, "UNSUBSCRIBE", mailbox)?;
            }

            Self::Rename { from, to } => {
                write_verb_mailbox(&mut buf, "RENAME", from)?;
                buf.push(' ');
                write_mailbox(&mut buf, to)?;
            }

            Self::List { reference, pattern } => {
                write_verb_mailbox(&mut buf, "LIST", reference)?;
                buf.push(' ');
                write_mailbox(&mut buf, pattern)?;
            }

            Self::Lsub { reference, pattern } => {
                write_verb_mailbox(&mut buf, "LSUB", reference)?;
                buf.push(' ');
                write_mailbox(&mut buf, pattern)?;
            }

            Self::Status { mailbox, items } => {
                write_verb_mailbox(&mut buf, "STATUS", mailbox)?;
                buf.push_str(" (");
                write_raw(&mut buf, &items.join(" "))?;
                buf.push(')');
            }

            Self::Append {
                mailbox,
                flags,
                size,
            } => {
                write_verb_mailbox(&mut buf, "APPEND", mailbox)?;
                buf.push(' ');
                if !flags.is_empty() {
                    write_flag_list(&mut buf, flags);
                    buf.push(' ');
                }
                buf.push_str(&format!("{{{size}}}"));
            }

            Self::Search { criteria } => {
                buf.push_str("SEARCH ");
                if criteria.trim().is_empty() {
                    buf.push_str("ALL");
                } else {
                    write_raw(&mut buf, criteria)?;
                }
            }

            Self::SearchLiteral { criteria, size } => {
                buf.push_str("SEARCH CHARSET UTF-8 ");
                write_raw(&mut buf, criteria)?;
                buf.push_str(&format!(" {{{size}}}"));
            }

            Self::Fetch { set, items } => {
                buf.push_str("FETCH ");
                write_raw(&mut buf, set)?;
                buf.push(' ');
                write_raw(&mut buf, items)?;
            }

            Self::Store { set, item, flags } => {
                buf.push_str("STORE ");
                write_raw(&mut buf, set)?;
                buf.push(' ');
                write_raw(&mut buf, item)?;
                buf.push(' ');
                write_flag_list(&mut buf, flags);
            }
        }

        Ok(buf)
    }

    /// Returns the command verb, used for logging without arguments.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::Create { .. } => "CREATE",
            Self::Delete { .. } => "DELETE",
            Self::Rename { .. } => "RENAME",
            Self::Subscribe { .. } => "SUBSCRIBE",
            Self::Unsubscribe { .. } => "UNSUBSCRIBE",
            Self::List { .. } => "LIST",
            Self::Lsub { .. } => "LSUB",
            Self::Status { .. } => "STATUS",
            Self::Append { .. } => "APPEND",
            Self::Search { .. } | Self::SearchLiteral { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
            Self::Expunge => "EXPUNGE",
        }
    }
}

fn write_verb_mailbox(buf: &mut String, verb: &str, mailbox: &Mailbox) -> Result<()> {
    buf.push_str(verb);
    buf.push(' ');
    write_mailbox(buf, mailbox)
}
