//! Verb-level IMAP client.
//!
//! [`Client`] renders [`Command`]s, runs them through a [`Session`] and
//! extracts the data each verb returns from the collected responses.
//! Mailbox arguments are Unicode; they travel in Modified UTF-7.

#![allow(clippy::missing_errors_doc)]

use std::collections::BTreeMap;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::config::{Config, Security};
use super::session::{Greeting, Reply, Session};
use super::stream::{ImapStream, connect_plain, connect_tls};
use crate::command::Command;
use crate::parser::{
    parse_capability, parse_fetch, parse_list, parse_search, parse_select, parse_status,
};
use crate::types::{Flag, ListResponse, Mailbox, SelectInfo};
use crate::{Error, Result};

/// IMAP client over a [`Session`].
pub struct Client<S> {
    session: Session<S>,
}

impl<S> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session", &self.session)
            .finish()
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an existing session.
    pub const fn new(session: Session<S>) -> Self {
        Self { session }
    }

    /// Creates a client and reads the server greeting.
    pub async fn from_stream(stream: S) -> Result<(Self, Greeting)> {
        let (session, greeting) = Session::from_stream(stream).await?;
        Ok((Self::new(session), greeting))
    }

    /// Returns the underlying session for raw commands.
    pub const fn session_mut(&mut self) -> &mut Session<S> {
        &mut self.session
    }

    /// Consumes the client and returns its session.
    pub fn into_session(self) -> Session<S> {
        self.session
    }

    /// Sends NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&Command::Noop).await.map(drop)
    }

    /// Requests the server capabilities.
    pub async fn capability(&mut self) -> Result<Vec<String>> {
        let reply = self.run(&Command::Capability).await?;
        Ok(reply
            .responses
            .iter()
            .find_map(|response| parse_capability(response))
            .unwrap_or_default())
    }

    /// Authenticates with LOGIN.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        self.run(&Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;
        info!(username, "logged in");
        Ok(())
    }

    /// Selects a mailbox for read-write access.
    pub async fn select(&mut self, mailbox: &str) -> Result<SelectInfo> {
        let reply = self
            .run(&Command::Select {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        Ok(select_info(&reply))
    }

    /// Opens a mailbox read-only.
    pub async fn examine(&mut self, mailbox: &str) -> Result<SelectInfo> {
        let reply = self
            .run(&Command::Examine {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;
        Ok(select_info(&reply))
    }

    /// Creates a mailbox.
    pub async fn create(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Create {
            mailbox: Mailbox::new(mailbox),
        })
        .await
        .map(drop)
    }

    /// Deletes a mailbox.
    pub async fn delete(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Delete {
            mailbox: Mailbox::new(mailbox),
        })
        .await
        .map(drop)
    }

    /// Renames a mailbox.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.run(&Command::Rename {
            from: Mailbox::new(from),
            to: Mailbox::new(to),
        })
        .await
        .map(drop)
    }

    /// Subscribes to a mailbox.
    pub async fn subscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Subscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await
        .map(drop)
    }

    /// Unsubscribes from a mailbox.
    pub async fn unsubscribe(&mut self, mailbox: &str) -> Result<()> {
        self.run(&Command::Unsubscribe {
            mailbox: Mailbox::new(mailbox),
        })
        .await
        .map(drop)
    }

    /// Lists mailboxes matching `pattern` under `reference`.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let reply = self
            .run(&Command::List {
                reference: Mailbox::new(reference),
                pattern: Mailbox::new(pattern),
            })
            .await?;
        collect_list(&reply)
    }

    /// Lists subscribed mailboxes matching `pattern` under `reference`.
    pub async fn lsub(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let reply = self
            .run(&Command::Lsub {
                reference: Mailbox::new(reference),
                pattern: Mailbox::new(pattern),
            })
            .await?;
        collect_list(&reply)
    }

    /// Requests status items, e.g. `MESSAGES` or `UNSEEN`, for a mailbox.
    ///
    /// Item names in the result are upper-cased.
    pub async fn status(&mut self, mailbox: &str, items: &[&str]) -> Result<BTreeMap<String, u64>> {
        let reply = self
            .run(&Command::Status {
                mailbox: Mailbox::new(mailbox),
                items: items.iter().map(ToString::to_string).collect(),
            })
            .await?;

        for response in &reply.responses {
            if let Some((_, values)) = parse_status(response)? {
                return Ok(values);
            }
        }
        Err(Error::Protocol("STATUS returned no data".to_string()))
    }

    /// Appends a raw RFC 5322 message to a mailbox.
    pub async fn append(&mut self, mailbox: &str, flags: &[Flag], message: &[u8]) -> Result<()> {
        let command = Command::Append {
            mailbox: Mailbox::new(mailbox),
            flags: flags.to_vec(),
            size: message.len(),
        };
        self.run_literal(&command, message).await.map(drop)
    }

    /// Searches the selected mailbox; empty criteria match all messages.
    pub async fn search(&mut self, criteria: &str) -> Result<Vec<u32>> {
        let reply = self
            .run(&Command::Search {
                criteria: criteria.to_string(),
            })
            .await?;
        collect_search(&reply)
    }

    /// Searches with a UTF-8 literal as the last argument, e.g.
    /// `search_literal("SUBJECT", "Grüße")`.
    pub async fn search_literal(&mut self, criteria: &str, literal: &str) -> Result<Vec<u32>> {
        let command = Command::SearchLiteral {
            criteria: criteria.to_string(),
            size: literal.len(),
        };
        let reply = self.run_literal(&command, literal.as_bytes()).await?;
        collect_search(&reply)
    }

    /// Fetches full messages, keyed by sequence number.
    pub async fn fetch(&mut self, set: &str) -> Result<BTreeMap<u32, Vec<u8>>> {
        let reply = self
            .run(&Command::Fetch {
                set: set.to_string(),
                items: "(BODY.PEEK[])".to_string(),
            })
            .await?;

        let mut messages = BTreeMap::new();
        for response in &reply.responses {
            if let Some(fetched) = parse_fetch(response)?
                && let Some(body) = fetched.body
            {
                messages.insert(fetched.seq, body);
            }
        }
        Ok(messages)
    }

    /// Alters message flags, e.g. `store("1:3", "+FLAGS", &[Flag::Seen])`.
    pub async fn store(&mut self, set: &str, item: &str, flags: &[Flag]) -> Result<()> {
        self.run(&Command::Store {
            set: set.to_string(),
            item: item.to_string(),
            flags: flags.to_vec(),
        })
        .await
        .map(drop)
    }

    /// Permanently removes messages flagged `\Deleted`.
    pub async fn expunge(&mut self) -> Result<()> {
        self.run(&Command::Expunge).await.map(drop)
    }

    /// Logs out. The server closes the connection afterwards.
    pub async fn logout(&mut self) -> Result<()> {
        self.run(&Command::Logout).await.map(drop)
    }

    async fn run(&mut self, command: &Command) -> Result<Reply> {
        let reply = self.session.command(&command.to_text()?).await?;
        if reply.is_continuation() {
            return Err(Error::Protocol(format!(
                "unexpected continuation request for {}",
                command.verb()
            )));
        }
        Ok(reply)
    }

    async fn run_literal(&mut self, command: &Command, literal: &[u8]) -> Result<Reply> {
        let reply = self.session.command(&command.to_text()?).await?;
        if !reply.is_continuation() {
            return Err(Error::Protocol(format!(
                "server did not request the {} literal",
                command.verb()
            )));
        }

        let reply = self.session.continue_literal(&reply, literal).await?;
        if reply.is_continuation() {
            return Err(Error::Protocol(format!(
                "unexpected continuation request for {}",
                command.verb()
            )));
        }
        Ok(reply)
    }
}

/// Opens a connection as configured and reads the greeting.
///
/// The connect timeout covers the TCP connect, the TLS handshake and the
/// greeting.
pub async fn connect(config: &Config) -> Result<Client<ImapStream>> {
    let open = async {
        let stream = match config.security {
            Security::Implicit => connect_tls(&config.host, config.port).await?,
            Security::None => connect_plain(&config.host, config.port).await?,
        };

        let mut session = Session::new(stream)
            .with_tag_prefix(config.tag_prefix)
            .with_unknown_status(config.unknown_status);
        let greeting = session.read_greeting().await?;
        debug!(status = %greeting.status, "greeting accepted");

        Ok::<_, Error>(Client::new(session))
    };

    let client = tokio::time::timeout(config.connect_timeout, open)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))??;
    info!(host = %config.host, port = config.port, "connected");
    Ok(client)
}

fn select_info(reply: &Reply) -> SelectInfo {
    let text = reply.completion().map_or("", |c| c.text.as_str());
    parse_select(&reply.responses, text)
}

fn collect_list(reply: &Reply) -> Result<Vec<ListResponse>> {
    let mut mailboxes = Vec::new();
    for response in &reply.responses {
        if let Some(list) = parse_list(response)? {
            mailboxes.push(list);
        }
    }
    Ok(mailboxes)
}

fn collect_search(reply: &Reply) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for response in &reply.responses {
        if let Some(found) = parse_search(response)? {
            ids.extend(found);
        }
    }
    Ok(ids)
}
