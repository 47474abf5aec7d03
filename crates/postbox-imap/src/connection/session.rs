//! Command engine.
//!
//! A [`Session`] writes one tagged command at a time and collects the
//! server's responses until the command completes or the server asks for
//! literal data. Every command method takes `&mut self`, so a session never
//! has two commands in flight.

#![allow(clippy::missing_errors_doc)]

use std::borrow::Cow;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

use super::join_responses;
use super::transport::Transport;
use crate::command::TagGenerator;
use crate::error::StatusError;
use crate::parser::{Completion, Line, ResponseParser, UnknownStatus};
use crate::types::Status;
use crate::{Error, Result};

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server completed the command with OK or PREAUTH.
    Completed(Completion),
    /// The server is waiting for literal data; carries the prompt text.
    Continuation(String),
}

/// Responses collected for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Tag the reply was collected under.
    pub tag: String,
    /// Informational responses, each with its line ending and any literal bytes.
    ///
    /// The completion line is not included.
    pub responses: Vec<Vec<u8>>,
    /// How the command ended.
    pub outcome: Outcome,
}

impl Reply {
    /// Returns the informational responses as one string.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        join_responses(&self.responses)
    }

    /// Iterates over the informational lines, without CRLF.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.responses
            .iter()
            .flat_map(|response| response.split_inclusive(|&b| b == b'\n'))
            .map(|line| {
                let line = line.strip_suffix(b"\n").unwrap_or(line);
                String::from_utf8_lossy(line.strip_suffix(b"\r").unwrap_or(line))
            })
    }

    /// Returns the completion, if the command completed.
    #[must_use]
    pub const fn completion(&self) -> Option<&Completion> {
        match &self.outcome {
            Outcome::Completed(completion) => Some(completion),
            Outcome::Continuation(_) => None,
        }
    }

    /// Returns true if the server is waiting for literal data.
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        matches!(self.outcome, Outcome::Continuation(_))
    }
}

/// The server greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// `OK` or `PREAUTH`.
    pub status: Status,
    /// Text after the status word.
    pub text: String,
}

/// Command engine over a byte stream.
pub struct Session<S> {
    transport: Transport<S>,
    tags: TagGenerator,
    unknown_status: UnknownStatus,
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tags", &self.tags)
            .field("unknown_status", &self.unknown_status)
            .finish_non_exhaustive()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session over a stream whose greeting was already consumed
    /// (or is not expected).
    pub fn new(stream: S) -> Self {
        Self {
            transport: Transport::new(stream),
            tags: TagGenerator::default(),
            unknown_status: UnknownStatus::default(),
        }
    }

    /// Creates a session and reads the server greeting.
    pub async fn from_stream(stream: S) -> Result<(Self, Greeting)> {
        let mut session = Self::new(stream);
        let greeting = session.read_greeting().await?;
        Ok((session, greeting))
    }

    /// Uses `prefix` for generated tags.
    #[must_use]
    pub fn with_tag_prefix(mut self, prefix: char) -> Self {
        self.tags = TagGenerator::new(prefix);
        self
    }

    /// Sets the policy for tagged lines with an unknown status word.
    #[must_use]
    pub fn with_unknown_status(mut self, policy: UnknownStatus) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Returns the tag generator.
    #[must_use]
    pub const fn tags(&self) -> &TagGenerator {
        &self.tags
    }

    /// Reads the untagged greeting line.
    ///
    /// `* OK` and `* PREAUTH` are accepted; `* BYE` fails with
    /// [`Error::Status`].
    pub async fn read_greeting(&mut self) -> Result<Greeting> {
        let response = self.transport.read_response().await?;
        let line = String::from_utf8_lossy(&response);
        let line = line.trim_end_matches(['\r', '\n']);
        debug!(greeting = %line, "server greeting");

        let Some(rest) = line.strip_prefix("* ") else {
            return Err(Error::Protocol(format!("unexpected greeting: {line}")));
        };
        let (word, text) = rest.split_once(' ').unwrap_or((rest, ""));

        match Status::parse(word) {
            Some(status @ (Status::Ok | Status::PreAuth)) => Ok(Greeting {
                status,
                text: text.to_string(),
            }),
            Some(Status::Bye) => Err(StatusError {
                status: Status::Bye,
                line: line.to_string(),
                responses: Vec::new(),
            }
            .into()),
            _ => Err(Error::Protocol(format!("unexpected greeting: {line}"))),
        }
    }

    /// Sends `command` under the next generated tag.
    pub async fn command(&mut self, command: &str) -> Result<Reply> {
        let tag = self.tags.next_tag();
        self.execute(&tag, command).await
    }

    /// Sends `<tag> SP <command> CRLF` and collects the reply.
    ///
    /// Returns once the server completes the command or asks for a literal.
    /// A NO, BAD or BYE completion is returned as [`Error::Status`].
    pub async fn execute(&mut self, tag: &str, command: &str) -> Result<Reply> {
        let verb = command.split(' ').next().unwrap_or_default();
        debug!(tag, verb, "sending command");

        self.transport.write_command(tag, command).await?;
        self.collect(tag).await
    }

    /// Writes `bytes` unchanged and collects the reply under `tag`.
    pub async fn raw(&mut self, tag: &str, bytes: &[u8]) -> Result<Reply> {
        debug!(tag, len = bytes.len(), "sending raw data");

        self.transport.write_all(bytes).await?;
        self.collect(tag).await
    }

    /// Answers a continuation request with `payload` followed by CRLF.
    ///
    /// Returns [`Error::InvalidState`] if `reply` is not a continuation.
    pub async fn continue_literal(&mut self, reply: &Reply, payload: &[u8]) -> Result<Reply> {
        if !reply.is_continuation() {
            return Err(Error::InvalidState(format!(
                "no continuation pending for {}",
                reply.tag
            )));
        }

        let mut data = Vec::with_capacity(payload.len() + 2);
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\r\n");
        self.raw(&reply.tag, &data).await
    }

    /// Consumes the session and returns the inner stream.
    pub fn into_inner(self) -> S {
        self.transport.into_inner()
    }

    async fn collect(&mut self, tag: &str) -> Result<Reply> {
        let parser = ResponseParser::new(tag).with_unknown_status(self.unknown_status);
        let mut responses = Vec::new();

        loop {
            let response = self.transport.read_response().await?;
            let classified = {
                let first_line = response
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(&response[..], |end| &response[..=end]);
                let line = String::from_utf8_lossy(first_line);
                trace!(line = %line.trim_end(), "received");
                parser.classify(&line)?
            };

            match classified {
                Line::Informational => responses.push(response),
                Line::Continuation(prompt) => {
                    return Ok(Reply {
                        tag: tag.to_string(),
                        responses,
                        outcome: Outcome::Continuation(prompt),
                    });
                }
                Line::Completion(completion) if completion.status.is_ok() => {
                    return Ok(Reply {
                        tag: tag.to_string(),
                        responses,
                        outcome: Outcome::Completed(completion),
                    });
                }
                Line::Completion(completion) => {
                    debug!(tag, status = %completion.status, "command failed");
                    return Err(StatusError {
                        status: completion.status,
                        line: completion.line,
                        responses,
                    }
                    .into());
                }
            }
        }
    }
}
