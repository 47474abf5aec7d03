//! Response classification and tokenizing.
//!
//! [`ResponseParser`] decides, line by line, whether the server is still
//! sending data for the current command, asking for a literal, or done.
//! The [`response`] module extracts structured data from the informational
//! lines a command collected.

pub mod lexer;
pub mod response;

use tracing::warn;

use crate::types::Status;
use crate::{Error, Result};

pub use lexer::{Lexer, Token};
pub use response::{
    FetchedBody, parse_capability, parse_fetch, parse_list, parse_search, parse_select,
    parse_status,
};

/// What to do with a line carrying the current tag but no known status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatus {
    /// Fail the command with [`Error::Protocol`].
    #[default]
    Reject,
    /// Treat the line as informational and keep reading.
    Ignore,
}

/// Terminal outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Tag the completion was matched against.
    pub tag: String,
    /// Status word.
    pub status: Status,
    /// Text following the status word.
    pub text: String,
    /// The raw line, without CRLF.
    pub line: String,
}

/// Classification of one server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Data to accumulate for the caller.
    Informational,
    /// The server is waiting for literal data; carries the prompt text.
    Continuation(String),
    /// The command finished.
    Completion(Completion),
}

/// Line classifier bound to the tag of the command in flight.
#[derive(Debug, Clone)]
pub struct ResponseParser {
    tag: String,
    unknown_status: UnknownStatus,
}

impl ResponseParser {
    /// Creates a parser for the given tag.
    ///
    /// An empty tag matches the completion of whichever command is in
    /// flight.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            unknown_status: UnknownStatus::default(),
        }
    }

    /// Sets the policy for tagged lines with an unknown status word.
    #[must_use]
    pub const fn with_unknown_status(mut self, policy: UnknownStatus) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Returns the tag this parser matches.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Classifies one line. A trailing CRLF or LF is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the line carries the current tag, the
    /// word after it is not a status word, and the policy is
    /// [`UnknownStatus::Reject`].
    pub fn classify(&self, line: &str) -> Result<Line> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(prompt) = line.strip_prefix('+') {
            return Ok(Line::Continuation(prompt.trim_start().to_string()));
        }

        if self.tag.is_empty() {
            return Ok(Self::classify_any_tag(line));
        }

        let Some(rest) = line
            .strip_prefix(self.tag.as_str())
            .and_then(|rest| rest.strip_prefix(' '))
        else {
            return Ok(Line::Informational);
        };

        let (word, text) = split_word(rest);
        if let Some(status) = Status::parse(word) {
            return Ok(Line::Completion(Completion {
                tag: self.tag.clone(),
                status,
                text: text.to_string(),
                line: line.to_string(),
            }));
        }

        match self.unknown_status {
            UnknownStatus::Reject => Err(Error::Protocol(format!(
                "unrecognized status in tagged response: {line}"
            ))),
            UnknownStatus::Ignore => {
                warn!(tag = %self.tag, "ignoring tagged line without status word");
                Ok(Line::Informational)
            }
        }
    }

    fn classify_any_tag(line: &str) -> Line {
        let (tag, rest) = split_word(line);
        if tag.is_empty() || tag == "*" {
            return Line::Informational;
        }

        let (word, text) = split_word(rest);
        Status::parse(word).map_or(Line::Informational, |status| {
            Line::Completion(Completion {
                tag: tag.to_string(),
                status,
                text: text.to_string(),
                line: line.to_string(),
            })
        })
    }
}

/// Splits off the first space-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    s.split_once(' ').unwrap_or((s, ""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn completion(line: Line) -> Completion {
        match line {
            Line::Completion(c) => c,
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_continuation() {
        let parser = ResponseParser::new("A1");
        assert_eq!(
            parser.classify("+ go ahead\r\n").unwrap(),
            Line::Continuation("go ahead".to_string())
        );
        assert_eq!(
            parser.classify("+\r\n").unwrap(),
            Line::Continuation(String::new())
        );
    }

    #[test]
    fn test_completion_ok() {
        let parser = ResponseParser::new("A1");
        let c = completion(parser.classify("A1 OK done\r\n").unwrap());
        assert_eq!(c.status, Status::Ok);
        assert_eq!(c.text, "done");
        assert_eq!(c.line, "A1 OK done");
        assert_eq!(c.tag, "A1");
    }

    #[test]
    fn test_completion_without_text() {
        let parser = ResponseParser::new("A2");
        let c = completion(parser.classify("A2 OK\r\n").unwrap());
        assert_eq!(c.status, Status::Ok);
        assert_eq!(c.text, "");
    }

    #[test]
    fn test_completion_failure_statuses() {
        let parser = ResponseParser::new("A3");
        let c = completion(parser.classify("A3 NO auth failed").unwrap());
        assert_eq!(c.status, Status::No);
        assert_eq!(c.line, "A3 NO auth failed");

        let c = completion(parser.classify("A3 BAD parse error").unwrap());
        assert_eq!(c.status, Status::Bad);

        let c = completion(parser.classify("A3 BYE shutting down").unwrap());
        assert_eq!(c.status, Status::Bye);
    }

    #[test]
    fn test_untagged_is_informational() {
        let parser = ResponseParser::new("A1");
        assert_eq!(
            parser.classify("* 1 EXISTS\r\n").unwrap(),
            Line::Informational
        );
        assert_eq!(
            parser.classify("* OK [UIDNEXT 4] ready").unwrap(),
            Line::Informational
        );
        assert_eq!(parser.classify("").unwrap(), Line::Informational);
    }

    #[test]
    fn test_longer_tag_with_same_prefix_is_not_ours() {
        let parser = ResponseParser::new("A1");
        assert_eq!(parser.classify("A10 OK done").unwrap(), Line::Informational);
    }

    #[test]
    fn test_other_tag_is_informational() {
        let parser = ResponseParser::new("A1");
        assert_eq!(parser.classify("A2 OK done").unwrap(), Line::Informational);
    }

    #[test]
    fn test_unknown_status_rejected_by_default() {
        let parser = ResponseParser::new("A1");
        let err = parser.classify("A1 DONE whatever").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_unknown_status_ignored_by_policy() {
        let parser = ResponseParser::new("A1").with_unknown_status(UnknownStatus::Ignore);
        assert_eq!(
            parser.classify("A1 DONE whatever").unwrap(),
            Line::Informational
        );
    }

    #[test]
    fn test_empty_tag_matches_any_completion() {
        let parser = ResponseParser::new("");
        let c = completion(parser.classify("A7 OK APPEND completed").unwrap());
        assert_eq!(c.tag, "A7");
        assert_eq!(c.status, Status::Ok);

        assert_eq!(parser.classify("* OK still here").unwrap(), Line::Informational);
        assert_eq!(parser.classify("A7 FETCH").unwrap(), Line::Informational);
    }
}
