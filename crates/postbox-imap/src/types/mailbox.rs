//! Mailbox types.

use crate::utf7::{self, Utf7Error};

/// Mailbox name in Unicode form.
///
/// Names are converted to Modified UTF-7 only when they are written into
/// command text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox (case-insensitive per RFC).
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Decodes a mailbox name received from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if `wire` is not valid Modified UTF-7.
    pub fn from_wire(wire: &str) -> Result<Self, Utf7Error> {
        utf7::decode(wire).map(Self)
    }

    /// Returns the Modified UTF-7 wire form of this name.
    #[must_use]
    pub fn to_wire(&self) -> String {
        utf7::encode(&self.0)
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Mailbox {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Mailbox state reported by SELECT/EXAMINE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectInfo {
    /// Number of messages in the mailbox.
    pub exists: u32,
    /// Number of recent messages.
    pub recent: u32,
    /// Whether the mailbox was opened read-only.
    pub read_only: bool,
}

/// LIST/LSUB response data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Mailbox attributes.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter.
    pub delimiter: Option<char>,
    /// Mailbox name, decoded from Modified UTF-7 when possible.
    pub mailbox: Mailbox,
}

/// Mailbox attributes from LIST response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// Mailbox cannot be selected.
    NoSelect,
    /// Mailbox cannot have children.
    NoInferiors,
    /// Mailbox has no children.
    HasNoChildren,
    /// Mailbox has children.
    HasChildren,
    /// Mailbox is marked for attention.
    Marked,
    /// Mailbox is not marked.
    Unmarked,
    /// Mailbox is the drafts folder.
    Drafts,
    /// Mailbox is the junk/spam folder.
    Junk,
    /// Mailbox is the sent folder.
    Sent,
    /// Mailbox is the trash folder.
    Trash,
    /// Unknown attribute.
    Unknown(String),
}

impl MailboxAttribute {
    /// Parses a mailbox attribute string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "\\NOSELECT" => Self::NoSelect,
            "\\NOINFERIORS" => Self::NoInferiors,
            "\\HASNOCHILDREN" => Self::HasNoChildren,
            "\\HASCHILDREN" => Self::HasChildren,
            "\\MARKED" => Self::Marked,
            "\\UNMARKED" => Self::Unmarked,
            "\\DRAFTS" => Self::Drafts,
            "\\JUNK" | "\\SPAM" => Self::Junk,
            "\\SENT" => Self::Sent,
            "\\TRASH" => Self::Trash,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_inbox() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
    }

    #[test]
    fn test_wire_round_trip() {
        let mb = Mailbox::new("Entwürfe & Notizen");
        let wire = mb.to_wire();
        assert_eq!(wire, "Entw&APw-rfe &- Notizen");
        assert_eq!(Mailbox::from_wire(&wire).unwrap(), mb);
    }

    #[test]
    fn test_from_wire_rejects_unterminated() {
        assert!(Mailbox::from_wire("&AOk").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Mailbox::new("Sent")), "Sent");
    }

    #[test]
    fn test_attribute_parse() {
        assert_eq!(
            MailboxAttribute::parse("\\Noselect"),
            MailboxAttribute::NoSelect
        );
        assert_eq!(
            MailboxAttribute::parse("\\HasNoChildren"),
            MailboxAttribute::HasNoChildren
        );
        assert_eq!(MailboxAttribute::parse("\\Spam"), MailboxAttribute::Junk);
        assert_eq!(
            MailboxAttribute::parse("\\Custom"),
            MailboxAttribute::Unknown("\\Custom".to_string())
        );
    }
}
