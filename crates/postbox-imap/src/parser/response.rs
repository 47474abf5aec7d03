//! Tokenizers for the untagged responses the client consumes.
//!
//! Each function takes one collected response (a line plus any literals it
//! carries) and returns `Ok(None)` when the response is of another kind.

use std::collections::BTreeMap;

use tracing::warn;

use super::lexer::{Lexer, Token};
use crate::Result;
use crate::types::{ListResponse, Mailbox, MailboxAttribute, SelectInfo};

/// Message data extracted from a FETCH response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedBody {
    /// Message sequence number.
    pub seq: u32,
    /// UID, if the server sent one.
    pub uid: Option<u32>,
    /// Full message bytes from `BODY[]` or `RFC822`.
    pub body: Option<Vec<u8>>,
}

/// Matches `* [number] KEYWORD`, leaving the lexer after the keyword.
fn untagged<'a>(response: &'a [u8], keyword: &str) -> Option<(Lexer<'a>, Option<u64>)> {
    let mut lexer = Lexer::new(response);
    if lexer.next_token().ok()? != Token::Asterisk || lexer.next_token().ok()? != Token::Space {
        return None;
    }

    let (number, atom) = match lexer.next_token().ok()? {
        Token::Number(n) => {
            if lexer.next_token().ok()? != Token::Space {
                return None;
            }
            match lexer.next_token().ok()? {
                Token::Atom(atom) => (Some(n), atom),
                _ => return None,
            }
        }
        Token::Atom(atom) => (None, atom),
        _ => return None,
    };

    atom.eq_ignore_ascii_case(keyword).then_some((lexer, number))
}

/// Parses `* CAPABILITY atom...`.
#[must_use]
pub fn parse_capability(response: &[u8]) -> Option<Vec<String>> {
    let (mut lexer, None) = untagged(response, "CAPABILITY")? else {
        return None;
    };

    let mut caps = Vec::new();
    loop {
        match lexer.next_token() {
            Ok(Token::Atom(cap)) => caps.push(cap.to_string()),
            Ok(Token::Space) => {}
            _ => break,
        }
    }
    Some(caps)
}

/// Parses `* LIST (attributes) delimiter name` (or `LSUB`).
///
/// Names are decoded from Modified UTF-7; a name that fails to decode is
/// kept in its wire form.
///
/// # Errors
///
/// Returns an error if the response is a LIST/LSUB response but is
/// malformed.
pub fn parse_list(response: &[u8]) -> Result<Option<ListResponse>> {
    let Some((mut lexer, None)) =
        untagged(response, "LIST").or_else(|| untagged(response, "LSUB"))
    else {
        return Ok(None);
    };

    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(attr) => attributes.push(MailboxAttribute::parse(attr)),
            token => {
                return Err(lexer.error(&format!("Unexpected token in attributes: {token:?}")));
            }
        }
    }

    lexer.expect_space()?;
    let delimiter = lexer.read_nstring()?.and_then(|d| d.chars().next());

    lexer.expect_space()?;
    let wire = lexer.read_astring()?;
    let mailbox = Mailbox::from_wire(&wire).unwrap_or_else(|err| {
        warn!(name = %wire, %err, "keeping undecodable mailbox name");
        Mailbox::new(wire.clone())
    });

    Ok(Some(ListResponse {
        attributes,
        delimiter,
        mailbox,
    }))
}

/// Parses `* STATUS name (item value ...)`.
///
/// Item names are returned upper-cased.
///
/// # Errors
///
/// Returns an error if the response is a STATUS response but is malformed,
/// e.g. an item without a value.
pub fn parse_status(response: &[u8]) -> Result<Option<(Mailbox, BTreeMap<String, u64>)>> {
    let Some((mut lexer, None)) = untagged(response, "STATUS") else {
        return Ok(None);
    };

    lexer.expect_space()?;
    let wire = lexer.read_astring()?;
    let mailbox = Mailbox::from_wire(&wire).unwrap_or_else(|_| Mailbox::new(wire.clone()));

    lexer.skip_spaces();
    lexer.expect(Token::LParen)?;

    let mut items = BTreeMap::new();
    loop {
        lexer.skip_spaces();
        if lexer.peek() == Some(b')') {
            lexer.advance();
            break;
        }
        let name = lexer.read_atom_string()?.to_ascii_uppercase();
        lexer.expect_space()?;
        let value = lexer.read_number()?;
        items.insert(name, value);
    }

    Ok(Some((mailbox, items)))
}

/// Parses `* SEARCH n...`.
///
/// # Errors
///
/// Returns an error if a message number does not fit in 32 bits.
pub fn parse_search(response: &[u8]) -> Result<Option<Vec<u32>>> {
    let Some((mut lexer, None)) = untagged(response, "SEARCH") else {
        return Ok(None);
    };

    let mut ids = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::Space => {}
            Token::Number(n) => {
                let id = u32::try_from(n)
                    .map_err(|_| lexer.error(&format!("Message number out of range: {n}")))?;
                ids.push(id);
            }
            // (MODSEQ n) from CONDSTORE servers
            Token::LParen => {
                while !matches!(lexer.next_token()?, Token::RParen | Token::Eof) {}
            }
            _ => break,
        }
    }

    Ok(Some(ids))
}

/// Parses `* n FETCH (items)`, extracting the full message body and UID.
///
/// # Errors
///
/// Returns an error if the response is a FETCH response but is malformed.
pub fn parse_fetch(response: &[u8]) -> Result<Option<FetchedBody>> {
    let Some((mut lexer, Some(seq))) = untagged(response, "FETCH") else {
        return Ok(None);
    };

    let seq = u32::try_from(seq).map_err(|_| lexer.error("Sequence number out of range"))?;
    let mut fetched = FetchedBody {
        seq,
        ..FetchedBody::default()
    };

    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    loop {
        lexer.skip_spaces();
        if lexer.peek() == Some(b')') {
            lexer.advance();
            break;
        }

        let name = lexer.read_atom_string()?.to_ascii_uppercase();
        let mut whole_message = name == "RFC822";
        if lexer.peek() == Some(b'[') {
            lexer.advance();
            whole_message = lexer.peek() == Some(b']');
            while !matches!(lexer.next_token()?, Token::RBracket | Token::Eof) {}
            // partial origin, e.g. <0>
            if lexer.peek() == Some(b'<') {
                lexer.read_atom_string()?;
            }
        }
        lexer.expect_space()?;

        if name == "UID" {
            fetched.uid = Some(lexer.read_u32()?);
        } else if whole_message {
            fetched.body = match lexer.next_token()? {
                Token::Literal(data) => Some(data.to_vec()),
                Token::QuotedString(s) => Some(s.into_bytes()),
                Token::Nil => None,
                token => {
                    return Err(lexer.error(&format!("Expected message data, got {token:?}")));
                }
            };
        } else {
            lexer.skip_value()?;
        }
    }

    Ok(Some(fetched))
}

/// Collects SELECT/EXAMINE data from the responses of the command and the
/// text of its completion.
#[must_use]
pub fn parse_select(responses: &[Vec<u8>], completion_text: &str) -> SelectInfo {
    let mut info = SelectInfo {
        read_only: completion_text
            .to_ascii_uppercase()
            .starts_with("[READ-ONLY]"),
        ..SelectInfo::default()
    };

    for response in responses {
        if let Some((_, Some(n))) = untagged(response, "EXISTS") {
            info.exists = u32::try_from(n).unwrap_or(u32::MAX);
        } else if let Some((_, Some(n))) = untagged(response, "RECENT") {
            info.recent = u32::try_from(n).unwrap_or(u32::MAX);
        }
    }

    info
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capability() {
        let caps = parse_capability(b"* CAPABILITY IMAP4rev1 IDLE AUTH=PLAIN\r\n").unwrap();
        assert_eq!(caps, vec!["IMAP4rev1", "IDLE", "AUTH=PLAIN"]);
        assert!(parse_capability(b"* OK ready\r\n").is_none());
    }

    #[test]
    fn test_list_quoted_name() {
        let list = parse_list(b"* LIST (\\HasNoChildren) \"/\" \"Sent Items\"\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(list.attributes, vec![MailboxAttribute::HasNoChildren]);
        assert_eq!(list.delimiter, Some('/'));
        assert_eq!(list.mailbox.as_str(), "Sent Items");
    }

    #[test]
    fn test_list_decodes_utf7_atom() {
        let list = parse_list(b"* LIST () \".\" Andr&AOk-\r\n").unwrap().unwrap();
        assert!(list.attributes.is_empty());
        assert_eq!(list.delimiter, Some('.'));
        assert_eq!(list.mailbox.as_str(), "André");
    }

    #[test]
    fn test_list_nil_delimiter_and_literal_name() {
        let list = parse_list(b"* LIST (\\Noselect \\HasChildren) NIL {5}\r\nNotes\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            list.attributes,
            vec![MailboxAttribute::NoSelect, MailboxAttribute::HasChildren]
        );
        assert_eq!(list.delimiter, None);
        assert_eq!(list.mailbox.as_str(), "Notes");
    }

    #[test]
    fn test_list_keeps_undecodable_name() {
        let list = parse_list(b"* LIST () \"/\" \"Bad&AOk\"\r\n").unwrap().unwrap();
        assert_eq!(list.mailbox.as_str(), "Bad&AOk");
    }

    #[test]
    fn test_lsub() {
        let list = parse_list(b"* LSUB () \"/\" INBOX\r\n").unwrap().unwrap();
        assert_eq!(list.mailbox, Mailbox::inbox());
    }

    #[test]
    fn test_list_ignores_other_responses() {
        assert!(parse_list(b"* 3 EXISTS\r\n").unwrap().is_none());
        assert!(parse_list(b"A1 OK LIST done\r\n").unwrap().is_none());
    }

    #[test]
    fn test_list_malformed() {
        assert!(parse_list(b"* LIST \\Noselect \"/\" x\r\n").is_err());
    }

    #[test]
    fn test_status() {
        let (mailbox, items) =
            parse_status(b"* STATUS \"Notes/pomera_sync\" (MESSAGES 231 UIDNEXT 44292)\r\n")
                .unwrap()
                .unwrap();
        assert_eq!(mailbox.as_str(), "Notes/pomera_sync");
        assert_eq!(items.get("MESSAGES"), Some(&231));
        assert_eq!(items.get("UIDNEXT"), Some(&44292));
    }

    #[test]
    fn test_status_unpaired_item() {
        assert!(parse_status(b"* STATUS INBOX (MESSAGES)\r\n").is_err());
    }

    #[test]
    fn test_search() {
        let ids = parse_search(b"* SEARCH 2 84 882\r\n").unwrap().unwrap();
        assert_eq!(ids, vec![2, 84, 882]);
    }

    #[test]
    fn test_search_empty_and_modseq() {
        assert_eq!(parse_search(b"* SEARCH\r\n").unwrap().unwrap(), Vec::<u32>::new());
        assert_eq!(
            parse_search(b"* SEARCH 1 5 (MODSEQ 917162500)\r\n")
                .unwrap()
                .unwrap(),
            vec![1, 5]
        );
    }

    #[test]
    fn test_fetch_literal_body() {
        let response = b"* 12 FETCH (UID 4827 BODY[] {21}\r\nSubject: hi\r\n\r\nbody\r\n)\r\n";
        let fetched = parse_fetch(response).unwrap().unwrap();
        assert_eq!(fetched.seq, 12);
        assert_eq!(fetched.uid, Some(4827));
        assert_eq!(fetched.body.as_deref(), Some(&b"Subject: hi\r\n\r\nbody\r\n"[..]));
    }

    #[test]
    fn test_lf_only_responses() {
        assert_eq!(parse_search(b"* SEARCH 2 84\n").unwrap().unwrap(), vec![2, 84]);

        let fetched = parse_fetch(b"* 1 FETCH (UID 7 BODY[] {5}\nhello)\n")
            .unwrap()
            .unwrap();
        assert_eq!(fetched.uid, Some(7));
        assert_eq!(fetched.body.as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_fetch_skips_other_items() {
        let response =
            b"* 3 FETCH (FLAGS (\\Seen) BODY[HEADER.FIELDS (SUBJECT)] {5}\r\nx\r\n\r\n RFC822.SIZE 44)\r\n";
        let fetched = parse_fetch(response).unwrap().unwrap();
        assert_eq!(fetched.seq, 3);
        assert_eq!(fetched.uid, None);
        assert_eq!(fetched.body, None);
    }

    #[test]
    fn test_fetch_rfc822_quoted() {
        let fetched = parse_fetch(b"* 1 FETCH (RFC822 \"short\")\r\n").unwrap().unwrap();
        assert_eq!(fetched.body.as_deref(), Some(&b"short"[..]));
    }

    #[test]
    fn test_fetch_requires_sequence_number() {
        assert!(parse_fetch(b"* FETCH (UID 1)\r\n").unwrap().is_none());
    }

    #[test]
    fn test_select() {
        let responses = vec![
            b"* FLAGS (\\Seen \\Deleted)\r\n".to_vec(),
            b"* 172 EXISTS\r\n".to_vec(),
            b"* 1 RECENT\r\n".to_vec(),
            b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n".to_vec(),
        ];
        let info = parse_select(&responses, "[READ-ONLY] EXAMINE completed");
        assert_eq!(info.exists, 172);
        assert_eq!(info.recent, 1);
        assert!(info.read_only);

        let info = parse_select(&responses, "[READ-WRITE] SELECT completed");
        assert!(!info.read_only);
    }
}
