//! Command text helpers.
//!
//! Command text is a single line, so no argument may carry CR, LF or NUL.

use crate::types::{Flag, Mailbox};
use crate::{Error, Result};

/// Writes an astring (atom or quoted string).
///
/// Strings with 8-bit bytes are quoted, never sent as atoms.
pub fn write_astring(buf: &mut String, s: &str) -> Result<()> {
    check_line_safe(s)?;
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push('"');
        for ch in s.chars() {
            if ch == '"' || ch == '\\' {
                buf.push('\\');
            }
            buf.push(ch);
        }
        buf.push('"');
    } else {
        buf.push_str(s);
    }
    Ok(())
}

/// Writes a mailbox name in its Modified UTF-7 wire form.
pub fn write_mailbox(buf: &mut String, mailbox: &Mailbox) -> Result<()> {
    write_astring(buf, &mailbox.to_wire())
}

/// Writes caller-formatted text such as search criteria or a sequence set.
pub fn write_raw(buf: &mut String, s: &str) -> Result<()> {
    check_line_safe(s)?;
    buf.push_str(s);
    Ok(())
}

/// Writes a parenthesized flag list.
pub fn write_flag_list(buf: &mut String, flags: &[Flag]) {
    buf.push('(');
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            buf.push(' ');
        }
        buf.push_str(flag.as_str());
    }
    buf.push(')');
}

fn check_line_safe(s: &str) -> Result<()> {
    if s.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::Protocol("command argument contains CR, LF or NUL".to_string()));
    }
    Ok(())
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']')
        || b < 0x20
        || b >= 0x7F
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn astring(s: &str) -> String {
        let mut buf = String::new();
        write_astring(&mut buf, s).unwrap();
        buf
    }

    #[test]
    fn test_atom_passthrough() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("Andr&AOk-"), "Andr&AOk-");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("*"), "\"*\"");
        assert_eq!(astring("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn test_eight_bit_is_quoted() {
        assert_eq!(astring("jörg"), "\"jörg\"");
        assert_eq!(astring("\u{7f}"), "\"\u{7f}\"");
    }

    #[test]
    fn test_line_breaks_rejected() {
        let mut buf = String::new();
        for bad in ["x\r\nA2 DELETE INBOX", "a\nb", "a\rb", "nul\0"] {
            assert!(matches!(write_astring(&mut buf, bad), Err(Error::Protocol(_))));
            assert!(write_raw(&mut buf, bad).is_err());
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_mailbox_is_encoded_before_quoting() {
        let mut buf = String::new();
        write_mailbox(&mut buf, &Mailbox::new("Lost & Found")).unwrap();
        assert_eq!(buf, "\"Lost &- Found\"");
    }

    #[test]
    fn test_flag_list() {
        let mut buf = String::new();
        write_flag_list(&mut buf, &[Flag::Seen, Flag::Keyword("$Work".to_string())]);
        assert_eq!(buf, "(\\Seen $Work)");

        let mut empty = String::new();
        write_flag_list(&mut empty, &[]);
        assert_eq!(empty, "()");
    }
}
