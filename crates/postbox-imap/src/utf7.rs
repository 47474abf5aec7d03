//! Modified UTF-7 mailbox name codec (RFC 3501 §5.1.3).
//!
//! Mailbox names travel over the wire in a restricted UTF-7 variant:
//!
//! - printable US-ASCII (`0x20..=0x7E`) represents itself, except `&`,
//!   which is written as the empty shift sequence `&-`;
//! - every other run of characters is encoded as UTF-16BE, Base64-encoded
//!   with `,` in place of `/` and no padding, and wrapped as `&...-`.
//!
//! ```
//! use postbox_imap::utf7;
//!
//! assert_eq!(utf7::encode("André"), "Andr&AOk-");
//! assert_eq!(utf7::decode("Andr&AOk-").unwrap(), "André");
//! assert_eq!(utf7::decode("&-").unwrap(), "&");
//! ```

use base64::Engine;
use base64::alphabet::IMAP_MUTF7;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::NO_PAD;
use thiserror::Error;

/// Base64 with the `,` alphabet and no padding.
const MODIFIED_BASE64: GeneralPurpose = GeneralPurpose::new(&IMAP_MUTF7, NO_PAD);

/// Shift character that starts an encoded run.
const SHIFT: char = '&';

/// Character that ends an encoded run.
const UNSHIFT: char = '-';

/// Errors produced while decoding a Modified UTF-7 name.
///
/// Positions are byte offsets of the offending `&` in the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Utf7Error {
    /// A `&` without a terminating `-`.
    #[error("unterminated shift sequence at byte {0}")]
    Unterminated(usize),

    /// The payload length would require three padding characters.
    #[error("invalid base64 length in shift sequence at byte {0}")]
    InvalidLength(usize),

    /// The payload is not valid modified Base64.
    #[error("invalid base64 in shift sequence at byte {position}: {message}")]
    Base64 {
        /// Byte offset of the shift sequence.
        position: usize,
        /// Decoder message.
        message: String,
    },

    /// The payload decodes to an odd number of bytes.
    #[error("odd number of UTF-16 bytes in shift sequence at byte {0}")]
    OddLength(usize),

    /// The payload contains an unpaired surrogate.
    #[error("invalid UTF-16 in shift sequence at byte {0}")]
    InvalidUtf16(usize),
}

/// Encodes a Unicode mailbox name into its wire form.
#[must_use]
pub fn encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();

    for ch in name.chars() {
        if is_printable(ch) {
            flush(&mut out, &mut pending);
            if ch == SHIFT {
                out.push_str("&-");
            } else {
                out.push(ch);
            }
        } else {
            let mut units = [0u16; 2];
            pending.extend_from_slice(ch.encode_utf16(&mut units));
        }
    }
    flush(&mut out, &mut pending);

    out
}

/// Decodes a wire-form mailbox name.
///
/// # Errors
///
/// Returns a [`Utf7Error`] if a shift sequence is unterminated or its
/// payload is not valid modified Base64 of UTF-16BE text.
pub fn decode(wire: &str) -> Result<String, Utf7Error> {
    let mut out = String::with_capacity(wire.len());
    let mut rest = wire;
    let mut offset = 0;

    while let Some(start) = rest.find(SHIFT) {
        out.push_str(&rest[..start]);

        let position = offset + start;
        let after = &rest[start + 1..];
        let end = after
            .find(UNSHIFT)
            .ok_or(Utf7Error::Unterminated(position))?;

        let payload = &after[..end];
        if payload.is_empty() {
            out.push(SHIFT);
        } else {
            decode_run(payload, position, &mut out)?;
        }

        let consumed = start + 1 + end + 1;
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Returns true if the character is written directly.
const fn is_printable(ch: char) -> bool {
    matches!(ch, ' '..='~')
}

fn flush(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }

    let bytes: Vec<u8> = pending.iter().flat_map(|unit| unit.to_be_bytes()).collect();
    out.push(SHIFT);
    MODIFIED_BASE64.encode_string(&bytes, out);
    out.push(UNSHIFT);
    pending.clear();
}

fn decode_run(payload: &str, position: usize, out: &mut String) -> Result<(), Utf7Error> {
    // A single leftover sextet would need three padding characters.
    if payload.len() % 4 == 1 {
        return Err(Utf7Error::InvalidLength(position));
    }

    let bytes = MODIFIED_BASE64
        .decode(payload)
        .map_err(|e| Utf7Error::Base64 {
            position,
            message: e.to_string(),
        })?;

    if bytes.len() % 2 != 0 {
        return Err(Utf7Error::OddLength(position));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    for ch in char::decode_utf16(units) {
        out.push(ch.map_err(|_| Utf7Error::InvalidUtf16(position))?);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::non_ascii_literal)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_ascii_passthrough() {
        assert_eq!(encode("INBOX"), "INBOX");
        assert_eq!(encode("Sent Items/2024-01"), "Sent Items/2024-01");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn test_encode_latin() {
        assert_eq!(encode("André"), "Andr&AOk-");
        assert_eq!(encode("Entwürfe"), "Entw&APw-rfe");
    }

    #[test]
    fn test_encode_ampersand() {
        assert_eq!(encode("&"), "&-");
        assert_eq!(encode("Lost & Found"), "Lost &- Found");
    }

    #[test]
    fn test_encode_rfc3501_examples() {
        assert_eq!(
            encode("~peter/mail/台北/日本語"),
            "~peter/mail/&U,BTFw-/&ZeVnLIqe-"
        );
        assert_eq!(encode("☺!"), "&Jjo-!");
    }

    #[test]
    fn test_encode_control_and_astral() {
        assert_eq!(encode("\t"), "&AAk-");
        assert_eq!(encode("𐀀"), "&2ADcAA-");
    }

    #[test]
    fn test_decode_literal_ampersand() {
        assert_eq!(decode("&-").unwrap(), "&");
        assert_eq!(decode("Lost &- Found").unwrap(), "Lost & Found");
    }

    #[test]
    fn test_decode_rfc3501_examples() {
        assert_eq!(
            decode("~peter/mail/&U,BTFw-/&ZeVnLIqe-").unwrap(),
            "~peter/mail/台北/日本語"
        );
        assert_eq!(decode("Andr&AOk-").unwrap(), "André");
        assert_eq!(decode("&2ADcAA-").unwrap(), "𐀀");
    }

    #[test]
    fn test_decode_plain_dash_is_kept() {
        assert_eq!(decode("a-b&AOk-c-d").unwrap(), "a-béc-d");
    }

    #[test]
    fn test_decode_unterminated() {
        assert_eq!(decode("&AOk"), Err(Utf7Error::Unterminated(0)));
        assert_eq!(decode("Andr&AOk"), Err(Utf7Error::Unterminated(4)));
    }

    #[test]
    fn test_decode_invalid_length() {
        assert_eq!(decode("&A-"), Err(Utf7Error::InvalidLength(0)));
        assert_eq!(decode("x&-&AAAAA-"), Err(Utf7Error::InvalidLength(3)));
    }

    #[test]
    fn test_decode_invalid_alphabet() {
        assert!(matches!(decode("&A/k-"), Err(Utf7Error::Base64 { .. })));
    }

    #[test]
    fn test_decode_odd_byte_count() {
        // "AOkA" is three bytes: 00 E9 00
        assert_eq!(decode("&AOkA-"), Err(Utf7Error::OddLength(0)));
    }

    #[test]
    fn test_decode_unpaired_surrogate() {
        // D800 on its own
        assert_eq!(decode("&2AA-"), Err(Utf7Error::InvalidUtf16(0)));
    }

    proptest! {
        #[test]
        fn encoding_is_reversible(s in any::<String>()) {
            prop_assert_eq!(decode(&encode(&s)).unwrap(), s);
        }

        #[test]
        fn ampersand_heavy_names_are_reversible(s in "[&a-z\u{e9}\u{65e5}-]{0,24}") {
            prop_assert_eq!(decode(&encode(&s)).unwrap(), s);
        }

        #[test]
        fn encoded_form_is_printable_ascii(s in any::<String>()) {
            prop_assert!(encode(&s).chars().all(is_printable));
        }

        #[test]
        fn decoding_never_panics(s in "\\PC*") {
            let _ = decode(&s);
        }
    }
}
