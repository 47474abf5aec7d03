//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses. Only one command is
//! ever outstanding on a session, so tags only need to differ from the
//! previous one; the counter cycles every 1000 commands.

/// Number of distinct counter values before the counter wraps.
const TAG_MODULUS: u16 = 1000;

/// Tag generator for IMAP commands.
///
/// Generates tags in the format "A1", "A2", ..., "A999", "A0", "A1", ...
/// The generator is plain owned state: a session holds one exclusively and
/// sharing it between tasks requires external locking.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u16,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Generates the next tag.
    ///
    /// The counter is advanced before formatting, so the first tag is
    /// `<prefix>1` and the counter wraps to 0 (not 1) after 999.
    pub fn next_tag(&mut self) -> String {
        self.counter = (self.counter + 1) % TAG_MODULUS;
        format!("{}{}", self.prefix, self.counter)
    }

    /// Returns the current counter value without incrementing.
    #[must_use]
    pub const fn current(&self) -> u16 {
        self.counter
    }

    /// Returns the tag prefix.
    #[must_use]
    pub const fn prefix(&self) -> char {
        self.prefix
    }

    /// Resets the counter to zero.
    pub const fn reset(&mut self) {
        self.counter = 0;
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
