//! Random shortcode generation.

use rand::Rng;

use crate::{Shortcode, ShortcodeGenerator};

/// 62 symbols: lowercase, uppercase, then digits.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated shortcodes (about 35.7 bits of entropy).
pub const DEFAULT_LENGTH: usize = 6;

/// Draws each character independently and uniformly from [`ALPHABET`].
#[derive(Clone, Copy, Debug)]
pub struct RandomShortcodeGenerator {
    length: usize,
}

impl RandomShortcodeGenerator {
    /// Lengths below [`DEFAULT_LENGTH`] leave a code space small enough to
    /// fill, after which generation never finds a free code.
    pub(crate) fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomShortcodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH)
    }
}

impl ShortcodeGenerator for RandomShortcodeGenerator {
    fn draw(&self) -> Shortcode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        // Non-empty by construction since length >= 1
        Shortcode(code)
    }
}

/// True if `code` only uses characters from [`ALPHABET`].
pub fn in_alphabet(code: &str) -> bool {
    code.bytes().all(|b| ALPHABET.contains(&b))
}
