//! Line tokenizer for the image display protocol
//!
//! A command line is split on a delimiter byte into tokens that borrow from
//! the line buffer. A token runs from the first byte accepted by the validity
//! predicate up to the last accepted byte before the next delimiter, so stray
//! whitespace or control bytes around a field never shift the fields after it.
//! Fields with no valid byte at all produce no token.

/// Maximum number of tokens kept for one line
pub const MAX_ARGS: usize = 128;

/// Bounded list of tokens borrowed from a single input line
///
/// Inserting past [`MAX_ARGS`] is a no-op, so a hostile line can never grow
/// this beyond the fixed capacity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args<'a> {
    tokens: Vec<&'a [u8]>,
}

impl<'a> Args<'a> {
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Append a token unless the list is already full
    fn push(&mut self, token: &'a [u8]) {
        if self.tokens.len() >= MAX_ARGS {
            return;
        }
        self.tokens.push(token);
    }

    /// Number of tokens produced
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`, if present
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.tokens.get(index).copied()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.tokens.iter().copied()
    }
}

/// Printable, non-whitespace ASCII (the C `isgraph` class)
pub fn is_printable(byte: u8) -> bool {
    byte.is_ascii_graphic()
}

/// Split `line` on `delim`, keeping only fields that contain a valid byte
///
/// Tokens are sub-slices of `line`; nothing is copied. Tokens beyond
/// [`MAX_ARGS`] are dropped silently.
pub fn tokenize<F>(line: &[u8], delim: u8, is_valid: F) -> Args<'_>
where
    F: Fn(u8) -> bool,
{
    let mut args = Args::new();

    for field in line.split(|&b| b == delim) {
        let Some(start) = field.iter().position(|&b| is_valid(b)) else {
            continue;
        };
        // A valid byte exists, so rposition always finds one at or after `start`
        let end = field
            .iter()
            .rposition(|&b| is_valid(b))
            .map_or(start + 1, |last| last + 1);
        args.push(&field[start..end]);
    }

    args
}
