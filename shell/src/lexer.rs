//! Splitting a command line into whitespace-separated tokens.
//!
//! There is no quoting, escaping or expansion: a token is any run of characters other
//! than space, tab and newline.

/// Characters that separate tokens.
pub const DELIMITERS: [char; 3] = [' ', '\t', '\n'];

/// Maximum number of tokens kept from one line. Further tokens are dropped silently.
pub const MAX_ARGUMENTS: usize = 32;

/// Maximum length of a single token in bytes. Longer tokens are truncated.
pub const MAX_TOKEN_LEN: usize = 255;

/// Capacity-bounded, ordered list of non-empty tokens.
///
/// The list owns its strings and is dropped with the loop iteration that produced it.
/// Its length marks the end of the argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<String>,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token, applying the truncation policy.
    ///
    /// Returns `false` without storing anything when `token` is empty or the list already
    /// holds [`MAX_ARGUMENTS`] tokens.
    pub fn push(&mut self, token: &str) -> bool {
        if token.is_empty() || self.is_full() {
            return false;
        }
        self.tokens.push(truncate(token, MAX_TOKEN_LEN).to_string());
        true
    }

    pub fn is_full(&self) -> bool {
        self.tokens.len() >= MAX_ARGUMENTS
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Split a raw line into tokens.
///
/// Consecutive delimiters produce no empty tokens. Only the first [`MAX_ARGUMENTS`]
/// tokens are kept.
pub fn split_into_tokens(line: &str) -> TokenList {
    let mut tokens = TokenList::new();
    for fragment in line.split(DELIMITERS) {
        if tokens.is_full() {
            break;
        }
        tokens.push(fragment);
    }
    tokens
}
