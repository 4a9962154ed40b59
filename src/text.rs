//! Text normalisation and offset-preserving tokenisation.
//!
//! Every downstream offset (NER spans, regex matches, claim features) refers
//! to the string produced by [`normalize`], so extraction always normalises
//! exactly once, up front.
use unicode_normalization::UnicodeNormalization;

/// A token with byte offsets into the normalised string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Unicode NFC, every maximal whitespace run (NBSP included) collapsed to a
/// single ASCII space, outer whitespace stripped.
pub fn normalize(s: &str) -> String {
    let composed: String = s.nfc().collect();
    let mut out = String::with_capacity(composed.len());
    let mut in_whitespace = false;
    for c in composed.chars() {
        if c.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace && !out.is_empty() {
            out.push(' ');
        }
        in_whitespace = false;
        out.push(c);
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Splits a normalised string into tokens. Runs of letters and digits form
/// one token, and a hyphen or apostrophe flanked by word characters stays
/// inside the token (chemical names and CAS numbers carry internal hyphens).
pub fn tokenize(s: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_word_char(c) {
            let mut j = i + 1;
            while j < chars.len() {
                let (_, cj) = chars[j];
                if is_word_char(cj) {
                    j += 1;
                } else if (cj == '-' || cj == '\'')
                    && j + 1 < chars.len()
                    && is_word_char(chars[j + 1].1)
                {
                    j += 2;
                } else {
                    break;
                }
            }
            let end = if j < chars.len() { chars[j].0 } else { s.len() };
            tokens.push(Token {
                text: s[start..end].to_string(),
                start,
                end,
            });
            i = j;
        } else {
            // Punctuation and any other symbol stand alone.
            let end = if i + 1 < chars.len() {
                chars[i + 1].0
            } else {
                s.len()
            };
            tokens.push(Token {
                text: s[start..end].to_string(),
                start,
                end,
            });
            i += 1;
        }
    }
    tokens
}
