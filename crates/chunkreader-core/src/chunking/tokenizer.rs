//! Single-pass tokenizer producing classified tokens.
//!
//! The tokenizer walks the input once, looking at most two runes ahead and one
//! behind. Tokens borrow from the input and exactly cover it: concatenating
//! every token value reproduces the original text byte for byte.

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    /// A run of whitespace (spaces, tabs, newlines).
    Space,
    /// Punctuation that does not end a sentence (`,`, `:`, `;`, dashes, brackets).
    Punctuation,
    /// One or more consecutive sentence terminators (`.`, `!?`, `...`).
    EndSentence,
    BeginQuote,
    EndQuote,
    /// A URL kept as a single unit, without trailing punctuation.
    Link,
}

/// A classified slice of the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub value: &'a str,
}

impl<'a> Token<'a> {
    /// Length of the token in characters.
    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }
}

const LINK_PREFIXES: [&str; 4] = ["http://", "https://", "ftp://", "www."];

/// Returns true for the quote glyphs the tokenizer tracks.
pub fn is_quote(c: char) -> bool {
    matches!(
        c,
        '"' | '\'' | '`' | '«' | '»' | '„' | '“' | '”' | '‘' | '’'
    )
}

/// Returns true for runes that terminate a sentence.
pub fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Returns true for runes that split words.
///
/// Symbols such as `$`, `%`, `/` or `@` are deliberately absent: they stay part
/// of the surrounding word.
pub fn is_punctuation(c: char) -> bool {
    is_sentence_end(c)
        || matches!(
            c,
            ',' | ';'
                | ':'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '-'
                | '¡'
                | '¿'
                | '‹'
                | '›'
                | '、'
                | '‐'..='―'
        )
}

fn is_hyphen(c: char) -> bool {
    matches!(c, '-' | '‐' | '‑')
}

/// Iterator over the tokens of a text.
///
/// Quote state is carried across the whole scan: the first quote glyph opens a
/// quote, the next one closes it, regardless of which glyphs they are.
pub struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    in_quote: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            in_quote: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token<'a> {
        let value = &self.text[self.pos..self.pos + len];
        self.pos += len;
        Token { kind, value }
    }

    /// Byte length of a link starting at the current position, if any.
    ///
    /// The link runs to the next whitespace; trailing punctuation and quotes are
    /// left for the following tokens so `see www.example.com.` still ends a
    /// sentence.
    fn scan_link(&self) -> Option<usize> {
        let rest = self.rest();
        let prefix = LINK_PREFIXES.iter().find(|p| rest.starts_with(*p))?;
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());

        let mut link = &rest[..end];
        while let Some(c) = link.chars().next_back() {
            if !(is_punctuation(c) || is_quote(c)) {
                break;
            }
            link = &link[..link.len() - c.len_utf8()];
        }

        if link.len() > prefix.len() && link.starts_with(prefix) {
            Some(link.len())
        } else {
            None
        }
    }

    /// Byte length of the word starting at the current position.
    fn scan_word(&self) -> usize {
        let rest = self.rest();
        let mut end = 0;
        let mut prev: Option<char> = None;
        let mut abbreviation = false;

        while let Some(c) = rest[end..].chars().next() {
            if c.is_whitespace() {
                break;
            }
            if is_quote(c) || is_punctuation(c) {
                let mut ahead = rest[end + c.len_utf8()..].chars();
                let next = ahead.next();
                let after_next = ahead.next();
                if !joins_word(c, prev, next, after_next, &mut abbreviation) {
                    break;
                }
            }
            prev = Some(c);
            end += c.len_utf8();
        }

        end
    }
}

/// Decides whether punctuation or a quote inside a word belongs to the word.
///
/// `abbreviation` is set once an abbreviation such as `e.g.` has been entered,
/// so its closing terminator is absorbed as well.
fn joins_word(
    c: char,
    prev: Option<char>,
    next: Option<char>,
    after_next: Option<char>,
    abbreviation: &mut bool,
) -> bool {
    let prev_letter = prev.is_some_and(char::is_alphabetic);
    let next_letter = next.is_some_and(char::is_alphabetic);

    if *abbreviation && is_sentence_end(c) {
        *abbreviation = false;
        return true;
    }
    if is_quote(c) {
        // contraction: don't, l'homme
        return prev_letter && next_letter;
    }
    if is_hyphen(c) {
        return prev.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric);
    }
    if matches!(c, '.' | ',' | ':') && prev.is_some_and(|p| p.is_ascii_digit()) {
        // 3.14, 1,000, 10:30
        if next.is_some_and(|n| n.is_ascii_digit()) {
            return true;
        }
    }
    if is_sentence_end(c) && prev_letter && next_letter && after_next.is_some_and(is_sentence_end)
    {
        *abbreviation = true;
        return true;
    }
    false
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = self.rest();
        let c = rest.chars().next()?;

        if c.is_whitespace() {
            let len = rest
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(rest.len());
            return Some(self.emit(TokenKind::Space, len));
        }

        if let Some(len) = self.scan_link() {
            return Some(self.emit(TokenKind::Link, len));
        }

        if is_quote(c) {
            let kind = if self.in_quote {
                TokenKind::EndQuote
            } else {
                TokenKind::BeginQuote
            };
            self.in_quote = !self.in_quote;
            return Some(self.emit(kind, c.len_utf8()));
        }

        if is_sentence_end(c) {
            // "?!" and "..." are one boundary
            let len = rest
                .find(|c: char| !is_sentence_end(c))
                .unwrap_or(rest.len());
            return Some(self.emit(TokenKind::EndSentence, len));
        }

        if is_punctuation(c) {
            return Some(self.emit(TokenKind::Punctuation, c.len_utf8()));
        }

        let len = self.scan_word();
        Some(self.emit(TokenKind::Word, len))
    }
}

/// Tokenizes `text`.
///
/// # Example
///
/// ```
/// use chunkreader_core::chunking::{tokenize, TokenKind};
///
/// let kinds: Vec<TokenKind> = tokenize("Hi, you!").map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Word,
///         TokenKind::Punctuation,
///         TokenKind::Space,
///         TokenKind::Word,
///         TokenKind::EndSentence,
///     ]
/// );
/// ```
pub fn tokenize(text: &str) -> Tokenizer<'_> {
    Tokenizer::new(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn pairs(text: &str) -> Vec<(TokenKind, &str)> {
        tokenize(text).map(|t| (t.kind, t.value)).collect()
    }

    #[test]
    fn test_mixed_sentence() {
        let text = r#"This is a "sample" text, including a link: https://www.example.com. Let's parse it!"#;
        let expected = vec![
            (Word, "This"),
            (Space, " "),
            (Word, "is"),
            (Space, " "),
            (Word, "a"),
            (Space, " "),
            (BeginQuote, "\""),
            (Word, "sample"),
            (EndQuote, "\""),
            (Space, " "),
            (Word, "text"),
            (Punctuation, ","),
            (Space, " "),
            (Word, "including"),
            (Space, " "),
            (Word, "a"),
            (Space, " "),
            (Word, "link"),
            (Punctuation, ":"),
            (Space, " "),
            (Link, "https://www.example.com"),
            (EndSentence, "."),
            (Space, " "),
            (Word, "Let's"),
            (Space, " "),
            (Word, "parse"),
            (Space, " "),
            (Word, "it"),
            (EndSentence, "!"),
        ];
        assert_eq!(pairs(text), expected);
    }

    #[test]
    fn test_tokens_cover_input() {
        let samples = [
            "First chunk.Second chunk.\n\t\tThird chunk.Fourth chunk.",
            "«Ёлка», — сказал он. Потом ушёл…",
            "Prices rose 3.5% to $1,200 (see www.example.org/report).",
            "  leading and trailing  ",
            "",
        ];
        for text in samples {
            let joined: String = tokenize(text).map(|t| t.value).collect();
            assert_eq!(joined, text);
            assert!(tokenize(text).all(|t| !t.value.is_empty()));
        }
    }

    #[test]
    fn test_whitespace_runs_are_single_tokens() {
        assert_eq!(
            pairs("a \n\t b"),
            vec![(Word, "a"), (Space, " \n\t "), (Word, "b")]
        );
    }

    #[test]
    fn test_terminator_runs_collapse() {
        assert_eq!(
            pairs("Really?! Yes..."),
            vec![
                (Word, "Really"),
                (EndSentence, "?!"),
                (Space, " "),
                (Word, "Yes"),
                (EndSentence, "..."),
            ]
        );
    }

    #[test]
    fn test_abbreviation_stays_in_word() {
        assert_eq!(
            pairs("Fruit, e.g. apples."),
            vec![
                (Word, "Fruit"),
                (Punctuation, ","),
                (Space, " "),
                (Word, "e.g."),
                (Space, " "),
                (Word, "apples"),
                (EndSentence, "."),
            ]
        );
    }

    #[test]
    fn test_terminator_between_words_still_ends_sentence() {
        assert_eq!(
            pairs("one.Two"),
            vec![(Word, "one"), (EndSentence, "."), (Word, "Two")]
        );
    }

    #[test]
    fn test_numbers_keep_separators() {
        assert_eq!(
            pairs("Pi is 3.14, not 1,000."),
            vec![
                (Word, "Pi"),
                (Space, " "),
                (Word, "is"),
                (Space, " "),
                (Word, "3.14"),
                (Punctuation, ","),
                (Space, " "),
                (Word, "not"),
                (Space, " "),
                (Word, "1,000"),
                (EndSentence, "."),
            ]
        );
    }

    #[test]
    fn test_hyphenated_word() {
        assert_eq!(
            pairs("well-known - fact"),
            vec![
                (Word, "well-known"),
                (Space, " "),
                (Punctuation, "-"),
                (Space, " "),
                (Word, "fact"),
            ]
        );
    }

    #[test]
    fn test_link_strips_trailing_punctuation() {
        assert_eq!(
            pairs("(see http://a.io/x?q=1)."),
            vec![
                (Punctuation, "("),
                (Word, "see"),
                (Space, " "),
                (Link, "http://a.io/x?q=1"),
                (Punctuation, ")"),
                (EndSentence, "."),
            ]
        );
    }

    #[test]
    fn test_bare_prefix_is_not_a_link() {
        assert_eq!(
            pairs("www."),
            vec![(Word, "www"), (EndSentence, ".")]
        );
    }

    #[test]
    fn test_quote_toggle_across_glyphs() {
        let kinds: Vec<TokenKind> = tokenize("«a» “b”")
            .filter(|t| matches!(t.kind, BeginQuote | EndQuote))
            .map(|t| t.kind)
            .collect();
        assert_eq!(kinds, vec![BeginQuote, EndQuote, BeginQuote, EndQuote]);
    }

    #[test]
    fn test_contraction_with_curly_apostrophe() {
        assert_eq!(
            pairs("don’t"),
            vec![(Word, "don’t")]
        );
    }
}
