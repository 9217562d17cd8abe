//! GLM tokenizer
//!
//! Splits raw GLM text into a flat, fully materialized stream of tokens:
//! words, `{`, `}` and `;`. Line comments (`// ...`) are dropped and all
//! whitespace (newlines, carriage returns, tabs, spaces) only separates
//! words. A `//` that directly follows `http:` or `https:` belongs to a URL
//! (stylesheet directives carry one) and is kept as part of the word.
//!
//! The tokenizer never repairs input: a statement missing its `;` simply
//! runs into the next one and is left for the parser to reject or accept.

use std::fmt;

/// Syntactic category of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier, keyword or value text
    Word(String),
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// `;`
    Semicolon,
}

/// A token plus the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// True for `;`, `{` and `}`, the tokens that end a statement run.
    pub fn is_terminator(&self) -> bool {
        !matches!(self.kind, TokenKind::Word(_))
    }

    /// Source text of the token.
    pub fn as_str(&self) -> &str {
        match &self.kind {
            TokenKind::Word(word) => word,
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::Semicolon => ";",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokenize GLM source text.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut word_line = 1;
    let mut line = 1;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '/' if text[idx..].starts_with("//") && !follows_url_scheme(&text[..idx]) => {
                flush_word(&mut tokens, &mut word, word_line);
                // Leave the newline itself for the line counter below.
                while let Some(&(_, next)) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ';' | '{' | '}' => {
                flush_word(&mut tokens, &mut word, word_line);
                let kind = match ch {
                    ';' => TokenKind::Semicolon,
                    '{' => TokenKind::OpenBrace,
                    _ => TokenKind::CloseBrace,
                };
                tokens.push(Token::new(kind, line));
            }
            c if c.is_whitespace() => {
                flush_word(&mut tokens, &mut word, word_line);
                if c == '\n' {
                    line += 1;
                }
            }
            c => {
                if word.is_empty() {
                    word_line = line;
                }
                word.push(c);
            }
        }
    }
    flush_word(&mut tokens, &mut word, word_line);
    tokens
}

fn follows_url_scheme(before: &str) -> bool {
    before.ends_with("http:") || before.ends_with("https:")
}

fn flush_word(tokens: &mut Vec<Token>, word: &mut String, line: usize) {
    if !word.is_empty() {
        tokens.push(Token::new(TokenKind::Word(std::mem::take(word)), line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    #[test]
    fn splits_on_delimiters_and_whitespace() {
        let tokens = texts("clock {clockey valley;};\nobject house {name myhouse;};");
        assert_eq!(
            tokens,
            vec![
                "clock", "{", "clockey", "valley", ";", "}", ";", "object", "house", "{", "name",
                "myhouse", ";", "}", ";"
            ]
        );
    }

    #[test]
    fn strips_line_comments() {
        let tokens = texts("// header comment\nobject node { // trailing\n\tname n1; // x\n};");
        assert_eq!(tokens, vec!["object", "node", "{", "name", "n1", ";", "}", ";"]);
        assert!(!tokens.iter().any(|t| t.contains("comment") || t.contains("trailing")));
    }

    #[test]
    fn strips_comment_on_last_line_without_newline() {
        assert_eq!(texts("module tape; // no newline"), vec!["module", "tape", ";"]);
    }

    #[test]
    fn keeps_urls_intact() {
        let tokens = texts("#set stylesheet=http://gridlab-d.svn.sourceforge.net/viewvc/gridlab-d/trunk/core/gridlabd-2_0;\n");
        assert_eq!(
            tokens,
            vec![
                "#set",
                "stylesheet=http://gridlab-d.svn.sourceforge.net/viewvc/gridlab-d/trunk/core/gridlabd-2_0",
                ";"
            ]
        );
    }

    #[test]
    fn keeps_https_urls_but_strips_following_comment() {
        let tokens = texts("#set stylesheet=https://example.org/a.xsl; // style\n");
        assert_eq!(tokens, vec!["#set", "stylesheet=https://example.org/a.xsl", ";"]);
    }

    #[test]
    fn collapses_tabs_and_carriage_returns() {
        let tokens = texts("object\tload {\r\n\tphases\t\tABCN;\r\n};");
        assert_eq!(tokens, vec!["object", "load", "{", "phases", "ABCN", ";", "}", ";"]);
    }

    #[test]
    fn records_line_numbers() {
        let tokens = tokenize("clock {\n  timezone EST+5EDT;\n}\n");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens.last().map(|t| t.line), Some(3));
    }

    #[test]
    fn empty_and_blank_input_produce_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\t\r\n // only a comment\n").is_empty());
    }

    #[test]
    fn terminator_classification() {
        let tokens = tokenize("a;{}");
        let flags: Vec<bool> = tokens.iter().map(Token::is_terminator).collect();
        assert_eq!(flags, vec![false, true, true, true]);
    }
}
