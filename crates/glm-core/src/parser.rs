//! GLM tree builder
//!
//! Consumes the token stream left to right, one statement run at a time. A
//! run is every token up to and including the next `;`, `{` or `}`; the
//! terminator decides what the run means:
//!
//! - `;` at top level: a directive leaf (`#include`, `#set`, `module tape`, ...).
//!   Inside a block: an attribute, first word is the key, the rest the value.
//! - `{`: opens a new block. One or two header words name the block type
//!   (`clock`, `object house`, `module powerflow`); three or more words form
//!   an embedded configuration header. `schedule` and `class` bodies are not
//!   key/value lists and are captured verbatim up to their matching `}`.
//! - `}`: any words before it become one last attribute, then the block closes.
//!
//! Open blocks live on an explicit stack rather than the call stack, so
//! nesting depth is bounded only by memory. Structural problems (a stray
//! `}`, a block never closed, a trailing statement without terminator) abort
//! the parse; no partial tree is returned.

use tracing::debug;

use crate::error::{GlmError, GlmResult};
use crate::token::{tokenize, Token, TokenKind};
use crate::tree::{GlmTree, Leaf, LeafId, LeafKind};

/// Tokenize and parse GLM text into a tree.
pub fn parse(text: &str) -> GlmResult<GlmTree> {
    parse_tokens(tokenize(text))
}

/// Parse an already tokenized GLM stream.
pub fn parse_tokens(tokens: Vec<Token>) -> GlmResult<GlmTree> {
    let mut builder = TreeBuilder::default();
    let mut tokens = tokens.into_iter();
    let mut run: Vec<Token> = Vec::new();

    while let Some(token) = tokens.next() {
        let terminator = token.is_terminator();
        run.push(token);
        if terminator {
            let statement = std::mem::take(&mut run);
            builder.accept(statement, &mut tokens)?;
        }
    }

    if let Some(first) = run.first() {
        return Err(GlmError::UnterminatedStatement {
            statement: join_words(&run),
            line: first.line,
        });
    }

    let tree = builder.finish()?;
    debug!(leaves = tree.len(), "parsed GLM tree");
    Ok(tree)
}

struct OpenBlock {
    leaf: Leaf,
    header: String,
    line: usize,
}

#[derive(Default)]
struct TreeBuilder {
    top: Vec<Leaf>,
    stack: Vec<OpenBlock>,
    next_id: usize,
}

impl TreeBuilder {
    fn alloc(&mut self) -> LeafId {
        let id = LeafId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn accept(
        &mut self,
        mut run: Vec<Token>,
        rest: &mut impl Iterator<Item = Token>,
    ) -> GlmResult<()> {
        let Some(terminator) = run.pop() else {
            return Ok(());
        };
        match terminator.kind {
            TokenKind::Semicolon => {
                self.statement(&run);
                Ok(())
            }
            TokenKind::OpenBrace => self.open(&run, terminator.line, rest),
            TokenKind::CloseBrace => self.close(&run, terminator.line),
            TokenKind::Word(_) => Ok(()),
        }
    }

    fn statement(&mut self, words: &[Token]) {
        let Some((first, rest)) = words.split_first() else {
            // A bare ';', typically the one after a closing brace.
            return;
        };
        if self.stack.is_empty() {
            let id = self.alloc();
            self.top.push(Leaf::new(
                id,
                LeafKind::Directive {
                    keyword: first.as_str().to_string(),
                    argument: join_words(rest),
                },
            ));
        } else if let Some(open) = self.stack.last_mut() {
            open.leaf.set_attr(first.as_str(), join_words(rest));
        }
    }

    fn open(
        &mut self,
        words: &[Token],
        brace_line: usize,
        rest: &mut impl Iterator<Item = Token>,
    ) -> GlmResult<()> {
        let id = self.alloc();
        let line = words.first().map_or(brace_line, |t| t.line);
        let header = join_words(words);

        let raw_block = match words {
            [keyword, name, ..] if keyword.as_str() == "schedule" || keyword.as_str() == "class" => {
                Some((keyword.as_str(), name.as_str().to_string()))
            }
            _ => None,
        };
        if let Some((keyword, name)) = raw_block {
            let body = read_raw_body(rest, &header, line)?;
            let kind = if keyword == "schedule" {
                LeafKind::Schedule { name, body }
            } else {
                LeafKind::Class { name, body }
            };
            self.attach(Leaf::new(id, kind));
            return Ok(());
        }

        let kind = match words {
            [] => LeafKind::Anonymous,
            [keyword] => LeafKind::from_header(keyword.as_str(), keyword.as_str()),
            [keyword, value] => LeafKind::from_header(keyword.as_str(), value.as_str()),
            _ => LeafKind::EmbeddedConfig {
                header: header.clone(),
            },
        };
        self.stack.push(OpenBlock {
            leaf: Leaf::new(id, kind),
            header,
            line,
        });
        Ok(())
    }

    fn close(&mut self, words: &[Token], line: usize) -> GlmResult<()> {
        let Some(mut open) = self.stack.pop() else {
            return Err(GlmError::UnexpectedCloseBrace { line });
        };
        if let Some((first, rest)) = words.split_first() {
            open.leaf.set_attr(first.as_str(), join_words(rest));
        }
        self.attach(open.leaf);
        Ok(())
    }

    fn attach(&mut self, leaf: Leaf) {
        match self.stack.last_mut() {
            Some(parent) => parent.leaf.push_child(leaf),
            None => self.top.push(leaf),
        }
    }

    fn finish(self) -> GlmResult<GlmTree> {
        if let Some(open) = self.stack.last() {
            return Err(GlmError::UnclosedBlock {
                header: open.header.clone(),
                line: open.line,
            });
        }
        Ok(GlmTree::from_parts(self.top, self.next_id))
    }
}

/// Consume tokens up to the `}` matching an already consumed `{` and render
/// them as text, one statement per line.
fn read_raw_body(
    rest: &mut impl Iterator<Item = Token>,
    header: &str,
    line: usize,
) -> GlmResult<String> {
    let mut depth = 1usize;
    let mut body = Vec::new();
    for token in rest.by_ref() {
        match token.kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => {
                depth -= 1;
                if depth == 0 {
                    return Ok(render_raw(&body));
                }
            }
            _ => {}
        }
        body.push(token);
    }
    Err(GlmError::UnclosedBlock {
        header: header.to_string(),
        line,
    })
}

fn render_raw(tokens: &[Token]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for token in tokens {
        match &token.kind {
            TokenKind::Word(word) => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            TokenKind::Semicolon => {
                current.push(';');
                lines.push(std::mem::take(&mut current));
            }
            TokenKind::OpenBrace => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push('{');
                lines.push(std::mem::take(&mut current));
            }
            TokenKind::CloseBrace => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                lines.push("}".to_string());
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

fn join_words(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
