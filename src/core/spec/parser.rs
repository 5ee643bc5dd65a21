//! Spec text parser.
//!
//! ```text
//! spec     := node ( '^' node )*
//! node     := NAME [ '@' versions ] variant* [ '%' NAME [ '@' versions ] ] [ '=' ARCH ]
//! variant  := '+' NAME | '~' NAME | NAME '=' VALUE
//! versions := ID ( ':' | ',' | ID )*
//! ```
//!
//! Whitespace separates tokens and ends a version list, so a valued
//! variant after a version needs a space: `mfem@3.0.1 blas=atlas`.
//! Every `^` dependency is attached to the root; normalization moves it to
//! its real place in the DAG.

use crate::core::compiler::CompilerSpec;
use crate::core::error::{ParseError, SpecResult};
use crate::core::registry::valid_package_name;
use crate::core::spec::{Spec, SpecNode};
use crate::core::variant::VariantValue;
use crate::core::version::VersionConstraint;

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    At,
    Plus,
    Tilde,
    Percent,
    Eq,
    Caret,
    Colon,
    Comma,
    Id,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
    /// Whitespace precedes the token.
    spaced: bool,
}

fn is_id_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_id_char(c: char) -> bool {
    is_id_start(c) || c == '.' || c == '-'
}

fn lex(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut spaced = false;

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            spaced = true;
            continue;
        }

        let kind = match c {
            '@' => TokenKind::At,
            '+' => TokenKind::Plus,
            '~' => TokenKind::Tilde,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Eq,
            '^' => TokenKind::Caret,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            c if is_id_start(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, d)) = chars.peek() {
                    if !is_id_char(d) {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Id,
                    start,
                    end,
                    spaced,
                });
                spaced = false;
                continue;
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character `{}`", other),
                    text,
                    start,
                    other.len_utf8(),
                ));
            }
        };

        tokens.push(Token {
            kind,
            start,
            end: start + c.len_utf8(),
            spaced,
        });
        spaced = false;
    }

    Ok(tokens)
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Result<Self, ParseError> {
        Ok(Parser {
            text,
            tokens: lex(text)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind(0) == Some(&kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn slice(&self, token: &Token) -> &'a str {
        &self.text[token.start..token.end]
    }

    fn error_at(&self, token: Option<&Token>, message: impl Into<String>) -> ParseError {
        match token {
            Some(t) => ParseError::new(message, self.text, t.start, t.end - t.start),
            None => ParseError::new(message, self.text, self.text.len(), 0),
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(t) => self.error_at(Some(t), format!("unexpected `{}`", self.slice(t))),
            None => self.error_at(None, "unexpected end of input"),
        }
    }

    fn expect_id(&mut self, what: &str) -> Result<(Token, &'a str), ParseError> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Id => {
                let t = t.clone();
                self.pos += 1;
                let s = self.slice(&t);
                Ok((t, s))
            }
            Some(t) => Err(self.error_at(
                Some(t),
                format!("expected {}, found `{}`", what, self.slice(t)),
            )),
            None => Err(self.error_at(None, format!("expected {}, found end of input", what))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_name(&mut self, what: &str) -> Result<String, ParseError> {
        let (token, name) = self.expect_id(what)?;
        if !valid_package_name(name) {
            return Err(self.error_at(Some(&token), format!("invalid package name `{}`", name)));
        }
        Ok(name.to_string())
    }

    /// Versions run until whitespace or a token that cannot be part of a list.
    fn parse_versions(&mut self) -> Result<VersionConstraint, ParseError> {
        let first = match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Id | TokenKind::Colon) => t.clone(),
            _ => return Err(self.unexpected_or("expected a version")),
        };

        let mut last = first.clone();
        self.pos += 1;
        while let Some(t) = self.peek() {
            let continues = !t.spaced
                && matches!(t.kind, TokenKind::Id | TokenKind::Colon | TokenKind::Comma);
            if !continues {
                break;
            }
            last = t.clone();
            self.pos += 1;
        }

        let text = &self.text[first.start..last.end];
        VersionConstraint::parse(text).map_err(|e| {
            ParseError::new(e.to_string(), self.text, first.start, last.end - first.start)
        })
    }

    fn unexpected_or(&self, message: &str) -> ParseError {
        match self.peek() {
            Some(t) => self.error_at(Some(t), format!("{}, found `{}`", message, self.slice(t))),
            None => self.error_at(None, format!("{}, found end of input", message)),
        }
    }

    fn parse_node(&mut self) -> Result<SpecNode, ParseError> {
        let mut node = SpecNode::new(self.parse_name("a package name")?);
        let mut seen_versions = false;

        loop {
            let Some(token) = self.peek().cloned() else {
                break;
            };
            match token.kind {
                TokenKind::At => {
                    if seen_versions {
                        return Err(self.error_at(Some(&token), "version specified twice"));
                    }
                    self.pos += 1;
                    node.versions = self.parse_versions()?;
                    seen_versions = true;
                }
                TokenKind::Plus | TokenKind::Tilde => {
                    self.pos += 1;
                    let (t, name) = self.expect_id("a variant name")?;
                    let value = VariantValue::Bool(token.kind == TokenKind::Plus);
                    if node.variants.insert(name, value).is_some() {
                        return Err(self.error_at(Some(&t), format!("variant `{}` specified twice", name)));
                    }
                }
                TokenKind::Id if self.peek_kind(1) == Some(&TokenKind::Eq) => {
                    self.pos += 2;
                    let name = self.slice(&token);
                    let (_, value) = self.expect_id("a variant value")?;
                    if node.variants.insert(name, VariantValue::Value(value.to_string())).is_some() {
                        return Err(self.error_at(Some(&token), format!("variant `{}` specified twice", name)));
                    }
                }
                TokenKind::Percent => {
                    if node.compiler.is_some() {
                        return Err(self.error_at(Some(&token), "compiler specified twice"));
                    }
                    self.pos += 1;
                    let name = self.parse_name("a compiler name")?;
                    let versions = if self.eat(TokenKind::At) {
                        self.parse_versions()?
                    } else {
                        VersionConstraint::any()
                    };
                    node.compiler = Some(CompilerSpec::new(name, versions));
                }
                TokenKind::Eq => {
                    if node.architecture.is_some() {
                        return Err(self.error_at(Some(&token), "architecture specified twice"));
                    }
                    self.pos += 1;
                    let (_, arch) = self.expect_id("an architecture")?;
                    node.architecture = Some(arch.to_string());
                }
                _ => break,
            }
        }

        Ok(node)
    }
}

/// Parse a full spec: a root node followed by `^` dependencies.
pub fn parse(text: &str) -> SpecResult<Spec> {
    let mut parser = Parser::new(text)?;
    if parser.at_end() {
        return Err(parser.error_at(None, "empty spec").into());
    }

    let root = parser.parse_node()?;
    let root_name = root.name.clone();
    let mut spec = Spec::from_node(root);

    while let Some(caret) = parser.peek().cloned() {
        if caret.kind != TokenKind::Caret {
            return Err(parser.unexpected().into());
        }
        parser.pos += 1;
        let dep = parser.parse_node()?;
        if spec.contains(&dep.name) {
            let message = if dep.name == root_name {
                format!("`{}` cannot depend on itself", dep.name)
            } else {
                format!("dependency `{}` specified twice", dep.name)
            };
            return Err(parser.error_at(Some(&caret), message).into());
        }
        spec.add_dependency(&root_name, dep)?;
    }

    Ok(spec)
}

/// Parse a single node with no `^` dependencies, as found on one line of a
/// tree rendering.
pub fn parse_node(text: &str) -> SpecResult<SpecNode> {
    let mut parser = Parser::new(text)?;
    let node = parser.parse_node()?;
    if !parser.at_end() {
        return Err(parser.unexpected().into());
    }
    Ok(node)
}
