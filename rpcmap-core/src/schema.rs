//! Interface-definition parsing.
//!
//! The catalog builder only needs three things out of a schema file: the
//! package, the services and their method names. [`SchemaParser`] is the
//! seam for that; [`ProtoParser`] is the bundled `.proto` reader. It works
//! on the token stream of the file and understands just enough of the
//! grammar (packages, service blocks, `rpc` declarations, nested option
//! blocks, comments and string literals) to pull those names out.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{IoResultExt, RpcmapError, RpcmapResult};

/// One declared RPC method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDecl {
    pub name: String,
}

/// One declared service and its methods, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDecl {
    pub name: String,
    pub methods: Vec<MethodDecl>,
}

/// The parsed shape of one schema file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaFile {
    /// Dotted package name, empty when the file declares none.
    pub package: String,
    pub services: Vec<ServiceDecl>,
}

impl SchemaFile {
    /// Total number of methods across all services.
    pub fn method_count(&self) -> usize {
        self.services.iter().map(|s| s.methods.len()).sum()
    }
}

/// Turns a schema file on disk into its package/service/method outline.
///
/// Implementations must be shareable across threads; a failure is reported
/// per file and the caller decides whether to skip it.
pub trait SchemaParser: Send + Sync {
    fn parse(&self, path: &Path) -> RpcmapResult<Vec<SchemaFile>>;
}

/// Bundled parser for protocol buffer `.proto` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtoParser;

impl SchemaParser for ProtoParser {
    fn parse(&self, path: &Path) -> RpcmapResult<Vec<SchemaFile>> {
        let content = fs::read_to_string(path).with_path(path)?;
        parse_proto(path, &content).map(|file| vec![file])
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

/// Splits proto source into identifiers, literals and single-char symbols,
/// dropping comments and whitespace.
fn lex_proto(content: &str) -> Vec<Token<'_>> {
    let bytes = content.as_bytes();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\n' => {
                line += 1;
                i += 1;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    if bytes[i] == b'\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'"' | b'\'' => {
                let start = i;
                let start_line = line;
                i += 1;
                while i < bytes.len() && bytes[i] != c {
                    if bytes[i] == b'\\' {
                        i += 1;
                    } else if bytes[i] == b'\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                tokens.push(Token {
                    text: &content[start..i],
                    line: start_line,
                });
            }
            c if c.is_ascii_whitespace() => i += 1,
            c if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
                {
                    i += 1;
                }
                tokens.push(Token {
                    text: &content[start..i],
                    line,
                });
            }
            _ => {
                // Multi-byte UTF-8 sequences only occur inside comments and
                // literals in valid proto files; step over the whole char.
                let len = content[i..].chars().next().map_or(1, char::len_utf8);
                tokens.push(Token {
                    text: &content[i..i + len],
                    line,
                });
                i += len;
            }
        }
    }

    tokens
}

fn is_identifier(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}

fn expect_name<'t>(
    tokens: &[Token<'t>],
    idx: usize,
    what: &str,
    path: &Path,
    line: usize,
) -> RpcmapResult<&'t str> {
    match tokens.get(idx) {
        Some(t) if is_identifier(t.text) => Ok(t.text),
        _ => Err(RpcmapError::schema_at(
            path,
            format!("expected {} name", what),
            line,
        )),
    }
}

#[derive(Debug, Clone, Copy)]
enum Block {
    /// Index into the services vector.
    Service(usize),
    Other,
}

/// Parses the text of a `.proto` file.
///
/// `path` is only used for error reporting.
pub fn parse_proto(path: &Path, content: &str) -> RpcmapResult<SchemaFile> {
    let tokens = lex_proto(content);
    let mut file = SchemaFile::default();
    let mut stack: Vec<(Block, usize)> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let tok = &tokens[i];
        match (tok.text, stack.last()) {
            ("package", None) => {
                file.package = expect_name(&tokens, i + 1, "package", path, tok.line)?.to_string();
                i += 2;
            }
            ("service", None) => {
                let name = expect_name(&tokens, i + 1, "service", path, tok.line)?;
                if tokens.get(i + 2).map(|t| t.text) != Some("{") {
                    return Err(RpcmapError::schema_at(
                        path,
                        format!("expected '{{' after service {}", name),
                        tok.line,
                    ));
                }
                file.services.push(ServiceDecl {
                    name: name.to_string(),
                    methods: Vec::new(),
                });
                stack.push((Block::Service(file.services.len() - 1), tok.line));
                i += 3;
            }
            ("rpc", Some(&(Block::Service(idx), _))) => {
                let name = expect_name(&tokens, i + 1, "rpc", path, tok.line)?;
                if tokens.get(i + 2).map(|t| t.text) != Some("(") {
                    return Err(RpcmapError::schema_at(
                        path,
                        format!("expected '(' after rpc {}", name),
                        tok.line,
                    ));
                }
                file.services[idx].methods.push(MethodDecl {
                    name: name.to_string(),
                });
                i += 2;
            }
            ("{", _) => {
                stack.push((Block::Other, tok.line));
                i += 1;
            }
            ("}", _) => {
                if stack.pop().is_none() {
                    return Err(RpcmapError::schema_at(path, "unexpected '}'", tok.line));
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    if let Some((_, line)) = stack.last() {
        return Err(RpcmapError::schema_at(path, "unclosed block", *line));
    }

    Ok(file)
}
