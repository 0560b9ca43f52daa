//! Selection document parser.
//!
//! Accepts the subset of GraphQL executable syntax the live-data schema
//! needs: an optional `query` / `subscription` header with an optional
//! operation name, then nested selection sets with optional aliases.
//! Commas are insignificant and `#` starts a comment that runs to end of line.

#![allow(clippy::result_large_err)]

use crate::errors::{ExError, LiveDataError, Result};

const MAX_DEPTH: usize = 32;

/// Operation type of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Subscription,
}

impl OperationKind {
    /// Name of the root type this operation selects from
    pub fn root_type_name(&self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Subscription => "Subscription",
        }
    }
}

/// A single field selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub alias: Option<String>,
    pub name: String,
    /// Nested selections; empty for leaf fields
    pub selections: Vec<Selection>,
}

impl Selection {
    /// Key under which this field appears in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A parsed executable document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub operation: OperationKind,
    pub name: Option<String>,
    pub selections: Vec<Selection>,
}

impl Document {
    /// Check every selection against the live-data schema
    ///
    /// # Errors
    ///
    /// `UnknownField` for a field the parent type does not define,
    /// `InvalidDocument` for a missing or unexpected sub-selection.
    pub fn validate(&self) -> std::result::Result<(), ExError> {
        super::schema::validate(self).map_err(ExError::from)
    }
}

/// Parse a selection document
///
/// # Errors
///
/// `InvalidDocument` with the byte offset of the first syntax error.
pub fn parse_document(source: &str) -> std::result::Result<Document, ExError> {
    Parser::new(source).document().map_err(ExError::from)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn document(&mut self) -> Result<Document> {
        self.skip_ignored();
        let mut operation = OperationKind::Query;
        let mut name = None;

        if self.peek() != Some(b'{') {
            let start = self.pos;
            let keyword = self.name()?;
            operation = match keyword {
                "query" => OperationKind::Query,
                "subscription" => OperationKind::Subscription,
                "mutation" => return Err(self.error_at(start, "mutation operations are not supported")),
                other => {
                    return Err(self.error_at(start, &format!("unexpected name \"{other}\"")));
                }
            };
            self.skip_ignored();
            if self.peek().is_some_and(is_name_start) {
                name = Some(self.name()?.to_string());
                self.skip_ignored();
            }
            if self.peek() == Some(b'(') {
                return Err(self.error("variables are not supported"));
            }
        }

        let selections = self.selection_set()?;
        self.skip_ignored();
        if self.pos < self.src.len() {
            return Err(self.error("expected end of document"));
        }

        Ok(Document {
            operation,
            name,
            selections,
        })
    }

    fn selection_set(&mut self) -> Result<Vec<Selection>> {
        self.expect(b'{')?;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("selection nesting is too deep"));
        }

        let mut selections = Vec::new();
        loop {
            self.skip_ignored();
            match self.peek() {
                Some(b'}') => {
                    if selections.is_empty() {
                        return Err(self.error("expected a selection"));
                    }
                    self.pos += 1;
                    self.depth -= 1;
                    return Ok(selections);
                }
                Some(b'.') => return Err(self.error("fragments are not supported")),
                Some(_) => selections.push(self.selection()?),
                None => return Err(self.error("unterminated selection set")),
            }
        }
    }

    fn selection(&mut self) -> Result<Selection> {
        let first = self.name()?.to_string();
        self.skip_ignored();

        let (alias, name) = if self.peek() == Some(b':') {
            self.pos += 1;
            self.skip_ignored();
            (Some(first), self.name()?.to_string())
        } else {
            (None, first)
        };
        self.skip_ignored();

        match self.peek() {
            Some(b'(') => return Err(self.error("arguments are not supported")),
            Some(b'@') => return Err(self.error("directives are not supported")),
            _ => {}
        }

        let selections = if self.peek() == Some(b'{') {
            self.selection_set()?
        } else {
            Vec::new()
        };

        Ok(Selection {
            alias,
            name,
            selections,
        })
    }

    fn name(&mut self) -> Result<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if is_name_start(b) => self.pos += 1,
            Some(_) => return Err(self.error("expected a name")),
            None => return Err(self.error("unexpected end of document")),
        }
        while self.peek().is_some_and(is_name_continue) {
            self.pos += 1;
        }
        Ok(&self.src[start..self.pos])
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        self.skip_ignored();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn skip_ignored(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b',' => self.pos += 1,
                b'#' => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                _ => {
                    // Unicode BOM
                    if self.src[self.pos..].starts_with('\u{feff}') {
                        self.pos += '\u{feff}'.len_utf8();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn error(&self, reason: &str) -> LiveDataError {
        self.error_at(self.pos, reason)
    }

    fn error_at(&self, offset: usize, reason: &str) -> LiveDataError {
        LiveDataError::DocumentSyntax {
            offset,
            reason: reason.to_string(),
        }
    }
}

fn is_name_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_name_continue(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_parses_subscription_with_name_and_nesting() {
        let doc = parse_document(
            r#"
            # live view
            subscription Live {
              jedis { id, houses { address } }
            }
            "#,
        )
        .unwrap();
        assert_eq!(doc.operation, OperationKind::Subscription);
        assert_eq!(doc.name.as_deref(), Some("Live"));
        assert_eq!(doc.selections.len(), 1);
        let jedis = &doc.selections[0];
        assert_eq!(jedis.name, "jedis");
        assert_eq!(jedis.selections.len(), 2);
        assert_eq!(jedis.selections[1].selections[0].name, "address");
    }

    #[test]
    fn test_anonymous_shorthand_is_query() {
        let doc = parse_document("{ houses { id } }").unwrap();
        assert_eq!(doc.operation, OperationKind::Query);
        assert!(doc.name.is_none());
    }

    #[test]
    fn test_alias_sets_response_key() {
        let doc = parse_document("{ homes: houses { id } }").unwrap();
        let sel = &doc.selections[0];
        assert_eq!(sel.name, "houses");
        assert_eq!(sel.response_key(), "homes");
    }

    #[test]
    fn test_syntax_errors_report_offset() {
        let err = parse_document("{ houses { id }").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidDocument);
        assert!(err.message().contains("offset 15"), "{}", err.message());

        let err = parse_document("{ houses(first: 1) { id } }").unwrap_err();
        assert!(err.message().contains("arguments are not supported"));

        let err = parse_document("mutation { houses { id } }").unwrap_err();
        assert!(err.message().contains("mutation"));
    }

    #[test]
    fn test_empty_selection_set_is_rejected() {
        let err = parse_document("{ }").unwrap_err();
        assert!(err.message().contains("expected a selection"));
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        let err = parse_document("{ houses { id } } extra").unwrap_err();
        assert!(err.message().contains("expected end of document"));
    }

    #[test]
    fn test_depth_limit() {
        let source = format!("{}{}", "{ a ".repeat(MAX_DEPTH + 1), "}".repeat(MAX_DEPTH + 1));
        let err = parse_document(&source).unwrap_err();
        assert!(err.message().contains("too deep"));
    }
}
