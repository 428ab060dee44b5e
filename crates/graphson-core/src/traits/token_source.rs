//! Pull-based token cursor trait.
//!
//! The importer never sees raw bytes; it walks a [`TokenSource`] and detaches one record at a
//! time with [`TokenSource::read_subtree_as_node`].

use crate::error::{GraphsonError, GraphsonResult};

/// A detached, recursively inspectable value.
pub type Node = serde_json::Value;

/// Structural and scalar tokens of a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    FieldName,
    String,
    Number,
    True,
    False,
    Null,
}

impl Token {
    /// Whether this token is a complete scalar value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Token::String | Token::Number | Token::True | Token::False | Token::Null
        )
    }
}

/// The payload of a scalar token.
#[derive(Debug, Clone, PartialEq)]
pub enum RawScalar {
    String(String),
    /// Numbers keep their exact literal so range checks happen in the decoder.
    Number(serde_json::Number),
    Boolean(bool),
    Null,
}

impl From<RawScalar> for Node {
    fn from(scalar: RawScalar) -> Self {
        match scalar {
            RawScalar::String(s) => Node::String(s),
            RawScalar::Number(n) => Node::Number(n),
            RawScalar::Boolean(b) => Node::Bool(b),
            RawScalar::Null => Node::Null,
        }
    }
}

/// A pull cursor over a token stream.
pub trait TokenSource {
    /// Advance to the next token. `None` means the input ended after a complete document.
    fn next_token(&mut self) -> GraphsonResult<Option<Token>>;

    /// The token the cursor is positioned on.
    fn current_token(&self) -> Option<Token>;

    /// The field name of the current `FieldName` token, or of the value token that follows it.
    fn current_field_name(&self) -> Option<&str>;

    /// The payload of the current scalar token.
    fn read_scalar(&mut self) -> GraphsonResult<RawScalar>;

    /// Detach the value starting at the current token, leaving the cursor on its last token.
    fn read_subtree_as_node(&mut self) -> GraphsonResult<Node> {
        match self.current_token() {
            Some(Token::StartObject) => {
                let mut map = serde_json::Map::new();
                loop {
                    match self.next_token()? {
                        Some(Token::EndObject) => break,
                        Some(Token::FieldName) => {
                            let key = self
                                .current_field_name()
                                .map(str::to_string)
                                .ok_or_else(|| GraphsonError::malformed("field name missing"))?;
                            self.next_token()?
                                .ok_or_else(|| GraphsonError::malformed("value missing"))?;
                            let value = self.read_subtree_as_node()?;
                            map.insert(key, value);
                        }
                        Some(other) => {
                            return Err(GraphsonError::malformed(format!(
                                "expected field name, found {:?}",
                                other
                            )))
                        }
                        None => return Err(GraphsonError::malformed("unterminated object")),
                    }
                }
                Ok(Node::Object(map))
            }
            Some(Token::StartArray) => {
                let mut items = Vec::new();
                loop {
                    match self.next_token()? {
                        Some(Token::EndArray) => break,
                        Some(_) => items.push(self.read_subtree_as_node()?),
                        None => return Err(GraphsonError::malformed("unterminated array")),
                    }
                }
                Ok(Node::Array(items))
            }
            Some(token) if token.is_scalar() => Ok(self.read_scalar()?.into()),
            other => Err(GraphsonError::malformed(format!(
                "expected a value, found {:?}",
                other
            ))),
        }
    }

    /// Skip the value starting at the current token without building it.
    fn skip_children(&mut self) -> GraphsonResult<()> {
        match self.current_token() {
            Some(Token::StartObject) | Some(Token::StartArray) => {
                let mut depth = 1usize;
                while depth > 0 {
                    match self.next_token()? {
                        Some(Token::StartObject) | Some(Token::StartArray) => depth += 1,
                        Some(Token::EndObject) | Some(Token::EndArray) => depth -= 1,
                        Some(_) => {}
                        None => return Err(GraphsonError::malformed("unterminated container")),
                    }
                }
                Ok(())
            }
            Some(token) if token.is_scalar() => Ok(()),
            other => Err(GraphsonError::malformed(format!(
                "expected a value, found {:?}",
                other
            ))),
        }
    }
}
