//! Typed value decoding.
//!
//! With embedded types every property value is an object `{"type": <tag>, "value": <raw>}` and
//! the tag decides the decoded variant. Without them the variant is inferred from the JSON kind:
//! integer literals become `Integer`, literals with a fraction or exponent become `Float`.
//!
//! Reserved keys (`_id`, `_outV`, `_inV`) are always inferred.

use std::collections::BTreeMap;
use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{GraphsonError, GraphsonResult, RecordKind};
use crate::tokens;
use crate::traits::Node;
use crate::types::{EdgeRecord, ElementRecord, Value, VertexRecord};

/// Type tags accepted in embedded-types documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TypeTag {
    String,
    #[strum(to_string = "long", serialize = "int", serialize = "integer")]
    Long,
    #[strum(to_string = "double", serialize = "float")]
    Double,
    Boolean,
    List,
    Map,
    Null,
}

/// Decodes nodes into values and records under one `embeddedTypes` setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueDecoder {
    embedded_types: bool,
}

impl ValueDecoder {
    pub fn new(embedded_types: bool) -> Self {
        Self { embedded_types }
    }

    pub fn embedded_types(&self) -> bool {
        self.embedded_types
    }

    /// Decode one property value.
    pub fn decode(&self, node: &Node) -> GraphsonResult<Value> {
        if self.embedded_types {
            decode_typed(node)
        } else {
            infer_value(node)
        }
    }

    /// Decode a record node read from the array of the given kind.
    pub fn decode_record(&self, kind: RecordKind, node: &Node) -> GraphsonResult<ElementRecord> {
        match kind {
            RecordKind::Vertex => self.decode_vertex(node).map(ElementRecord::Vertex),
            RecordKind::Edge => self.decode_edge(node).map(ElementRecord::Edge),
        }
    }

    pub fn decode_vertex(&self, node: &Node) -> GraphsonResult<VertexRecord> {
        let fields = record_fields(node)?;
        Ok(VertexRecord {
            id: infer_value(required(fields, tokens::_ID)?)?,
            properties: self.decode_properties(fields, &tokens::VERTEX_RESERVED)?,
        })
    }

    pub fn decode_edge(&self, node: &Node) -> GraphsonResult<EdgeRecord> {
        let fields = record_fields(node)?;
        let label = match required(fields, tokens::_LABEL)? {
            Node::String(label) => label.clone(),
            other => {
                return Err(GraphsonError::type_mismatch(format!(
                    "edge label must be a string, found {}",
                    describe(other)
                )))
            }
        };
        Ok(EdgeRecord {
            id: infer_value(required(fields, tokens::_ID)?)?,
            out_vertex_id: infer_value(required(fields, tokens::_OUT_V)?)?,
            in_vertex_id: infer_value(required(fields, tokens::_IN_V)?)?,
            label,
            properties: self.decode_properties(fields, &tokens::EDGE_RESERVED)?,
        })
    }

    fn decode_properties(
        &self,
        fields: &serde_json::Map<String, Node>,
        reserved: &[&str],
    ) -> GraphsonResult<BTreeMap<String, Value>> {
        fields
            .iter()
            .filter(|(key, _)| !reserved.contains(&key.as_str()))
            .map(|(key, node)| self.decode(node).map(|value| (key.clone(), value)))
            .collect()
    }
}

fn record_fields(node: &Node) -> GraphsonResult<&serde_json::Map<String, Node>> {
    node.as_object().ok_or_else(|| {
        GraphsonError::type_mismatch(format!(
            "record must be an object, found {}",
            describe(node)
        ))
    })
}

fn required<'a>(fields: &'a serde_json::Map<String, Node>, key: &str) -> GraphsonResult<&'a Node> {
    fields.get(key).ok_or_else(|| GraphsonError::missing_field(key))
}

fn describe(node: &Node) -> &'static str {
    match node {
        Node::Null => "null",
        Node::Bool(_) => "boolean",
        Node::Number(_) => "number",
        Node::String(_) => "string",
        Node::Array(_) => "array",
        Node::Object(_) => "object",
    }
}

/// Decode a node by inferring its type from the JSON kind.
pub fn infer_value(node: &Node) -> GraphsonResult<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Boolean(*b),
        Node::String(s) => Value::String(s.clone()),
        Node::Number(n) => infer_number(n)?,
        Node::Array(items) => Value::List(items.iter().map(infer_value).collect::<Result<_, _>>()?),
        Node::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| infer_value(v).map(|value| (k.clone(), value)))
                .collect::<GraphsonResult<_>>()?,
        ),
    })
}

fn infer_number(n: &serde_json::Number) -> GraphsonResult<Value> {
    let literal = n.to_string();
    if is_fractional(&literal) {
        parse_float(&literal).map(Value::Float)
    } else {
        parse_integer(&literal).map(Value::Integer)
    }
}

fn is_fractional(literal: &str) -> bool {
    literal.contains(|c: char| matches!(c, '.' | 'e' | 'E'))
}

fn parse_integer(literal: &str) -> GraphsonResult<i64> {
    literal.parse::<i64>().map_err(|_| {
        let digits = literal.strip_prefix('-').unwrap_or(literal);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            GraphsonError::NumericOverflow {
                literal: literal.to_string(),
            }
        } else {
            GraphsonError::type_mismatch(format!("'{}' is not an integer", literal))
        }
    })
}

/// Floats must be finite: non-finite values have no JSON form and would collide as ids.
fn parse_float(literal: &str) -> GraphsonResult<f64> {
    let value = literal
        .parse::<f64>()
        .map_err(|_| GraphsonError::type_mismatch(format!("'{}' is not a number", literal)))?;
    if value.is_finite() {
        Ok(value)
    } else if is_numeric_literal(literal) {
        Err(GraphsonError::NumericOverflow {
            literal: literal.to_string(),
        })
    } else {
        Err(GraphsonError::type_mismatch(format!(
            "'{}' is not a finite number",
            literal
        )))
    }
}

fn is_numeric_literal(literal: &str) -> bool {
    let body = literal.strip_prefix('-').unwrap_or(literal);
    body.starts_with(|c: char| c.is_ascii_digit())
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}

/// Decode a `{"type": ..., "value": ...}` node.
pub fn decode_typed(node: &Node) -> GraphsonResult<Value> {
    let fields = node.as_object().ok_or_else(|| {
        GraphsonError::type_mismatch(format!(
            "expected a typed value object, found {}",
            describe(node)
        ))
    })?;
    let tag_name = match required(fields, tokens::TYPE)? {
        Node::String(name) => name,
        other => {
            return Err(GraphsonError::type_mismatch(format!(
                "type tag must be a string, found {}",
                describe(other)
            )))
        }
    };
    let tag = TypeTag::from_str(tag_name).map_err(|_| GraphsonError::UnknownTypeTag {
        tag: tag_name.clone(),
    })?;

    let raw = match fields.get(tokens::VALUE) {
        None if tag == TypeTag::Null => return Ok(Value::Null),
        None => return Err(GraphsonError::missing_field(tokens::VALUE)),
        Some(Node::Null) => return Ok(Value::Null),
        Some(raw) => raw,
    };

    match tag {
        TypeTag::String => match raw {
            Node::String(s) => Ok(Value::String(s.clone())),
            Node::Number(n) => Ok(Value::String(n.to_string())),
            Node::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Long => match raw {
            Node::Number(n) => {
                let literal = n.to_string();
                if is_fractional(&literal) {
                    return Err(GraphsonError::type_mismatch(format!(
                        "'{}' is not an integer",
                        literal
                    )));
                }
                parse_integer(&literal).map(Value::Integer)
            }
            Node::String(s) => parse_integer(s.trim()).map(Value::Integer),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Double => match raw {
            Node::Number(n) => parse_float(&n.to_string()).map(Value::Float),
            Node::String(s) => parse_float(s.trim()).map(Value::Float),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Boolean => match raw {
            Node::Bool(b) => Ok(Value::Boolean(*b)),
            Node::String(s) if s == "true" => Ok(Value::Boolean(true)),
            Node::String(s) if s == "false" => Ok(Value::Boolean(false)),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::List => match raw {
            Node::Array(items) => Ok(Value::List(
                items.iter().map(decode_typed).collect::<Result<_, _>>()?,
            )),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Map => match raw {
            Node::Object(entries) => Ok(Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| decode_typed(v).map(|value| (k.clone(), value)))
                    .collect::<GraphsonResult<_>>()?,
            )),
            other => Err(mismatch(tag, other)),
        },
        TypeTag::Null => Ok(Value::Null),
    }
}

fn mismatch(tag: TypeTag, node: &Node) -> GraphsonError {
    GraphsonError::type_mismatch(format!(
        "value tagged '{}' can not be a {}",
        tag,
        describe(node)
    ))
}
