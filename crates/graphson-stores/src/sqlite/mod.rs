//! Persistent graph store on SQLite.
//!
//! Mutations run inside a transaction that is opened lazily by the first write after a commit.
//! `commit()` makes the batch durable and `rollback()` discards it; dropping the store with a
//! transaction still open discards it as well, so an import that fails midway leaves exactly the
//! batches that were committed before the failure.

pub mod schema;

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection, ErrorCode as SqliteErrorCode, OptionalExtension};
use tracing::debug;

use graphson_core::error::{GraphsonError, GraphsonResult};
use graphson_core::import::decode_typed;
use graphson_core::traits::{validate_property_key, ElementRef, GraphStore, Node};
use graphson_core::types::Value;

/// An edge read back from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEdge {
    pub id: Value,
    pub out_vertex_id: Value,
    pub in_vertex_id: Value,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

/// Transactional destination store backed by SQLite.
#[derive(Debug)]
pub struct SqliteGraph {
    conn: Connection,
    commit_count: u64,
}

impl SqliteGraph {
    /// Open (or create) a database file.
    pub fn open(db_path: impl AsRef<Path>) -> GraphsonResult<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(sql("failed to open database"))?;
        Self::from_connection(conn)
    }

    /// Create a store in a private in-memory database.
    pub fn in_memory() -> GraphsonResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql("failed to open database"))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> GraphsonResult<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn,
            commit_count: 0,
        })
    }

    /// Commits issued through [`GraphStore::commit`].
    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Whether uncommitted mutations are pending.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub fn vertex_count(&self) -> GraphsonResult<u64> {
        self.count("SELECT COUNT(*) FROM vertices")
    }

    pub fn edge_count(&self) -> GraphsonResult<u64> {
        self.count("SELECT COUNT(*) FROM edges")
    }

    /// All vertex ids in insertion order.
    pub fn vertex_ids(&self) -> GraphsonResult<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT element_id FROM vertices ORDER BY id")
            .map_err(sql("failed to list vertices"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(sql("failed to list vertices"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql("failed to list vertices"))?;
        rows.iter().map(|text| decode_stored(text)).collect()
    }

    /// Properties of a vertex, or `None` when no vertex has this id.
    pub fn vertex_properties(&self, id: &Value) -> GraphsonResult<Option<BTreeMap<String, Value>>> {
        match self.row_id("SELECT id FROM vertices WHERE element_id = ?1", id)? {
            Some(row_id) => self
                .properties("SELECT key, value FROM vertex_properties WHERE vertex_id = ?1", row_id)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Read an edge with its endpoints and properties.
    pub fn edge(&self, id: &Value) -> GraphsonResult<Option<StoredEdge>> {
        let row = self
            .conn
            .query_row(
                "SELECT e.id, o.element_id, i.element_id, e.label
                 FROM edges e
                 JOIN vertices o ON o.id = e.source_id
                 JOIN vertices i ON i.id = e.target_id
                 WHERE e.element_id = ?1",
                params![id.canonical_key()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(sql("failed to read edge"))?;

        let Some((row_id, out_id, in_id, label)) = row else {
            return Ok(None);
        };
        Ok(Some(StoredEdge {
            id: id.clone(),
            out_vertex_id: decode_stored(&out_id)?,
            in_vertex_id: decode_stored(&in_id)?,
            label,
            properties: self
                .properties("SELECT key, value FROM edge_properties WHERE edge_id = ?1", row_id)?,
        }))
    }

    fn count(&self, query: &str) -> GraphsonResult<u64> {
        let n: i64 = self
            .conn
            .query_row(query, [], |row| row.get(0))
            .map_err(sql("failed to count rows"))?;
        Ok(n as u64)
    }

    fn row_id(&self, query: &str, id: &Value) -> GraphsonResult<Option<i64>> {
        self.conn
            .query_row(query, params![id.canonical_key()], |row| row.get(0))
            .optional()
            .map_err(sql("failed to look up element"))
    }

    fn properties(&self, query: &str, row_id: i64) -> GraphsonResult<BTreeMap<String, Value>> {
        let mut stmt = self.conn.prepare(query).map_err(sql("failed to read properties"))?;
        let rows = stmt
            .query_map(params![row_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(sql("failed to read properties"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql("failed to read properties"))?;

        rows.into_iter()
            .map(|(key, text)| decode_stored(&text).map(|value| (key, value)))
            .collect()
    }

    fn begin(&mut self) -> GraphsonResult<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN")
                .map_err(sql("failed to begin transaction"))?;
            debug!("began transaction");
        }
        Ok(())
    }
}

impl GraphStore for SqliteGraph {
    type Vertex = i64;
    type Edge = i64;

    fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<i64>> {
        self.row_id("SELECT id FROM vertices WHERE element_id = ?1", id)
    }

    fn create_vertex(&mut self, id: &Value) -> GraphsonResult<i64> {
        if let Some(row_id) = self.lookup_vertex(id)? {
            return Ok(row_id);
        }
        self.begin()?;
        self.conn
            .execute(
                "INSERT INTO vertices (element_id) VALUES (?1)",
                params![id.canonical_key()],
            )
            .map_err(sql("failed to insert vertex"))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn create_edge(
        &mut self,
        id: &Value,
        out_vertex: &i64,
        in_vertex: &i64,
        label: &str,
    ) -> GraphsonResult<i64> {
        self.begin()?;
        self.conn
            .execute(
                "INSERT INTO edges (element_id, source_id, target_id, label) VALUES (?1, ?2, ?3, ?4)",
                params![id.canonical_key(), out_vertex, in_vertex, label],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(SqliteErrorCode::ConstraintViolation) if self.edge_exists(id) => {
                    GraphsonError::DuplicateEdgeId {
                        edge_id: id.to_string(),
                    }
                }
                _ => GraphsonError::store_with_source(format!("failed to insert edge: {}", e), e),
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    fn set_property(
        &mut self,
        element: ElementRef<'_, i64, i64>,
        key: &str,
        value: &Value,
    ) -> GraphsonResult<()> {
        validate_property_key(key)?;
        let (query, row_id) = match element {
            ElementRef::Vertex(&row_id) => (
                "INSERT INTO vertex_properties (vertex_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(vertex_id, key) DO UPDATE SET value = excluded.value",
                row_id,
            ),
            ElementRef::Edge(&row_id) => (
                "INSERT INTO edge_properties (edge_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(edge_id, key) DO UPDATE SET value = excluded.value",
                row_id,
            ),
        };
        self.begin()?;
        self.conn
            .execute(query, params![row_id, key, value.canonical_key()])
            .map_err(|e| GraphsonError::PropertyWriteRejected {
                key: key.to_string(),
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    fn commit(&mut self) -> GraphsonResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT").map_err(|e| GraphsonError::StoreCommitFailed {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
            debug!(commit = self.commit_count + 1, "committed transaction");
        }
        self.commit_count += 1;
        Ok(())
    }

    fn rollback(&mut self) -> GraphsonResult<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(sql("failed to roll back transaction"))?;
            debug!("rolled back transaction");
        }
        Ok(())
    }

    fn supports_transactions(&self) -> bool {
        true
    }
}

impl SqliteGraph {
    fn edge_exists(&self, id: &Value) -> bool {
        matches!(
            self.row_id("SELECT id FROM edges WHERE element_id = ?1", id),
            Ok(Some(_))
        )
    }
}

fn sql(context: &'static str) -> impl Fn(rusqlite::Error) -> GraphsonError {
    move |e| GraphsonError::store_with_source(format!("{}: {}", context, e), e)
}

fn decode_stored(text: &str) -> GraphsonResult<Value> {
    let node: Node = serde_json::from_str(text)?;
    decode_typed(&node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_round_trip() {
        let mut graph = SqliteGraph::in_memory().unwrap();
        let v = graph.create_vertex(&Value::Integer(1)).unwrap();
        graph
            .set_property(ElementRef::Vertex(&v), "name", &Value::from("marko"))
            .unwrap();
        graph
            .set_property(ElementRef::Vertex(&v), "age", &Value::Integer(29))
            .unwrap();
        graph
            .set_property(ElementRef::Vertex(&v), "age", &Value::Integer(30))
            .unwrap();

        assert_eq!(graph.lookup_vertex(&Value::Integer(1)).unwrap(), Some(v));
        assert_eq!(graph.lookup_vertex(&Value::from("1")).unwrap(), None);

        let props = graph.vertex_properties(&Value::Integer(1)).unwrap().unwrap();
        assert_eq!(props["name"], Value::from("marko"));
        assert_eq!(props["age"], Value::Integer(30));
        assert_eq!(graph.vertex_ids().unwrap(), vec![Value::Integer(1)]);
    }

    #[test]
    fn test_edge_round_trip() {
        let mut graph = SqliteGraph::in_memory().unwrap();
        let a = graph.create_vertex(&Value::from("a")).unwrap();
        let b = graph.create_vertex(&Value::from("b")).unwrap();
        let e = graph.create_edge(&Value::Integer(7), &a, &b, "knows").unwrap();
        graph
            .set_property(ElementRef::Edge(&e), "weight", &Value::Float(0.5))
            .unwrap();
        graph
            .set_property(
                ElementRef::Edge(&e),
                "tags",
                &Value::List(vec![Value::from("x"), Value::Boolean(true)]),
            )
            .unwrap();

        let edge = graph.edge(&Value::Integer(7)).unwrap().unwrap();
        assert_eq!(edge.out_vertex_id, Value::from("a"));
        assert_eq!(edge.in_vertex_id, Value::from("b"));
        assert_eq!(edge.label, "knows");
        assert_eq!(edge.properties["weight"], Value::Float(0.5));
        assert_eq!(
            edge.properties["tags"],
            Value::List(vec![Value::from("x"), Value::Boolean(true)])
        );
        assert!(graph.edge(&Value::Integer(8)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_edge_id() {
        let mut graph = SqliteGraph::in_memory().unwrap();
        let a = graph.create_vertex(&Value::from("a")).unwrap();
        graph.create_edge(&Value::Integer(7), &a, &a, "x").unwrap();
        let err = graph.create_edge(&Value::Integer(7), &a, &a, "y").unwrap_err();
        assert!(matches!(err, GraphsonError::DuplicateEdgeId { .. }));
    }

    #[test]
    fn test_reserved_key_rejected() {
        let mut graph = SqliteGraph::in_memory().unwrap();
        let a = graph.create_vertex(&Value::from("a")).unwrap();
        let err = graph
            .set_property(ElementRef::Vertex(&a), "id", &Value::Integer(1))
            .unwrap_err();
        assert!(matches!(err, GraphsonError::PropertyWriteRejected { .. }));
    }

    #[test]
    fn test_lazy_transactions() {
        let mut graph = SqliteGraph::in_memory().unwrap();
        assert!(!graph.in_transaction());

        graph.create_vertex(&Value::from("a")).unwrap();
        assert!(graph.in_transaction());
        graph.commit().unwrap();
        assert!(!graph.in_transaction());
        assert_eq!(graph.commit_count(), 1);

        graph.create_vertex(&Value::from("b")).unwrap();
        graph.rollback().unwrap();
        assert_eq!(graph.vertex_count().unwrap(), 1);

        // A commit with nothing pending still counts.
        graph.commit().unwrap();
        assert_eq!(graph.commit_count(), 2);
    }
}
