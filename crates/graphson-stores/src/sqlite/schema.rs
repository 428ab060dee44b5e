//! SQLite schema for the persistent graph store.
//!
//! Four tables:
//! - `vertices`: one row per vertex, keyed by the canonical form of its id
//! - `edges`: one row per edge with its endpoints and label
//! - `vertex_properties` / `edge_properties`: one row per property, values in typed JSON form

use rusqlite::Connection;
use tracing::debug;

use graphson_core::error::{GraphsonError, GraphsonResult};

/// SQL for the vertices table.
pub const CREATE_VERTICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vertices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    element_id TEXT NOT NULL UNIQUE
)
"#;

/// SQL for the edges table.
pub const CREATE_EDGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    element_id TEXT NOT NULL UNIQUE,
    source_id INTEGER NOT NULL REFERENCES vertices(id) ON DELETE CASCADE,
    target_id INTEGER NOT NULL REFERENCES vertices(id) ON DELETE CASCADE,
    label TEXT NOT NULL
)
"#;

/// Index for traversal from source.
pub const CREATE_EDGES_SOURCE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id)
"#;

/// Index for traversal to target.
pub const CREATE_EDGES_TARGET_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id)
"#;

/// Index for label filtering.
pub const CREATE_EDGES_LABEL_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_edges_label ON edges(label)
"#;

/// SQL for vertex properties.
pub const CREATE_VERTEX_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS vertex_properties (
    vertex_id INTEGER NOT NULL REFERENCES vertices(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (vertex_id, key)
)
"#;

/// SQL for edge properties.
pub const CREATE_EDGE_PROPERTIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS edge_properties (
    edge_id INTEGER NOT NULL REFERENCES edges(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (edge_id, key)
)
"#;

/// Initialize the graph schema in the given database connection.
///
/// Safe to call multiple times.
pub fn init_schema(conn: &Connection) -> GraphsonResult<()> {
    conn.execute_batch(
        &[
            "PRAGMA foreign_keys = ON;",
            CREATE_VERTICES_TABLE,
            ";",
            CREATE_EDGES_TABLE,
            ";",
            CREATE_EDGES_SOURCE_INDEX,
            ";",
            CREATE_EDGES_TARGET_INDEX,
            ";",
            CREATE_EDGES_LABEL_INDEX,
            ";",
            CREATE_VERTEX_PROPERTIES_TABLE,
            ";",
            CREATE_EDGE_PROPERTIES_TABLE,
            ";",
        ]
        .concat(),
    )
    .map_err(|e| {
        GraphsonError::store_with_source(format!("failed to initialize schema: {}", e), e)
    })?;

    debug!("initialized graph schema");
    Ok(())
}
