//! Streaming import state machine.

use tracing::{debug, info, trace};

use crate::config::ImportConfig;
use crate::error::{Direction, GraphsonError, GraphsonResult, RecordKind, RecordLocator};
use crate::import::batch::BatchController;
use crate::import::decoder::ValueDecoder;
use crate::import::factory::ElementFactory;
use crate::tokens;
use crate::traits::{GraphStore, Node, Token, TokenSource};
use crate::types::{EdgeRecord, ElementRecord, VertexRecord};

/// Position of the driver inside the top-level document object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    AwaitingField,
    InVerticesArray,
    InEdgesArray,
    Done,
}

/// Statistics from a completed import.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    /// Vertex records materialized (re-imported vertices count again).
    pub vertices: u64,
    /// Edge records materialized.
    pub edges: u64,
    /// Commits issued, including the final one.
    pub commits: u64,
    /// Vertices created because an edge referenced them first.
    pub implicit_vertices: u64,
    /// Unknown top-level fields that were skipped.
    pub skipped_fields: Vec<String>,
}

impl ImportStats {
    /// Vertices and edges together.
    pub fn records(&self) -> u64 {
        self.vertices + self.edges
    }
}

/// Drives one document from a token source into a graph store.
///
/// Only one record is detached from the stream at a time. Any error aborts the import without
/// further store mutation; batches committed before it stay committed.
pub struct Importer<'a, G: GraphStore, S: TokenSource> {
    factory: ElementFactory<'a, G>,
    source: &'a mut S,
    batch: BatchController,
    decoder: ValueDecoder,
    state: ImportState,
    stats: ImportStats,
    vertex_index: u64,
    edge_index: u64,
}

impl<'a, G: GraphStore, S: TokenSource> Importer<'a, G, S> {
    /// Create an importer. Fails when the configuration is invalid.
    pub fn new(graph: &'a mut G, source: &'a mut S, config: &ImportConfig) -> GraphsonResult<Self> {
        config.validate()?;
        Ok(Self {
            factory: ElementFactory::new(graph)
                .with_missing_vertex_policy(config.missing_vertex_policy),
            source,
            batch: BatchController::new(config.buffer_size)?,
            decoder: ValueDecoder::default(),
            state: ImportState::AwaitingField,
            stats: ImportStats::default(),
            vertex_index: 0,
            edge_index: 0,
        })
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    /// Consume the document and issue the final commit.
    pub fn run(&mut self) -> GraphsonResult<ImportStats> {
        info!(buffer_size = self.batch.buffer_size(), "starting GraphSON import");

        match self.source.next_token()? {
            Some(Token::StartObject) => {}
            Some(other) => {
                return Err(GraphsonError::malformed(format!(
                    "document must be an object, found {:?}",
                    other
                )))
            }
            None => return Err(GraphsonError::malformed("empty document")),
        }

        while self.state != ImportState::Done {
            self.step()?;
        }
        if let Some(token) = self.source.next_token()? {
            return Err(GraphsonError::malformed(format!(
                "trailing content after document: {:?}",
                token
            )));
        }

        self.batch.finish(self.factory.graph_mut())?;
        self.stats.commits = self.batch.commits();
        self.stats.implicit_vertices = self.factory.implicit_vertices();

        info!(
            vertices = self.stats.vertices,
            edges = self.stats.edges,
            commits = self.stats.commits,
            "GraphSON import complete"
        );
        Ok(std::mem::take(&mut self.stats))
    }

    fn step(&mut self) -> GraphsonResult<()> {
        match self.state {
            ImportState::AwaitingField => self.read_field(),
            ImportState::InVerticesArray => {
                let locator = position(RecordKind::Vertex, self.vertex_index);
                self.read_element(RecordKind::Vertex)
                    .map_err(|e| e.in_record(locator))
            }
            ImportState::InEdgesArray => {
                let locator = position(RecordKind::Edge, self.edge_index);
                self.read_element(RecordKind::Edge)
                    .map_err(|e| e.in_record(locator))
            }
            ImportState::Done => Ok(()),
        }
    }

    fn read_field(&mut self) -> GraphsonResult<()> {
        match self.source.next_token()? {
            Some(Token::FieldName) => {}
            Some(Token::EndObject) => {
                self.state = ImportState::Done;
                return Ok(());
            }
            Some(other) => {
                return Err(GraphsonError::malformed(format!(
                    "expected a field name, found {:?}",
                    other
                )))
            }
            None => {
                return Err(GraphsonError::malformed(
                    "document ended inside the top-level object",
                ))
            }
        }

        let name = self
            .source
            .current_field_name()
            .map(str::to_string)
            .ok_or_else(|| GraphsonError::malformed("field name missing"))?;
        let value = self
            .source
            .next_token()?
            .ok_or_else(|| GraphsonError::malformed(format!("value of '{}' missing", name)))?;

        match name.as_str() {
            tokens::EMBEDDED_TYPES => {
                let embedded = match value {
                    Token::True => true,
                    Token::False => false,
                    other => {
                        return Err(GraphsonError::type_mismatch(format!(
                            "'{}' must be a boolean, found {:?}",
                            tokens::EMBEDDED_TYPES,
                            other
                        )))
                    }
                };
                debug!(embedded_types = embedded, "switching value decoding");
                self.decoder = ValueDecoder::new(embedded);
            }
            tokens::VERTICES => {
                expect_array(&name, value)?;
                self.state = ImportState::InVerticesArray;
            }
            tokens::EDGES => {
                expect_array(&name, value)?;
                self.state = ImportState::InEdgesArray;
            }
            _ => {
                debug!(field = %name, "skipping unknown top-level field");
                self.source.skip_children()?;
                self.stats.skipped_fields.push(name);
            }
        }
        Ok(())
    }

    fn read_element(&mut self, kind: RecordKind) -> GraphsonResult<()> {
        match self.source.next_token()? {
            Some(Token::EndArray) => {
                self.state = ImportState::AwaitingField;
                Ok(())
            }
            Some(Token::StartObject) => {
                let node = self.source.read_subtree_as_node()?;
                let index = match kind {
                    RecordKind::Vertex => self.vertex_index,
                    RecordKind::Edge => self.edge_index,
                };
                self.import_record(kind, &node)
                    .map_err(|e| e.in_record(record_locator(kind, index, &node)))?;
                match kind {
                    RecordKind::Vertex => self.vertex_index += 1,
                    RecordKind::Edge => self.edge_index += 1,
                }
                Ok(())
            }
            Some(other) => Err(GraphsonError::malformed(format!(
                "{} record must be an object, found {:?}",
                kind, other
            ))),
            None => Err(GraphsonError::malformed(format!(
                "document ended inside the {} array",
                kind
            ))),
        }
    }

    fn import_record(&mut self, kind: RecordKind, node: &Node) -> GraphsonResult<()> {
        let record = self.decoder.decode_record(kind, node)?;
        trace!(kind = %record.kind(), id = %record.id(), "decoded record");
        match record {
            ElementRecord::Vertex(record) => self.import_vertex(&record),
            ElementRecord::Edge(record) => self.import_edge(&record),
        }
    }

    fn import_vertex(&mut self, record: &VertexRecord) -> GraphsonResult<()> {
        trace!(id = %record.id, properties = record.properties.len(), "importing vertex");
        self.factory.materialize_vertex(record)?;
        self.batch.record_materialized(self.factory.graph_mut())?;
        self.stats.vertices += 1;
        Ok(())
    }

    fn import_edge(&mut self, record: &EdgeRecord) -> GraphsonResult<()> {
        trace!(id = %record.id, label = %record.label, "importing edge");
        let out_vertex = self
            .factory
            .resolve_vertex(&record.out_vertex_id, Direction::Out)?;
        let in_vertex = self
            .factory
            .resolve_vertex(&record.in_vertex_id, Direction::In)?;
        self.factory
            .materialize_edge(record, &out_vertex, &in_vertex)?;
        self.batch.record_materialized(self.factory.graph_mut())?;
        self.stats.edges += 1;
        Ok(())
    }
}

fn expect_array(name: &str, token: Token) -> GraphsonResult<()> {
    if token == Token::StartArray {
        Ok(())
    } else {
        Err(GraphsonError::malformed(format!(
            "'{}' must be an array, found {:?}",
            name, token
        )))
    }
}

fn position(kind: RecordKind, index: u64) -> RecordLocator {
    RecordLocator {
        kind,
        index,
        id: None,
    }
}

fn record_locator(kind: RecordKind, index: u64, node: &Node) -> RecordLocator {
    RecordLocator {
        kind,
        index,
        id: node.get(tokens::_ID).map(Node::to_string),
    }
}

/// Import one document into `graph`, committing every `buffer_size` records.
pub fn import_document<G, S>(
    graph: &mut G,
    source: &mut S,
    buffer_size: usize,
) -> GraphsonResult<()>
where
    G: GraphStore,
    S: TokenSource,
{
    let config = ImportConfig::with_buffer_size(buffer_size);
    let mut importer = Importer::new(graph, source, &config)?;
    importer.run().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::JsonTokenReader;
    use crate::traits::ElementRef;
    use crate::types::Value;
    use std::collections::BTreeMap;

    /// Vertices by canonical id; edges are only counted.
    #[derive(Default)]
    struct TallyStore {
        vertices: BTreeMap<String, BTreeMap<String, Value>>,
        edges: usize,
        commits: usize,
    }

    impl GraphStore for TallyStore {
        type Vertex = String;
        type Edge = ();

        fn lookup_vertex(&mut self, id: &Value) -> GraphsonResult<Option<String>> {
            let key = id.canonical_key();
            Ok(self.vertices.contains_key(&key).then_some(key))
        }

        fn create_vertex(&mut self, id: &Value) -> GraphsonResult<String> {
            let key = id.canonical_key();
            self.vertices.insert(key.clone(), BTreeMap::new());
            Ok(key)
        }

        fn create_edge(
            &mut self,
            _id: &Value,
            _out: &String,
            _in: &String,
            _label: &str,
        ) -> GraphsonResult<()> {
            self.edges += 1;
            Ok(())
        }

        fn set_property(
            &mut self,
            element: ElementRef<'_, String, ()>,
            key: &str,
            value: &Value,
        ) -> GraphsonResult<()> {
            if let ElementRef::Vertex(id) = element {
                if let Some(props) = self.vertices.get_mut(id) {
                    props.insert(key.to_string(), value.clone());
                }
            }
            Ok(())
        }

        fn commit(&mut self) -> GraphsonResult<()> {
            self.commits += 1;
            Ok(())
        }
    }

    fn run(doc: &str, config: &ImportConfig) -> (TallyStore, GraphsonResult<ImportStats>) {
        let mut store = TallyStore::default();
        let mut source = JsonTokenReader::new(doc.as_bytes());
        let result = Importer::new(&mut store, &mut source, config).and_then(|mut i| i.run());
        (store, result)
    }

    #[test]
    fn test_state_transitions() {
        let mut store = TallyStore::default();
        let mut source = JsonTokenReader::new(r#"{"vertices":[{"_id":1}],"edges":[]}"#.as_bytes());
        let mut importer =
            Importer::new(&mut store, &mut source, &ImportConfig::default()).unwrap();
        assert_eq!(importer.state(), ImportState::AwaitingField);

        let stats = importer.run().unwrap();
        assert_eq!(importer.state(), ImportState::Done);
        assert_eq!(stats.vertices, 1);
        assert_eq!(stats.commits, 1);
    }

    #[test]
    fn test_empty_object_commits_once() {
        let (store, result) = run("{}", &ImportConfig::default());
        assert_eq!(result.unwrap().records(), 0);
        assert_eq!(store.commits, 1);
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let doc = r#"{"mode":"NORMAL","extra":{"a":[1,2,{"b":null}]},"vertices":[{"_id":"1"}]}"#;
        let (store, result) = run(doc, &ImportConfig::default());
        let stats = result.unwrap();
        assert_eq!(stats.skipped_fields, vec!["mode".to_string(), "extra".to_string()]);
        assert_eq!(store.vertices.len(), 1);
    }

    #[test]
    fn test_embedded_types_applies_to_later_records() {
        let doc = r#"{
            "vertices":[{"_id":"1","age":29}],
            "embeddedTypes":true,
            "edges":[]
        }"#;
        let (store, result) = run(doc, &ImportConfig::default());
        result.unwrap();
        let props = &store.vertices[&Value::from("1").canonical_key()];
        assert_eq!(props["age"], Value::Integer(29));

        let doc = r#"{"embeddedTypes":true,"vertices":[{"_id":"1","age":{"type":"double","value":29}}]}"#;
        let (store, result) = run(doc, &ImportConfig::default());
        result.unwrap();
        let props = &store.vertices[&Value::from("1").canonical_key()];
        assert_eq!(props["age"], Value::Float(29.0));
    }

    #[test]
    fn test_embedded_types_must_be_boolean() {
        let (_, result) = run(r#"{"embeddedTypes":"yes"}"#, &ImportConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_vertices_must_be_array() {
        let (store, result) = run(r#"{"vertices":{"_id":"1"}}"#, &ImportConfig::default());
        assert!(result.unwrap_err().is_stream_error());
        assert_eq!(store.commits, 0);
    }

    #[test]
    fn test_record_errors_carry_locator() {
        let doc = r#"{"vertices":[{"_id":"1"},{"_id":"2","n":99999999999999999999}]}"#;
        let (store, result) = run(doc, &ImportConfig::default());
        let err = result.unwrap_err();

        assert!(matches!(err.root(), GraphsonError::NumericOverflow { .. }));
        let locator = err.locator().unwrap();
        assert_eq!(locator.kind, RecordKind::Vertex);
        assert_eq!(locator.index, 1);
        assert_eq!(locator.id.as_deref(), Some("\"2\""));
        assert_eq!(store.commits, 0);
    }

    #[test]
    fn test_non_object_record_rejected() {
        let (_, result) = run(r#"{"edges":[42]}"#, &ImportConfig::default());
        let err = result.unwrap_err();
        assert_eq!(err.locator().unwrap().kind, RecordKind::Edge);
        assert!(err.is_stream_error());
    }

    #[test]
    fn test_document_must_be_object() {
        let (_, result) = run("[]", &ImportConfig::default());
        assert!(result.is_err());
        let (_, result) = run("", &ImportConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_import_document_entry_point() {
        let mut store = TallyStore::default();
        let doc = r#"{"vertices":[{"_id":"1"},{"_id":"2"}],"edges":[{"_id":"e","_outV":"1","_inV":"2","_label":"knows"}]}"#;
        let mut source = JsonTokenReader::new(doc.as_bytes());
        import_document(&mut store, &mut source, 2).unwrap();
        assert_eq!(store.vertices.len(), 2);
        assert_eq!(store.edges, 1);
        assert_eq!(store.commits, 2);
    }
}
