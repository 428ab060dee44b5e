//! Reader entry points over byte streams.

use std::io::Read;

use crate::config::ImportConfig;
use crate::error::GraphsonResult;
use crate::import::driver::{ImportStats, Importer};
use crate::stream::JsonTokenReader;
use crate::traits::GraphStore;

/// Wraps a destination graph and imports GraphSON documents into it.
///
/// ```ignore
/// let mut reader = GraphsonReader::new(MemoryGraph::new());
/// reader.input_graph(File::open("graph.json")?)?;
/// let graph = reader.into_inner();
/// ```
#[derive(Debug)]
pub struct GraphsonReader<G: GraphStore> {
    graph: G,
    config: ImportConfig,
}

impl<G: GraphStore> GraphsonReader<G> {
    /// Wrap a graph with the default configuration.
    pub fn new(graph: G) -> Self {
        Self::with_config(graph, ImportConfig::default())
    }

    pub fn with_config(graph: G, config: ImportConfig) -> Self {
        Self { graph, config }
    }

    /// Import a document using the configured buffer size.
    pub fn input_graph<R: Read>(&mut self, input: R) -> GraphsonResult<ImportStats> {
        let mut source = JsonTokenReader::new(input);
        let mut importer = Importer::new(&mut self.graph, &mut source, &self.config)?;
        importer.run()
    }

    /// Import a document committing every `buffer_size` records.
    pub fn input_graph_with_buffer<R: Read>(
        &mut self,
        input: R,
        buffer_size: usize,
    ) -> GraphsonResult<ImportStats> {
        let config = ImportConfig {
            buffer_size,
            ..self.config.clone()
        };
        let mut source = JsonTokenReader::new(input);
        let mut importer = Importer::new(&mut self.graph, &mut source, &config)?;
        importer.run()
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Unwrap the destination graph.
    pub fn into_inner(self) -> G {
        self.graph
    }
}

/// Import a document on a blocking worker thread.
///
/// The graph is moved into the worker and handed back with the statistics, so the
/// synchronous driver never blocks the async runtime.
pub async fn import_document_async<G, R>(
    graph: G,
    input: R,
    config: ImportConfig,
) -> GraphsonResult<(G, ImportStats)>
where
    G: GraphStore + Send + 'static,
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || -> GraphsonResult<(G, ImportStats)> {
        let mut reader = GraphsonReader::with_config(graph, config);
        let stats = reader.input_graph(input)?;
        Ok((reader.into_inner(), stats))
    })
    .await?
}
