//! Commit boundaries for buffered imports.

use tracing::debug;

use crate::error::{GraphsonError, GraphsonResult};
use crate::traits::GraphStore;

/// Counts materialized records and commits the store every `buffer_size` of them.
///
/// Vertices and edges share one counter. The final commit in [`BatchController::finish`] happens
/// regardless of the counter, so a successful import always ends durable.
#[derive(Debug, Clone)]
pub struct BatchController {
    buffer_size: usize,
    pending: usize,
    commits: u64,
}

impl BatchController {
    /// Create a controller. A zero buffer size is rejected.
    pub fn new(buffer_size: usize) -> GraphsonResult<Self> {
        if buffer_size == 0 {
            return Err(GraphsonError::Configuration(
                "buffer_size must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            buffer_size,
            pending: 0,
            commits: 0,
        })
    }

    /// Record one materialized element, committing when the buffer is full.
    pub fn record_materialized<G: GraphStore>(&mut self, graph: &mut G) -> GraphsonResult<()> {
        self.pending += 1;
        if self.pending >= self.buffer_size {
            self.commit(graph)?;
        }
        Ok(())
    }

    /// Commit whatever is left at the end of the stream, even when nothing is pending.
    pub fn finish<G: GraphStore>(&mut self, graph: &mut G) -> GraphsonResult<()> {
        self.commit(graph)
    }

    fn commit<G: GraphStore>(&mut self, graph: &mut G) -> GraphsonResult<()> {
        debug!(
            records = self.pending,
            transactional = graph.supports_transactions(),
            "committing batch"
        );
        graph.commit().map_err(|e| match e {
            failed @ GraphsonError::StoreCommitFailed { .. } => failed,
            other => GraphsonError::StoreCommitFailed {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        })?;
        self.pending = 0;
        self.commits += 1;
        Ok(())
    }

    /// Records materialized since the last commit.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Commits issued so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
