use tracing::{info, warn};

use crate::backend::{BatchItem, DryRun, NewStep, StepSource};
use crate::config::LayoutConfig;
use crate::error::{BackendError, SessionError};
use crate::graph::GraphNode;
use crate::step::Step;
use crate::store::GraphStore;

/// One open test case wired to its backend. Mutations go to the backend
/// first; on failure the store keeps the last good graph.
pub struct WorkflowSession<S: StepSource> {
    source: S,
    case_id: String,
    store: GraphStore,
}

impl<S: StepSource> WorkflowSession<S> {
    /// Loads `case_id` and builds its graph.
    pub fn open(source: S, case_id: impl Into<String>, config: LayoutConfig) -> Result<Self, SessionError> {
        let mut session = Self {
            source,
            case_id: case_id.into(),
            store: GraphStore::new(config),
        };
        session.store.set_case_id(Some(session.case_id.clone()));
        session.refresh()?;
        info!(case_id = %session.case_id, "workflow opened");
        Ok(session)
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Access for renderer intents that only touch the derived graph.
    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let steps = self.source.fetch_steps(&self.case_id)?;
        self.store.set_graph(steps)?;
        Ok(())
    }

    /// Adds a step at the insertion point drawn as `node_id`.
    pub fn insert_at(&mut self, node_id: &str, new_step: NewStep) -> Result<Step, SessionError> {
        let at = self
            .store
            .graph()
            .node(node_id)
            .and_then(GraphNode::insertion_point)
            .cloned()
            .ok_or_else(|| SessionError::UnknownNode(node_id.to_string()))?;
        let case_id = self.case_id.clone();
        self.mutate("insert", |source| source.insert_step(&case_id, &at, new_step))
    }

    pub fn delete_step(&mut self, step_id: &str) -> Result<(), SessionError> {
        let case_id = self.case_id.clone();
        self.mutate("delete", |source| source.delete_step(&case_id, step_id))
    }

    pub fn reorder_step(&mut self, step_id: &str, location: i32) -> Result<(), SessionError> {
        let case_id = self.case_id.clone();
        self.mutate("reorder", |source| source.reorder_step(&case_id, step_id, location))
    }

    pub fn batch_replace(&mut self, items: Vec<BatchItem>) -> Result<(), SessionError> {
        let case_id = self.case_id.clone();
        self.mutate("batch", |source| source.batch_replace(&case_id, items))
    }

    /// Selects the step behind `node_id`; insertion points clear the
    /// selection.
    pub fn select(&mut self, node_id: &str) -> Result<Option<&Step>, SessionError> {
        if self.store.graph().node(node_id).is_none() {
            return Err(SessionError::UnknownNode(node_id.to_string()));
        }
        Ok(self.store.select_node(node_id))
    }

    pub fn dry_run(&self) -> Result<DryRun, SessionError> {
        let report = self.source.dry_run(&self.case_id)?;
        info!(
            case_id = %self.case_id,
            steps = report.visited.len(),
            unconfigured = report.unconfigured.len(),
            "dry run finished"
        );
        Ok(report)
    }

    /// Tears the session down and hands the backend back.
    pub fn close(mut self) -> S {
        self.store.reset();
        self.source
    }

    fn mutate<T>(
        &mut self,
        operation: &str,
        apply: impl FnOnce(&mut S) -> Result<T, BackendError>,
    ) -> Result<T, SessionError> {
        match apply(&mut self.source) {
            Ok(value) => {
                self.refresh()?;
                Ok(value)
            }
            Err(err) => {
                warn!(case_id = %self.case_id, operation, error = %err, "backend rejected change, keeping current graph");
                Err(err.into())
            }
        }
    }
}
