use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::GraphBuilder;
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::graph::{EdgeKind, FlowGraph, GraphEdge, GraphNode, Position};
use crate::layout::{Layout, compute_layout};
use crate::step::{self, Step};

/// Local change emitted by the canvas for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeChange {
    Position { id: String, position: Position },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EdgeChange {
    Remove { id: String },
}

/// Edge drawn by hand between two handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
}

/// State of the workflow open in the editor. The step sequence is the source
/// of truth; renderer intents only touch the derived lists.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    config: LayoutConfig,
    case_id: Option<String>,
    steps: Vec<Step>,
    graph: FlowGraph,
    layout: Layout,
    current_node: Option<Step>,
}

impl GraphStore {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Test case the next rebuild is tagged with.
    pub fn set_case_id(&mut self, case_id: Option<String>) {
        self.case_id = case_id;
    }

    pub fn case_id(&self) -> Option<&str> {
        self.case_id.as_deref()
    }

    /// Replaces the step sequence and rebuilds the positioned graph. Nothing
    /// is committed when layout fails, so the previous graph stays intact.
    /// The selection is refreshed from the new sequence and cleared when its
    /// step is gone.
    pub fn set_graph(&mut self, steps: Vec<Step>) -> Result<(), LayoutError> {
        let mut builder = GraphBuilder::new();
        if let Some(case_id) = &self.case_id {
            builder = builder.with_case_id(case_id.clone());
        }
        let mut graph = builder.build(&steps);
        let layout = compute_layout(&graph.nodes, &graph.edges, &self.config)?;
        apply_positions(&mut graph.nodes, &layout);
        info!(
            case_id = self.case_id.as_deref().unwrap_or("-"),
            steps = steps.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "workflow graph rebuilt"
        );

        self.steps = steps;
        self.graph = graph;
        self.layout = layout;
        if let Some(selected) = &self.current_node {
            let fresh = step::find_step(&self.steps, &selected.id).cloned();
            if fresh.as_ref() != Some(selected) {
                self.set_current_node(fresh);
            }
        }
        Ok(())
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.graph.edges
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn current_node(&self) -> Option<&Step> {
        self.current_node.as_ref()
    }

    pub fn set_current_node(&mut self, step: Option<Step>) {
        debug!(step_id = step.as_ref().map(|s| s.id.as_str()).unwrap_or("-"), "selection changed");
        self.current_node = step;
    }

    /// Selects the step behind `node_id`. Insertion points and unknown ids
    /// clear the selection.
    pub fn select_node(&mut self, node_id: &str) -> Option<&Step> {
        let payload = self.graph.node(node_id).and_then(GraphNode::payload).cloned();
        self.set_current_node(payload);
        self.current_node.as_ref()
    }

    /// Clears everything, including the case id.
    pub fn reset(&mut self) {
        info!(case_id = self.case_id.as_deref().unwrap_or("-"), "workflow store reset");
        self.case_id = None;
        self.steps.clear();
        self.graph = FlowGraph::default();
        self.layout = Layout::default();
        self.current_node = None;
    }

    /// Drops a step (and its subtree) from the local sequence and rebuilds.
    pub fn remove_step(&mut self, step_id: &str) -> Result<(), LayoutError> {
        let steps = step::without_step(&self.steps, step_id);
        self.set_graph(steps)
    }

    /// Points a step at a reusable action group and rebuilds.
    pub fn assign_reference(&mut self, step_id: &str, reference: &str, name: &str) -> Result<(), LayoutError> {
        let steps = step::with_reference(&self.steps, step_id, reference, name);
        self.set_graph(steps)
    }

    pub fn apply_node_changes(&mut self, changes: Vec<NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Position { id, position } => {
                    if let Some(node) = self.graph.nodes.iter_mut().find(|node| node.id == id) {
                        node.position = Some(position);
                    }
                }
                NodeChange::Remove { id } => self.graph.nodes.retain(|node| node.id != id),
            }
        }
    }

    pub fn apply_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Remove { id } => self.graph.edges.retain(|edge| edge.id != id),
            }
        }
    }

    /// Adds a hand-drawn edge unless the two nodes are already connected in
    /// that direction. Returns whether an edge was added.
    pub fn connect(&mut self, connection: Connection) -> bool {
        let exists = self
            .graph
            .edges
            .iter()
            .any(|edge| edge.source == connection.source && edge.target == connection.target);
        if exists {
            return false;
        }
        let id = format!(
            "{}:{}->{}",
            EdgeKind::Connection.tag(),
            connection.source,
            connection.target
        );
        self.graph.edges.push(GraphEdge::new(
            id,
            EdgeKind::Connection,
            connection.source,
            connection.target,
        ));
        true
    }

    pub fn set_nodes(&mut self, nodes: Vec<GraphNode>) {
        self.graph.nodes = nodes;
    }

    pub fn set_edges(&mut self, edges: Vec<GraphEdge>) {
        self.graph.edges = edges;
    }

    /// Lays out the current node and edge lists again, discarding manual
    /// moves.
    pub fn rearrange_node_positions(&mut self) -> Result<(), LayoutError> {
        let layout = compute_layout(&self.graph.nodes, &self.graph.edges, &self.config)?;
        apply_positions(&mut self.graph.nodes, &layout);
        self.layout = layout;
        Ok(())
    }
}

fn apply_positions(nodes: &mut [GraphNode], layout: &Layout) {
    for node in nodes {
        match layout.nodes.get(&node.id) {
            Some(placed) => {
                node.position = Some(placed.position());
                node.target_handle = placed.target_handle;
                node.source_handle = placed.source_handle;
            }
            None => node.position = None,
        }
    }
}
