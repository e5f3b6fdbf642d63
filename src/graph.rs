use serde::{Deserialize, Serialize};

use crate::step::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Action,
    Condition,
    LoopStart,
    LoopEnd,
    InsertionPoint,
}

impl NodeKind {
    pub fn size_class(self) -> SizeClass {
        match self {
            Self::Action | Self::Condition | Self::LoopStart => SizeClass::Wide,
            Self::LoopEnd | Self::InsertionPoint => SizeClass::Dot,
        }
    }

    /// Token used to dispatch the node to a visual component.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Action => "action",
            Self::Condition => "condition",
            Self::LoopStart => "loop-start",
            Self::LoopEnd => "loop-end",
            Self::InsertionPoint => "insertion-point",
        }
    }
}

/// Footprint reserved for a node by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Wide,
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Flow,
    Yes,
    No,
    Continue,
    End,
    /// Drawn by the user in the canvas; never derived from steps.
    Connection,
}

impl EdgeKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Yes => "yes",
            Self::No => "no",
            Self::Continue => "continue",
            Self::End => "end",
            Self::Connection => "connection",
        }
    }

    /// Loop re-entry edges point back up the graph and stay out of ranking.
    pub fn is_ranked(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Where a new step lands when added at an insertion point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionPoint {
    pub execution_order: i32,
    pub parent_id: Option<String>,
    pub case_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeData {
    Step { payload: Step },
    Insertion(InsertionPoint),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub data: NodeData,
    /// Written by the layout engine only.
    pub position: Option<Position>,
    pub target_handle: HandleSide,
    pub source_handle: HandleSide,
}

impl GraphNode {
    pub fn new(id: String, kind: NodeKind, data: NodeData) -> Self {
        Self {
            id,
            kind,
            data,
            position: None,
            target_handle: HandleSide::Top,
            source_handle: HandleSide::Bottom,
        }
    }

    pub fn payload(&self) -> Option<&Step> {
        match &self.data {
            NodeData::Step { payload } => Some(payload),
            NodeData::Insertion(_) => None,
        }
    }

    pub fn insertion_point(&self) -> Option<&InsertionPoint> {
        match &self.data {
            NodeData::Insertion(point) => Some(point),
            NodeData::Step { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    pub min_len: usize,
}

impl GraphEdge {
    pub fn new(id: String, kind: EdgeKind, source: String, target: String) -> Self {
        Self {
            id,
            kind,
            source,
            target,
            min_len: 1,
        }
    }
}

/// Derived node and edge lists for one step sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlowGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
