use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::{EdgeKind, HandleSide, NodeKind, Position};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: String,
    pub kind: NodeKind,
    /// Top-left corner.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rank: usize,
    pub order: usize,
    pub target_handle: HandleSide,
    pub source_handle: HandleSide,
}

impl NodeLayout {
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn anchor(&self, side: HandleSide) -> (f32, f32) {
        match side {
            HandleSide::Top => (self.center_x(), self.y),
            HandleSide::Bottom => (self.center_x(), self.y + self.height),
            HandleSide::Left => (self.x, self.center_y()),
            HandleSide::Right => (self.x + self.width, self.center_y()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Layout {
    pub nodes: BTreeMap<String, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub rank_count: usize,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn position(&self, node_id: &str) -> Option<Position> {
        self.nodes.get(node_id).map(NodeLayout::position)
    }
}
