use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, NodeKind};
use crate::step::StepType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub text_color: String,
    pub background: String,
    pub border_color: String,
    pub action_fill: String,
    pub assertion_fill: String,
    pub condition_fill: String,
    pub loop_fill: String,
    pub loop_end_fill: String,
    pub insertion_fill: String,
    pub line_color: String,
    pub yes_color: String,
    pub no_color: String,
    pub continue_color: String,
}

impl Theme {
    /// Palette of the test-case editor canvas.
    pub fn canvas() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            text_color: "#1C2430".to_string(),
            background: "#EFF6FF".to_string(),
            border_color: "#FFFFFF".to_string(),
            action_fill: "#E0E7FF".to_string(),
            assertion_fill: "#FEE2E2".to_string(),
            condition_fill: "#FFEDD5".to_string(),
            loop_fill: "#E0E7FF".to_string(),
            loop_end_fill: "#FEE2E2".to_string(),
            insertion_fill: "#FFFFFF".to_string(),
            line_color: "#7A8AA6".to_string(),
            yes_color: "#16A34A".to_string(),
            no_color: "#DC2626".to_string(),
            continue_color: "#6366F1".to_string(),
        }
    }

    pub fn node_fill(&self, kind: NodeKind, step_type: Option<&StepType>) -> &str {
        match kind {
            NodeKind::Action if step_type == Some(&StepType::Assertion) => &self.assertion_fill,
            NodeKind::Action => &self.action_fill,
            NodeKind::Condition => &self.condition_fill,
            NodeKind::LoopStart => &self.loop_fill,
            NodeKind::LoopEnd => &self.loop_end_fill,
            NodeKind::InsertionPoint => &self.insertion_fill,
        }
    }

    pub fn edge_stroke(&self, kind: EdgeKind) -> &str {
        match kind {
            EdgeKind::Yes => &self.yes_color,
            EdgeKind::No => &self.no_color,
            EdgeKind::Continue => &self.continue_color,
            EdgeKind::Flow | EdgeKind::End | EdgeKind::Connection => &self.line_color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::canvas()
    }
}
