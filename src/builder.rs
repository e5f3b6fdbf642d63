use tracing::debug;

use crate::graph::{
    EdgeKind, FlowGraph, GraphEdge, GraphNode, InsertionPoint, NodeData, NodeKind,
};
use crate::step::{Step, StepType, ordered};

pub const START_NODE_ID: &str = "start";

/// How a step is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Action,
    Condition,
    Loop,
    BranchEntry,
}

impl Block {
    fn of(step_type: &StepType) -> Self {
        match step_type {
            StepType::Condition => Self::Condition,
            StepType::Loop => Self::Loop,
            StepType::YesCase | StepType::NoCase => Self::BranchEntry,
            StepType::Assertion | StepType::ActionGroup | StepType::Unknown(_) => Self::Action,
        }
    }
}

fn node_id(prefix: &str, step_id: &str) -> String {
    format!("{prefix}:{step_id}")
}

/// Edge whose source is fixed while its target is still unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEdge {
    pub id: String,
    pub kind: EdgeKind,
    pub source: String,
}

impl OpenEdge {
    pub fn flow(source: &str) -> Self {
        Self {
            id: node_id(EdgeKind::Flow.tag(), source),
            kind: EdgeKind::Flow,
            source: source.to_string(),
        }
    }

    fn finish(self, target: &str) -> GraphEdge {
        GraphEdge::new(self.id, self.kind, self.source, target.to_string())
    }
}

/// Builds the graph for a top-level step sequence. Node and edge ids depend
/// only on step ids and structure, so rebuilding the same tree yields the
/// same ids.
pub fn build_graph(steps: &[Step]) -> FlowGraph {
    GraphBuilder::new().build(steps)
}

#[derive(Debug, Default)]
pub struct GraphBuilder {
    case_id: Option<String>,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case id recorded on the leading insertion point.
    pub fn with_case_id(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn build(mut self, steps: &[Step]) -> FlowGraph {
        let start = InsertionPoint {
            execution_order: 1,
            parent_id: None,
            case_id: self.case_id.clone(),
        };
        self.push_insertion(START_NODE_ID.to_string(), start);
        // The trailing open edge of the top-level sequence has nothing to
        // attach to and is dropped.
        let _ = self.append_sequence(steps, Some(OpenEdge::flow(START_NODE_ID)), None);
        FlowGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    /// Chains `steps` after `open` and returns the edge left dangling from
    /// the last node of the sequence.
    pub fn append_sequence(
        &mut self,
        steps: &[Step],
        mut open: Option<OpenEdge>,
        parent_id: Option<&str>,
    ) -> Option<OpenEdge> {
        for step in ordered(steps) {
            open = match Block::of(&step.type_field) {
                Block::Action => self.append_action(step, open, parent_id),
                Block::Condition => self.append_condition(step, open, parent_id),
                Block::Loop => self.append_loop(step, open, parent_id),
                Block::BranchEntry => {
                    debug!(step_id = %step.id, "branch entry outside a condition, drawing as action");
                    self.append_action(step, open, parent_id)
                }
            };
        }
        open
    }

    fn append_action(
        &mut self,
        step: &Step,
        open: Option<OpenEdge>,
        parent_id: Option<&str>,
    ) -> Option<OpenEdge> {
        if let StepType::Unknown(tag) = &step.type_field {
            debug!(step_id = %step.id, tag = %tag, "unknown step type, drawing as action");
        }
        let action = node_id("action", &step.id);
        self.close(open, &action);
        self.push_step(action.clone(), NodeKind::Action, step);

        let after = self.push_after(step, parent_id);
        self.edges.push(OpenEdge::flow(&action).finish(&after));
        Some(OpenEdge::flow(&after))
    }

    fn append_loop(
        &mut self,
        step: &Step,
        open: Option<OpenEdge>,
        parent_id: Option<&str>,
    ) -> Option<OpenEdge> {
        let start = node_id("loop", &step.id);
        self.close(open, &start);
        self.push_step(start.clone(), NodeKind::LoopStart, step);

        let body = node_id("loop-body", &step.id);
        self.push_insertion(
            body.clone(),
            InsertionPoint {
                execution_order: 1,
                parent_id: Some(step.id.clone()),
                case_id: step.case_id.clone(),
            },
        );
        self.edges.push(OpenEdge::flow(&start).finish(&body));

        let trailing = self.append_sequence(&step.children, Some(OpenEdge::flow(&body)), Some(&step.id));
        let end = node_id("endloop", &step.id);
        self.close(trailing, &end);
        self.push_step(end.clone(), NodeKind::LoopEnd, step);

        self.edges.push(GraphEdge::new(
            node_id(EdgeKind::Continue.tag(), &end),
            EdgeKind::Continue,
            end.clone(),
            start,
        ));
        let after = self.push_after(step, parent_id);
        self.edges.push(GraphEdge::new(
            node_id(EdgeKind::End.tag(), &end),
            EdgeKind::End,
            end,
            after.clone(),
        ));
        Some(OpenEdge::flow(&after))
    }

    fn append_condition(
        &mut self,
        step: &Step,
        open: Option<OpenEdge>,
        parent_id: Option<&str>,
    ) -> Option<OpenEdge> {
        let condition = node_id("condition", &step.id);
        self.close(open, &condition);
        self.push_step(condition.clone(), NodeKind::Condition, step);

        let join = node_id("condition-end", &step.id);
        let branches = ordered(&step.children);
        if branches.is_empty() {
            self.edges.push(OpenEdge::flow(&condition).finish(&join));
        }
        for branch in branches {
            let kind = match branch.type_field {
                StepType::YesCase => EdgeKind::Yes,
                StepType::NoCase => EdgeKind::No,
                _ => {
                    debug!(step_id = %branch.id, "condition branch without yes/no tag");
                    EdgeKind::Flow
                }
            };
            let entry = node_id("branch", &branch.id);
            self.push_insertion(
                entry.clone(),
                InsertionPoint {
                    execution_order: 1,
                    parent_id: Some(branch.id.clone()),
                    case_id: step.case_id.clone(),
                },
            );
            self.edges.push(GraphEdge::new(
                format!("{}-branch:{}", kind.tag(), branch.id),
                kind,
                condition.clone(),
                entry.clone(),
            ));
            let trailing = self.append_sequence(&branch.children, Some(OpenEdge::flow(&entry)), Some(&branch.id));
            self.close(trailing, &join);
        }

        self.push_insertion(
            join.clone(),
            InsertionPoint {
                execution_order: step.execution_order.saturating_add(1),
                parent_id: parent_id.map(str::to_string),
                case_id: step.case_id.clone(),
            },
        );
        Some(OpenEdge::flow(&join))
    }

    fn close(&mut self, open: Option<OpenEdge>, target: &str) {
        if let Some(open) = open {
            self.edges.push(open.finish(target));
        }
    }

    fn push_step(&mut self, id: String, kind: NodeKind, step: &Step) {
        self.nodes.push(GraphNode::new(
            id,
            kind,
            NodeData::Step {
                payload: step.clone(),
            },
        ));
    }

    fn push_insertion(&mut self, id: String, point: InsertionPoint) {
        self.nodes
            .push(GraphNode::new(id, NodeKind::InsertionPoint, NodeData::Insertion(point)));
    }

    /// Insertion point directly after `step` among its siblings.
    fn push_after(&mut self, step: &Step, parent_id: Option<&str>) -> String {
        let id = node_id("insert", &step.id);
        self.push_insertion(
            id.clone(),
            InsertionPoint {
                execution_order: step.execution_order.saturating_add(1),
                parent_id: parent_id.map(str::to_string),
                case_id: step.case_id.clone(),
            },
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn action(id: &str, order: i32) -> Step {
        Step::new(id, StepType::Assertion, order)
    }

    fn edge_pairs(graph: &FlowGraph) -> Vec<(&str, &str, EdgeKind)> {
        graph
            .edges
            .iter()
            .map(|edge| (edge.source.as_str(), edge.target.as_str(), edge.kind))
            .collect()
    }

    fn assert_well_formed(graph: &FlowGraph) {
        let ids: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids.len(), graph.nodes.len(), "duplicate node ids");
        let edge_ids: HashSet<&str> = graph.edges.iter().map(|edge| edge.id.as_str()).collect();
        assert_eq!(edge_ids.len(), graph.edges.len(), "duplicate edge ids");
        for edge in &graph.edges {
            assert!(ids.contains(edge.source.as_str()), "{}: dangling source", edge.id);
            assert!(ids.contains(edge.target.as_str()), "{}: dangling target", edge.id);
        }
    }

    #[test]
    fn empty_case_has_a_start_insertion_point() {
        let graph = build_graph(&[]);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        let start = &graph.nodes[0];
        assert_eq!(start.id, START_NODE_ID);
        assert_eq!(start.kind, NodeKind::InsertionPoint);
        assert_eq!(start.insertion_point().unwrap().execution_order, 1);
    }

    #[test]
    fn single_action_chains_through_its_insertion_point() {
        let graph = build_graph(&[action("a1", 1)]);
        let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "action:a1", "insert:a1"]);
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("start", "action:a1", EdgeKind::Flow),
                ("action:a1", "insert:a1", EdgeKind::Flow),
            ]
        );
        assert_eq!(graph.nodes[1].payload().unwrap().id, "a1");
        assert_eq!(graph.nodes[2].insertion_point().unwrap().execution_order, 2);
    }

    #[test]
    fn flat_sequences_follow_the_node_count_law() {
        for n in 1..6 {
            let steps: Vec<Step> = (1..=n).map(|i| action(&format!("s{i}"), i)).collect();
            let graph = build_graph(&steps);
            assert_eq!(graph.nodes.len(), 2 * n as usize + 1);
            assert_eq!(graph.edges.len(), 2 * n as usize);
            for pair in graph.edges.windows(2) {
                assert_eq!(pair[0].target, pair[1].source, "edges must chain in order");
            }
            assert_well_formed(&graph);
        }
    }

    #[test]
    fn siblings_are_chained_by_execution_order() {
        let graph = build_graph(&[action("b", 2), action("a", 1)]);
        let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["start", "action:a", "insert:a", "action:b", "insert:b"]);
    }

    #[test]
    fn empty_loop_round_trip() {
        let graph = build_graph(&[Step::new("l1", StepType::Loop, 1)]);
        let kinds: Vec<(&str, NodeKind)> =
            graph.nodes.iter().map(|node| (node.id.as_str(), node.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("start", NodeKind::InsertionPoint),
                ("loop:l1", NodeKind::LoopStart),
                ("loop-body:l1", NodeKind::InsertionPoint),
                ("endloop:l1", NodeKind::LoopEnd),
                ("insert:l1", NodeKind::InsertionPoint),
            ]
        );
        let pairs = edge_pairs(&graph);
        assert!(pairs.contains(&("endloop:l1", "loop:l1", EdgeKind::Continue)));
        assert!(pairs.contains(&("endloop:l1", "insert:l1", EdgeKind::End)));
        assert!(pairs.contains(&("loop-body:l1", "endloop:l1", EdgeKind::Flow)));
        assert_eq!(
            graph.node("loop-body:l1").unwrap().insertion_point().unwrap().parent_id.as_deref(),
            Some("l1")
        );
        assert_well_formed(&graph);
    }

    #[test]
    fn loop_body_is_chained_inside_the_loop() {
        let looped = Step::new("l1", StepType::Loop, 1)
            .with_children(vec![action("a1", 1), action("a2", 2)]);
        let graph = build_graph(&[looped]);
        let pairs = edge_pairs(&graph);
        assert!(pairs.contains(&("loop-body:l1", "action:a1", EdgeKind::Flow)));
        assert!(pairs.contains(&("insert:a2", "endloop:l1", EdgeKind::Flow)));
        let after_a1 = graph.node("insert:a1").unwrap().insertion_point().unwrap();
        assert_eq!(after_a1.parent_id.as_deref(), Some("l1"));
        assert_eq!(after_a1.execution_order, 2);
        assert_well_formed(&graph);
    }

    #[test]
    fn condition_branches_fan_in() {
        let condition = Step::new("c1", StepType::Condition, 1).with_children(vec![
            Step::new("y", StepType::YesCase, 1),
            Step::new("n", StepType::NoCase, 2),
        ]);
        let graph = build_graph(&[condition]);

        let joins: Vec<&GraphNode> = graph
            .nodes
            .iter()
            .filter(|node| node.id.starts_with("condition-end:"))
            .collect();
        assert_eq!(joins.len(), 1);

        let branch_edges: Vec<&GraphEdge> = graph
            .edges
            .iter()
            .filter(|edge| edge.source == "condition:c1")
            .collect();
        assert_eq!(branch_edges.len(), 2);
        let kinds: HashSet<EdgeKind> = branch_edges.iter().map(|edge| edge.kind).collect();
        assert_eq!(kinds, HashSet::from([EdgeKind::Yes, EdgeKind::No]));

        let into_join = graph
            .edges
            .iter()
            .filter(|edge| edge.target == "condition-end:c1")
            .count();
        assert_eq!(into_join, 2);
        assert_well_formed(&graph);
    }

    #[test]
    fn condition_without_branches_flows_to_its_join() {
        let graph = build_graph(&[Step::new("c1", StepType::Condition, 1), action("a1", 2)]);
        let pairs = edge_pairs(&graph);
        assert!(pairs.contains(&("condition:c1", "condition-end:c1", EdgeKind::Flow)));
        assert!(pairs.contains(&("condition-end:c1", "action:a1", EdgeKind::Flow)));
        assert_well_formed(&graph);
    }

    #[test]
    fn maximal_execution_order_does_not_overflow() {
        let graph = build_graph(&[
            action("a1", i32::MAX),
            Step::new("c1", StepType::Condition, i32::MAX),
        ]);
        let after = graph.node("insert:a1").unwrap().insertion_point().unwrap();
        assert_eq!(after.execution_order, i32::MAX);
        let join = graph.node("condition-end:c1").unwrap().insertion_point().unwrap();
        assert_eq!(join.execution_order, i32::MAX);
    }

    #[test]
    fn unknown_types_degrade_to_actions() {
        let graph = build_graph(&[
            Step::new("w", StepType::Unknown("Wait".to_string()), 1),
            Step::new("y", StepType::YesCase, 2),
        ]);
        assert_eq!(graph.node("action:w").unwrap().kind, NodeKind::Action);
        assert_eq!(graph.node("action:y").unwrap().kind, NodeKind::Action);
        assert_eq!(graph.nodes.len(), 5);
    }

    #[test]
    fn nested_structures_are_deterministic_and_consistent() {
        let steps = vec![
            action("a1", 1),
            Step::new("c1", StepType::Condition, 2).with_children(vec![
                Step::new("y", StepType::YesCase, 1).with_children(vec![
                    Step::new("l1", StepType::Loop, 1).with_children(vec![action("a2", 1)]),
                ]),
                Step::new("n", StepType::NoCase, 2).with_children(vec![action("a3", 1)]),
            ]),
            action("a4", 3),
        ];
        let first = build_graph(&steps);
        let second = build_graph(&steps);
        assert_eq!(first, second);
        assert_well_formed(&first);
        assert!(first.nodes.iter().all(|node| node.position.is_none()));
    }
}
