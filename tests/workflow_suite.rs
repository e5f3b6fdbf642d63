use std::collections::HashSet;
use std::path::Path;

use caseflow::backend::NewStep;
use caseflow::config::RenderConfig;
use caseflow::layout_dump::LayoutDump;
use caseflow::render::render_svg;
use caseflow::step::parse_steps;
use caseflow::theme::Theme;
use caseflow::{
    EdgeKind, FlowGraph, Layout, LayoutConfig, MemoryBackend, StepType, WorkflowSession, build_graph,
    compute_layout,
};

fn load_fixture(name: &str) -> Vec<caseflow::Step> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_steps(&input).expect("fixture parse failed")
}

fn lay_out(name: &str) -> (FlowGraph, Layout) {
    let steps = load_fixture(name);
    let graph = build_graph(&steps);
    let layout = compute_layout(&graph.nodes, &graph.edges, &LayoutConfig::default()).expect("layout failed");
    (graph, layout)
}

fn assert_consistent(graph: &FlowGraph, layout: &Layout, fixture: &str) {
    let ids: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    assert_eq!(ids.len(), graph.nodes.len(), "{fixture}: duplicate node ids");
    for edge in &graph.edges {
        assert!(ids.contains(edge.source.as_str()), "{fixture}: {} has no source", edge.id);
        assert!(ids.contains(edge.target.as_str()), "{fixture}: {} has no target", edge.id);

        let from = &layout.nodes[&edge.source];
        let to = &layout.nodes[&edge.target];
        if edge.kind == EdgeKind::Continue {
            assert!(from.rank > to.rank, "{fixture}: {} must point back up", edge.id);
        } else {
            assert!(to.rank > from.rank, "{fixture}: {} must point down", edge.id);
        }
    }
    assert_eq!(layout.nodes.len(), graph.nodes.len(), "{fixture}: unplaced nodes");
    for node in layout.nodes.values() {
        assert!(node.x >= 0.0 && node.y >= 0.0, "{fixture}: {} is off canvas", node.id);
        assert!(node.x + node.width <= layout.width, "{fixture}: {} overflows", node.id);
    }
}

#[test]
fn lay_out_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let fixtures = [
        ("empty.json", 1, 0),
        ("flat.json", 7, 6),
        ("loop.json", 11, 11),
        ("condition.json", 9, 9),
        ("nested.json", 21, 22),
    ];
    for (fixture, nodes, edges) in fixtures {
        let (graph, layout) = lay_out(fixture);
        assert_eq!(graph.nodes.len(), nodes, "{fixture}: node count");
        assert_eq!(graph.edges.len(), edges, "{fixture}: edge count");
        assert_consistent(&graph, &layout, fixture);

        let svg = render_svg(&graph, &layout, &Theme::canvas(), &RenderConfig::default());
        assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
    }
}

#[test]
fn rebuilds_are_identical() {
    for fixture in ["loop.json", "condition.json", "nested.json"] {
        let first = lay_out(fixture);
        let second = lay_out(fixture);
        assert_eq!(first, second, "{fixture}: rebuild differs");
    }
}

#[test]
fn nested_children_follow_execution_order() {
    let (graph, _) = lay_out("nested.json");
    assert!(graph.edges.iter().any(|edge| edge.source == "branch:no" && edge.target == "action:a4"));
    assert!(graph.edges.iter().any(|edge| edge.source == "insert:a4" && edge.target == "action:a3"));
    // unknown tags still get an action node
    assert!(graph.node("action:w1").is_some());
}

#[test]
fn dump_is_valid_json() {
    let (graph, layout) = lay_out("condition.json");
    let dump = LayoutDump::from_layout(&layout, &graph, Some("case-1"));
    let json: serde_json::Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 9);
    let condition = json["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node["id"] == "condition:c1")
        .unwrap();
    assert_eq!(condition["label"], "Is logged in");
    assert_eq!(condition["kind"], "condition");
}

#[test]
fn session_edits_round_trip_through_the_backend() {
    let backend = MemoryBackend::new().with_case("case-1", load_fixture("condition.json"));
    let mut session = WorkflowSession::open(backend, "case-1", LayoutConfig::default()).unwrap();
    assert_eq!(session.store().nodes().len(), 9);

    let created = session
        .insert_at("branch:no", NewStep::of(StepType::Assertion))
        .unwrap();
    assert_eq!(created.parent_id.as_deref(), Some("no"));
    let node_id = format!("action:{}", created.id);
    assert!(session.store().graph().node(&node_id).is_some());
    assert_eq!(session.store().nodes().len(), 11);

    let report = session.dry_run().unwrap();
    assert!(report.unconfigured.contains(&created.id));

    session.delete_step("c1").unwrap();
    assert_eq!(session.store().nodes().len(), 3);
    let backend = session.close();
    assert_eq!(backend.case_ids().count(), 1);
}
