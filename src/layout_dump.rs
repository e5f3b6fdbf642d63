use crate::graph::{FlowGraph, HandleSide, InsertionPoint};
use crate::layout::Layout;
use crate::store::GraphStore;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Positioned workflow in the shape the canvas consumes.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub case_id: Option<String>,
    pub width: f32,
    pub height: f32,
    pub rank_count: usize,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    /// Visual component the node is drawn with.
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rank: usize,
    pub order: usize,
    pub target_position: HandleSide,
    pub source_position: HandleSide,
    pub label: Option<String>,
    pub step_id: Option<String>,
    pub step_type: Option<String>,
    pub insertion: Option<InsertionPoint>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub kind: String,
    pub source: String,
    pub target: String,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    /// Nodes follow graph order; nodes the layout did not place are left out.
    pub fn from_layout(layout: &Layout, graph: &FlowGraph, case_id: Option<&str>) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .filter_map(|node| {
                let placed = layout.nodes.get(&node.id)?;
                let payload = node.payload();
                Some(NodeDump {
                    id: node.id.clone(),
                    kind: node.kind.tag().to_string(),
                    x: placed.x,
                    y: placed.y,
                    width: placed.width,
                    height: placed.height,
                    rank: placed.rank,
                    order: placed.order,
                    target_position: placed.target_handle,
                    source_position: placed.source_handle,
                    label: payload.map(|step| step.display_label()),
                    step_id: payload.map(|step| step.id.clone()),
                    step_type: payload.map(|step| step.type_field.to_string()),
                    insertion: node.insertion_point().cloned(),
                })
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                kind: edge.kind.tag().to_string(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            case_id: case_id.map(str::to_string),
            width: layout.width,
            height: layout.height,
            rank_count: layout.rank_count,
            nodes,
            edges,
        }
    }

    pub fn from_store(store: &GraphStore) -> Self {
        Self::from_layout(store.layout(), store.graph(), store.case_id())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_layout_dump(path: &Path, store: &GraphStore) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_store(store);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::step::{Step, StepType};

    #[test]
    fn dump_carries_canvas_fields() {
        let mut store = GraphStore::new(LayoutConfig::default());
        store.set_case_id(Some("case-3".to_string()));
        store
            .set_graph(vec![Step::new("l1", StepType::Loop, 1)])
            .unwrap();
        let dump = LayoutDump::from_store(&store);
        assert_eq!(dump.nodes.len(), 5);
        assert_eq!(dump.edges.len(), 5);

        let json: serde_json::Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
        assert_eq!(json["case_id"], "case-3");
        let looped = &json["nodes"][1];
        assert_eq!(looped["kind"], "loop-start");
        assert_eq!(looped["label"], "Configure [Loop]");
        assert_eq!(looped["target_position"], "top");
        assert_eq!(json["nodes"][2]["insertion"]["parent_id"], "l1");
        assert!(json["edges"].as_array().unwrap().iter().any(|edge| edge["kind"] == "continue"));
    }

    #[test]
    fn writes_dump_files() {
        let mut store = GraphStore::new(LayoutConfig::default());
        store
            .set_graph(vec![Step::new("a1", StepType::Assertion, 1)])
            .unwrap();
        let path = std::env::temp_dir().join(format!("caseflow-dump-{}.json", std::process::id()));
        write_layout_dump(&path, &store).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["nodes"][1]["id"], "action:a1");
    }
}
