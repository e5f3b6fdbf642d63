use crate::config::RenderConfig;
use crate::graph::{EdgeKind, FlowGraph, NodeKind};
use crate::layout::{EdgeLayout, Layout, NodeLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

/// Static preview of a positioned workflow.
pub fn render_svg(graph: &FlowGraph, layout: &Layout, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let pad = config.padding;
    let width = (layout.width + pad * 2.0).max(config.min_width);
    let height = (layout.height + pad * 2.0).max(config.min_height);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for kind in [EdgeKind::Flow, EdgeKind::Yes, EdgeKind::No, EdgeKind::Continue] {
        svg.push_str(&format!(
            "<marker id=\"arrow-{}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
            kind.tag(),
            theme.edge_stroke(kind)
        ));
    }
    svg.push_str("</defs>");
    svg.push_str(&format!("<g transform=\"translate({pad:.2} {pad:.2})\">"));

    for edge in &layout.edges {
        svg.push_str(&edge_svg(edge, theme));
    }

    for node in &graph.nodes {
        let Some(placed) = layout.nodes.get(&node.id) else {
            continue;
        };
        let step_type = node.payload().map(|step| &step.type_field);
        let fill = theme.node_fill(node.kind, step_type);
        match node.kind {
            NodeKind::InsertionPoint => svg.push_str(&insertion_svg(placed, fill, theme)),
            NodeKind::LoopEnd => svg.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                placed.center_x(),
                placed.center_y(),
                placed.width.min(placed.height) / 2.0,
                fill,
                theme.continue_color
            )),
            NodeKind::Action | NodeKind::Condition | NodeKind::LoopStart => {
                let radius = if node.kind == NodeKind::Condition { 20.0 } else { 8.0 };
                svg.push_str(&format!(
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{radius}\" ry=\"{radius}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1.4\"/>",
                    placed.x,
                    placed.y,
                    placed.width,
                    placed.height,
                    fill,
                    theme.border_color
                ));
                let label = node.payload().map(|step| step.display_label()).unwrap_or_default();
                svg.push_str(&text_svg(placed.center_x(), placed.center_y(), &label, theme));
            }
        }
    }

    svg.push_str("</g></svg>");
    svg
}

fn edge_svg(edge: &EdgeLayout, theme: &Theme) -> String {
    let stroke = theme.edge_stroke(edge.kind);
    let (dash, marker) = match edge.kind {
        EdgeKind::Continue => (" stroke-dasharray=\"6 4\"", "continue"),
        EdgeKind::Yes => ("", "yes"),
        EdgeKind::No => ("", "no"),
        EdgeKind::Connection => (" stroke-dasharray=\"3 3\"", "flow"),
        EdgeKind::Flow | EdgeKind::End => ("", "flow"),
    };
    let mut out = format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\"{} marker-end=\"url(#arrow-{})\"/>",
        points_to_path(&edge.points),
        stroke,
        dash,
        marker
    );
    let branch_label = match edge.kind {
        EdgeKind::Yes => Some("Yes"),
        EdgeKind::No => Some("No"),
        _ => None,
    };
    if let Some(label) = branch_label {
        let (x, y) = edge_midpoint(edge);
        out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{label}</text>",
            y - 4.0,
            theme.font_family,
            theme.font_size,
            stroke
        ));
    }
    out
}

fn insertion_svg(node: &NodeLayout, fill: &str, theme: &Theme) -> String {
    let (cx, cy) = (node.center_x(), node.center_y());
    let r = node.width.min(node.height) / 2.0 - 2.0;
    format!(
        "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\" stroke=\"{line}\" stroke-width=\"1\"/><path d=\"M {:.2} {cy:.2} L {:.2} {cy:.2} M {cx:.2} {:.2} L {cx:.2} {:.2}\" stroke=\"{line}\" stroke-width=\"1.4\"/>",
        cx - r / 2.0,
        cx + r / 2.0,
        cy - r / 2.0,
        cy + r / 2.0,
        line = theme.line_color
    )
}

fn text_svg(x: f32, y: f32, label: &str, theme: &Theme) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        y + theme.font_size / 3.0,
        theme.font_family,
        theme.font_size,
        theme.text_color,
        escape_xml(label)
    )
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

fn edge_midpoint(edge: &EdgeLayout) -> (f32, f32) {
    if edge.points.len() >= 4 {
        let p1 = edge.points[1];
        let p2 = edge.points[2];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else if edge.points.len() >= 2 {
        let p1 = edge.points[0];
        let p2 = edge.points[edge.points.len() - 1];
        ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0)
    } else {
        (0.0, 0.0)
    }
}

pub fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents)?;
        }
        None => {
            print!("{}", contents);
        }
    }
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_graph;
    use crate::config::LayoutConfig;
    use crate::layout::compute_layout;
    use crate::step::{Step, StepType};

    #[test]
    fn render_svg_basic() {
        let mut condition = Step::new("c1", StepType::Condition, 1).with_children(vec![
            Step::new("y", StepType::YesCase, 1),
            Step::new("n", StepType::NoCase, 2),
        ]);
        condition.name = Some("Cart <empty>".to_string());
        let graph = build_graph(&[condition, Step::new("a1", StepType::Assertion, 2)]);
        let layout = compute_layout(&graph.nodes, &graph.edges, &LayoutConfig::default()).unwrap();
        let svg = render_svg(&graph, &layout, &Theme::canvas(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Cart &lt;empty&gt;"));
        assert!(svg.contains("Configure [Assertion]"));
        assert!(svg.contains(">Yes</text>"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn empty_layout_keeps_minimum_canvas() {
        let svg = render_svg(
            &FlowGraph::default(),
            &Layout::default(),
            &Theme::canvas(),
            &RenderConfig::default(),
        );
        assert!(svg.contains("width=\"200\""));
    }
}
