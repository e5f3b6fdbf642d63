mod ranking;
mod types;

pub use types::*;

use ranking::{RankEdge, compute_ranks, order_rank_nodes};

use crate::config::{LayoutConfig, NodeSize};
use crate::error::LayoutError;
use crate::graph::{EdgeKind, GraphEdge, GraphNode, HandleSide};
use std::collections::{BTreeMap, HashMap};

/// Layered top-to-bottom layout. Computes positions for every node. Fails only when an edge references a
/// node that is not in `nodes`.
pub fn compute_layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    config: &LayoutConfig,
) -> Result<Layout, LayoutError> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let mut endpoints: Vec<(usize, usize)> = Vec::with_capacity(edges.len());
    for edge in edges {
        let lookup = |id: &str| {
            index.get(id).copied().ok_or_else(|| LayoutError::UnknownNode {
                edge: edge.id.clone(),
                node: id.to_string(),
            })
        };
        endpoints.push((lookup(&edge.source)?, lookup(&edge.target)?));
    }
    if nodes.is_empty() {
        return Ok(Layout::default());
    }

    let rank_edges: Vec<RankEdge> = edges
        .iter()
        .zip(&endpoints)
        .filter(|(edge, _)| edge.kind.is_ranked())
        .map(|(edge, (from, to))| RankEdge {
            from: *from,
            to: *to,
            min_len: edge.min_len,
        })
        .collect();
    let node_ranks = compute_ranks(nodes.len(), &rank_edges);

    let mut grid = RankGrid::new(nodes, &node_ranks, config);
    let mut routes: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];
    for (edge_idx, edge) in edges.iter().enumerate() {
        if edge.kind.is_ranked() {
            let (from, to) = endpoints[edge_idx];
            routes[edge_idx] = grid.connect(from, to);
        }
    }

    let rank_count = grid.rank_nodes.len();
    order_rank_nodes(
        &mut grid.rank_nodes,
        &grid.links,
        grid.sizes.len(),
        config.order_passes,
    );
    let centers = grid.assign_centers(config);

    let mut rank_heights = vec![0.0f32; rank_count];
    for (idx, size) in grid.sizes.iter().enumerate() {
        let rank = grid.ranks[idx];
        rank_heights[rank] = rank_heights[rank].max(size.height);
    }
    let mut rank_tops = vec![0.0f32; rank_count];
    for rank in 1..rank_count {
        rank_tops[rank] = rank_tops[rank - 1] + rank_heights[rank - 1] + config.rank_spacing;
    }

    let mut node_layouts: Vec<NodeLayout> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let size = grid.sizes[idx];
            let rank = grid.ranks[idx];
            NodeLayout {
                id: node.id.clone(),
                kind: node.kind,
                x: centers[idx] - size.width / 2.0,
                y: rank_tops[rank] + (rank_heights[rank] - size.height) / 2.0,
                width: size.width,
                height: size.height,
                rank,
                order: grid.rank_nodes[rank]
                    .iter()
                    .position(|id| *id == idx)
                    .unwrap_or(0),
                target_handle: HandleSide::Top,
                source_handle: HandleSide::Bottom,
            }
        })
        .collect();

    let routing_point = |idx: usize| {
        let rank = grid.ranks[idx];
        (centers[idx], rank_tops[rank] + rank_heights[rank] / 2.0)
    };
    let mut edge_layouts: Vec<EdgeLayout> = edges
        .iter()
        .enumerate()
        .map(|(edge_idx, edge)| {
            let (from, to) = endpoints[edge_idx];
            let via: Vec<(f32, f32)> = routes[edge_idx].iter().map(|idx| routing_point(*idx)).collect();
            EdgeLayout {
                id: edge.id.clone(),
                kind: edge.kind,
                source: edge.source.clone(),
                target: edge.target.clone(),
                points: route_edge(edge.kind, &node_layouts[from], &node_layouts[to], &via),
            }
        })
        .collect();

    route_loop_returns(&mut edge_layouts, &node_layouts, &endpoints, config);
    Ok(normalize(&mut node_layouts, edge_layouts, rank_count, config))
}

/// Rank buckets over real nodes plus the routing points of long edges.
struct RankGrid {
    sizes: Vec<NodeSize>,
    ranks: Vec<usize>,
    dummy: Vec<bool>,
    rank_nodes: Vec<Vec<usize>>,
    links: Vec<(usize, usize)>,
}

impl RankGrid {
    fn new(nodes: &[GraphNode], ranks: &[usize], config: &LayoutConfig) -> Self {
        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        let mut rank_nodes: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
        for (idx, rank) in ranks.iter().enumerate() {
            rank_nodes[*rank].push(idx);
        }
        Self {
            sizes: nodes
                .iter()
                .map(|node| config.size_of(node.kind.size_class()))
                .collect(),
            ranks: ranks.to_vec(),
            dummy: vec![false; nodes.len()],
            rank_nodes,
            links: Vec::new(),
        }
    }

    /// Links `from` to `to` through one routing point per skipped rank and
    /// returns those points. Edges that do not point downward are left out.
    fn connect(&mut self, from: usize, to: usize) -> Vec<usize> {
        let (from_rank, to_rank) = (self.ranks[from], self.ranks[to]);
        if to_rank <= from_rank {
            return Vec::new();
        }
        let mut route = Vec::new();
        let mut prev = from;
        for rank in from_rank + 1..to_rank {
            let id = self.sizes.len();
            self.sizes.push(NodeSize {
                width: 0.0,
                height: 0.0,
            });
            self.ranks.push(rank);
            self.dummy.push(true);
            self.rank_nodes[rank].push(id);
            self.links.push((prev, id));
            route.push(id);
            prev = id;
        }
        self.links.push((prev, to));
        route
    }

    /// Minimum distance between the centers of two neighbours in a rank.
    fn separation(&self, left: usize, right: usize, config: &LayoutConfig) -> f32 {
        let gap = if self.dummy[left] || self.dummy[right] {
            config.edge_spacing
        } else {
            config.node_spacing
        };
        (self.sizes[left].width + self.sizes[right].width) / 2.0 + gap
    }

    /// Cross-axis centers: packed ranks, then alternating sweeps that pull
    /// every node toward the median of its neighbours in the previous rank.
    fn assign_centers(&self, config: &LayoutConfig) -> Vec<f32> {
        let count = self.sizes.len();
        let mut upper: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut lower: Vec<Vec<usize>> = vec![Vec::new(); count];
        for &(from, to) in &self.links {
            lower[from].push(to);
            upper[to].push(from);
        }

        let mut centers = vec![0.0f32; count];
        for bucket in &self.rank_nodes {
            let mut cursor = 0.0;
            for (pos, id) in bucket.iter().enumerate() {
                if pos > 0 {
                    cursor += self.separation(bucket[pos - 1], *id, config);
                }
                centers[*id] = cursor;
            }
            let offset = cursor / 2.0;
            for id in bucket {
                centers[*id] -= offset;
            }
        }

        let ranks = self.rank_nodes.len();
        for _ in 0..config.align_passes {
            for rank in 1..ranks {
                self.align_rank(rank, &upper, &mut centers, config);
            }
            for rank in (0..ranks.saturating_sub(1)).rev() {
                self.align_rank(rank, &lower, &mut centers, config);
            }
        }
        for rank in 1..ranks {
            self.align_rank(rank, &upper, &mut centers, config);
        }
        centers
    }

    fn align_rank(&self, rank: usize, neighbors: &[Vec<usize>], centers: &mut [f32], config: &LayoutConfig) {
        let bucket = &self.rank_nodes[rank];
        if bucket.is_empty() {
            return;
        }
        let desired: Vec<f32> = bucket
            .iter()
            .map(|id| median(neighbors[*id].iter().map(|n| centers[*n])).unwrap_or(centers[*id]))
            .collect();
        let mut placed = desired.clone();
        for pos in 1..bucket.len() {
            let min = placed[pos - 1] + self.separation(bucket[pos - 1], bucket[pos], config);
            if placed[pos] < min {
                placed[pos] = min;
            }
        }
        // Spread the push-right evenly so crowded ranks stay balanced around
        // their neighbours.
        let drift = placed
            .iter()
            .zip(&desired)
            .map(|(placed, desired)| placed - desired)
            .sum::<f32>()
            / bucket.len() as f32;
        for (pos, id) in bucket.iter().enumerate() {
            centers[*id] = placed[pos] - drift;
        }
    }
}

fn median(values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut values: Vec<f32> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    })
}

fn route_edge(kind: EdgeKind, from: &NodeLayout, to: &NodeLayout, via: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let end = to.anchor(to.target_handle);
    match kind {
        // Branches leave the condition on the side their entry was placed
        // and drop into it. Yes takes the left when the entry sits centered.
        EdgeKind::Yes | EdgeKind::No => {
            let side = if to.center_x() < from.center_x() {
                HandleSide::Left
            } else if to.center_x() > from.center_x() || kind == EdgeKind::No {
                HandleSide::Right
            } else {
                HandleSide::Left
            };
            let start = from.anchor(side);
            let mut points = vec![start, (end.0, start.1)];
            points.extend_from_slice(via);
            points.push(end);
            points
        }
        EdgeKind::Continue => vec![from.anchor(HandleSide::Left), to.anchor(HandleSide::Left)],
        _ if to.rank <= from.rank => vec![
            (from.center_x(), from.center_y()),
            (to.center_x(), to.center_y()),
        ],
        _ => {
            let mut points = vec![from.anchor(from.source_handle)];
            points.extend_from_slice(via);
            points.push(end);
            points
        }
    }
}

/// Routes each loop re-entry edge left of every node spanned by the loop.
fn route_loop_returns(
    edges: &mut [EdgeLayout],
    nodes: &[NodeLayout],
    endpoints: &[(usize, usize)],
    config: &LayoutConfig,
) {
    for (edge, (from, to)) in edges.iter_mut().zip(endpoints) {
        if edge.kind != EdgeKind::Continue {
            continue;
        }
        let (top, bottom) = {
            let (a, b) = (nodes[*from].rank, nodes[*to].rank);
            (a.min(b), a.max(b))
        };
        let left = nodes
            .iter()
            .filter(|node| node.rank >= top && node.rank <= bottom)
            .map(|node| node.x)
            .fold(f32::INFINITY, f32::min);
        let lane = left - config.loop_return_offset;
        let start = nodes[*from].anchor(HandleSide::Left);
        let end = nodes[*to].anchor(HandleSide::Left);
        edge.points = vec![start, (lane, start.1), (lane, end.1), end];
    }
}

/// Shifts everything so the drawing starts at the configured margins.
fn normalize(
    nodes: &mut [NodeLayout],
    mut edges: Vec<EdgeLayout>,
    rank_count: usize,
    config: &LayoutConfig,
) -> Layout {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    for node in nodes.iter() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
    }
    for edge in &edges {
        for (x, y) in &edge.points {
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
        }
    }
    let dx = config.margin_x - min_x;
    let dy = config.margin_y - min_y;

    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    let mut positioned = BTreeMap::new();
    for node in nodes.iter_mut() {
        node.x += dx;
        node.y += dy;
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
        positioned.insert(node.id.clone(), node.clone());
    }
    for edge in &mut edges {
        for point in &mut edge.points {
            point.0 += dx;
            point.1 += dy;
            max_x = max_x.max(point.0);
            max_y = max_y.max(point.1);
        }
    }

    Layout {
        nodes: positioned,
        edges,
        rank_count,
        width: max_x + config.margin_x,
        height: max_y + config.margin_y,
    }
}
