use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Edge between node indices that takes part in rank assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct RankEdge {
    pub from: usize,
    pub to: usize,
    pub min_len: usize,
}

/// Longest-path ranking from the sources. Nodes are visited in topological
/// order with ties broken by input index; edges that point back to an
/// already visited node do not constrain ranks.
pub(super) fn compute_ranks(node_count: usize, edges: &[RankEdge]) -> Vec<usize> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indeg = vec![0usize; node_count];
    for (idx, edge) in edges.iter().enumerate() {
        adj[edge.from].push(idx);
        indeg[edge.to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    for (id, deg) in indeg.iter().enumerate() {
        if *deg == 0 {
            ready.push(Reverse(id));
        }
    }

    let mut order = Vec::with_capacity(node_count);
    let mut processed = vec![false; node_count];
    loop {
        while let Some(Reverse(id)) = ready.pop() {
            if processed[id] {
                continue;
            }
            processed[id] = true;
            order.push(id);
            for &edge_idx in &adj[id] {
                let next = edges[edge_idx].to;
                if processed[next] {
                    continue;
                }
                indeg[next] = indeg[next].saturating_sub(1);
                if indeg[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() >= node_count {
            break;
        }

        // Cycle: the earliest remaining node becomes a source and its
        // incoming edges are treated as back-edges.
        match (0..node_count).find(|id| !processed[*id]) {
            Some(id) => ready.push(Reverse(id)),
            None => break,
        }
    }

    let mut visit_index = vec![0usize; node_count];
    for (idx, id) in order.iter().enumerate() {
        visit_index[*id] = idx;
    }

    let mut ranks = vec![0usize; node_count];
    for &node in &order {
        for &edge_idx in &adj[node] {
            let edge = &edges[edge_idx];
            if visit_index[edge.to] <= visit_index[node] {
                continue;
            }
            ranks[edge.to] = ranks[edge.to].max(ranks[node] + edge.min_len.max(1));
        }
    }
    ranks
}

/// Median-heuristic crossing reduction, alternating downward and upward
/// sweeps. `links` must only connect adjacent ranks.
pub(super) fn order_rank_nodes(
    rank_nodes: &mut [Vec<usize>],
    links: &[(usize, usize)],
    node_count: usize,
    passes: usize,
) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for &(from, to) in links {
        outgoing[from].push(to);
        incoming[to].push(from);
    }

    let mut positions = vec![0usize; node_count];
    let update_positions = |rank_nodes: &[Vec<usize>], positions: &mut Vec<usize>| {
        for bucket in rank_nodes {
            for (idx, id) in bucket.iter().enumerate() {
                positions[*id] = idx;
            }
        }
    };
    update_positions(&*rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<usize>, neighbors: &[Vec<usize>], positions: &[usize]| {
        let mut keyed: Vec<(f32, usize, usize)> = bucket
            .iter()
            .enumerate()
            .map(|(idx, id)| (median_position(*id, neighbors, positions, idx), idx, *id))
            .collect();
        keyed.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        *bucket = keyed.into_iter().map(|(_, _, id)| id).collect();
    };

    for _ in 0..passes.max(1) {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(&*rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len() - 1).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(&*rank_nodes, &mut positions);
        }
    }
}

fn median_position(node: usize, neighbors: &[Vec<usize>], positions: &[usize], current: usize) -> f32 {
    let mut values: Vec<f32> = neighbors[node]
        .iter()
        .map(|neighbor| positions[*neighbor] as f32)
        .collect();
    if values.is_empty() {
        return current as f32;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: usize, to: usize) -> RankEdge {
        RankEdge { from, to, min_len: 1 }
    }

    #[test]
    fn longest_path_wins() {
        // 0 -> 1 -> 2 -> 3 and a shortcut 0 -> 3
        let ranks = compute_ranks(4, &[edge(0, 1), edge(1, 2), edge(2, 3), edge(0, 3)]);
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn min_len_stretches_ranks() {
        let ranks = compute_ranks(2, &[RankEdge { from: 0, to: 1, min_len: 3 }]);
        assert_eq!(ranks, vec![0, 3]);
    }

    #[test]
    fn cycles_terminate() {
        let ranks = compute_ranks(3, &[edge(0, 1), edge(1, 2), edge(2, 0)]);
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[1], ranks[0] + 1);
    }

    #[test]
    fn median_ordering_untangles_a_crossing() {
        // rank 0: [0, 1], rank 1: [2, 3] with 0 -> 3 and 1 -> 2
        let mut ranks = vec![vec![0, 1], vec![2, 3]];
        order_rank_nodes(&mut ranks, &[(0, 3), (1, 2)], 4, 2);
        let pos = |id: usize, bucket: &Vec<usize>| bucket.iter().position(|x| *x == id).unwrap();
        let top_first = pos(0, &ranks[0]) < pos(1, &ranks[0]);
        let bottom_first = pos(3, &ranks[1]) < pos(2, &ranks[1]);
        assert_eq!(top_first, bottom_first);
    }

    #[test]
    fn ties_keep_input_order() {
        let mut ranks = vec![vec![0], vec![1, 2]];
        order_rank_nodes(&mut ranks, &[(0, 1), (0, 2)], 3, 4);
        assert_eq!(ranks[1], vec![1, 2]);
    }
}
