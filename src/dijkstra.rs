//! Shortest Path First: Dijkstra over the LSDB's topology graph, rooted at
//! self (§4.8).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::types::{Cost, RouterId};

#[derive(Eq, PartialEq)]
struct HeapEntry {
    cost: Cost,
    seq: usize,
    node: RouterId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest cost pops first.
        // Ties broken by insertion order (`seq`), i.e. whichever equal-cost
        // path the heap was given first, matching the tie-break rule of
        // §4.8 (no cross-node consistency is required).
        other.cost.cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes, for every destination reachable from `source` over `graph`,
/// the first hop and total distance of the shortest path. `source` itself
/// is never in the result.
pub fn shortest_paths(
    graph: &HashMap<RouterId, HashMap<RouterId, Cost>>,
    source: &str,
) -> HashMap<RouterId, (RouterId, Cost)> {
    let mut distance: HashMap<RouterId, Cost> = HashMap::new();
    let mut previous: HashMap<RouterId, RouterId> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq_counter = 0usize;

    distance.insert(source.to_string(), 0);
    heap.push(HeapEntry {
        cost: 0,
        seq: seq_counter,
        node: source.to_string(),
    });

    while let Some(HeapEntry { cost, node, .. }) = heap.pop() {
        if cost > *distance.get(&node).unwrap_or(&Cost::MAX) {
            continue;
        }
        let Some(edges) = graph.get(&node) else { continue };
        for (neighbor, edge_cost) in edges {
            let candidate = cost + edge_cost;
            let better = candidate < *distance.get(neighbor).unwrap_or(&Cost::MAX);
            if better {
                distance.insert(neighbor.clone(), candidate);
                previous.insert(neighbor.clone(), node.clone());
                seq_counter += 1;
                heap.push(HeapEntry {
                    cost: candidate,
                    seq: seq_counter,
                    node: neighbor.clone(),
                });
            }
        }
    }

    let mut routes = HashMap::new();
    for dest in distance.keys() {
        if dest == source {
            continue;
        }
        if let Some(next_hop) = first_hop(source, dest, &previous) {
            routes.insert(dest.clone(), (next_hop, distance[dest]));
        }
    }
    routes
}

/// Walks `previous` back from `dest` to `source`, returning the node
/// adjacent to `source` on that path (the next hop).
fn first_hop(source: &str, dest: &str, previous: &HashMap<RouterId, RouterId>) -> Option<RouterId> {
    let mut current = dest.to_string();
    let mut hop = dest.to_string();
    loop {
        let pred = previous.get(&current)?;
        if pred == source {
            return Some(hop);
        }
        hop = pred.clone();
        current = pred.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(graph: &mut HashMap<RouterId, HashMap<RouterId, Cost>>, a: &str, b: &str, cost: Cost) {
        graph.entry(a.to_string()).or_default().insert(b.to_string(), cost);
        graph.entry(b.to_string()).or_default().insert(a.to_string(), cost);
    }

    #[test]
    fn self_is_never_a_destination() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 1);
        let routes = shortest_paths(&graph, "A");
        assert!(!routes.contains_key("A"));
    }

    #[test]
    fn unreachable_destinations_are_omitted() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 1);
        graph.entry("C".to_string()).or_default();
        let routes = shortest_paths(&graph, "A");
        assert!(!routes.contains_key("C"));
    }

    #[test]
    fn three_node_linear_costs() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 1);
        edge(&mut graph, "B", "C", 2);
        let routes = shortest_paths(&graph, "A");
        assert_eq!(routes["B"], ("B".to_string(), 1));
        assert_eq!(routes["C"], ("B".to_string(), 3));

        let routes_from_c = shortest_paths(&graph, "C");
        assert_eq!(routes_from_c["B"], ("B".to_string(), 2));
        assert_eq!(routes_from_c["A"], ("B".to_string(), 3));
    }

    #[test]
    fn ring_reroutes_around_a_failed_node() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 1);
        edge(&mut graph, "B", "C", 1);
        edge(&mut graph, "C", "D", 1);
        edge(&mut graph, "D", "A", 1);
        let routes = shortest_paths(&graph, "A");
        assert_eq!(routes["C"].1, 2);

        // Remove B: only the D-side path to C remains.
        graph.remove("B");
        graph.get_mut("A").unwrap().remove("B");
        graph.get_mut("C").unwrap().remove("B");
        let routes = shortest_paths(&graph, "A");
        assert_eq!(routes["C"], ("D".to_string(), 2));
    }

    #[test]
    fn distances_satisfy_triangle_inequality() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 5);
        edge(&mut graph, "B", "C", 5);
        edge(&mut graph, "A", "C", 3);
        let routes = shortest_paths(&graph, "A");
        assert!(routes["C"].1 <= routes["B"].1 + 5);
    }

    #[test]
    fn rerunning_spf_on_unchanged_graph_is_deterministic() {
        let mut graph = HashMap::new();
        edge(&mut graph, "A", "B", 1);
        edge(&mut graph, "B", "C", 2);
        let first = shortest_paths(&graph, "A");
        let second = shortest_paths(&graph, "A");
        assert_eq!(first, second);
    }
}
