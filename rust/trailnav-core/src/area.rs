use itertools::Itertools;
use serde::Serialize;

use crate::error::NavResult;
use crate::models::{BoundingBox, Edge, Node};
use crate::snapshot::GraphSnapshot;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaQuery {
    pub bbox: Option<BoundingBox>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AreaGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Nodes and edges inside `bbox` (the whole graph without one). With a category,
/// only matching edges are kept and nodes are limited to their endpoints.
pub fn graph_in_area(snapshot: &GraphSnapshot, query: &AreaQuery) -> NavResult<AreaGraph> {
    if let Some(b) = &query.bbox {
        b.validate()?;
    }
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let edge_idx: Vec<u32> = match &query.bbox {
        Some(b) => snapshot.spatial().edges_in_bbox(b),
        None => (0..snapshot.edges().len() as u32).collect(),
    };
    let edge_idx: Vec<u32> = edge_idx
        .into_iter()
        .filter(|&e| category.map_or(true, |c| snapshot.edge(e).category.eq_ignore_ascii_case(c)))
        .collect();

    let node_idx: Vec<u32> = match (category, &query.bbox) {
        (Some(_), _) => edge_idx
            .iter()
            .flat_map(|&e| {
                let (s, t) = snapshot.edge_ends(e);
                [s, t]
            })
            .sorted_unstable()
            .dedup()
            .collect(),
        (None, Some(b)) => snapshot.spatial().nodes_in_bbox(b),
        (None, None) => (0..snapshot.nodes().len() as u32).collect(),
    };

    Ok(AreaGraph {
        nodes: node_idx.iter().map(|&n| snapshot.node(n).clone()).collect(),
        edges: edge_idx.iter().map(|&e| snapshot.edge(e).clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GraphData;
    use crate::snapshot::SnapshotOptions;

    fn snapshot() -> GraphSnapshot {
        let nodes = vec![
            Node::new(1, 0.0, 0.0),
            Node::new(2, 0.001, 0.0),
            Node::new(3, 0.002, 0.0),
            Node::new(4, 0.05, 0.05),
        ];
        let edges = vec![
            Edge::new(1, 1, 2, 1.0),
            Edge::new(2, 2, 3, 1.0).with_category("stairs"),
            Edge::new(3, 3, 4, 1.0).with_category("road"),
        ];
        GraphSnapshot::build(GraphData { nodes, edges, features: vec![] }, 1, &SnapshotOptions::default()).unwrap()
    }

    #[test]
    fn whole_graph_without_filters() {
        let g = graph_in_area(&snapshot(), &AreaQuery::default()).unwrap();
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.edges.len(), 3);
    }

    #[test]
    fn bbox_limits_nodes_and_edges() {
        let q = AreaQuery { bbox: Some(BoundingBox::new(-0.0001, -0.0001, 0.0015, 0.0001)), category: None };
        let g = graph_in_area(&snapshot(), &q).unwrap();
        assert_eq!(g.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(g.edges.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn category_keeps_edge_endpoints() {
        let q = AreaQuery { bbox: None, category: Some("Stairs".into()) };
        let g = graph_in_area(&snapshot(), &q).unwrap();
        assert_eq!(g.edges.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(g.nodes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn invalid_bbox_rejected() {
        let q = AreaQuery { bbox: Some(BoundingBox::new(1.0, 0.0, 0.0, 1.0)), category: None };
        assert!(graph_in_area(&snapshot(), &q).is_err());
    }
}
