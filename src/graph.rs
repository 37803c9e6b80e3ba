//! Node/link view of a course's knowledge points for graph visualisation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{KnowledgePoint, PointType, Relation, RelationType};

const SYMBOL_SCALE: f64 = 30.0;
const MIN_SYMBOL_SIZE: f64 = 15.0;
const MAX_SYMBOL_SIZE: f64 = 40.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub difficulty: i32,
    pub importance: f64,
    pub estimated_time: i32,
    pub parent_id: Option<i64>,
    pub category: u8,
    pub symbol_size: f64,
}

impl From<&KnowledgePoint> for GraphNode {
    fn from(p: &KnowledgePoint) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            point_type: p.point_type,
            difficulty: p.difficulty_level,
            importance: p.importance,
            estimated_time: p.estimated_time,
            parent_id: p.parent_id,
            category: p.point_type.category_index(),
            symbol_size: symbol_size(p.importance),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: i64,
    pub target: i64,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub strength: f64,
    /// One endpoint is not among the graph's nodes
    pub dangling: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    pub total_nodes: usize,
    pub total_links: usize,
    pub dangling_links: usize,
    pub course_id: i64,
    pub query_time_ms: u64,
}

impl KnowledgeGraph {
    pub fn with_query_time(mut self, ms: u64) -> Self {
        self.query_time_ms = ms;
        self
    }

    pub fn node(&self, id: i64) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Display size, scaled by importance and clamped to [15, 40]
pub fn symbol_size(importance: f64) -> f64 {
    (importance * SYMBOL_SCALE).clamp(MIN_SYMBOL_SIZE, MAX_SYMBOL_SIZE)
}

/// Build the graph view. Links whose endpoints fall outside `nodes` are kept
/// and flagged `dangling`.
pub fn assemble(course_id: i64, nodes: &[KnowledgePoint], relations: &[Relation]) -> KnowledgeGraph {
    let ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();

    let links: Vec<GraphLink> = relations
        .iter()
        .map(|r| GraphLink {
            source: r.source_id,
            target: r.target_id,
            relation_type: r.relation_type,
            strength: r.strength,
            dangling: !ids.contains(&r.source_id) || !ids.contains(&r.target_id),
        })
        .collect();

    let dangling_links = links.iter().filter(|l| l.dangling).count();
    if dangling_links > 0 {
        tracing::debug!(course_id, dangling_links, "Graph has links leaving the node set");
    }

    KnowledgeGraph {
        total_nodes: nodes.len(),
        total_links: links.len(),
        nodes: nodes.iter().map(GraphNode::from).collect(),
        links,
        dangling_links,
        course_id,
        query_time_ms: 0,
    }
}
