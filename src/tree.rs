//! Parent/child forest over a course's knowledge points.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::{KnowledgePoint, PointType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub difficulty: i32,
    pub importance: f64,
    pub estimated_time: i32,
    pub order_index: i32,
    /// Absent for leaves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn leaf(p: &KnowledgePoint) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            point_type: p.point_type,
            difficulty: p.difficulty_level,
            importance: p.importance,
            estimated_time: p.estimated_time,
            order_index: p.order_index,
            children: None,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn size(&self) -> usize {
        1 + self.children().iter().map(TreeNode::size).sum::<usize>()
    }
}

struct Builder<'a> {
    by_parent: HashMap<Option<i64>, Vec<&'a KnowledgePoint>>,
    visited: HashSet<i64>,
    max_depth: usize,
}

impl<'a> Builder<'a> {
    fn descend(&mut self, point: &'a KnowledgePoint, depth: usize) -> TreeNode {
        let mut node = TreeNode::leaf(point);

        if depth + 1 >= self.max_depth {
            if self.by_parent.contains_key(&Some(point.id)) {
                tracing::warn!(id = point.id, depth, "Tree depth limit reached, children dropped");
            }
            return node;
        }

        let kids = self.by_parent.get(&Some(point.id)).cloned().unwrap_or_default();
        let mut children = Vec::with_capacity(kids.len());
        for kid in kids {
            if self.visited.insert(kid.id) {
                children.push(self.descend(kid, depth + 1));
            }
        }

        if !children.is_empty() {
            node.children = Some(children);
        }
        node
    }
}

/// Build the forest rooted at nodes without a parent, siblings ordered by
/// `(order_index, id)`.
///
/// Nodes that no root reaches (parent cycles, parents outside the given set)
/// are left out and logged.
pub fn build_forest(nodes: &[KnowledgePoint], max_depth: usize) -> Vec<TreeNode> {
    let mut by_parent: HashMap<Option<i64>, Vec<&KnowledgePoint>> = HashMap::new();
    for node in nodes {
        by_parent.entry(node.parent_id).or_default().push(node);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|p| (p.order_index, p.id));
    }

    let roots = by_parent.get(&None).cloned().unwrap_or_default();
    let mut builder = Builder {
        by_parent,
        visited: roots.iter().map(|r| r.id).collect(),
        max_depth: max_depth.max(1),
    };

    let forest: Vec<TreeNode> = roots.into_iter().map(|r| builder.descend(r, 0)).collect();

    let unreachable: Vec<i64> = nodes
        .iter()
        .filter(|n| !builder.visited.contains(&n.id))
        .map(|n| n.id)
        .collect();
    if !unreachable.is_empty() {
        tracing::warn!(?unreachable, "Knowledge points not reachable from any root");
    }

    forest
}
