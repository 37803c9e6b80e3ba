//! Learning path execution state.
//!
//! A saved plan becomes a path instance that moves `not_started -> active -> completed`,
//! or `active -> abandoned`. Each planned knowledge point moves `pending -> completed`;
//! the path completes once no pending node remains.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    NotStarted,
    Active,
    Completed,
    Abandoned,
}

impl PathStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathStatus::NotStarted => "not_started",
            PathStatus::Active => "active",
            PathStatus::Completed => "completed",
            PathStatus::Abandoned => "abandoned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "not_started" => Some(PathStatus::NotStarted),
            "active" => Some(PathStatus::Active),
            "completed" => Some(PathStatus::Completed),
            "abandoned" => Some(PathStatus::Abandoned),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PathStatus::NotStarted => "Not Started",
            PathStatus::Active => "Active",
            PathStatus::Completed => "Completed",
            PathStatus::Abandoned => "Abandoned",
        }
    }

    pub fn can_transition_to(&self, next: PathStatus) -> bool {
        matches!(
            (self, next),
            (PathStatus::NotStarted, PathStatus::Active)
                | (PathStatus::Active, PathStatus::Completed)
                | (PathStatus::Active, PathStatus::Abandoned)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PathStatus::Completed | PathStatus::Abandoned)
    }

    pub fn ensure_transition(&self, next: PathStatus) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Completed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(NodeStatus::Pending),
            "completed" => Some(NodeStatus::Completed),
            _ => None,
        }
    }

    pub fn ensure_completable(&self) -> Result<()> {
        match self {
            NodeStatus::Pending => Ok(()),
            NodeStatus::Completed => Err(Error::InvalidTransition {
                from: self.as_str(),
                to: NodeStatus::Completed.as_str(),
            }),
        }
    }
}

// A persisted learning path instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPathRecord {
    pub id: i64,
    pub student_id: i64,
    pub course_id: Option<i64>,
    pub status: PathStatus,
    pub threshold: f64,
    pub match_score: f64,
    pub total_time: i64,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

// One knowledge point scheduled within a path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    pub path_id: i64,
    pub knowledge_point_id: i64,
    pub name: String,
    pub stage_index: usize,
    pub position: usize,
    pub status: NodeStatus,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathProgress {
    pub path: LearningPathRecord,
    pub nodes: Vec<PathNode>,
}

impl PathProgress {
    pub fn completed_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
            .count()
    }

    /// Percentage of nodes completed (0-100)
    pub fn completion_rate(&self) -> f64 {
        if self.nodes.is_empty() {
            0.0
        } else {
            self.completed_count() as f64 / self.nodes.len() as f64 * 100.0
        }
    }

    pub fn next_node(&self) -> Option<&PathNode> {
        self.nodes.iter().find(|n| n.status == NodeStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod status_tests {
        use super::*;

        #[test]
        fn allowed_transitions() {
            assert!(PathStatus::NotStarted.can_transition_to(PathStatus::Active));
            assert!(PathStatus::Active.can_transition_to(PathStatus::Completed));
            assert!(PathStatus::Active.can_transition_to(PathStatus::Abandoned));
        }

        #[test]
        fn rejected_transitions() {
            assert!(!PathStatus::NotStarted.can_transition_to(PathStatus::Completed));
            assert!(!PathStatus::NotStarted.can_transition_to(PathStatus::Abandoned));
            assert!(!PathStatus::Completed.can_transition_to(PathStatus::Active));
            assert!(!PathStatus::Abandoned.can_transition_to(PathStatus::Active));
            assert!(!PathStatus::Active.can_transition_to(PathStatus::Active));
        }

        #[test]
        fn ensure_transition_reports_states() {
            let err = PathStatus::Completed
                .ensure_transition(PathStatus::Active)
                .unwrap_err();
            match err {
                Error::InvalidTransition { from, to } => {
                    assert_eq!(from, "completed");
                    assert_eq!(to, "active");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[test]
        fn terminal_states() {
            assert!(PathStatus::Completed.is_terminal());
            assert!(PathStatus::Abandoned.is_terminal());
            assert!(!PathStatus::Active.is_terminal());
        }

        #[test]
        fn string_round_trip() {
            for s in [
                PathStatus::NotStarted,
                PathStatus::Active,
                PathStatus::Completed,
                PathStatus::Abandoned,
            ] {
                assert_eq!(PathStatus::from_str(s.as_str()), Some(s));
            }
            assert_eq!(PathStatus::from_str("paused"), None);
        }

        #[test]
        fn completed_node_cannot_complete_again() {
            assert!(NodeStatus::Pending.ensure_completable().is_ok());
            assert!(NodeStatus::Completed.ensure_completable().is_err());
        }
    }

    mod progress_tests {
        use super::*;

        fn node(id: i64, status: NodeStatus) -> PathNode {
            PathNode {
                path_id: 1,
                knowledge_point_id: id,
                name: format!("kp{id}"),
                stage_index: 0,
                position: id as usize,
                status,
                completed_at: None,
            }
        }

        fn progress(nodes: Vec<PathNode>) -> PathProgress {
            PathProgress {
                path: LearningPathRecord {
                    id: 1,
                    student_id: 1,
                    course_id: None,
                    status: PathStatus::Active,
                    threshold: 0.8,
                    match_score: 0.5,
                    total_time: 60,
                    created_at: String::new(),
                    started_at: None,
                    completed_at: None,
                },
                nodes,
            }
        }

        #[test]
        fn completion_rate_empty() {
            assert_eq!(progress(vec![]).completion_rate(), 0.0);
        }

        #[test]
        fn completion_rate_partial() {
            let p = progress(vec![
                node(1, NodeStatus::Completed),
                node(2, NodeStatus::Pending),
                node(3, NodeStatus::Pending),
                node(4, NodeStatus::Completed),
            ]);
            assert_eq!(p.completion_rate(), 50.0);
            assert_eq!(p.next_node().map(|n| n.knowledge_point_id), Some(2));
        }
    }
}
