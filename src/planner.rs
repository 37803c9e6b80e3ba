//! Prerequisite-aware learning path planning.
//!
//! Targets already at the mastery threshold are dropped, the rest are layered
//! with Kahn's algorithm over `prerequisite` edges. Each layer becomes a stage:
//! everything in it is learnable once the earlier stages are done.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mastery::{topic_label, MasteryRecord};
use crate::models::{KnowledgePoint, PointType, Relation};

/// Current mastery (0-1) per knowledge point id and per topic label
#[derive(Debug, Clone, Default)]
pub struct MasteryLookup {
    by_point: HashMap<i64, f64>,
    by_label: HashMap<String, f64>,
}

impl MasteryLookup {
    pub fn from_records(records: &[MasteryRecord]) -> Self {
        let mut lookup = Self::default();
        for record in records {
            let value = (record.progress / 100.0).clamp(0.0, 1.0);
            match record.knowledge_point_id {
                Some(id) => {
                    lookup.by_point.insert(id, value);
                }
                None => {
                    lookup.by_label.insert(record.knowledge_point.clone(), value);
                }
            }
        }
        lookup
    }

    /// Explicit id first, then the topic label of the point's name, else 0
    pub fn current(&self, point: &KnowledgePoint) -> f64 {
        if let Some(v) = self.by_point.get(&point.id) {
            return *v;
        }
        self.by_label
            .get(&topic_label(&point.name))
            .copied()
            .unwrap_or(0.0)
    }

    /// Mean of all known mastery values, 0 when nothing is known
    pub fn student_level(&self) -> f64 {
        let values: Vec<f64> = self
            .by_point
            .values()
            .chain(self.by_label.values())
            .copied()
            .collect();
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}

pub struct PlanInput<'a> {
    pub targets: &'a [KnowledgePoint],
    pub relations: &'a [Relation],
    pub mastery: &'a MasteryLookup,
    pub threshold: f64,
    pub time_budget: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPoint {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub difficulty_level: i32,
    pub importance: f64,
    pub estimated_time: i32,
    pub current_mastery: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStage {
    pub index: usize,
    pub knowledge_points: Vec<PlannedPoint>,
    pub focus: String,
    pub estimated_time: i64,
    pub assessment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub stage: usize,
    pub title: String,
    pub cumulative_time: i64,
    pub knowledge_points: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPathPlan {
    pub stages: Vec<PlanStage>,
    pub total_time: i64,
    pub milestones: Vec<Milestone>,
    pub match_score: f64,
    /// Targets cut by the time budget, in learning order
    pub deferred: Vec<i64>,
    pub threshold: f64,
}

impl LearningPathPlan {
    pub fn empty(threshold: f64) -> Self {
        Self {
            stages: Vec::new(),
            total_time: 0,
            milestones: Vec::new(),
            match_score: 0.0,
            deferred: Vec::new(),
            threshold,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Planned point ids in learning order
    pub fn ordered_ids(&self) -> Vec<i64> {
        self.stages
            .iter()
            .flat_map(|s| s.knowledge_points.iter().map(|p| p.id))
            .collect()
    }
}

pub fn plan(input: &PlanInput) -> Result<LearningPathPlan> {
    let threshold = input.threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(Error::validation(format!(
            "mastery threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    let mut seen = HashSet::new();
    let candidates: Vec<PlannedPoint> = input
        .targets
        .iter()
        .filter(|p| seen.insert(p.id))
        .filter_map(|p| {
            let current = input.mastery.current(p);
            let gap = threshold - current;
            if gap <= 0.0 {
                return None;
            }
            Some(PlannedPoint {
                id: p.id,
                name: p.name.clone(),
                point_type: p.point_type,
                difficulty_level: p.difficulty_level,
                importance: p.importance,
                estimated_time: p.estimated_time,
                current_mastery: current,
                gap,
            })
        })
        .collect();

    if candidates.is_empty() {
        tracing::debug!("No target below threshold, empty plan");
        return Ok(LearningPathPlan::empty(threshold));
    }
    let gapped = candidates.len();

    let outside = untargeted_prerequisites(&candidates, input.targets, input.relations);
    if !outside.is_empty() {
        tracing::warn!(
            ?outside,
            "Planned points have prerequisites outside the targets; their order is not enforced"
        );
    }

    let levels = prerequisite_levels(candidates, input.relations)?;

    let mut stages: Vec<PlanStage> = Vec::new();
    let mut milestones = Vec::new();
    let mut deferred = Vec::new();
    let mut cumulative: i64 = 0;

    for level in levels {
        let time: i64 = level.iter().map(|p| p.estimated_time as i64).sum();
        let over_budget = input
            .time_budget
            .is_some_and(|budget| cumulative + time > budget as i64);

        if !deferred.is_empty() || (over_budget && !stages.is_empty()) {
            deferred.extend(level.iter().map(|p| p.id));
            continue;
        }

        cumulative += time;
        let index = stages.len();
        milestones.push(Milestone {
            stage: index,
            title: format!("Complete stage {}", index + 1),
            cumulative_time: cumulative,
            knowledge_points: level.iter().map(|p| p.id).collect(),
        });
        stages.push(PlanStage {
            index,
            focus: stage_focus(&level).to_string(),
            estimated_time: time,
            assessment: stage_assessment(&level, threshold),
            knowledge_points: level,
        });
    }

    if !deferred.is_empty() {
        tracing::info!(deferred = deferred.len(), "Time budget cut the plan short");
    }

    let match_score = match_score(&stages, gapped, input.mastery.student_level());

    Ok(LearningPathPlan {
        total_time: cumulative,
        stages,
        milestones,
        match_score,
        deferred,
        threshold,
    })
}

// Difficulty ascending, importance descending, id ascending
fn stage_order(a: &PlannedPoint, b: &PlannedPoint) -> Ordering {
    a.difficulty_level
        .cmp(&b.difficulty_level)
        .then_with(|| b.importance.total_cmp(&a.importance))
        .then_with(|| a.id.cmp(&b.id))
}

/// Prerequisite edges `(source, target)` into a planned point from a point that is not a target
fn untargeted_prerequisites(
    planned: &[PlannedPoint],
    targets: &[KnowledgePoint],
    relations: &[Relation],
) -> Vec<(i64, i64)> {
    let planned: HashSet<i64> = planned.iter().map(|p| p.id).collect();
    let targeted: HashSet<i64> = targets.iter().map(|p| p.id).collect();
    let mut edges: Vec<(i64, i64)> = relations
        .iter()
        .filter(|r| r.is_prerequisite())
        .filter(|r| planned.contains(&r.target_id) && !targeted.contains(&r.source_id))
        .map(|r| (r.source_id, r.target_id))
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Kahn's algorithm by levels; leftover nodes mean a prerequisite cycle.
fn prerequisite_levels(
    points: Vec<PlannedPoint>,
    relations: &[Relation],
) -> Result<Vec<Vec<PlannedPoint>>> {
    let max_rounds = points.len();
    let mut remaining: HashMap<i64, PlannedPoint> =
        points.into_iter().map(|p| (p.id, p)).collect();

    let mut in_degree: HashMap<i64, usize> = remaining.keys().map(|id| (*id, 0)).collect();
    let mut dependents: HashMap<i64, Vec<i64>> = HashMap::new();
    let mut edges = HashSet::new();

    for rel in relations.iter().filter(|r| r.is_prerequisite()) {
        if !remaining.contains_key(&rel.source_id) || !remaining.contains_key(&rel.target_id) {
            continue;
        }
        if !edges.insert((rel.source_id, rel.target_id)) {
            continue;
        }
        dependents.entry(rel.source_id).or_default().push(rel.target_id);
        if let Some(degree) = in_degree.get_mut(&rel.target_id) {
            *degree += 1;
        }
    }

    let mut ready: Vec<i64> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut levels = Vec::new();

    for _ in 0..max_rounds {
        if ready.is_empty() {
            break;
        }

        let mut level: Vec<PlannedPoint> =
            ready.iter().filter_map(|id| remaining.remove(id)).collect();
        level.sort_by(stage_order);

        let mut next = Vec::new();
        for point in &level {
            for dependent in dependents.get(&point.id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }

        levels.push(level);
        ready = next;
    }

    if !remaining.is_empty() {
        let mut stuck: Vec<i64> = remaining.into_keys().collect();
        stuck.sort_unstable();
        tracing::warn!(?stuck, "Prerequisite cycle blocks planning");
        return Err(Error::UnsatisfiableOrdering(stuck));
    }

    Ok(levels)
}

fn stage_focus(points: &[PlannedPoint]) -> &'static str {
    let dominant = PointType::ALL
        .iter()
        .copied()
        .max_by(|a, b| {
            let count = |t: PointType| points.iter().filter(|p| p.point_type == t).count();
            count(*a)
                .cmp(&count(*b))
                .then(b.category_index().cmp(&a.category_index()))
        })
        .unwrap_or(PointType::Concept);

    match dominant {
        PointType::Concept => "Understand the core concepts",
        PointType::Skill => "Practise the key skills",
        PointType::Application => "Apply the material to real problems",
    }
}

fn stage_assessment(points: &[PlannedPoint], threshold: f64) -> String {
    let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
    format!(
        "Reach {:.0}% mastery on: {}",
        threshold * 100.0,
        names.join(", ")
    )
}

/// Half difficulty fit against the student's level, half target coverage.
fn match_score(stages: &[PlanStage], gapped: usize, student_level: f64) -> f64 {
    let planned: Vec<&PlannedPoint> = stages.iter().flat_map(|s| &s.knowledge_points).collect();
    if planned.is_empty() || gapped == 0 {
        return 0.0;
    }

    let misfit = planned
        .iter()
        .map(|p| {
            let normalized = (p.difficulty_level.clamp(1, 5) - 1) as f64 / 4.0;
            (normalized - student_level).abs()
        })
        .sum::<f64>()
        / planned.len() as f64;
    let difficulty_fit = 1.0 - misfit;
    let coverage = planned.len() as f64 / gapped as f64;

    let score = (0.5 * difficulty_fit + 0.5 * coverage).clamp(0.0, 1.0);
    (score * 100.0).round() / 100.0
}
