use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_DIFFICULTY: i32 = 1;
pub const DEFAULT_IMPORTANCE: f64 = 0.5;
pub const DEFAULT_ESTIMATED_TIME: i32 = 30;

// Kind of knowledge point; also drives the graph category index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    Concept,
    Skill,
    Application,
}

impl PointType {
    pub const ALL: [PointType; 3] = [PointType::Concept, PointType::Skill, PointType::Application];

    pub fn as_str(&self) -> &'static str {
        match self {
            PointType::Concept => "concept",
            PointType::Skill => "skill",
            PointType::Application => "application",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "concept" | "c" => Some(PointType::Concept),
            "skill" | "s" => Some(PointType::Skill),
            "application" | "app" | "a" => Some(PointType::Application),
            _ => None,
        }
    }

    pub fn category_index(&self) -> u8 {
        match self {
            PointType::Concept => 0,
            PointType::Skill => 1,
            PointType::Application => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PointType::Concept => "Concept",
            PointType::Skill => "Skill",
            PointType::Application => "Application",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Prerequisite,
    Related,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Prerequisite => "prerequisite",
            RelationType::Related => "related",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prerequisite" | "prereq" | "p" => Some(RelationType::Prerequisite),
            "related" | "r" => Some(RelationType::Related),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub course_id: i64,
    pub parent_id: Option<i64>,
    #[serde(rename = "type")]
    pub point_type: PointType,
    #[serde(rename = "difficulty")]
    pub difficulty_level: i32,
    pub importance: f64,
    pub estimated_time: i32,
    pub order_index: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// Request to create a knowledge point. Defaults are applied in [`NewKnowledgePoint::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewKnowledgePoint {
    pub course_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<i64>,
    pub point_type: PointType,
    pub difficulty_level: i32,
    pub importance: f64,
    pub estimated_time: i32,
}

impl NewKnowledgePoint {
    pub fn new(course_id: i64, name: impl Into<String>) -> Self {
        Self {
            course_id,
            name: name.into(),
            description: None,
            parent_id: None,
            point_type: PointType::Concept,
            difficulty_level: DEFAULT_DIFFICULTY,
            importance: DEFAULT_IMPORTANCE,
            estimated_time: DEFAULT_ESTIMATED_TIME,
        }
    }

    pub fn with_type(mut self, point_type: PointType) -> Self {
        self.point_type = point_type;
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_difficulty(mut self, difficulty_level: i32) -> Self {
        self.difficulty_level = difficulty_level;
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_estimated_time(mut self, minutes: i32) -> Self {
        self.estimated_time = minutes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_difficulty(self.difficulty_level)?;
        validate_importance(self.importance)?;
        validate_estimated_time(self.estimated_time)
    }
}

/// Partial update; `None` leaves a field untouched, `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePointUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<i64>>,
    pub point_type: Option<PointType>,
    pub difficulty_level: Option<i32>,
    pub importance: Option<f64>,
    pub estimated_time: Option<i32>,
}

impl KnowledgePointUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(d) = self.difficulty_level {
            validate_difficulty(d)?;
        }
        if let Some(i) = self.importance {
            validate_importance(i)?;
        }
        if let Some(t) = self.estimated_time {
            validate_estimated_time(t)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, point: &mut KnowledgePoint) {
        if let Some(name) = &self.name {
            point.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            point.description = description.clone();
        }
        if let Some(parent_id) = self.parent_id {
            point.parent_id = parent_id;
        }
        if let Some(point_type) = self.point_type {
            point.point_type = point_type;
        }
        if let Some(d) = self.difficulty_level {
            point.difficulty_level = d;
        }
        if let Some(i) = self.importance {
            point.importance = i;
        }
        if let Some(t) = self.estimated_time {
            point.estimated_time = t;
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("knowledge point name must not be empty"));
    }
    Ok(())
}

fn validate_difficulty(level: i32) -> Result<()> {
    if !(1..=5).contains(&level) {
        return Err(Error::validation(format!(
            "difficulty level must be between 1 and 5, got {}",
            level
        )));
    }
    Ok(())
}

fn validate_importance(importance: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&importance) {
        return Err(Error::validation(format!(
            "importance must be between 0 and 1, got {}",
            importance
        )));
    }
    Ok(())
}

fn validate_estimated_time(minutes: i32) -> Result<()> {
    if minutes < 0 {
        return Err(Error::validation(format!(
            "estimated time must not be negative, got {}",
            minutes
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub relation_type: RelationType,
    pub strength: f64,
}

impl Relation {
    pub fn touches(&self, point_id: i64) -> bool {
        self.source_id == point_id || self.target_id == point_id
    }

    pub fn is_prerequisite(&self) -> bool {
        self.relation_type == RelationType::Prerequisite
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelation {
    pub source_id: i64,
    pub target_id: i64,
    pub relation_type: RelationType,
    pub strength: f64,
}

impl NewRelation {
    pub fn prerequisite(source_id: i64, target_id: i64) -> Self {
        Self {
            source_id,
            target_id,
            relation_type: RelationType::Prerequisite,
            strength: 1.0,
        }
    }

    pub fn related(source_id: i64, target_id: i64) -> Self {
        Self {
            relation_type: RelationType::Related,
            ..Self::prerequisite(source_id, target_id)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_id == self.target_id {
            return Err(Error::validation(format!(
                "knowledge point {} cannot relate to itself",
                self.source_id
            )));
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(Error::validation(format!(
                "relation strength must be between 0 and 1, got {}",
                self.strength
            )));
        }
        Ok(())
    }
}

// Prerequisite edges around one knowledge point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointRelations {
    /// Edges that must be learned before the point (point is the target)
    pub prerequisites: Vec<Relation>,
    /// Edges the point unlocks (point is the source)
    pub subsequents: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub knowledge_point_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub task_id: i64,
    pub student_id: i64,
    pub score: Option<f64>,
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionWithTask {
    pub submission: Submission,
    pub task: Task,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, page: u32, size: u32) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            (total + size as i64 - 1) / size as i64
        };
        Self {
            data,
            total,
            page,
            size,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatistics {
    pub total_points: i64,
    pub concept_count: i64,
    pub skill_count: i64,
    pub application_count: i64,
    pub relation_count: i64,
    pub prerequisite_count: i64,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod point_type_tests {
        use super::*;

        #[test]
        fn category_indexes() {
            assert_eq!(PointType::Concept.category_index(), 0);
            assert_eq!(PointType::Skill.category_index(), 1);
            assert_eq!(PointType::Application.category_index(), 2);
        }

        #[test]
        fn from_str_accepts_aliases() {
            assert_eq!(PointType::from_str("CONCEPT"), Some(PointType::Concept));
            assert_eq!(PointType::from_str("s"), Some(PointType::Skill));
            assert_eq!(PointType::from_str(" app "), Some(PointType::Application));
            assert_eq!(PointType::from_str("lecture"), None);
            assert_eq!(PointType::from_str(""), None);
        }

        #[test]
        fn as_str_round_trips() {
            for t in PointType::ALL {
                assert_eq!(PointType::from_str(t.as_str()), Some(t));
            }
        }

        #[test]
        fn serializes_lowercase() {
            let json = serde_json::to_string(&PointType::Application).unwrap();
            assert_eq!(json, "\"application\"");
        }
    }

    mod relation_type_tests {
        use super::*;

        #[test]
        fn from_str_variants() {
            assert_eq!(
                RelationType::from_str("prerequisite"),
                Some(RelationType::Prerequisite)
            );
            assert_eq!(RelationType::from_str("Related"), Some(RelationType::Related));
            assert_eq!(RelationType::from_str("depends"), None);
        }
    }

    mod new_point_tests {
        use super::*;

        #[test]
        fn new_applies_defaults() {
            let p = NewKnowledgePoint::new(1, "Linked lists");
            assert_eq!(p.difficulty_level, 1);
            assert_eq!(p.importance, 0.5);
            assert_eq!(p.estimated_time, 30);
            assert_eq!(p.point_type, PointType::Concept);
            assert!(p.parent_id.is_none());
            assert!(p.validate().is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            let p = NewKnowledgePoint::new(1, "   ");
            assert!(matches!(p.validate(), Err(Error::Validation(_))));
        }

        #[test]
        fn difficulty_out_of_range_rejected() {
            assert!(NewKnowledgePoint::new(1, "x").with_difficulty(0).validate().is_err());
            assert!(NewKnowledgePoint::new(1, "x").with_difficulty(6).validate().is_err());
            assert!(NewKnowledgePoint::new(1, "x").with_difficulty(5).validate().is_ok());
        }

        #[test]
        fn importance_out_of_range_rejected() {
            assert!(NewKnowledgePoint::new(1, "x").with_importance(1.2).validate().is_err());
            assert!(NewKnowledgePoint::new(1, "x").with_importance(-0.1).validate().is_err());
        }

        #[test]
        fn negative_time_rejected() {
            assert!(NewKnowledgePoint::new(1, "x")
                .with_estimated_time(-5)
                .validate()
                .is_err());
        }
    }

    mod update_tests {
        use super::*;

        fn point() -> KnowledgePoint {
            KnowledgePoint {
                id: 1,
                name: "Trees".to_string(),
                description: Some("old".to_string()),
                course_id: 1,
                parent_id: Some(9),
                point_type: PointType::Concept,
                difficulty_level: 2,
                importance: 0.5,
                estimated_time: 30,
                order_index: 1,
                created_at: String::new(),
                updated_at: String::new(),
            }
        }

        #[test]
        fn default_update_is_empty() {
            assert!(KnowledgePointUpdate::default().is_empty());
        }

        #[test]
        fn apply_changes_only_given_fields() {
            let mut p = point();
            let update = KnowledgePointUpdate {
                difficulty_level: Some(4),
                parent_id: Some(None),
                ..Default::default()
            };
            update.apply_to(&mut p);
            assert_eq!(p.difficulty_level, 4);
            assert_eq!(p.parent_id, None);
            assert_eq!(p.name, "Trees");
            assert_eq!(p.description.as_deref(), Some("old"));
        }

        #[test]
        fn invalid_update_rejected() {
            let update = KnowledgePointUpdate {
                importance: Some(3.0),
                ..Default::default()
            };
            assert!(update.validate().is_err());
        }
    }

    mod relation_tests {
        use super::*;

        #[test]
        fn self_loop_rejected() {
            assert!(NewRelation::prerequisite(3, 3).validate().is_err());
        }

        #[test]
        fn strength_bounds() {
            let mut r = NewRelation::related(1, 2);
            assert!(r.validate().is_ok());
            r.strength = 1.5;
            assert!(r.validate().is_err());
        }

        #[test]
        fn touches_either_endpoint() {
            let r = Relation {
                id: 1,
                source_id: 4,
                target_id: 7,
                relation_type: RelationType::Prerequisite,
                strength: 1.0,
            };
            assert!(r.touches(4));
            assert!(r.touches(7));
            assert!(!r.touches(5));
            assert!(r.is_prerequisite());
        }
    }

    mod page_tests {
        use super::*;

        #[test]
        fn total_pages_rounds_up() {
            let page: Page<i32> = Page::new(vec![], 11, 0, 5);
            assert_eq!(page.total_pages, 3);
        }

        #[test]
        fn zero_size_has_no_pages() {
            let page: Page<i32> = Page::new(vec![], 11, 0, 0);
            assert_eq!(page.total_pages, 0);
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_wraps_data() {
            let out = JsonOutput::ok(5);
            assert!(out.success);
            assert_eq!(out.data, Some(5));
            assert!(out.error.is_none());
        }

        #[test]
        fn err_carries_message() {
            let out = JsonOutput::<()>::err("boom");
            assert!(!out.success);
            assert_eq!(out.error.as_deref(), Some("boom"));
        }
    }
}
