//! Operations exposed to callers, composed from the store and the engines.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::graph::{self, KnowledgeGraph};
use crate::mastery::{self, topic_label, MasteryReport, Recommendation, WeakPointReport};
use crate::models::{
    Course, CourseStatistics, KnowledgePoint, PointRelations, PointType, Student,
    SubmissionWithTask,
};
use crate::planner::{self, LearningPathPlan, MasteryLookup, PlanInput};
use crate::tree::{self, TreeNode};

/// Parameters for a recommended learning path
#[derive(Debug, Clone, Default)]
pub struct PathRequest {
    pub student_id: i64,
    pub course_id: Option<i64>,
    /// Explicit targets; empty means infer them from weak points
    pub targets: Vec<i64>,
    pub threshold: Option<f64>,
    pub time_budget: Option<u32>,
}

pub struct Service<'a> {
    db: &'a Database,
    config: &'a Config,
}

impl<'a> Service<'a> {
    pub fn new(db: &'a Database, config: &'a Config) -> Self {
        Self { db, config }
    }

    fn require_course(&self, id: i64) -> Result<Course> {
        self.db.get_course(id)?.ok_or(Error::not_found("course", id))
    }

    fn require_student(&self, id: i64) -> Result<Student> {
        self.db.get_student(id)?.ok_or(Error::not_found("student", id))
    }

    pub fn get_knowledge_graph(
        &self,
        course_id: i64,
        point_type: Option<PointType>,
    ) -> Result<KnowledgeGraph> {
        let started = Instant::now();
        self.require_course(course_id)?;

        let nodes = self.db.fetch_nodes(course_id, point_type)?;
        let ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();
        let relations = self.db.fetch_relations(&ids)?;

        let graph = graph::assemble(course_id, &nodes, &relations)
            .with_query_time(started.elapsed().as_millis() as u64);
        tracing::info!(
            course_id,
            nodes = graph.total_nodes,
            links = graph.total_links,
            ms = graph.query_time_ms,
            "Assembled knowledge graph"
        );
        Ok(graph)
    }

    pub fn get_knowledge_tree(&self, course_id: i64) -> Result<Vec<TreeNode>> {
        self.require_course(course_id)?;
        let nodes = self.db.fetch_course_nodes(course_id)?;
        Ok(tree::build_forest(&nodes, self.config.tree.max_depth))
    }

    pub fn get_mastery(&self, student_id: i64, course_id: Option<i64>) -> Result<MasteryReport> {
        self.require_student(student_id)?;
        if let Some(course_id) = course_id {
            self.require_course(course_id)?;
        }

        let submissions = self.db.submissions_for_student(student_id, course_id)?;
        let names = self.linked_point_names(&submissions)?;
        Ok(mastery::evaluate(student_id, course_id, &submissions, &names))
    }

    /// `None` falls back to the configured limit
    pub fn get_weak_points(&self, student_id: i64, limit: Option<usize>) -> Result<WeakPointReport> {
        let limit = limit.unwrap_or(self.config.mastery.weak_point_limit);
        if limit == 0 {
            return Err(Error::validation("weak point limit must be at least 1"));
        }
        self.require_student(student_id)?;

        let submissions = self.db.submissions_for_student(student_id, None)?;
        let names = self.linked_point_names(&submissions)?;
        Ok(mastery::weak_points(student_id, &submissions, &names, limit))
    }

    pub fn get_recommendations(&self, student_id: i64) -> Result<Vec<Recommendation>> {
        self.require_student(student_id)?;
        let submissions = self.db.submissions_for_student(student_id, None)?;
        let tasks = self.db.tasks_for_student_courses(student_id)?;
        Ok(mastery::recommendations(&submissions, &tasks))
    }

    pub fn get_recommended_path(&self, request: &PathRequest) -> Result<LearningPathPlan> {
        let threshold = request
            .threshold
            .unwrap_or(self.config.planner.mastery_threshold);
        let time_budget = request
            .time_budget
            .or(self.config.planner.time_budget_minutes);

        let report = self.get_mastery(request.student_id, request.course_id)?;

        let targets = if request.targets.is_empty() {
            self.infer_targets(request.student_id, request.course_id)?
        } else {
            let found = self.db.fetch_points_by_ids(&request.targets)?;
            if let Some(missing) = request
                .targets
                .iter()
                .find(|id| !found.iter().any(|p| p.id == **id))
            {
                return Err(Error::not_found("knowledge point", *missing));
            }
            found
        };

        let ids: HashSet<i64> = targets.iter().map(|p| p.id).collect();
        let relations = self.db.fetch_relations(&ids)?;
        let lookup = MasteryLookup::from_records(&report.knowledge_mastery);

        let plan = planner::plan(&PlanInput {
            targets: &targets,
            relations: &relations,
            mastery: &lookup,
            threshold,
            time_budget,
        })?;
        tracing::info!(
            student_id = request.student_id,
            targets = targets.len(),
            stages = plan.stages.len(),
            "Planned learning path"
        );
        Ok(plan)
    }

    // Course points matching the student's weak topics
    fn infer_targets(&self, student_id: i64, course_id: Option<i64>) -> Result<Vec<KnowledgePoint>> {
        let course_id = course_id.ok_or_else(|| {
            Error::validation("a course is required to infer targets from weak points")
        })?;

        let weak = self.get_weak_points(student_id, None)?;
        let nodes = self.db.fetch_course_nodes(course_id)?;

        let targets: Vec<KnowledgePoint> = nodes
            .into_iter()
            .filter(|node| {
                let label = topic_label(&node.name);
                weak.weak_points.iter().any(|wp| match wp.knowledge_point_id {
                    Some(id) => id == node.id,
                    None => wp.knowledge_point == label || wp.knowledge_point == node.name,
                })
            })
            .collect();

        if targets.is_empty() {
            tracing::debug!(student_id, course_id, "No weak point maps onto the course");
        }
        Ok(targets)
    }

    pub fn get_statistics(&self, course_id: i64) -> Result<CourseStatistics> {
        self.require_course(course_id)?;
        self.db.course_statistics(course_id)
    }

    pub fn get_point_relations(&self, point_id: i64) -> Result<PointRelations> {
        self.db
            .get_knowledge_point(point_id)?
            .ok_or(Error::not_found("knowledge point", point_id))?;
        self.db.point_relations(point_id)
    }

    fn linked_point_names(&self, submissions: &[SubmissionWithTask]) -> Result<HashMap<i64, String>> {
        let ids: Vec<i64> = submissions
            .iter()
            .filter_map(|s| s.task.knowledge_point_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(self
            .db
            .fetch_points_by_ids(&ids)?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewKnowledgePoint, NewRelation};

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn add_point(db: &Database, course: i64, name: &str) -> i64 {
        db.create_knowledge_point(&NewKnowledgePoint::new(course, name))
            .unwrap()
            .id
    }

    fn submit(db: &Database, student: i64, course: i64, title: &str, score: f64) {
        let task = db.add_task(course, title, None, None).unwrap();
        db.record_submission(student, task, Some(score)).unwrap();
    }

    mod graph_tests {
        use super::*;

        #[test]
        fn unknown_course_is_not_found() {
            let db = setup_db();
            let config = Config::default();
            let service = Service::new(&db, &config);
            assert!(service.get_knowledge_graph(3, None).unwrap_err().is_not_found());
        }

        #[test]
        fn cross_course_link_is_dangling() {
            let db = setup_db();
            let config = Config::default();
            let c1 = db.add_course("C1").unwrap();
            let c2 = db.add_course("C2").unwrap();
            let a = add_point(&db, c1, "a");
            let b = add_point(&db, c1, "b");
            let x = add_point(&db, c2, "x");
            db.create_relation(&NewRelation::prerequisite(a, b)).unwrap();
            db.create_relation(&NewRelation::prerequisite(x, a)).unwrap();

            let graph = Service::new(&db, &config).get_knowledge_graph(c1, None).unwrap();
            assert_eq!(graph.total_nodes, 2);
            assert_eq!(graph.total_links, 2);
            assert_eq!(graph.dangling_links, 1);
        }

        #[test]
        fn type_filter_limits_nodes() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            add_point(&db, course, "a");
            db.create_knowledge_point(
                &NewKnowledgePoint::new(course, "b").with_type(PointType::Application),
            )
            .unwrap();

            let graph = Service::new(&db, &config)
                .get_knowledge_graph(course, Some(PointType::Application))
                .unwrap();
            assert_eq!(graph.total_nodes, 1);
            assert_eq!(graph.nodes[0].category, 2);
        }

        #[test]
        fn tree_for_course() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let root = add_point(&db, course, "root");
            db.create_knowledge_point(&NewKnowledgePoint::new(course, "leaf").with_parent(root))
                .unwrap();

            let forest = Service::new(&db, &config).get_knowledge_tree(course).unwrap();
            assert_eq!(forest.len(), 1);
            assert_eq!(forest[0].children().len(), 1);
        }
    }

    mod mastery_tests {
        use super::*;

        #[test]
        fn pooled_topic_average() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            submit(&db, student, course, "数据结构作业一", 95.0);
            submit(&db, student, course, "数据结构作业二", 70.0);

            let report = Service::new(&db, &config)
                .get_mastery(student, Some(course))
                .unwrap();
            assert_eq!(report.knowledge_mastery.len(), 1);
            assert_eq!(report.knowledge_mastery[0].average_score, 82.5);
            assert_eq!(report.knowledge_mastery[0].mastery_level, 2);
        }

        #[test]
        fn no_submissions_is_empty_not_error() {
            let db = setup_db();
            let config = Config::default();
            let student = db.add_student("S").unwrap();

            let report = Service::new(&db, &config).get_mastery(student, None).unwrap();
            assert!(report.knowledge_mastery.is_empty());
            assert_eq!(report.overall_mastery, 0.0);
        }

        #[test]
        fn unknown_student_is_not_found() {
            let db = setup_db();
            let config = Config::default();
            let service = Service::new(&db, &config);
            assert!(service.get_mastery(8, None).unwrap_err().is_not_found());
            assert!(service.get_recommendations(8).unwrap_err().is_not_found());
        }

        #[test]
        fn linked_task_uses_point_name() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            let point = add_point(&db, course, "Hash tables");
            let task = db.add_task(course, "Homework 3", None, Some(point)).unwrap();
            db.record_submission(student, task, Some(64.0)).unwrap();

            let report = Service::new(&db, &config).get_mastery(student, None).unwrap();
            assert_eq!(report.knowledge_mastery[0].knowledge_point, "Hash tables");
            assert_eq!(report.knowledge_mastery[0].knowledge_point_id, Some(point));
        }

        #[test]
        fn zero_limit_rejected() {
            let db = setup_db();
            let config = Config::default();
            let student = db.add_student("S").unwrap();
            let err = Service::new(&db, &config)
                .get_weak_points(student, Some(0))
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        #[test]
        fn weak_points_use_config_limit() {
            let db = setup_db();
            let mut config = Config::default();
            config.mastery.weak_point_limit = 1;
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            submit(&db, student, course, "算法一", 30.0);
            submit(&db, student, course, "数据库一", 50.0);

            let report = Service::new(&db, &config).get_weak_points(student, None).unwrap();
            assert_eq!(report.total_weak_points, 1);
            assert_eq!(report.weak_points[0].knowledge_point, "算法");
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn targets_inferred_from_weak_points() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            let ds = add_point(&db, course, "数据结构基础");
            let algo = add_point(&db, course, "算法设计");
            add_point(&db, course, "操作系统原理");
            db.create_relation(&NewRelation::prerequisite(ds, algo)).unwrap();
            submit(&db, student, course, "数据结构作业", 50.0);
            submit(&db, student, course, "算法作业", 40.0);

            let plan = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    course_id: Some(course),
                    ..Default::default()
                })
                .unwrap();

            assert_eq!(plan.ordered_ids(), vec![ds, algo]);
            assert_eq!(plan.stages[0].knowledge_points[0].current_mastery, 0.5);
        }

        #[test]
        fn inference_needs_course() {
            let db = setup_db();
            let config = Config::default();
            let student = db.add_student("S").unwrap();

            let err = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    ..Default::default()
                })
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        #[test]
        fn nothing_to_infer_gives_empty_plan() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            add_point(&db, course, "Graphs");

            let plan = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    course_id: Some(course),
                    ..Default::default()
                })
                .unwrap();
            assert!(plan.is_empty());
        }

        #[test]
        fn unknown_explicit_target_is_not_found() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            let a = add_point(&db, course, "a");

            let err = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    targets: vec![a, 999],
                    ..Default::default()
                })
                .unwrap_err();
            assert!(err.is_not_found());
        }

        #[test]
        fn explicit_cycle_is_unsatisfiable() {
            let db = setup_db();
            let config = Config::default();
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            let p1 = add_point(&db, course, "P1");
            let p2 = add_point(&db, course, "P2");
            let p3 = add_point(&db, course, "P3");
            db.create_relation(&NewRelation::prerequisite(p1, p2)).unwrap();
            db.create_relation(&NewRelation::prerequisite(p2, p3)).unwrap();
            db.create_relation(&NewRelation::prerequisite(p3, p1)).unwrap();

            let err = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    targets: vec![p1, p2, p3],
                    ..Default::default()
                })
                .unwrap_err();
            assert!(matches!(err, Error::UnsatisfiableOrdering(_)));
        }

        #[test]
        fn config_budget_applies() {
            let db = setup_db();
            let mut config = Config::default();
            config.planner.time_budget_minutes = Some(30);
            let course = db.add_course("C").unwrap();
            let student = db.add_student("S").unwrap();
            let p1 = add_point(&db, course, "P1");
            let p2 = add_point(&db, course, "P2");
            db.create_relation(&NewRelation::prerequisite(p1, p2)).unwrap();

            let plan = Service::new(&db, &config)
                .get_recommended_path(&PathRequest {
                    student_id: student,
                    targets: vec![p1, p2],
                    ..Default::default()
                })
                .unwrap();
            assert_eq!(plan.ordered_ids(), vec![p1]);
            assert_eq!(plan.deferred, vec![p2]);
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn relations_of_unknown_point() {
            let db = setup_db();
            let config = Config::default();
            let service = Service::new(&db, &config);
            assert!(service.get_point_relations(1).unwrap_err().is_not_found());
            assert!(service.get_statistics(1).unwrap_err().is_not_found());
        }
    }
}
