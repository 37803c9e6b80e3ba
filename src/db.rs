use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{
    Course, CourseStatistics, KnowledgePoint, KnowledgePointUpdate, NewKnowledgePoint,
    NewRelation, Page, PointRelations, PointType, Relation, RelationType, Student, Submission,
    SubmissionWithTask, Task,
};
use crate::path::{LearningPathRecord, NodeStatus, PathNode, PathProgress, PathStatus};
use crate::planner::LearningPathPlan;

const POINT_COLUMNS: &str = "id, name, description, course_id, parent_id, type, \
    difficulty_level, importance, estimated_time, order_index, created_at, updated_at";

// Ids bound per IN (...) list, well under SQLite's host parameter limit
const MAX_BOUND_IDS: usize = 500;

const PATH_COLUMNS: &str = "id, student_id, course_id, status, threshold, match_score, \
    total_time, created_at, started_at, completed_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS knowledge_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                course_id INTEGER NOT NULL,
                parent_id INTEGER,
                type TEXT NOT NULL DEFAULT 'concept' CHECK(type IN ('concept', 'skill', 'application')),
                difficulty_level INTEGER NOT NULL DEFAULT 1 CHECK(difficulty_level BETWEEN 1 AND 5),
                importance REAL NOT NULL DEFAULT 0.5,
                estimated_time INTEGER NOT NULL DEFAULT 30,
                order_index INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
                FOREIGN KEY (parent_id) REFERENCES knowledge_points(id) ON DELETE SET NULL
            );

            -- Relations are removed explicitly when a point is deleted
            CREATE TABLE IF NOT EXISTS knowledge_point_relations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id INTEGER NOT NULL,
                target_id INTEGER NOT NULL,
                relation_type TEXT NOT NULL CHECK(relation_type IN ('prerequisite', 'related')),
                strength REAL NOT NULL DEFAULT 1.0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (source_id, target_id, relation_type),
                FOREIGN KEY (source_id) REFERENCES knowledge_points(id),
                FOREIGN KEY (target_id) REFERENCES knowledge_points(id)
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                knowledge_point_id INTEGER,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE,
                FOREIGN KEY (knowledge_point_id) REFERENCES knowledge_points(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL,
                student_id INTEGER NOT NULL,
                score REAL,
                submitted_at TEXT,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS learning_paths (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                course_id INTEGER,
                status TEXT NOT NULL DEFAULT 'not_started' CHECK(status IN ('not_started', 'active', 'completed', 'abandoned')),
                threshold REAL NOT NULL,
                match_score REAL NOT NULL DEFAULT 0,
                total_time INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE,
                FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS learning_path_nodes (
                path_id INTEGER NOT NULL,
                knowledge_point_id INTEGER NOT NULL,
                stage_index INTEGER NOT NULL,
                position INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending', 'completed')),
                completed_at TEXT,
                PRIMARY KEY (path_id, knowledge_point_id),
                FOREIGN KEY (path_id) REFERENCES learning_paths(id) ON DELETE CASCADE,
                FOREIGN KEY (knowledge_point_id) REFERENCES knowledge_points(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_points_course ON knowledge_points(course_id, order_index);
            CREATE INDEX IF NOT EXISTS idx_points_parent ON knowledge_points(parent_id);
            CREATE INDEX IF NOT EXISTS idx_relations_source ON knowledge_point_relations(source_id);
            CREATE INDEX IF NOT EXISTS idx_relations_target ON knowledge_point_relations(target_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_course ON tasks(course_id);
            CREATE INDEX IF NOT EXISTS idx_submissions_student ON submissions(student_id);
            CREATE INDEX IF NOT EXISTS idx_paths_student ON learning_paths(student_id);
            "#,
        )?;

        // Older databases predate the explicit task link
        self.migrate()?;

        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_tasks_point ON tasks(knowledge_point_id);",
        )?;

        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let has_point_link = self
            .conn
            .prepare("SELECT knowledge_point_id FROM tasks LIMIT 1")
            .is_ok();

        if !has_point_link {
            tracing::info!("Migrating tasks table: adding knowledge_point_id");
            self.conn.execute_batch(
                "ALTER TABLE tasks ADD COLUMN knowledge_point_id INTEGER \
                 REFERENCES knowledge_points(id) ON DELETE SET NULL;",
            )?;
        }

        Ok(())
    }

    // Course and student operations

    pub fn add_course(&self, name: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::validation("course name must not be empty"));
        }
        self.conn.execute(
            "INSERT INTO courses (name) VALUES (?1)",
            params![name.trim()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let course = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM courses WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Course {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM courses ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Course {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn add_student(&self, name: &str) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(Error::validation("student name must not be empty"));
        }
        self.conn.execute(
            "INSERT INTO students (name) VALUES (?1)",
            params![name.trim()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_student(&self, id: i64) -> Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                "SELECT id, name FROM students WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Student {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    fn require_course(&self, id: i64) -> Result<Course> {
        self.get_course(id)?.ok_or(Error::not_found("course", id))
    }

    // Graph store access

    /// All nodes of a course, optionally restricted to one type
    pub fn fetch_nodes(
        &self,
        course_id: i64,
        point_type: Option<PointType>,
    ) -> Result<Vec<KnowledgePoint>> {
        let sql = format!(
            "SELECT {} FROM knowledge_points \
             WHERE course_id = ?1 AND (?2 IS NULL OR type = ?2) \
             ORDER BY order_index, id",
            POINT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![course_id, point_type.map(|t| t.as_str())],
            point_from_row,
        )?;
        let nodes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        tracing::debug!(course_id, count = nodes.len(), "Fetched knowledge points");
        Ok(nodes)
    }

    pub fn fetch_course_nodes(&self, course_id: i64) -> Result<Vec<KnowledgePoint>> {
        self.fetch_nodes(course_id, None)
    }

    /// Look up points by id, in the order given; unknown ids are skipped
    pub fn fetch_points_by_ids(&self, ids: &[i64]) -> Result<Vec<KnowledgePoint>> {
        let mut found: HashMap<i64, KnowledgePoint> = HashMap::new();
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "SELECT {} FROM knowledge_points WHERE id IN ({})",
                POINT_COLUMNS,
                numbered_placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), point_from_row)?;
            for point in rows {
                let point = point?;
                found.insert(point.id, point);
            }
        }

        Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
    }

    /// Every relation touching any of `node_ids` at either end
    pub fn fetch_relations(&self, node_ids: &HashSet<i64>) -> Result<Vec<Relation>> {
        let mut ids: Vec<i64> = node_ids.iter().copied().collect();
        ids.sort_unstable();

        // A relation can match in two chunks; key by id to keep one copy in id order
        let mut found: BTreeMap<i64, Relation> = BTreeMap::new();
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let sql = format!(
                "SELECT id, source_id, target_id, relation_type, strength \
                 FROM knowledge_point_relations \
                 WHERE source_id IN ({0}) OR target_id IN ({0})",
                numbered_placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), relation_from_row)?;
            for relation in rows {
                let relation = relation?;
                found.insert(relation.id, relation);
            }
        }

        Ok(found.into_values().collect())
    }

    // Knowledge point authoring

    pub fn create_knowledge_point(&self, new: &NewKnowledgePoint) -> Result<KnowledgePoint> {
        new.validate()?;
        self.require_course(new.course_id)?;
        if let Some(parent_id) = new.parent_id {
            self.check_point_in_course(new.course_id, parent_id)?;
        }

        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_points WHERE course_id = ?1",
            params![new.course_id],
            |row| row.get(0),
        )?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            INSERT INTO knowledge_points
                (name, description, course_id, parent_id, type, difficulty_level,
                 importance, estimated_time, order_index, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
            params![
                new.name.trim(),
                new.description,
                new.course_id,
                new.parent_id,
                new.point_type.as_str(),
                new.difficulty_level,
                new.importance,
                new.estimated_time,
                count + 1,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, course_id = new.course_id, "Created knowledge point");

        self.get_knowledge_point(id)?
            .ok_or(Error::not_found("knowledge point", id))
    }

    pub fn get_knowledge_point(&self, id: i64) -> Result<Option<KnowledgePoint>> {
        let sql = format!("SELECT {} FROM knowledge_points WHERE id = ?1", POINT_COLUMNS);
        let point = self
            .conn
            .query_row(&sql, params![id], point_from_row)
            .optional()?;
        Ok(point)
    }

    pub fn update_knowledge_point(
        &self,
        id: i64,
        update: &KnowledgePointUpdate,
    ) -> Result<KnowledgePoint> {
        update.validate()?;
        let mut point = self
            .get_knowledge_point(id)?
            .ok_or(Error::not_found("knowledge point", id))?;

        if update.is_empty() {
            return Ok(point);
        }

        if let Some(Some(parent_id)) = update.parent_id {
            if parent_id == id {
                return Err(Error::validation("a knowledge point cannot be its own parent"));
            }
            self.check_point_in_course(point.course_id, parent_id)?;
            if self.ancestors(parent_id)?.contains(&id) {
                return Err(Error::validation(format!(
                    "moving {} under {} would create a parent cycle",
                    id, parent_id
                )));
            }
        }

        update.apply_to(&mut point);
        point.updated_at = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"
            UPDATE knowledge_points
            SET name = ?1, description = ?2, parent_id = ?3, type = ?4,
                difficulty_level = ?5, importance = ?6, estimated_time = ?7, updated_at = ?8
            WHERE id = ?9
            "#,
            params![
                point.name,
                point.description,
                point.parent_id,
                point.point_type.as_str(),
                point.difficulty_level,
                point.importance,
                point.estimated_time,
                point.updated_at,
                id,
            ],
        )?;
        tracing::info!(id, "Updated knowledge point");

        Ok(point)
    }

    /// Pages are 1-based
    pub fn list_knowledge_points_paged(
        &self,
        course_id: i64,
        page: u32,
        size: u32,
    ) -> Result<Page<KnowledgePoint>> {
        if page == 0 || size == 0 {
            return Err(Error::validation("page and size must be at least 1"));
        }

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM knowledge_points WHERE course_id = ?1",
            params![course_id],
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM knowledge_points WHERE course_id = ?1 \
             ORDER BY order_index, id LIMIT ?2 OFFSET ?3",
            POINT_COLUMNS
        );
        let offset = (page as i64 - 1) * size as i64;
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![course_id, size as i64, offset], point_from_row)?;
        let data = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page::new(data, total, page, size))
    }

    /// Delete a point and every relation touching it, atomically
    pub fn delete_knowledge_point(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM knowledge_points WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(false);
        }

        let path_ids: Vec<i64> = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT path_id FROM learning_path_nodes WHERE knowledge_point_id = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let relations = tx.execute(
            "DELETE FROM knowledge_point_relations WHERE source_id = ?1 OR target_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM knowledge_points WHERE id = ?1", params![id])?;

        // Path nodes cascade away; an active path left with nothing pending is done
        let now = Utc::now().to_rfc3339();
        for path_id in path_ids {
            let finished = tx.execute(
                "UPDATE learning_paths SET status = ?1, completed_at = ?2 \
                 WHERE id = ?3 AND status = ?4 AND NOT EXISTS ( \
                     SELECT 1 FROM learning_path_nodes \
                     WHERE path_id = ?3 AND status = ?5)",
                params![
                    PathStatus::Completed.as_str(),
                    now,
                    path_id,
                    PathStatus::Active.as_str(),
                    NodeStatus::Pending.as_str()
                ],
            )?;
            if finished > 0 {
                tracing::info!(path_id, point_id = id, "Learning path completed by deletion");
            }
        }
        tx.commit()?;

        tracing::info!(id, relations, "Deleted knowledge point");
        Ok(true)
    }

    fn check_point_in_course(&self, course_id: i64, point_id: i64) -> Result<()> {
        let point = self
            .get_knowledge_point(point_id)?
            .ok_or(Error::not_found("knowledge point", point_id))?;
        if point.course_id != course_id {
            return Err(Error::validation(format!(
                "knowledge point {} belongs to course {}, not {}",
                point_id, point.course_id, course_id
            )));
        }
        Ok(())
    }

    // Ancestor chain of a point, stopping at a repeat
    fn ancestors(&self, id: i64) -> Result<HashSet<i64>> {
        let mut seen = HashSet::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if !seen.insert(node) {
                break;
            }
            current = self
                .conn
                .query_row(
                    "SELECT parent_id FROM knowledge_points WHERE id = ?1",
                    params![node],
                    |row| row.get::<_, Option<i64>>(0),
                )
                .optional()?
                .flatten();
        }
        Ok(seen)
    }

    // Relation operations

    pub fn create_relation(&self, new: &NewRelation) -> Result<Relation> {
        new.validate()?;
        let source = self
            .get_knowledge_point(new.source_id)?
            .ok_or(Error::not_found("knowledge point", new.source_id))?;
        let target = self
            .get_knowledge_point(new.target_id)?
            .ok_or(Error::not_found("knowledge point", new.target_id))?;

        if source.course_id != target.course_id {
            tracing::warn!(
                source = source.id,
                target = target.id,
                "Relation crosses courses {} and {}",
                source.course_id,
                target.course_id
            );
        }

        let duplicate: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM knowledge_point_relations \
             WHERE source_id = ?1 AND target_id = ?2 AND relation_type = ?3)",
            params![new.source_id, new.target_id, new.relation_type.as_str()],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(Error::validation(format!(
                "{} relation {} -> {} already exists",
                new.relation_type.as_str(),
                new.source_id,
                new.target_id
            )));
        }

        self.conn.execute(
            "INSERT INTO knowledge_point_relations (source_id, target_id, relation_type, strength) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.source_id,
                new.target_id,
                new.relation_type.as_str(),
                new.strength
            ],
        )?;

        Ok(Relation {
            id: self.conn.last_insert_rowid(),
            source_id: new.source_id,
            target_id: new.target_id,
            relation_type: new.relation_type,
            strength: new.strength,
        })
    }

    pub fn delete_relation(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM knowledge_point_relations WHERE id = ?1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    pub fn point_relations(&self, point_id: i64) -> Result<PointRelations> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, source_id, target_id, relation_type, strength
            FROM knowledge_point_relations
            WHERE relation_type = 'prerequisite' AND (source_id = ?1 OR target_id = ?1)
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![point_id], relation_from_row)?;

        let mut relations = PointRelations::default();
        for rel in rows {
            let rel = rel?;
            if rel.target_id == point_id {
                relations.prerequisites.push(rel);
            } else {
                relations.subsequents.push(rel);
            }
        }
        Ok(relations)
    }

    pub fn course_statistics(&self, course_id: i64) -> Result<CourseStatistics> {
        let (total_points, concept_count, skill_count, application_count): (i64, i64, i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN type = 'concept' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN type = 'skill' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN type = 'application' THEN 1 ELSE 0 END), 0)
            FROM knowledge_points
            WHERE course_id = ?1
            "#,
            params![course_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let (relation_count, prerequisite_count): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN r.relation_type = 'prerequisite' THEN 1 ELSE 0 END), 0)
            FROM knowledge_point_relations r
            JOIN knowledge_points kp ON r.source_id = kp.id
            WHERE kp.course_id = ?1
            "#,
            params![course_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CourseStatistics {
            total_points,
            concept_count,
            skill_count,
            application_count,
            relation_count,
            prerequisite_count,
        })
    }

    // Tasks and submissions

    pub fn add_task(
        &self,
        course_id: i64,
        title: &str,
        description: Option<&str>,
        knowledge_point_id: Option<i64>,
    ) -> Result<i64> {
        if title.trim().is_empty() {
            return Err(Error::validation("task title must not be empty"));
        }
        self.require_course(course_id)?;
        if let Some(point_id) = knowledge_point_id {
            self.check_point_in_course(course_id, point_id)?;
        }

        self.conn.execute(
            "INSERT INTO tasks (course_id, title, description, knowledge_point_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![course_id, title.trim(), description, knowledge_point_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, course_id, title, description, knowledge_point_id FROM tasks WHERE id = ?1",
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    pub fn tasks_for_course(&self, course_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, course_id, title, description, knowledge_point_id \
             FROM tasks WHERE course_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![course_id], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Tasks of every course the student has submitted to
    pub fn tasks_for_student_courses(&self, student_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, course_id, title, description, knowledge_point_id
            FROM tasks
            WHERE course_id IN (
                SELECT DISTINCT t.course_id
                FROM submissions s
                JOIN tasks t ON s.task_id = t.id
                WHERE s.student_id = ?1
            )
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![student_id], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn record_submission(
        &self,
        student_id: i64,
        task_id: i64,
        score: Option<f64>,
    ) -> Result<i64> {
        if let Some(score) = score {
            if !(0.0..=100.0).contains(&score) {
                return Err(Error::validation(format!(
                    "score must be between 0 and 100, got {}",
                    score
                )));
            }
        }
        self.get_student(student_id)?
            .ok_or(Error::not_found("student", student_id))?;
        self.get_task(task_id)?
            .ok_or(Error::not_found("task", task_id))?;

        self.conn.execute(
            "INSERT INTO submissions (task_id, student_id, score, submitted_at) VALUES (?1, ?2, ?3, ?4)",
            params![task_id, student_id, score, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// A student's submissions joined with their tasks, oldest first
    pub fn submissions_for_student(
        &self,
        student_id: i64,
        course_id: Option<i64>,
    ) -> Result<Vec<SubmissionWithTask>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.task_id, s.student_id, s.score, s.submitted_at,
                   t.id, t.course_id, t.title, t.description, t.knowledge_point_id
            FROM submissions s
            JOIN tasks t ON s.task_id = t.id
            WHERE s.student_id = ?1 AND (?2 IS NULL OR t.course_id = ?2)
            ORDER BY s.submitted_at, s.id
            "#,
        )?;

        let rows = stmt.query_map(params![student_id, course_id], |row| {
            Ok(SubmissionWithTask {
                submission: Submission {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    student_id: row.get(2)?,
                    score: row.get(3)?,
                    submitted_at: row.get(4)?,
                },
                task: Task {
                    id: row.get(5)?,
                    course_id: row.get(6)?,
                    title: row.get(7)?,
                    description: row.get(8)?,
                    knowledge_point_id: row.get(9)?,
                },
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // Learning path operations

    pub fn save_path(
        &self,
        student_id: i64,
        course_id: Option<i64>,
        plan: &LearningPathPlan,
    ) -> Result<i64> {
        if plan.is_empty() {
            return Err(Error::validation("cannot save an empty learning path"));
        }
        self.get_student(student_id)?
            .ok_or(Error::not_found("student", student_id))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO learning_paths (student_id, course_id, status, threshold, match_score, total_time, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                student_id,
                course_id,
                PathStatus::NotStarted.as_str(),
                plan.threshold,
                plan.match_score,
                plan.total_time,
                Utc::now().to_rfc3339(),
            ],
        )?;
        let path_id = tx.last_insert_rowid();

        let mut position: i64 = 0;
        for stage in &plan.stages {
            for point in &stage.knowledge_points {
                tx.execute(
                    "INSERT INTO learning_path_nodes (path_id, knowledge_point_id, stage_index, position) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![path_id, point.id, stage.index as i64, position],
                )?;
                position += 1;
            }
        }
        tx.commit()?;

        tracing::info!(path_id, student_id, nodes = position, "Saved learning path");
        Ok(path_id)
    }

    pub fn get_path(&self, id: i64) -> Result<Option<LearningPathRecord>> {
        let sql = format!("SELECT {} FROM learning_paths WHERE id = ?1", PATH_COLUMNS);
        let path = self
            .conn
            .query_row(&sql, params![id], path_from_row)
            .optional()?;
        Ok(path)
    }

    pub fn list_paths(&self, student_id: i64) -> Result<Vec<LearningPathRecord>> {
        let sql = format!(
            "SELECT {} FROM learning_paths WHERE student_id = ?1 ORDER BY id DESC",
            PATH_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![student_id], path_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn path_nodes(&self, path_id: i64) -> Result<Vec<PathNode>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT n.path_id, n.knowledge_point_id, kp.name, n.stage_index, n.position,
                   n.status, n.completed_at
            FROM learning_path_nodes n
            JOIN knowledge_points kp ON n.knowledge_point_id = kp.id
            WHERE n.path_id = ?1
            ORDER BY n.position
            "#,
        )?;

        let rows = stmt.query_map(params![path_id], |row| {
            let stage_index: i64 = row.get(3)?;
            let position: i64 = row.get(4)?;
            let status: String = row.get(5)?;
            Ok(PathNode {
                path_id: row.get(0)?,
                knowledge_point_id: row.get(1)?,
                name: row.get(2)?,
                stage_index: stage_index as usize,
                position: position as usize,
                status: NodeStatus::from_str(&status).unwrap_or(NodeStatus::Pending),
                completed_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn path_progress(&self, id: i64) -> Result<PathProgress> {
        let path = self
            .get_path(id)?
            .ok_or(Error::not_found("learning path", id))?;
        let nodes = self.path_nodes(id)?;
        Ok(PathProgress { path, nodes })
    }

    pub fn start_path(&self, id: i64) -> Result<LearningPathRecord> {
        let path = self
            .get_path(id)?
            .ok_or(Error::not_found("learning path", id))?;
        path.status.ensure_transition(PathStatus::Active)?;

        self.conn.execute(
            "UPDATE learning_paths SET status = ?1, started_at = ?2 WHERE id = ?3",
            params![PathStatus::Active.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        tracing::info!(id, "Started learning path");

        self.get_path(id)?
            .ok_or(Error::not_found("learning path", id))
    }

    /// Mark one node done; the path completes with its last pending node
    pub fn complete_path_node(&self, path_id: i64, point_id: i64) -> Result<PathProgress> {
        let tx = self.conn.unchecked_transaction()?;

        let path = self
            .get_path(path_id)?
            .ok_or(Error::not_found("learning path", path_id))?;
        if path.status != PathStatus::Active {
            return Err(Error::validation(format!(
                "learning path {} is {}, not active",
                path_id,
                path.status.as_str()
            )));
        }

        let status: String = tx
            .query_row(
                "SELECT status FROM learning_path_nodes WHERE path_id = ?1 AND knowledge_point_id = ?2",
                params![path_id, point_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::not_found("path node", point_id))?;
        NodeStatus::from_str(&status)
            .unwrap_or(NodeStatus::Pending)
            .ensure_completable()?;

        let now = Utc::now().to_rfc3339();
        tx.execute(
            "UPDATE learning_path_nodes SET status = ?1, completed_at = ?2 \
             WHERE path_id = ?3 AND knowledge_point_id = ?4",
            params![NodeStatus::Completed.as_str(), now, path_id, point_id],
        )?;

        let pending: i64 = tx.query_row(
            "SELECT COUNT(*) FROM learning_path_nodes WHERE path_id = ?1 AND status = 'pending'",
            params![path_id],
            |row| row.get(0),
        )?;
        if pending == 0 {
            path.status.ensure_transition(PathStatus::Completed)?;
            tx.execute(
                "UPDATE learning_paths SET status = ?1, completed_at = ?2 WHERE id = ?3",
                params![PathStatus::Completed.as_str(), now, path_id],
            )?;
            tracing::info!(path_id, "Learning path completed");
        }
        tx.commit()?;

        self.path_progress(path_id)
    }

    pub fn abandon_path(&self, id: i64) -> Result<LearningPathRecord> {
        let path = self
            .get_path(id)?
            .ok_or(Error::not_found("learning path", id))?;
        path.status.ensure_transition(PathStatus::Abandoned)?;

        self.conn.execute(
            "UPDATE learning_paths SET status = ?1 WHERE id = ?2",
            params![PathStatus::Abandoned.as_str(), id],
        )?;
        tracing::info!(id, "Abandoned learning path");

        self.get_path(id)?
            .ok_or(Error::not_found("learning path", id))
    }
}

// ?1, ?2, ... ?n
fn numbered_placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn point_from_row(row: &Row) -> rusqlite::Result<KnowledgePoint> {
    let point_type: String = row.get(5)?;
    Ok(KnowledgePoint {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        course_id: row.get(3)?,
        parent_id: row.get(4)?,
        point_type: PointType::from_str(&point_type).unwrap_or(PointType::Concept),
        difficulty_level: row.get(6)?,
        importance: row.get(7)?,
        estimated_time: row.get(8)?,
        order_index: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn relation_from_row(row: &Row) -> rusqlite::Result<Relation> {
    let relation_type: String = row.get(3)?;
    Ok(Relation {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relation_type: RelationType::from_str(&relation_type).unwrap_or(RelationType::Related),
        strength: row.get(4)?,
    })
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        course_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        knowledge_point_id: row.get(4)?,
    })
}

fn path_from_row(row: &Row) -> rusqlite::Result<LearningPathRecord> {
    let status: String = row.get(3)?;
    Ok(LearningPathRecord {
        id: row.get(0)?,
        student_id: row.get(1)?,
        course_id: row.get(2)?,
        status: PathStatus::from_str(&status).unwrap_or(PathStatus::NotStarted),
        threshold: row.get(4)?,
        match_score: row.get(5)?,
        total_time: row.get(6)?,
        created_at: row.get(7)?,
        started_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}
