//! Per-topic mastery derived from a student's submissions.
//!
//! Tasks carry no mandatory link to a knowledge point, so each submission is
//! attributed to a topic: the task's explicit `knowledge_point_id` when set,
//! otherwise a label guessed from the task title by [`topic_label`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{SubmissionWithTask, Task};

/// Topics averaging below this score are reported as weak points
pub const WEAK_POINT_THRESHOLD: f64 = 70.0;

/// Used as the comparison baseline when a student has no scored submissions
const DEFAULT_OVERALL_AVERAGE: f64 = 75.0;

const FALLBACK_LABEL_CHARS: usize = 10;

// Checked in order; the first keyword found in the title wins
const TOPIC_KEYWORDS: [(&str, &str); 6] = [
    ("数据结构", "数据结构"),
    ("算法", "算法"),
    ("网络", "计算机网络"),
    ("数据库", "数据库"),
    ("操作系统", "操作系统"),
    ("编程", "程序设计"),
];

/// Guess a topic label from a task title.
///
/// Falls back to the first ten characters of the title when no keyword matches.
pub fn topic_label(title: &str) -> String {
    for (keyword, label) in TOPIC_KEYWORDS {
        if title.contains(keyword) {
            return label.to_string();
        }
    }
    title.chars().take(FALLBACK_LABEL_CHARS).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MasteryLevel {
    NotMastered = 0,
    Beginner = 1,
    Familiar = 2,
    Mastered = 3,
}

impl MasteryLevel {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(v: i32) -> Self {
        match v {
            3 => MasteryLevel::Mastered,
            2 => MasteryLevel::Familiar,
            1 => MasteryLevel::Beginner,
            _ => MasteryLevel::NotMastered,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MasteryLevel::NotMastered => "not mastered",
            MasteryLevel::Beginner => "beginner",
            MasteryLevel::Familiar => "familiar",
            MasteryLevel::Mastered => "mastered",
        }
    }
}

/// Closed lower bounds: 90 is mastered, 75 familiar, 60 beginner.
pub fn classify_mastery(average_score: f64) -> MasteryLevel {
    if average_score >= 90.0 {
        MasteryLevel::Mastered
    } else if average_score >= 75.0 {
        MasteryLevel::Familiar
    } else if average_score >= 60.0 {
        MasteryLevel::Beginner
    } else {
        MasteryLevel::NotMastered
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub knowledge_point: String,
    pub knowledge_point_id: Option<i64>,
    pub scores: Vec<f64>,
    pub average_score: f64,
    pub mastery_level: i32,
    pub mastery_label: String,
    pub progress: f64,
    pub attempt_count: usize,
    pub last_practice: Option<String>,
}

impl MasteryRecord {
    pub fn level(&self) -> MasteryLevel {
        MasteryLevel::from_i32(self.mastery_level)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasteryReport {
    pub student_id: i64,
    pub course_id: Option<i64>,
    pub knowledge_mastery: Vec<MasteryRecord>,
    pub overall_mastery: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaknessLevel {
    Severe,
    Moderate,
    Mild,
    Slight,
}

impl WeaknessLevel {
    /// `None` once the average reaches the weak-point threshold
    pub fn from_average(average_score: f64) -> Option<Self> {
        if average_score < 40.0 {
            Some(WeaknessLevel::Severe)
        } else if average_score < 55.0 {
            Some(WeaknessLevel::Moderate)
        } else if average_score < WEAK_POINT_THRESHOLD {
            Some(WeaknessLevel::Mild)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeaknessLevel::Severe => "severe",
            WeaknessLevel::Moderate => "moderate",
            WeaknessLevel::Mild => "mild",
            WeaknessLevel::Slight => "slight",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeakPoint {
    pub knowledge_point: String,
    pub knowledge_point_id: Option<i64>,
    pub task_names: Vec<String>,
    pub average_score: f64,
    pub attempt_count: usize,
    pub weakness_level: WeaknessLevel,
    pub improvement_potential: String,
    pub issues: Vec<String>,
    pub last_attempt: Option<String>,
    pub suggested_practice: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeakPointReport {
    pub student_id: i64,
    pub weak_points: Vec<WeakPoint>,
    pub total_weak_points: usize,
    pub overall_suggestion: String,
    pub analysis_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TopicKey {
    Point(i64),
    Label(String),
}

struct TopicGroup<'a> {
    label: String,
    point_id: Option<i64>,
    entries: Vec<&'a SubmissionWithTask>,
}

impl TopicGroup<'_> {
    fn scores(&self) -> Vec<f64> {
        self.entries
            .iter()
            .filter_map(|e| e.submission.score)
            .collect()
    }

    fn last_activity(&self, scored_only: bool) -> Option<String> {
        self.entries
            .iter()
            .filter(|e| !scored_only || e.submission.score.is_some())
            .filter_map(|e| e.submission.submitted_at.clone())
            .max()
    }

    fn task_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.task.title.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn group_by_topic<'a>(
    submissions: &'a [SubmissionWithTask],
    point_names: &HashMap<i64, String>,
) -> Vec<TopicGroup<'a>> {
    let mut groups: BTreeMap<TopicKey, TopicGroup<'a>> = BTreeMap::new();

    for entry in submissions {
        let (key, label) = match entry.task.knowledge_point_id {
            Some(id) => {
                let label = point_names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| topic_label(&entry.task.title));
                (TopicKey::Point(id), label)
            }
            None => {
                let label = topic_label(&entry.task.title);
                (TopicKey::Label(label.clone()), label)
            }
        };
        let point_id = match key {
            TopicKey::Point(id) => Some(id),
            TopicKey::Label(_) => None,
        };

        groups
            .entry(key)
            .or_insert_with(|| TopicGroup {
                label,
                point_id,
                entries: Vec::new(),
            })
            .entries
            .push(entry);
    }

    groups.into_values().collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Aggregate submissions into one mastery record per topic.
///
/// Unscored submissions count as attempts but not toward the average. A topic
/// with no scored submission averages 0.
pub fn evaluate(
    student_id: i64,
    course_id: Option<i64>,
    submissions: &[SubmissionWithTask],
    point_names: &HashMap<i64, String>,
) -> MasteryReport {
    let mut records: Vec<MasteryRecord> = group_by_topic(submissions, point_names)
        .iter()
        .map(|group| {
            let scores = group.scores();
            let average = mean(&scores).unwrap_or(0.0);
            let level = classify_mastery(average);
            MasteryRecord {
                knowledge_point: group.label.clone(),
                knowledge_point_id: group.point_id,
                scores,
                average_score: round1(average),
                mastery_level: level.as_i32(),
                mastery_label: level.label().to_string(),
                progress: round1(average.min(100.0)),
                attempt_count: group.entries.len(),
                last_practice: group.last_activity(false),
            }
        })
        .collect();

    records.sort_by(|a, b| {
        a.knowledge_point
            .cmp(&b.knowledge_point)
            .then(a.knowledge_point_id.cmp(&b.knowledge_point_id))
    });

    let progress: Vec<f64> = records.iter().map(|r| r.progress).collect();
    let overall_mastery = mean(&progress).map(round1).unwrap_or(0.0);

    MasteryReport {
        student_id,
        course_id,
        knowledge_mastery: records,
        overall_mastery,
    }
}

fn improvement_potential(average_score: f64) -> &'static str {
    if average_score < 40.0 {
        "needs focused attention"
    } else if average_score < 55.0 {
        "large room for improvement"
    } else if average_score < WEAK_POINT_THRESHOLD {
        "room for improvement"
    } else {
        "can be further optimized"
    }
}

fn diagnose_issues(average_score: f64, attempts: usize) -> Vec<String> {
    let mut issues: Vec<&str> = Vec::new();

    if average_score < 40.0 {
        issues.extend(["weak grasp of basic concepts", "needs to relearn the fundamentals"]);
    } else if average_score < 55.0 {
        issues.extend(["comprehension needs improvement", "needs more practice"]);
    } else if average_score < WEAK_POINT_THRESHOLD {
        issues.extend(["details are not handled precisely", "needs deeper understanding"]);
    }

    if attempts == 1 {
        issues.push("too few practice attempts");
    } else if attempts > 5 {
        issues.push("many attempts with limited improvement");
    }

    if issues.is_empty() {
        issues.push("needs further analysis");
    }
    issues.into_iter().map(String::from).collect()
}

fn suggested_practice(average_score: f64, attempts: usize) -> u32 {
    let attempts = attempts.min(u32::MAX as usize) as u32;
    let (floor, ceiling): (u32, u32) = if average_score < 40.0 {
        (5, 8)
    } else if average_score < 55.0 {
        (3, 5)
    } else if average_score < WEAK_POINT_THRESHOLD {
        (2, 3)
    } else {
        (1, 2)
    };
    ceiling.saturating_sub(attempts).max(floor)
}

fn overall_suggestion(weak_count: usize) -> &'static str {
    match weak_count {
        0 => "Performance is good. Keep it up and take on more challenging material!",
        1..=2 => "Overall performance is solid; targeted practice on the weak areas is enough.",
        3..=4 => "Several knowledge points need focused practice; tackle them one stage at a time.",
        _ => "Build a systematic review plan focused on consolidating the fundamentals.",
    }
}

/// Rank the topics a student struggles with, lowest average first.
///
/// When no topic averages below the weak-point threshold, topics below the
/// student's own overall average are reported as `slight` weaknesses instead.
pub fn weak_points(
    student_id: i64,
    submissions: &[SubmissionWithTask],
    point_names: &HashMap<i64, String>,
    limit: usize,
) -> WeakPointReport {
    let groups = group_by_topic(submissions, point_names);

    let mut scored: Vec<(f64, &TopicGroup, Vec<f64>)> = groups
        .iter()
        .filter_map(|g| {
            let scores = g.scores();
            mean(&scores).map(|avg| (avg, g, scores))
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut weak: Vec<WeakPoint> = scored
        .iter()
        .filter_map(|(avg, group, scores)| {
            let level = WeaknessLevel::from_average(*avg)?;
            Some(WeakPoint {
                knowledge_point: group.label.clone(),
                knowledge_point_id: group.point_id,
                task_names: group.task_names(),
                average_score: round1(*avg),
                attempt_count: scores.len(),
                weakness_level: level,
                improvement_potential: improvement_potential(*avg).to_string(),
                issues: diagnose_issues(*avg, scores.len()),
                last_attempt: group.last_activity(true),
                suggested_practice: suggested_practice(*avg, scores.len()),
            })
        })
        .take(limit)
        .collect();

    if weak.is_empty() && !submissions.is_empty() {
        let all_scores: Vec<f64> = submissions
            .iter()
            .filter_map(|s| s.submission.score)
            .collect();
        let overall = mean(&all_scores).unwrap_or(DEFAULT_OVERALL_AVERAGE);

        weak = scored
            .iter()
            .filter(|(avg, _, _)| *avg < overall)
            .take(limit)
            .map(|(avg, group, scores)| WeakPoint {
                knowledge_point: group.label.clone(),
                knowledge_point_id: group.point_id,
                task_names: group.task_names(),
                average_score: round1(*avg),
                attempt_count: scores.len(),
                weakness_level: WeaknessLevel::Slight,
                improvement_potential: "room for improvement".to_string(),
                issues: vec![
                    "relatively weak".to_string(),
                    "room for further improvement".to_string(),
                ],
                last_attempt: group.last_activity(true),
                suggested_practice: 2,
            })
            .collect();
    }

    tracing::debug!(student_id, weak = weak.len(), "Weak point analysis done");

    WeakPointReport {
        student_id,
        total_weak_points: weak.len(),
        overall_suggestion: overall_suggestion(weak.len()).to_string(),
        weak_points: weak,
        analysis_date: Utc::now().to_rfc3339(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Review,
    Practice,
    Challenge,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub estimated_minutes: u32,
}

const MAX_INCOMPLETE_TASKS: usize = 3;

/// Study recommendations from low scores, unsubmitted tasks and the overall average.
pub fn recommendations(submissions: &[SubmissionWithTask], tasks: &[Task]) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    let low_scores = submissions
        .iter()
        .filter(|s| matches!(s.submission.score, Some(score) if score < WEAK_POINT_THRESHOLD))
        .count();

    let submitted: HashSet<i64> = submissions.iter().map(|s| s.task.id).collect();
    let incomplete = tasks
        .iter()
        .filter(|t| !submitted.contains(&t.id))
        .take(MAX_INCOMPLETE_TASKS)
        .count();

    if low_scores > 0 {
        recs.push(Recommendation {
            id: "rec_low_score".to_string(),
            title: "Review weak knowledge points".to_string(),
            description: format!(
                "You scored below {} on {} submission(s); review the related knowledge points",
                WEAK_POINT_THRESHOLD, low_scores
            ),
            kind: RecommendationKind::Review,
            priority: Priority::High,
            estimated_minutes: low_scores as u32 * 30,
        });
    }

    if incomplete > 0 {
        recs.push(Recommendation {
            id: "rec_incomplete".to_string(),
            title: "Finish outstanding tasks".to_string(),
            description: format!("You have {} task(s) without a submission", incomplete),
            kind: RecommendationKind::Practice,
            priority: Priority::Medium,
            estimated_minutes: incomplete as u32 * 60,
        });
    }

    let scores: Vec<f64> = submissions.iter().filter_map(|s| s.submission.score).collect();
    let average = mean(&scores).unwrap_or(0.0);
    if average >= 80.0 {
        recs.push(Recommendation {
            id: "rec_advanced".to_string(),
            title: "Take on harder material".to_string(),
            description: format!(
                "Your average score is {:.1}; try more challenging content",
                average
            ),
            kind: RecommendationKind::Challenge,
            priority: Priority::Low,
            estimated_minutes: 90,
        });
    }

    if recs.is_empty() {
        recs.push(Recommendation {
            id: "rec_general".to_string(),
            title: "Keep a steady rhythm".to_string(),
            description: "Keep up regular review and practice".to_string(),
            kind: RecommendationKind::General,
            priority: Priority::Medium,
            estimated_minutes: 45,
        });
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Submission;

    fn entry(task_id: i64, title: &str, score: Option<f64>) -> SubmissionWithTask {
        entry_at(task_id, title, score, "2025-03-01T10:00:00+00:00")
    }

    fn entry_at(task_id: i64, title: &str, score: Option<f64>, at: &str) -> SubmissionWithTask {
        SubmissionWithTask {
            submission: Submission {
                id: task_id * 100,
                task_id,
                student_id: 1,
                score,
                submitted_at: Some(at.to_string()),
            },
            task: Task {
                id: task_id,
                course_id: 1,
                title: title.to_string(),
                description: None,
                knowledge_point_id: None,
            },
        }
    }

    fn no_points() -> HashMap<i64, String> {
        HashMap::new()
    }

    mod label_tests {
        use super::*;

        #[test]
        fn keyword_titles_map_to_topics() {
            assert_eq!(topic_label("数据结构作业一"), "数据结构");
            assert_eq!(topic_label("排序算法练习"), "算法");
            assert_eq!(topic_label("网络协议实验"), "计算机网络");
            assert_eq!(topic_label("数据库设计"), "数据库");
            assert_eq!(topic_label("操作系统进程调度"), "操作系统");
            assert_eq!(topic_label("Rust编程入门"), "程序设计");
        }

        #[test]
        fn earlier_keyword_wins() {
            assert_eq!(topic_label("网络数据库"), "计算机网络");
            assert_eq!(topic_label("数据结构与算法"), "数据结构");
        }

        #[test]
        fn long_title_truncated_to_ten_chars() {
            assert_eq!(topic_label("Introduction to Linear Algebra"), "Introducti");
            assert_eq!(topic_label("线性代数矩阵运算综合练习题"), "线性代数矩阵运算综合");
        }

        #[test]
        fn short_title_kept_whole() {
            assert_eq!(topic_label("Calculus"), "Calculus");
            assert_eq!(topic_label(""), "");
        }
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn levels() {
            assert_eq!(classify_mastery(95.0).as_i32(), 3);
            assert_eq!(classify_mastery(80.0).as_i32(), 2);
            assert_eq!(classify_mastery(65.0).as_i32(), 1);
            assert_eq!(classify_mastery(50.0).as_i32(), 0);
        }

        #[test]
        fn boundaries_are_closed_below() {
            assert_eq!(classify_mastery(90.0), MasteryLevel::Mastered);
            assert_eq!(classify_mastery(75.0), MasteryLevel::Familiar);
            assert_eq!(classify_mastery(60.0), MasteryLevel::Beginner);
            assert_eq!(classify_mastery(89.99), MasteryLevel::Familiar);
            assert_eq!(classify_mastery(59.99), MasteryLevel::NotMastered);
        }

        #[test]
        fn labels() {
            assert_eq!(MasteryLevel::Mastered.label(), "mastered");
            assert_eq!(MasteryLevel::NotMastered.label(), "not mastered");
            assert_eq!(MasteryLevel::from_i32(7), MasteryLevel::NotMastered);
        }
    }

    mod evaluate_tests {
        use super::*;

        #[test]
        fn same_label_tasks_are_pooled() {
            let subs = vec![
                entry(1, "数据结构作业一", Some(95.0)),
                entry(2, "数据结构作业二", Some(70.0)),
            ];
            let report = evaluate(1, None, &subs, &no_points());

            assert_eq!(report.knowledge_mastery.len(), 1);
            let record = &report.knowledge_mastery[0];
            assert_eq!(record.knowledge_point, "数据结构");
            assert_eq!(record.average_score, 82.5);
            assert_eq!(record.mastery_level, 2);
            assert_eq!(record.attempt_count, 2);
            assert_eq!(report.overall_mastery, 82.5);
        }

        #[test]
        fn unmatched_title_uses_truncated_label() {
            let subs = vec![entry(1, "Weekly reflection essay", Some(55.0))];
            let report = evaluate(1, None, &subs, &no_points());

            let record = &report.knowledge_mastery[0];
            assert_eq!(record.knowledge_point, "Weekly ref");
            assert_eq!(record.mastery_level, 0);
            assert_eq!(record.progress, 55.0);
        }

        #[test]
        fn unscored_submissions_count_as_attempts_only() {
            let subs = vec![
                entry(1, "算法一", Some(80.0)),
                entry(1, "算法一", None),
                entry(2, "算法二", Some(90.0)),
            ];
            let report = evaluate(1, None, &subs, &no_points());

            let record = &report.knowledge_mastery[0];
            assert_eq!(record.attempt_count, 3);
            assert_eq!(record.scores, vec![80.0, 90.0]);
            assert_eq!(record.average_score, 85.0);
        }

        #[test]
        fn topic_without_scores_averages_zero() {
            let subs = vec![entry(1, "Essay", None)];
            let report = evaluate(1, None, &subs, &no_points());

            assert_eq!(report.knowledge_mastery[0].average_score, 0.0);
            assert_eq!(report.knowledge_mastery[0].attempt_count, 1);
        }

        #[test]
        fn no_submissions_yield_empty_report() {
            let report = evaluate(1, Some(3), &[], &no_points());
            assert!(report.knowledge_mastery.is_empty());
            assert_eq!(report.overall_mastery, 0.0);
            assert_eq!(report.course_id, Some(3));
        }

        #[test]
        fn overall_is_mean_of_progress() {
            let subs = vec![
                entry(1, "数据库一", Some(100.0)),
                entry(2, "操作系统一", Some(50.0)),
            ];
            let report = evaluate(1, None, &subs, &no_points());
            assert_eq!(report.overall_mastery, 75.0);
        }

        #[test]
        fn last_practice_is_latest_timestamp() {
            let subs = vec![
                entry_at(1, "算法一", Some(80.0), "2025-01-01T00:00:00+00:00"),
                entry_at(2, "算法二", Some(80.0), "2025-02-01T00:00:00+00:00"),
            ];
            let report = evaluate(1, None, &subs, &no_points());
            assert_eq!(
                report.knowledge_mastery[0].last_practice.as_deref(),
                Some("2025-02-01T00:00:00+00:00")
            );
        }

        #[test]
        fn explicit_point_link_overrides_title() {
            let mut linked = entry(1, "数据结构作业", Some(60.0));
            linked.task.knowledge_point_id = Some(42);
            let subs = vec![linked, entry(2, "数据结构作业二", Some(100.0))];
            let names = HashMap::from([(42, "Binary trees".to_string())]);

            let report = evaluate(1, None, &subs, &names);

            assert_eq!(report.knowledge_mastery.len(), 2);
            let linked = report
                .knowledge_mastery
                .iter()
                .find(|r| r.knowledge_point_id == Some(42))
                .unwrap();
            assert_eq!(linked.knowledge_point, "Binary trees");
            assert_eq!(linked.average_score, 60.0);
        }
    }

    mod weak_point_tests {
        use super::*;

        #[test]
        fn moderate_weakness_reports_comprehension_issue() {
            let subs = vec![entry(1, "算法一", Some(50.0))];
            let report = weak_points(1, &subs, &no_points(), 5);

            assert_eq!(report.weak_points.len(), 1);
            let wp = &report.weak_points[0];
            assert_eq!(wp.weakness_level, WeaknessLevel::Moderate);
            assert!(wp
                .issues
                .contains(&"comprehension needs improvement".to_string()));
            assert!(wp.issues.contains(&"too few practice attempts".to_string()));
        }

        #[test]
        fn strong_only_topic_means_good_performance() {
            let subs = vec![entry(1, "算法一", Some(95.0))];
            let report = weak_points(1, &subs, &no_points(), 5);

            assert!(report.weak_points.is_empty());
            assert_eq!(report.total_weak_points, 0);
            assert!(report.overall_suggestion.contains("Performance is good"));
        }

        #[test]
        fn severity_buckets() {
            assert_eq!(WeaknessLevel::from_average(39.9), Some(WeaknessLevel::Severe));
            assert_eq!(WeaknessLevel::from_average(40.0), Some(WeaknessLevel::Moderate));
            assert_eq!(WeaknessLevel::from_average(54.9), Some(WeaknessLevel::Moderate));
            assert_eq!(WeaknessLevel::from_average(55.0), Some(WeaknessLevel::Mild));
            assert_eq!(WeaknessLevel::from_average(69.9), Some(WeaknessLevel::Mild));
            assert_eq!(WeaknessLevel::from_average(70.0), None);
        }

        #[test]
        fn sorted_lowest_first_and_truncated() {
            let subs = vec![
                entry(1, "算法一", Some(65.0)),
                entry(2, "数据库一", Some(30.0)),
                entry(3, "操作系统一", Some(50.0)),
            ];
            let report = weak_points(1, &subs, &no_points(), 2);

            let labels: Vec<&str> = report
                .weak_points
                .iter()
                .map(|w| w.knowledge_point.as_str())
                .collect();
            assert_eq!(labels, vec!["数据库", "操作系统"]);
            assert_eq!(report.weak_points[0].weakness_level, WeaknessLevel::Severe);
            assert_eq!(report.total_weak_points, 2);
        }

        #[test]
        fn falls_back_to_below_own_average() {
            let subs = vec![
                entry(1, "算法一", Some(95.0)),
                entry(2, "数据库一", Some(75.0)),
            ];
            let report = weak_points(1, &subs, &no_points(), 5);

            assert_eq!(report.weak_points.len(), 1);
            let wp = &report.weak_points[0];
            assert_eq!(wp.knowledge_point, "数据库");
            assert_eq!(wp.weakness_level, WeaknessLevel::Slight);
            assert_eq!(wp.suggested_practice, 2);
        }

        #[test]
        fn unscored_topics_are_not_weak_points() {
            let subs = vec![entry(1, "算法一", None)];
            let report = weak_points(1, &subs, &no_points(), 5);
            assert!(report.weak_points.is_empty());
        }

        #[test]
        fn no_submissions_no_weak_points() {
            let report = weak_points(1, &[], &no_points(), 5);
            assert!(report.weak_points.is_empty());
            assert!(report.overall_suggestion.contains("Performance is good"));
        }

        #[test]
        fn suggestion_scales_with_count() {
            assert!(overall_suggestion(5).contains("systematic"));
            assert!(overall_suggestion(3).contains("one stage at a time"));
            assert!(overall_suggestion(1).contains("targeted practice"));
        }

        #[test]
        fn suggested_practice_has_floor() {
            assert_eq!(suggested_practice(30.0, 1), 7);
            assert_eq!(suggested_practice(30.0, 10), 5);
            assert_eq!(suggested_practice(50.0, 1), 4);
            assert_eq!(suggested_practice(65.0, 4), 2);
        }

        #[test]
        fn many_attempts_flagged() {
            let issues = diagnose_issues(60.0, 6);
            assert!(issues.contains(&"many attempts with limited improvement".to_string()));
        }
    }

    mod recommendation_tests {
        use super::*;

        fn task(id: i64) -> Task {
            Task {
                id,
                course_id: 1,
                title: format!("Task {id}"),
                description: None,
                knowledge_point_id: None,
            }
        }

        #[test]
        fn low_scores_and_missing_tasks() {
            let subs = vec![entry(1, "算法一", Some(40.0))];
            let tasks = vec![task(1), task(2), task(3)];
            let recs = recommendations(&subs, &tasks);

            assert_eq!(recs[0].kind, RecommendationKind::Review);
            assert_eq!(recs[0].priority, Priority::High);
            assert_eq!(recs[1].kind, RecommendationKind::Practice);
            assert_eq!(recs[1].estimated_minutes, 120);
            assert_eq!(recs.len(), 2);
        }

        #[test]
        fn strong_student_gets_challenge() {
            let subs = vec![entry(1, "算法一", Some(92.0))];
            let recs = recommendations(&subs, &[task(1)]);
            assert_eq!(recs.len(), 1);
            assert_eq!(recs[0].kind, RecommendationKind::Challenge);
        }

        #[test]
        fn general_advice_when_nothing_stands_out() {
            let subs = vec![entry(1, "算法一", Some(75.0))];
            let recs = recommendations(&subs, &[task(1)]);
            assert_eq!(recs.len(), 1);
            assert_eq!(recs[0].kind, RecommendationKind::General);
        }
    }
}
