mod tui;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use coursegraph::config::Config;
use coursegraph::db::Database;
use coursegraph::models::{
    JsonOutput, KnowledgePoint, KnowledgePointUpdate, NewKnowledgePoint, NewRelation, PointType,
    RelationType,
};
use coursegraph::path::PathProgress;
use coursegraph::planner::LearningPathPlan;
use coursegraph::service::{PathRequest, Service};
use coursegraph::tree::TreeNode;

#[derive(Parser)]
#[command(name = "coursegraph")]
#[command(about = "Knowledge graphs, mastery analytics and learning paths for course content")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Manage courses
    #[command(subcommand)]
    Course(CourseCommands),

    /// Manage students
    #[command(subcommand)]
    Student(StudentCommands),

    /// Manage knowledge points
    #[command(subcommand)]
    Point(PointCommands),

    /// Manage relations between knowledge points
    #[command(subcommand)]
    Relation(RelationCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Record a task submission
    Submit {
        /// Student ID
        student: i64,

        /// Task ID
        task: i64,

        /// Score between 0 and 100; omit for an ungraded submission
        #[arg(long, short)]
        score: Option<f64>,
    },

    /// Show the knowledge graph of a course
    Graph {
        /// Course ID
        course: i64,

        /// Only include points of this type (concept/skill/application)
        #[arg(long = "type", short = 't')]
        point_type: Option<String>,
    },

    /// Show the knowledge tree of a course
    Tree {
        /// Course ID
        course: i64,
    },

    /// Show knowledge point statistics for a course
    Stats {
        /// Course ID
        course: i64,
    },

    /// Show a student's mastery per knowledge point
    Mastery {
        /// Student ID
        student: i64,

        /// Restrict to one course
        #[arg(long, short)]
        course: Option<i64>,
    },

    /// Show a student's weak points
    Weak {
        /// Student ID
        student: i64,

        /// Maximum number of weak points
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Show study recommendations for a student
    Recommend {
        /// Student ID
        student: i64,
    },

    /// Plan and follow learning paths
    #[command(subcommand)]
    Path(PathCommands),

    /// Launch interactive terminal UI
    Tui {
        /// Course ID
        #[arg(long, short)]
        course: i64,

        /// Student ID
        #[arg(long, short)]
        student: i64,
    },
}

#[derive(Subcommand)]
enum CourseCommands {
    /// Add a course
    Add {
        /// Course name
        name: String,
    },

    /// List all courses
    List,
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Add a student
    Add {
        /// Student name
        name: String,
    },
}

#[derive(Subcommand)]
enum PointCommands {
    /// Add a knowledge point
    Add {
        /// Course ID
        course: i64,

        /// Knowledge point name
        name: String,

        /// Description
        #[arg(long, short)]
        description: Option<String>,

        /// concept, skill or application
        #[arg(long = "type", short = 't')]
        point_type: Option<String>,

        /// Difficulty from 1 to 5
        #[arg(long)]
        difficulty: Option<i32>,

        /// Importance from 0 to 1
        #[arg(long)]
        importance: Option<f64>,

        /// Estimated study time in minutes
        #[arg(long)]
        time: Option<i32>,

        /// Parent knowledge point ID
        #[arg(long, short)]
        parent: Option<i64>,
    },

    /// Update a knowledge point
    Update {
        /// Knowledge point ID
        id: i64,

        #[arg(long, short)]
        name: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long = "type", short = 't')]
        point_type: Option<String>,

        #[arg(long)]
        difficulty: Option<i32>,

        #[arg(long)]
        importance: Option<f64>,

        #[arg(long)]
        time: Option<i32>,

        /// New parent knowledge point ID
        #[arg(long, short, conflicts_with = "root")]
        parent: Option<i64>,

        /// Detach from the parent
        #[arg(long)]
        root: bool,
    },

    /// Show knowledge point details
    Show {
        /// Knowledge point ID
        id: i64,
    },

    /// List knowledge points of a course, a page at a time
    List {
        /// Course ID
        course: i64,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size
        #[arg(long, default_value_t = 20)]
        size: u32,
    },

    /// Delete a knowledge point with its relations
    Delete {
        /// Knowledge point ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum RelationCommands {
    /// Add a relation; a prerequisite source is learned before its target
    Add {
        /// Source knowledge point ID
        source: i64,

        /// Target knowledge point ID
        target: i64,

        /// prerequisite or related
        #[arg(long = "type", short = 't', default_value = "prerequisite")]
        relation_type: String,

        /// Strength from 0 to 1
        #[arg(long, short, default_value_t = 1.0)]
        strength: f64,
    },

    /// Delete a relation
    Delete {
        /// Relation ID
        id: i64,
    },

    /// Show prerequisites and subsequents of a knowledge point
    Show {
        /// Knowledge point ID
        point: i64,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task to a course
    Add {
        /// Course ID
        course: i64,

        /// Task title
        title: String,

        #[arg(long, short)]
        description: Option<String>,

        /// Knowledge point the task assesses
        #[arg(long, short)]
        point: Option<i64>,
    },
}

#[derive(Subcommand)]
enum PathCommands {
    /// Plan a learning path
    Plan {
        /// Student ID
        student: i64,

        /// Course ID
        #[arg(long, short)]
        course: Option<i64>,

        /// Target knowledge point (repeatable); defaults to the weak points
        #[arg(long = "target", short)]
        targets: Vec<i64>,

        /// Mastery threshold between 0 and 1
        #[arg(long)]
        threshold: Option<f64>,

        /// Time budget in minutes
        #[arg(long, short)]
        budget: Option<u32>,

        /// Persist the plan as a new learning path
        #[arg(long)]
        save: bool,
    },

    /// List a student's learning paths
    List {
        /// Student ID
        student: i64,
    },

    /// Show a learning path and its progress
    Show {
        /// Path ID
        id: i64,
    },

    /// Start a planned learning path
    Start {
        /// Path ID
        id: i64,
    },

    /// Mark a knowledge point of an active path as completed
    Complete {
        /// Path ID
        id: i64,

        /// Knowledge point ID
        point: i64,
    },

    /// Abandon a learning path
    Abandon {
        /// Path ID
        id: i64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coursegraph=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(data: T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
    Ok(())
}

fn parse_point_type(s: &str) -> Result<PointType, String> {
    PointType::from_str(s).ok_or_else(|| {
        format!(
            "Invalid type '{}'. Use: concept, skill, or application",
            s
        )
    })
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db_path = config.db_path();
    let db = Database::open(&db_path)?;
    let service = Service::new(&db, &config);

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Course(course_cmd) => match course_cmd {
            CourseCommands::Add { name } => {
                let id = db.add_course(&name)?;
                if cli.json {
                    print_json(serde_json::json!({ "id": id, "name": name }))?;
                } else {
                    println!("Added course '{}' with ID: {}", name, id);
                }
            }

            CourseCommands::List => {
                let courses = db.list_courses()?;
                if cli.json {
                    print_json(&courses)?;
                } else if courses.is_empty() {
                    println!("No courses found.");
                } else {
                    println!("{:<5} {:<40} CREATED", "ID", "NAME");
                    println!("{}", "-".repeat(70));
                    for course in courses {
                        println!(
                            "{:<5} {:<40} {}",
                            course.id,
                            truncate(&course.name, 38),
                            course.created_at
                        );
                    }
                }
            }
        },

        Commands::Student(StudentCommands::Add { name }) => {
            let id = db.add_student(&name)?;
            if cli.json {
                print_json(serde_json::json!({ "id": id, "name": name }))?;
            } else {
                println!("Added student '{}' with ID: {}", name, id);
            }
        }

        Commands::Point(point_cmd) => match point_cmd {
            PointCommands::Add {
                course,
                name,
                description,
                point_type,
                difficulty,
                importance,
                time,
                parent,
            } => {
                let mut new = NewKnowledgePoint::new(course, name);
                new.description = description;
                new.parent_id = parent;
                if let Some(t) = point_type {
                    new.point_type = parse_point_type(&t)?;
                }
                if let Some(d) = difficulty {
                    new.difficulty_level = d;
                }
                if let Some(i) = importance {
                    new.importance = i;
                }
                if let Some(t) = time {
                    new.estimated_time = t;
                }

                let point = db.create_knowledge_point(&new)?;
                if cli.json {
                    print_json(&point)?;
                } else {
                    println!("Added knowledge point '{}' with ID: {}", point.name, point.id);
                }
            }

            PointCommands::Update {
                id,
                name,
                description,
                point_type,
                difficulty,
                importance,
                time,
                parent,
                root,
            } => {
                let update = KnowledgePointUpdate {
                    name,
                    description: description.map(Some),
                    parent_id: if root { Some(None) } else { parent.map(Some) },
                    point_type: point_type.as_deref().map(parse_point_type).transpose()?,
                    difficulty_level: difficulty,
                    importance,
                    estimated_time: time,
                };
                if update.is_empty() {
                    return Err("Nothing to update; pass at least one field".into());
                }

                let point = db.update_knowledge_point(id, &update)?;
                if cli.json {
                    print_json(&point)?;
                } else {
                    println!("Updated knowledge point {}.", point.id);
                }
            }

            PointCommands::Show { id } => {
                let point = db
                    .get_knowledge_point(id)?
                    .ok_or_else(|| format!("Knowledge point {} not found", id))?;
                let relations = service.get_point_relations(id)?;

                if cli.json {
                    print_json(serde_json::json!({
                        "point": point,
                        "relations": relations
                    }))?;
                } else {
                    print_point(&point);
                    println!();
                    println!("--- Relations ---");
                    println!("Prerequisites: {}", relations.prerequisites.len());
                    for r in &relations.prerequisites {
                        println!("  <- {} ({}, {:.2})", r.source_id, r.relation_type.as_str(), r.strength);
                    }
                    println!("Subsequents: {}", relations.subsequents.len());
                    for r in &relations.subsequents {
                        println!("  -> {} ({}, {:.2})", r.target_id, r.relation_type.as_str(), r.strength);
                    }
                }
            }

            PointCommands::List { course, page, size } => {
                let page = db.list_knowledge_points_paged(course, page, size)?;
                if cli.json {
                    print_json(&page)?;
                } else if page.data.is_empty() {
                    println!("No knowledge points found.");
                } else {
                    println!(
                        "{:<5} {:<36} {:<12} {:<5} {:<6} TIME",
                        "ID", "NAME", "TYPE", "DIFF", "IMP"
                    );
                    println!("{}", "-".repeat(75));
                    for p in &page.data {
                        println!(
                            "{:<5} {:<36} {:<12} {:<5} {:<6.2} {}m",
                            p.id,
                            truncate(&p.name, 34),
                            p.point_type.label(),
                            p.difficulty_level,
                            p.importance,
                            p.estimated_time
                        );
                    }
                    println!();
                    println!(
                        "Page {} of {} ({} points)",
                        page.page, page.total_pages, page.total
                    );
                }
            }

            PointCommands::Delete { id } => {
                if db.delete_knowledge_point(id)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Knowledge point {} deleted.", id);
                    }
                } else if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err("Knowledge point not found"))?
                    );
                } else {
                    println!("Knowledge point not found.");
                }
            }
        },

        Commands::Relation(relation_cmd) => match relation_cmd {
            RelationCommands::Add {
                source,
                target,
                relation_type,
                strength,
            } => {
                let relation_type = RelationType::from_str(&relation_type).ok_or_else(|| {
                    format!(
                        "Invalid relation type '{}'. Use: prerequisite or related",
                        relation_type
                    )
                })?;
                let relation = db.create_relation(&NewRelation {
                    source_id: source,
                    target_id: target,
                    relation_type,
                    strength,
                })?;

                if cli.json {
                    print_json(&relation)?;
                } else {
                    println!(
                        "Added {} relation {} -> {} with ID: {}",
                        relation.relation_type.as_str(),
                        relation.source_id,
                        relation.target_id,
                        relation.id
                    );
                }
            }

            RelationCommands::Delete { id } => {
                if db.delete_relation(id)? {
                    if cli.json {
                        println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                    } else {
                        println!("Relation {} deleted.", id);
                    }
                } else if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err("Relation not found"))?
                    );
                } else {
                    println!("Relation not found.");
                }
            }

            RelationCommands::Show { point } => {
                let relations = service.get_point_relations(point)?;
                if cli.json {
                    print_json(&relations)?;
                } else {
                    println!("{:<5} {:<8} {:<8} {:<14} STRENGTH", "ID", "SOURCE", "TARGET", "TYPE");
                    println!("{}", "-".repeat(50));
                    for r in relations.prerequisites.iter().chain(&relations.subsequents) {
                        println!(
                            "{:<5} {:<8} {:<8} {:<14} {:.2}",
                            r.id,
                            r.source_id,
                            r.target_id,
                            r.relation_type.as_str(),
                            r.strength
                        );
                    }
                }
            }
        },

        Commands::Task(TaskCommands::Add {
            course,
            title,
            description,
            point,
        }) => {
            let id = db.add_task(course, &title, description.as_deref(), point)?;
            if cli.json {
                print_json(serde_json::json!({ "id": id, "title": title }))?;
            } else {
                println!("Added task '{}' with ID: {}", title, id);
            }
        }

        Commands::Submit {
            student,
            task,
            score,
        } => {
            let id = db.record_submission(student, task, score)?;
            if cli.json {
                print_json(serde_json::json!({ "id": id }))?;
            } else {
                match score {
                    Some(s) => println!("Recorded submission {} (score {:.1}).", id, s),
                    None => println!("Recorded ungraded submission {}.", id),
                }
            }
        }

        Commands::Graph { course, point_type } => {
            let point_type = point_type.as_deref().map(parse_point_type).transpose()?;
            let graph = service.get_knowledge_graph(course, point_type)?;
            if cli.json {
                print_json(&graph)?;
            } else {
                println!("=== Knowledge Graph (course {}) ===", course);
                println!(
                    "Nodes: {}  Links: {}  Dangling: {}  ({} ms)",
                    graph.total_nodes, graph.total_links, graph.dangling_links, graph.query_time_ms
                );
                println!();
                for link in &graph.links {
                    let name = |id: i64| {
                        graph
                            .node(id)
                            .map(|n| n.name.clone())
                            .unwrap_or_else(|| format!("#{}", id))
                    };
                    println!(
                        "{} -> {} [{} {:.2}]{}",
                        name(link.source),
                        name(link.target),
                        link.relation_type.as_str(),
                        link.strength,
                        if link.dangling { " (outside graph)" } else { "" }
                    );
                }
            }
        }

        Commands::Tree { course } => {
            let forest = service.get_knowledge_tree(course)?;
            if cli.json {
                print_json(&forest)?;
            } else if forest.is_empty() {
                println!("No knowledge points found.");
            } else {
                for root in &forest {
                    print_tree(root, 0);
                }
            }
        }

        Commands::Stats { course } => {
            let stats = service.get_statistics(course)?;
            if cli.json {
                print_json(&stats)?;
            } else {
                println!("=== Course Statistics ===");
                println!("Knowledge points: {}", stats.total_points);
                println!("  Concepts: {}", stats.concept_count);
                println!("  Skills: {}", stats.skill_count);
                println!("  Applications: {}", stats.application_count);
                println!("Relations: {}", stats.relation_count);
                println!("  Prerequisites: {}", stats.prerequisite_count);
            }
        }

        Commands::Mastery { student, course } => {
            let report = service.get_mastery(student, course)?;
            if cli.json {
                print_json(&report)?;
            } else if report.knowledge_mastery.is_empty() {
                println!("No graded submissions found.");
            } else {
                println!(
                    "{:<30} {:<8} {:<14} {:<9} LAST",
                    "KNOWLEDGE POINT", "AVG", "LEVEL", "ATTEMPTS"
                );
                println!("{}", "-".repeat(80));
                for r in &report.knowledge_mastery {
                    println!(
                        "{:<30} {:<8.1} {:<14} {:<9} {}",
                        truncate(&r.knowledge_point, 28),
                        r.average_score,
                        r.mastery_label,
                        r.attempt_count,
                        r.last_practice.as_deref().unwrap_or("-")
                    );
                }
                println!();
                println!("Overall mastery: {:.1}", report.overall_mastery);
            }
        }

        Commands::Weak { student, limit } => {
            let report = service.get_weak_points(student, limit)?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!("=== Weak Points ===");
                for wp in &report.weak_points {
                    println!(
                        "[{}] {} (avg {:.1}, {} attempts)",
                        wp.weakness_level.as_str(),
                        wp.knowledge_point,
                        wp.average_score,
                        wp.attempt_count
                    );
                    for issue in &wp.issues {
                        println!("    - {}", issue);
                    }
                    println!("    Practise {} more task(s)", wp.suggested_practice);
                }
                println!();
                println!("{}", report.overall_suggestion);
            }
        }

        Commands::Recommend { student } => {
            let recs = service.get_recommendations(student)?;
            if cli.json {
                print_json(&recs)?;
            } else if recs.is_empty() {
                println!("No recommendations right now.");
            } else {
                for rec in &recs {
                    println!(
                        "[{:?}] {} (~{} min)",
                        rec.priority, rec.title, rec.estimated_minutes
                    );
                    println!("    {}", rec.description);
                }
            }
        }

        Commands::Path(path_cmd) => match path_cmd {
            PathCommands::Plan {
                student,
                course,
                targets,
                threshold,
                budget,
                save,
            } => {
                let plan = service.get_recommended_path(&PathRequest {
                    student_id: student,
                    course_id: course,
                    targets,
                    threshold,
                    time_budget: budget,
                })?;

                let path_id = if save && !plan.is_empty() {
                    Some(db.save_path(student, course, &plan)?)
                } else {
                    None
                };

                if cli.json {
                    print_json(serde_json::json!({ "pathId": path_id, "plan": plan }))?;
                } else {
                    print_plan(&plan);
                    if let Some(id) = path_id {
                        println!();
                        println!("Saved as learning path {}. Start it with:", id);
                        println!("  coursegraph path start {}", id);
                    }
                }
            }

            PathCommands::List { student } => {
                let paths = db.list_paths(student)?;
                if cli.json {
                    print_json(&paths)?;
                } else if paths.is_empty() {
                    println!("No learning paths found.");
                } else {
                    println!(
                        "{:<5} {:<8} {:<12} {:<7} {:<8} CREATED",
                        "ID", "COURSE", "STATUS", "MATCH", "TIME"
                    );
                    println!("{}", "-".repeat(70));
                    for p in paths {
                        println!(
                            "{:<5} {:<8} {:<12} {:<7.2} {:<8} {}",
                            p.id,
                            p.course_id.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                            p.status.label(),
                            p.match_score,
                            format!("{}m", p.total_time),
                            p.created_at
                        );
                    }
                }
            }

            PathCommands::Show { id } => {
                let progress = db.path_progress(id)?;
                if cli.json {
                    print_json(&progress)?;
                } else {
                    print_progress(&progress);
                }
            }

            PathCommands::Start { id } => {
                let path = db.start_path(id)?;
                if cli.json {
                    print_json(&path)?;
                } else {
                    println!("Learning path {} is now {}.", path.id, path.status.label());
                }
            }

            PathCommands::Complete { id, point } => {
                let progress = db.complete_path_node(id, point)?;
                if cli.json {
                    print_json(&progress)?;
                } else {
                    print_progress(&progress);
                }
            }

            PathCommands::Abandon { id } => {
                let path = db.abandon_path(id)?;
                if cli.json {
                    print_json(&path)?;
                } else {
                    println!("Learning path {} abandoned.", path.id);
                }
            }
        },

        Commands::Tui { course, student } => {
            tui::run(db, config, course, student)?;
        }
    }

    Ok(())
}

fn print_point(point: &KnowledgePoint) {
    println!("Knowledge point: {}", point.name);
    println!("ID: {}", point.id);
    println!("Course: {}", point.course_id);
    if let Some(desc) = &point.description {
        println!("Description: {}", desc);
    }
    if let Some(parent) = point.parent_id {
        println!("Parent: {}", parent);
    }
    println!("Type: {}", point.point_type.label());
    println!("Difficulty: {}/5", point.difficulty_level);
    println!("Importance: {:.2}", point.importance);
    println!("Estimated time: {} min", point.estimated_time);
    println!("Created: {}", point.created_at);
}

fn print_tree(node: &TreeNode, depth: usize) {
    println!(
        "{}{} [{}] (id {}, D{}, {}m)",
        "  ".repeat(depth),
        node.name,
        node.point_type.label(),
        node.id,
        node.difficulty,
        node.estimated_time
    );
    for child in node.children() {
        print_tree(child, depth + 1);
    }
}

fn print_plan(plan: &LearningPathPlan) {
    if plan.is_empty() {
        println!("Every target already meets the mastery threshold. Nothing to plan.");
        return;
    }

    println!("=== Learning Path ===");
    println!(
        "{} stage(s), {} min total, match score {:.2}",
        plan.stages.len(),
        plan.total_time,
        plan.match_score
    );
    for stage in &plan.stages {
        println!();
        println!(
            "Stage {} ({} min): {}",
            stage.index + 1,
            stage.estimated_time,
            stage.focus
        );
        for p in &stage.knowledge_points {
            println!(
                "  {:<5} {:<34} now {:>3.0}%  gap {:>3.0}%  {}m",
                p.id,
                truncate(&p.name, 32),
                p.current_mastery * 100.0,
                p.gap * 100.0,
                p.estimated_time
            );
        }
        println!("  Check: {}", stage.assessment);
    }
    if !plan.deferred.is_empty() {
        println!();
        println!("Deferred by the time budget: {:?}", plan.deferred);
    }
}

fn print_progress(progress: &PathProgress) {
    let path = &progress.path;
    println!("Learning path {} ({})", path.id, path.status.label());
    println!(
        "Progress: {}/{} ({:.0}%)",
        progress.completed_count(),
        progress.nodes.len(),
        progress.completion_rate()
    );
    println!();
    for node in &progress.nodes {
        let mark = if node.completed_at.is_some() { "x" } else { " " };
        println!(
            "  [{}] S{} {:<5} {}",
            mark,
            node.stage_index + 1,
            node.knowledge_point_id,
            node.name
        );
    }
    if let Some(next) = progress.next_node() {
        println!();
        println!("Next up: {} (ID: {})", next.name, next.knowledge_point_id);
    }
}

/// Shorten to at most `max_len` characters, ending in "..." when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
