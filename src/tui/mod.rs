mod ui;
mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use coursegraph::config::Config;
use coursegraph::db::Database;
use coursegraph::mastery::{MasteryReport, WeakPointReport};
use coursegraph::models::PointType;
use coursegraph::planner::{LearningPathPlan, PlannedPoint};
use coursegraph::service::{PathRequest, Service};
use coursegraph::tree::TreeNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Tree,
    Mastery,
    Path,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Tree => View::Mastery,
            View::Mastery => View::Path,
            View::Path => View::Tree,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Tree => View::Path,
            View::Mastery => View::Tree,
            View::Path => View::Mastery,
        }
    }

    fn index(&self) -> usize {
        match self {
            View::Tree => 0,
            View::Mastery => 1,
            View::Path => 2,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

// One line of the indented tree view
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub depth: usize,
    pub id: i64,
    pub name: String,
    pub point_type: PointType,
    pub difficulty: i32,
    pub estimated_time: i32,
    pub has_children: bool,
}

fn flatten_forest(forest: &[TreeNode], depth: usize, out: &mut Vec<TreeRow>) {
    for node in forest {
        out.push(TreeRow {
            depth,
            id: node.id,
            name: node.name.clone(),
            point_type: node.point_type,
            difficulty: node.difficulty,
            estimated_time: node.estimated_time,
            has_children: !node.children().is_empty(),
        });
        flatten_forest(node.children(), depth + 1, out);
    }
}

#[derive(Debug, Clone)]
pub struct PlanRow {
    pub stage: usize,
    pub point: PlannedPoint,
}

pub struct App {
    db: Database,
    config: Config,
    pub course_id: i64,
    pub student_id: i64,
    pub course_name: String,
    pub view: View,
    pub tree: StatefulList<TreeRow>,
    pub mastery: MasteryReport,
    pub weak: WeakPointReport,
    pub mastery_rows: StatefulList<usize>,
    pub plan: Option<LearningPathPlan>,
    pub plan_rows: StatefulList<PlanRow>,
    pub plan_error: Option<String>,
    pub status_message: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        db: Database,
        config: Config,
        course_id: i64,
        student_id: i64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let course_name = db
            .get_course(course_id)?
            .map(|c| c.name)
            .ok_or_else(|| format!("Course {} not found", course_id))?;

        let mut app = Self {
            db,
            config,
            course_id,
            student_id,
            course_name,
            view: View::Tree,
            tree: StatefulList::with_items(Vec::new()),
            mastery_rows: StatefulList::with_items(Vec::new()),
            mastery: MasteryReport::default(),
            weak: WeakPointReport::default(),
            plan: None,
            plan_rows: StatefulList::with_items(Vec::new()),
            plan_error: None,
            status_message: None,
            should_quit: false,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn refresh_data(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let service = Service::new(&self.db, &self.config);

        let forest = service.get_knowledge_tree(self.course_id)?;
        let mut rows = Vec::new();
        flatten_forest(&forest, 0, &mut rows);
        self.tree = StatefulList::with_items(rows);

        self.mastery = service.get_mastery(self.student_id, Some(self.course_id))?;
        self.weak = service.get_weak_points(self.student_id, None)?;
        self.mastery_rows =
            StatefulList::with_items((0..self.mastery.knowledge_mastery.len()).collect());

        // A cyclic prerequisite graph is shown in the Path tab, not fatal
        let request = PathRequest {
            student_id: self.student_id,
            course_id: Some(self.course_id),
            ..Default::default()
        };
        match service.get_recommended_path(&request) {
            Ok(plan) => {
                let rows = plan
                    .stages
                    .iter()
                    .flat_map(|s| {
                        s.knowledge_points.iter().map(move |p| PlanRow {
                            stage: s.index,
                            point: p.clone(),
                        })
                    })
                    .collect();
                self.plan_rows = StatefulList::with_items(rows);
                self.plan = Some(plan);
                self.plan_error = None;
            }
            Err(e) => {
                self.plan = None;
                self.plan_rows = StatefulList::with_items(Vec::new());
                self.plan_error = Some(e.to_string());
            }
        }
        Ok(())
    }

    fn save_plan(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(plan) = &self.plan else {
            return Ok(());
        };
        if plan.is_empty() {
            self.status_message = Some("Nothing to save: no weak points in this course".into());
            return Ok(());
        }
        let id = self
            .db
            .save_path(self.student_id, Some(self.course_id), plan)?;
        self.status_message = Some(format!("Saved learning path {}", id));
        Ok(())
    }

    fn handle_key(
        &mut self,
        key: KeyCode,
        modifiers: KeyModifiers,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.status_message = None;

        match key {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
                self.status_message = Some("Refreshed".into());
            }

            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => self.view = self.view.prev(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.view = self.view.next(),

            KeyCode::Char('j') | KeyCode::Down => match self.view {
                View::Tree => self.tree.next(),
                View::Mastery => self.mastery_rows.next(),
                View::Path => self.plan_rows.next(),
            },
            KeyCode::Char('k') | KeyCode::Up => match self.view {
                View::Tree => self.tree.previous(),
                View::Mastery => self.mastery_rows.previous(),
                View::Path => self.plan_rows.previous(),
            },

            KeyCode::Char('g') => match self.view {
                View::Tree => self.tree.first(),
                View::Mastery => self.mastery_rows.first(),
                View::Path => self.plan_rows.first(),
            },
            KeyCode::Char('G') => match self.view {
                View::Tree => self.tree.last(),
                View::Mastery => self.mastery_rows.last(),
                View::Path => self.plan_rows.last(),
            },

            KeyCode::Char('s') if self.view == View::Path => self.save_plan()?,

            _ => {}
        }
        Ok(())
    }
}

pub fn run(
    db: Database,
    config: Config,
    course_id: i64,
    student_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load before touching the terminal so lookup errors print normally
    let mut app = App::new(db, config, course_id, student_id)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_cycle_both_ways() {
        assert_eq!(View::Tree.next(), View::Mastery);
        assert_eq!(View::Path.next(), View::Tree);
        assert_eq!(View::Tree.prev(), View::Path);
        assert_eq!(View::Mastery.index(), 1);
    }

    #[test]
    fn list_wraps_around() {
        let mut list = StatefulList::with_items(vec![1, 2, 3]);
        list.previous();
        assert_eq!(list.selected, Some(2));
        list.next();
        assert_eq!(list.selected, Some(0));
        list.last();
        assert_eq!(list.selected_item(), Some(&3));
    }

    #[test]
    fn empty_list_has_no_selection() {
        let mut list: StatefulList<i32> = StatefulList::with_items(vec![]);
        list.next();
        list.first();
        assert_eq!(list.selected, None);
    }

    #[test]
    fn app_rejects_unknown_course_or_student() {
        let db = Database::open(":memory:").unwrap();
        db.init().unwrap();
        let course = db.add_course("Algorithms").unwrap();
        assert!(App::new(db, Config::default(), course, 42).is_err());

        let db = Database::open(":memory:").unwrap();
        db.init().unwrap();
        let student = db.add_student("Ada").unwrap();
        assert!(App::new(db, Config::default(), 7, student).is_err());
    }

    #[test]
    fn app_loads_course_views() {
        use coursegraph::models::{NewKnowledgePoint, NewRelation};

        let db = Database::open(":memory:").unwrap();
        db.init().unwrap();
        let course = db.add_course("Algorithms").unwrap();
        let student = db.add_student("Ada").unwrap();
        let root = db
            .create_knowledge_point(&NewKnowledgePoint::new(course, "数据结构基础"))
            .unwrap();
        let child = db
            .create_knowledge_point(&NewKnowledgePoint::new(course, "算法分析").with_parent(root.id))
            .unwrap();
        db.create_relation(&NewRelation::prerequisite(root.id, child.id))
            .unwrap();
        let task = db.add_task(course, "算法作业", None, None).unwrap();
        db.record_submission(student, task, Some(45.0)).unwrap();

        let mut app = App::new(db, Config::default(), course, student).unwrap();

        assert_eq!(app.course_name, "Algorithms");
        assert_eq!(app.tree.items.len(), 2);
        assert_eq!(app.tree.items[1].depth, 1);
        assert!(app.tree.items[0].has_children);
        assert_eq!(app.mastery.knowledge_mastery.len(), 1);
        assert_eq!(app.plan_rows.items.len(), 1);
        assert_eq!(app.plan_rows.items[0].point.id, child.id);

        app.view = View::Path;
        app.handle_key(KeyCode::Char('s'), KeyModifiers::NONE).unwrap();
        assert_eq!(app.db.list_paths(student).unwrap().len(), 1);
    }
}
