//! Derived list views over a task snapshot.
//!
//! The list pipeline is strictly ordered: [`filter_tasks`] →
//! [`sort_by_due`] → [`paginate`]. [`compose`] runs all three for the
//! all-tasks page. The remaining functions derive the completed,
//! categories and dashboard pages. Nothing here mutates the snapshot.
//!
//! Functions that compare against "today" take it as an argument so the
//! caller decides the clock.

use chrono::NaiveDate;
use tasksync_proto::task::{Priority, Task, TaskStatus};

/// Items shown per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Due-date bucket filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DueBucket {
    /// Due exactly today.
    Today,
    /// Due strictly before today.
    Overdue,
}

impl DueBucket {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Overdue => "Overdue",
        }
    }

    /// Whether `task` falls in this bucket. Undated tasks never do.
    #[must_use]
    pub fn contains(self, task: &Task, today: NaiveDate) -> bool {
        task.due_date.is_some_and(|due| match self {
            Self::Today => due == today,
            Self::Overdue => due < today,
        })
    }
}

/// Direction of the due-date sort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    /// Earliest first.
    #[default]
    Ascending,
    /// Latest first.
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Short label for the filter bar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascending => "Due ↑",
            Self::Descending => "Due ↓",
        }
    }
}

/// Active filter predicates. Unset fields pass every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring over title or description.
    pub search: String,
    /// Exact status match.
    pub status: Option<TaskStatus>,
    /// Exact priority match.
    pub priority: Option<Priority>,
    /// Due-date bucket.
    pub due: Option<DueBucket>,
}

impl TaskFilter {
    /// Whether `task` passes every active predicate.
    #[must_use]
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        matches_search(task, &self.search)
            && self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
            && self.due.is_none_or(|bucket| bucket.contains(task, today))
    }

    /// Whether any predicate is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.is_empty()
            || self.status.is_some()
            || self.priority.is_some()
            || self.due.is_some()
    }

    /// Cycles the status filter: all → each status → all.
    pub fn cycle_status(&mut self) {
        self.status = cycle(self.status, &TaskStatus::ALL);
    }

    /// Cycles the priority filter: all → each priority → all.
    pub fn cycle_priority(&mut self) {
        self.priority = cycle(self.priority, &Priority::ALL);
    }

    /// Cycles the due filter: all → today → overdue → all.
    pub fn cycle_due(&mut self) {
        self.due = cycle(self.due, &[DueBucket::Today, DueBucket::Overdue]);
    }
}

fn cycle<T: Copy + PartialEq>(current: Option<T>, values: &[T]) -> Option<T> {
    match current {
        None => values.first().copied(),
        Some(v) => values
            .iter()
            .position(|x| *x == v)
            .and_then(|i| values.get(i + 1))
            .copied(),
    }
}

/// Case-insensitive substring match over title or description.
/// An empty term matches everything.
#[must_use]
pub fn matches_search(task: &Task, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.description_or_empty().to_lowercase().contains(&needle)
}

/// Tasks passing `filter`, in snapshot order.
#[must_use]
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter, today: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t, today)).collect()
}

/// Stable sort by due date; absent dates sort as the Unix epoch.
pub fn sort_by_due(tasks: &mut [&Task], direction: SortDirection) {
    match direction {
        SortDirection::Ascending => tasks.sort_by_key(|t| t.due_or_epoch()),
        SortDirection::Descending => {
            tasks.sort_by(|a, b| b.due_or_epoch().cmp(&a.due_or_epoch()));
        }
    }
}

/// Number of pages needed for `count` items.
#[must_use]
pub const fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        count.div_ceil(page_size)
    }
}

/// The 1-based `page` of `items`. Out-of-range pages yield an empty slice.
#[must_use]
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Parameters of the all-tasks page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Filter predicates.
    pub filter: TaskFilter,
    /// Due-date sort; `None` keeps snapshot order.
    pub sort: Option<SortDirection>,
    /// 1-based page number.
    pub page: usize,
    /// Items per page.
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::default(),
            sort: Some(SortDirection::Ascending),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a composed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a> {
    /// Tasks on this page.
    pub items: Vec<&'a Task>,
    /// Requested page number.
    pub page: usize,
    /// Pages available for the filtered list.
    pub total_pages: usize,
    /// Tasks passing the filter across all pages.
    pub total_matches: usize,
}

/// Runs filter → sort → paginate.
#[must_use]
pub fn compose<'a>(tasks: &'a [Task], query: &ListQuery, today: NaiveDate) -> Page<'a> {
    let mut filtered = filter_tasks(tasks, &query.filter, today);
    if let Some(direction) = query.sort {
        sort_by_due(&mut filtered, direction);
    }
    Page {
        items: paginate(&filtered, query.page, query.page_size).to_vec(),
        page: query.page,
        total_pages: total_pages(filtered.len(), query.page_size),
        total_matches: filtered.len(),
    }
}

/// Tasks whose status is `Completed`, in snapshot order.
#[must_use]
pub fn completed_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.is_completed()).collect()
}

/// Tasks of one priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityGroup<'a> {
    pub priority: Priority,
    pub tasks: Vec<&'a Task>,
}

/// Groups tasks by priority, highest first. Empty groups are kept.
#[must_use]
pub fn group_by_priority(tasks: &[Task]) -> Vec<PriorityGroup<'_>> {
    [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .map(|priority| PriorityGroup {
            priority,
            tasks: tasks.iter().filter(|t| t.priority == priority).collect(),
        })
        .collect()
}

/// Status counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl DashboardStats {
    /// Counts statuses across `tasks`.
    #[must_use]
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Pending => stats.pending += 1,
            }
            stats
        })
    }

    /// `count` as a percentage of the total, or 0 with no tasks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}

/// Everything the dashboard page shows.
///
/// A non-blank search narrows every section and the counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard<'a> {
    /// Tasks matching the dashboard search (empty when no search).
    pub matches: Vec<&'a Task>,
    /// Matching tasks due today.
    pub today: Vec<&'a Task>,
    /// Matching tasks due after today, earliest first.
    pub upcoming: Vec<&'a Task>,
    /// Status counts over the matching tasks.
    pub stats: DashboardStats,
}

/// Derives the dashboard from the snapshot.
#[must_use]
pub fn dashboard<'a>(tasks: &'a [Task], search: &str, today: NaiveDate) -> Dashboard<'a> {
    let term = search.trim();
    let filtered: Vec<&Task> = tasks.iter().filter(|t| matches_search(t, term)).collect();
    let mut upcoming: Vec<&Task> = filtered
        .iter()
        .copied()
        .filter(|t| t.due_date.is_some_and(|d| d > today))
        .collect();
    sort_by_due(&mut upcoming, SortDirection::Ascending);
    Dashboard {
        today: filtered
            .iter()
            .copied()
            .filter(|t| t.due_date == Some(today))
            .collect(),
        upcoming,
        stats: DashboardStats::from_tasks(filtered.iter().copied()),
        matches: if term.is_empty() { Vec::new() } else { filtered },
    }
}

/// Tasks due on `date`.
#[must_use]
pub fn tasks_on(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| t.due_date == Some(date)).collect()
}

/// Due-date classification for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    DueToday,
    Future,
    Undated,
}

/// Classifies `task` relative to `today`.
#[must_use]
pub fn due_state(task: &Task, today: NaiveDate) -> DueState {
    match task.due_date {
        None => DueState::Undated,
        Some(d) if d < today => DueState::Overdue,
        Some(d) if d == today => DueState::DueToday,
        Some(_) => DueState::Future,
    }
}

/// `"Mar 1, 2024"`, or `"No due date"`.
#[must_use]
pub fn format_due(date: Option<NaiveDate>) -> String {
    date.map_or_else(
        || "No due date".to_string(),
        |d| d.format("%b %-d, %Y").to_string(),
    )
}
