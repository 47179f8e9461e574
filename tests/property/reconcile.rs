//! Property-based tests for snapshot reconciliation and list views.
//!
//! Uses proptest to verify:
//! 1. Updates keep order and length; unknown ids change nothing.
//! 2. Deletes remove exactly the matching task.
//! 3. Creates prepend.
//! 4. Toggling twice is a no-op; a failed toggle restores the original.
//! 5. Pagination covers every filtered task exactly once.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use proptest::prelude::*;
use tasksync::tasks::view::{self, ListQuery, SortDirection, TaskFilter};
use tasksync::tasks::{TaskSnapshot, begin_toggle, reconcile};
use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::{Priority, Task, TaskId, TaskStatus};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

fn arb_due() -> impl Strategy<Value = Option<NaiveDate>> {
    proptest::option::of((-20i64..20).prop_map(|offset| today() + chrono::Duration::days(offset)))
}

/// Tasks with unique ids `t0..tN`.
fn arb_tasks(max: usize) -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        ("[a-z ]{1,12}", arb_status(), arb_priority(), arb_due()),
        0..max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (title, status, priority, due_date))| {
                let mut task = Task::new(format!("t{i}"), title);
                task.status = status;
                task.priority = priority;
                task.due_date = due_date;
                task
            })
            .collect()
    })
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

proptest! {
    #[test]
    fn update_preserves_order_and_length(tasks in arb_tasks(12), pick in any::<prop::sample::Index>(), title in "[a-z]{1,8}") {
        prop_assume!(!tasks.is_empty());
        let index = pick.index(tasks.len());
        let mut changed = tasks[index].clone();
        changed.title = title;

        let after = reconcile(tasks.clone(), &TaskEvent::TaskUpdated(changed.clone()));
        prop_assert_eq!(ids(&after), ids(&tasks));
        prop_assert_eq!(&after[index], &changed);
    }

    #[test]
    fn unknown_ids_change_nothing(tasks in arb_tasks(12)) {
        let ghost = Task::new("ghost", "nobody has me");
        prop_assert_eq!(reconcile(tasks.clone(), &TaskEvent::TaskUpdated(ghost)), tasks.clone());
        prop_assert_eq!(reconcile(tasks.clone(), &TaskEvent::TaskDeleted(TaskId::new("ghost"))), tasks);
    }

    #[test]
    fn delete_removes_exactly_one(tasks in arb_tasks(12), pick in any::<prop::sample::Index>()) {
        prop_assume!(!tasks.is_empty());
        let victim = tasks[pick.index(tasks.len())].id.clone();
        let after = reconcile(tasks.clone(), &TaskEvent::TaskDeleted(victim.clone()));
        prop_assert_eq!(after.len(), tasks.len() - 1);
        prop_assert!(after.iter().all(|t| t.id != victim));
    }

    #[test]
    fn create_prepends(tasks in arb_tasks(12)) {
        let fresh = Task::new("fresh", "new");
        let after = reconcile(tasks.clone(), &TaskEvent::TaskCreated(fresh.clone()));
        prop_assert_eq!(&after[0], &fresh);
        prop_assert_eq!(&after[1..], &tasks[..]);
    }

    #[test]
    fn double_toggle_is_a_no_op(tasks in arb_tasks(12), pick in any::<prop::sample::Index>()) {
        prop_assume!(!tasks.is_empty());
        let id = tasks[pick.index(tasks.len())].id.clone();
        let original = tasks.iter().find(|t| t.id == id).unwrap().status;

        let mut snapshot = TaskSnapshot::new();
        snapshot.replace_all(tasks);
        begin_toggle(&mut snapshot, &id).unwrap();
        begin_toggle(&mut snapshot, &id).unwrap();

        let after = snapshot.get(&id).unwrap().status;
        // In-progress goes to pending, then on to completed.
        let expected = if original == TaskStatus::InProgress { TaskStatus::Completed } else { original };
        prop_assert_eq!(after, expected);
    }

    #[test]
    fn failed_toggle_restores_original(tasks in arb_tasks(12), pick in any::<prop::sample::Index>()) {
        prop_assume!(!tasks.is_empty());
        let mut snapshot = TaskSnapshot::new();
        snapshot.replace_all(tasks.clone());
        let id = tasks[pick.index(tasks.len())].id.clone();

        let (toggle, patch) = begin_toggle(&mut snapshot, &id).unwrap();
        prop_assert_eq!(patch.status, Some(toggle.target));
        prop_assert!(toggle.rollback(&mut snapshot));
        prop_assert_eq!(snapshot.tasks(), &tasks[..]);
    }

    #[test]
    fn pages_cover_filtered_tasks_once(tasks in arb_tasks(30), page_size in 1usize..8, completed_only in any::<bool>()) {
        let filter = TaskFilter {
            status: completed_only.then_some(TaskStatus::Completed),
            ..TaskFilter::default()
        };
        let expected = view::filter_tasks(&tasks, &filter, today()).len();

        let mut seen = Vec::new();
        let mut query = ListQuery { filter, sort: Some(SortDirection::Ascending), page: 1, page_size };
        let total_pages = view::compose(&tasks, &query, today()).total_pages;
        for page in 1..=total_pages {
            query.page = page;
            let composed = view::compose(&tasks, &query, today());
            prop_assert!(composed.items.len() <= page_size);
            seen.extend(composed.items.iter().map(|t| t.id.clone()));
        }
        prop_assert_eq!(seen.len(), expected);
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), expected);
    }
}

#[test]
fn twelve_tasks_make_three_pages_of_five() {
    let tasks: Vec<Task> = (0..12).map(|i| Task::new(format!("t{i}"), "x")).collect();
    let page_ids = |page| {
        let query = ListQuery {
            page,
            ..ListQuery::default()
        };
        view::compose(&tasks, &query, today())
            .items
            .iter()
            .map(|t| t.id.as_str().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(page_ids(1), vec!["t0", "t1", "t2", "t3", "t4"]);
    assert_eq!(page_ids(3), vec!["t10", "t11"]);
    assert!(page_ids(4).is_empty());
    assert_eq!(view::total_pages(12, 5), 3);
}

#[test]
fn status_and_search_filters_pick_one_task() {
    let mut milk = Task::new("milk", "Buy milk");
    milk.priority = Priority::Low;
    let mut ship = Task::new("ship", "Ship release");
    ship.status = TaskStatus::Completed;
    ship.priority = Priority::High;
    ship.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
    let tasks = [milk, ship];

    let pending = TaskFilter {
        status: Some(TaskStatus::Pending),
        ..TaskFilter::default()
    };
    let matched: Vec<&str> = view::filter_tasks(&tasks, &pending, today())
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(matched, vec!["milk"]);

    let search = TaskFilter {
        search: "ship".to_string(),
        ..TaskFilter::default()
    };
    let matched: Vec<&str> = view::filter_tasks(&tasks, &search, today())
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(matched, vec!["ship"]);
}

#[test]
fn undated_tasks_sort_first_ascending() {
    let mut undated = Task::new("none", "no date");
    undated.due_date = None;
    let mut march = Task::new("mar", "march");
    march.due_date = NaiveDate::from_ymd_opt(2024, 3, 1);
    let mut january = Task::new("jan", "january");
    january.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
    let tasks = [undated, march, january];

    let mut refs: Vec<&Task> = tasks.iter().collect();
    view::sort_by_due(&mut refs, SortDirection::Ascending);
    let order: Vec<&str> = refs.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["none", "jan", "mar"]);

    view::sort_by_due(&mut refs, SortDirection::Descending);
    let order: Vec<&str> = refs.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(order, vec!["mar", "jan", "none"]);
}

#[test]
fn filters_combine() {
    let mut urgent = Task::new("a", "Write report");
    urgent.priority = Priority::High;
    urgent.due_date = Some(today());
    let mut done = Task::new("b", "Report review");
    done.status = TaskStatus::Completed;
    done.priority = Priority::High;
    let other = Task::new("c", "Groceries");
    let tasks = [urgent, done, other];

    let filter = TaskFilter {
        search: "REPORT".to_string(),
        priority: Some(Priority::High),
        ..TaskFilter::default()
    };
    let matched: Vec<&str> = view::filter_tasks(&tasks, &filter, today())
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(matched, vec!["a", "b"]);

    let filter = TaskFilter {
        due: Some(view::DueBucket::Today),
        ..filter
    };
    assert_eq!(view::filter_tasks(&tasks, &filter, today()).len(), 1);
}
