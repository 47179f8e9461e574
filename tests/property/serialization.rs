//! Property-based tests for the push-frame and API body codecs.
//!
//! Uses proptest to verify:
//! 1. Any well-formed `TaskEvent` survives encode → decode.
//! 2. Arbitrary text never causes a panic in `decode_event`.
//! 3. Due dates survive as day-granular values whatever time part the
//!    server appends.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::NaiveDate;
use proptest::prelude::*;
use tasksync_proto::codec;
use tasksync_proto::event::TaskEvent;
use tasksync_proto::task::{Priority, Task, TaskId, TaskStatus, UserRef};

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    "[a-f0-9]{24}".prop_map(TaskId::new)
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

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1970i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_user() -> impl Strategy<Value = UserRef> {
    (
        proptest::option::of("[a-z0-9]{1,12}"),
        proptest::option::of("[A-Za-z ]{1,20}"),
        proptest::option::of("[a-z]{1,8}@example\\.com"),
    )
        .prop_map(|(id, name, email)| UserRef { id, name, email })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        "[^\x00]{1,80}",
        proptest::option::of("[^\x00]{0,200}"),
        arb_status(),
        arb_priority(),
        proptest::option::of(arb_date()),
        prop::collection::vec(arb_user(), 0..4),
    )
        .prop_map(
            |(id, title, description, status, priority, due_date, shared_with)| Task {
                id,
                title,
                description,
                status,
                priority,
                due_date,
                shared_with,
            },
        )
}

fn arb_event() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        arb_task().prop_map(TaskEvent::TaskCreated),
        arb_task().prop_map(TaskEvent::TaskUpdated),
        arb_task_id().prop_map(TaskEvent::TaskDeleted),
    ]
}

proptest! {
    #[test]
    fn event_frames_round_trip(event in arb_event()) {
        let frame = codec::encode_event(&event).unwrap();
        prop_assert_eq!(codec::decode_event(&frame).unwrap(), event);
    }

    #[test]
    fn decode_never_panics_on_arbitrary_text(text in ".*") {
        let _ = codec::decode_event(&text);
    }

    #[test]
    fn due_date_time_part_is_dropped(date in arb_date(), h in 0u32..24, m in 0u32..60) {
        let frame = format!(
            r#"{{"event":"taskUpdated","data":{{"_id":"t","title":"x","dueDate":"{}T{h:02}:{m:02}:00.000Z"}}}}"#,
            date.format("%Y-%m-%d"),
        );
        let event = codec::decode_event(&frame).unwrap();
        let TaskEvent::TaskUpdated(task) = event else {
            panic!("expected TaskUpdated");
        };
        prop_assert_eq!(task.due_date, Some(date));
    }
}
