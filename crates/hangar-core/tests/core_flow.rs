use std::fs;

use chrono::{Duration, TimeZone, Utc};
use hangar_core::datastore::DataStore;
use hangar_core::header::header_state;
use hangar_core::order::{Comparators, Listing};
use hangar_core::params::{RequestParams, SortKey, SortSpec, SortTerm};
use hangar_core::task::{Category, Priority, Status, Task};
use hangar_core::view::{Snapshot, ViewOptions, build_view};
use tempfile::tempdir;

fn seeded_snapshot() -> Snapshot {
    let now = Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0).single().expect("valid now");
    let finance = Category {
        id: 5,
        name: "Finance".to_string(),
    };
    let school = Category {
        id: 3,
        name: "School".to_string(),
    };
    let priorities: Vec<Priority> = ["Critical", "High", "Medium", "Low", "Optional", "Someday"]
        .iter()
        .enumerate()
        .map(|(idx, name)| Priority {
            id: idx as u64 + 1,
            name: name.to_string(),
        })
        .collect();

    let mut taxes = Task::new_pending(
        1,
        "URGENT: file taxes".to_string(),
        finance.clone(),
        priorities[3].clone(),
        now,
    );
    taxes.deadline = Some(now + Duration::days(30));
    taxes.add_subtask(1, "collect receipts", Status::Completed);
    taxes.add_subtask(2, "fill forms", Status::Completed);
    taxes.add_subtask(3, "review", Status::Completed);
    taxes.add_subtask(4, "submit", Status::Pending);

    let mut budget = Task::new_pending(
        2,
        "Monthly budget".to_string(),
        finance.clone(),
        priorities[0].clone(),
        now,
    );
    budget.status = Status::InProgress;

    let mut essay = Task::new_pending(
        3,
        "History essay".to_string(),
        school.clone(),
        priorities[2].clone(),
        now,
    );
    essay.deadline = Some(now + Duration::days(2));

    let mut thesis = Task::new_pending(
        4,
        "Thesis outline".to_string(),
        school.clone(),
        priorities[5].clone(),
        now,
    );
    thesis.status = Status::Completed;

    Snapshot {
        categories: vec![finance, school],
        priorities,
        tasks: vec![taxes, budget, essay, thesis],
    }
}

fn ids(view: &hangar_core::view::TaskView<'_>) -> Vec<u64> {
    view.rows.iter().map(|r| r.task.id).collect()
}

#[test]
fn datastore_roundtrip_feeds_the_view() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(temp.path()).expect("open datastore");
    store.save_snapshot(&seeded_snapshot()).expect("save snapshot");

    let snapshot = store.load_snapshot().expect("load snapshot");
    assert_eq!(snapshot.tasks.len(), 4);
    assert_eq!(snapshot.tasks[0].subtasks.len(), 4);

    let params = RequestParams::from_query([("category", "5"), ("order", "-progress")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::CategoryScoped, Utc::now()),
        &Comparators::standard(),
    );

    let got: Vec<(u64, u8)> = view.rows.iter().map(|r| (r.task.id, r.progress)).collect();
    assert_eq!(got, vec![(1, 75), (2, 50)]);
}

#[test]
fn import_accepts_readable_deadlines() {
    let temp = tempdir().expect("tempdir");
    let store = DataStore::open(&temp.path().join("data")).expect("open datastore");
    let doc = temp.path().join("seed.json");
    fs::write(
        &doc,
        r#"{
          "categories": [{"id": 1, "name": "Work"}],
          "priorities": [{"id": 1, "name": "High"}],
          "tasks": [{
            "id": 9,
            "title": "Board deck",
            "deadline": "2026-03-01T17:00:00Z",
            "status": "in_progress",
            "priority": {"id": 1, "name": "High"},
            "category": {"id": 1, "name": "Work"},
            "created_at": "20260201T000000Z",
            "updated_at": "20260201T000000Z"
          }]
        }"#,
    )
    .expect("write seed");

    let imported = store.import_file(&doc).expect("import");
    assert_eq!(imported.tasks.len(), 1);

    let reloaded = store.load_snapshot().expect("reload");
    let task = &reloaded.tasks[0];
    assert_eq!(task.status, Status::InProgress);
    assert_eq!(
        task.deadline,
        Some(Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).single().expect("valid"))
    );
}

#[test]
fn priority_ascending_uses_rank_table() {
    let snapshot = seeded_snapshot();
    let params = RequestParams::from_query([("sort", "priority"), ("dir", "asc")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::CategoryScoped, Utc::now()),
        &Comparators::standard(),
    );
    // Critical, Medium, Low, then the unranked "Someday".
    assert_eq!(ids(&view), vec![2, 3, 1, 4]);
}

#[test]
fn priority_is_not_sortable_in_plain_task_listing() {
    let snapshot = seeded_snapshot();
    let params = RequestParams::from_query([("sort", "priority")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::Tasks, Utc::now()),
        &Comparators::standard(),
    );
    assert!(view.sort.is_empty());
    assert_eq!(ids(&view), vec![1, 2, 3, 4]);
    assert!(view.header.column(SortKey::Priority).is_none());
}

#[test]
fn deadline_ordering_puts_undated_tasks_last() {
    let snapshot = seeded_snapshot();
    for order in ["deadline", "-deadline"] {
        let params = RequestParams::from_query([("order", order)]);
        let view = build_view(
            &snapshot,
            &params,
            &ViewOptions::new(Listing::Tasks, Utc::now()),
            &Comparators::standard(),
        );
        let got = ids(&view);
        assert_eq!(&got[2..], &[2, 4], "order {order}");
    }
}

#[test]
fn header_rotation_follows_clicks() {
    let spec = SortSpec::from_terms([SortTerm::desc(SortKey::Title)]);
    let state = header_state(&spec, Listing::Tasks.columns());

    let after_deadline = state.column(SortKey::Deadline).expect("deadline").next.clone();
    assert_eq!(
        after_deadline.terms(),
        &[SortTerm::asc(SortKey::Deadline), SortTerm::desc(SortKey::Title)]
    );

    let state = header_state(&after_deadline, Listing::Tasks.columns());
    let after_title = state.column(SortKey::Title).expect("title").next.clone();
    assert_eq!(
        after_title.terms(),
        &[SortTerm::asc(SortKey::Title), SortTerm::asc(SortKey::Deadline)]
    );

    let state = header_state(&after_title, Listing::Tasks.columns());
    let toggled = state.column(SortKey::Title).expect("title").next.clone();
    assert_eq!(
        toggled.terms(),
        &[SortTerm::desc(SortKey::Title), SortTerm::asc(SortKey::Deadline)]
    );
}

#[test]
fn garbage_parameters_degrade_to_an_empty_view() {
    let snapshot = seeded_snapshot();
    let params = RequestParams::from_query([
        ("category", "9999"),
        ("priority", "not-a-number"),
        ("sort", "colour"),
        ("dir", "sideways"),
    ]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::CategoryScoped, Utc::now()),
        &Comparators::standard(),
    );
    assert!(view.rows.is_empty());
    assert_eq!(view.header.columns.len(), 6);
    assert_eq!(view.summary.total, 0);
}

#[test]
fn search_and_status_narrow_without_reordering() {
    let snapshot = seeded_snapshot();
    let params = RequestParams::from_query([("q", "urgent")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::Tasks, Utc::now()),
        &Comparators::standard(),
    );
    assert_eq!(ids(&view), vec![1]);

    let params = RequestParams::from_query([("status", "pending")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::Tasks, Utc::now()),
        &Comparators::standard(),
    );
    assert_eq!(ids(&view), vec![1, 3]);
    assert_eq!(view.summary.pending, 2);
}

#[test]
fn subtask_listing_filters_on_subtask_status() {
    let snapshot = seeded_snapshot();
    let params = RequestParams::from_query([("status", "completed"), ("order", "-title")]);
    let view = build_view(
        &snapshot,
        &params,
        &ViewOptions::new(Listing::SubTasks, Utc::now()),
        &Comparators::standard(),
    );

    // The parent task is still Pending; its completed subtasks are listed.
    let got: Vec<(u64, &str)> = view.rows.iter().map(|r| (r.task.id, r.title())).collect();
    assert_eq!(
        got,
        vec![(1, "review"), (1, "fill forms"), (1, "collect receipts")]
    );
    assert!(view.rows.iter().all(|r| r.progress == 100));
    assert_eq!(view.summary.completed, 3);
    assert_eq!(view.header.columns.len(), 6);
}
