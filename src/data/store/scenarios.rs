//! Behaviour every [CollectionStore] must share, run against each backend.

use std::collections::HashSet;
use std::sync::Arc;

use bson::DateTime as BsonDateTime;

use super::{CollectionStore, Mutation, SubmissionEdit};
use crate::data::collection::{Collection, Submission};

const HOUR_MILLIS: i64 = 3_600_000;

pub fn collection(username: &str, created_at: BsonDateTime) -> Collection {
    Collection {
        username: username.to_string(),
        password: Some("pw".to_string()),
        password_hash: None,
        section: "A1".to_string(),
        course_code: "CS101".to_string(),
        semester: "Fall".to_string(),
        faculty: "Engineering".to_string(),
        department: "CSE".to_string(),
        team_count: 3,
        slides: vec![],
        submissions: vec![],
        created_at,
    }
}

pub fn submission(id: &str, serial: i64) -> Submission {
    Submission {
        id: id.to_string(),
        team_name: None,
        team_serial: serial.to_string(),
        serial_order: serial,
        slide_link: format!("http://slides/{}", id),
        leader_email: None,
        submitted_at: BsonDateTime::now(),
        updated_at: None,
    }
}

fn serials(submissions: &[Submission]) -> Vec<&str> {
    submissions.iter().map(|it| it.team_serial.as_str()).collect()
}

async fn with_collection(store: &dyn CollectionStore, username: &str) {
    let created = store
        .insert_collection(&collection(username, BsonDateTime::now()))
        .await
        .expect("unable to insert collection");
    assert_eq!(created, Mutation::Applied(()));
}

pub async fn insert_rejects_taken_username(store: &dyn CollectionStore) {
    let c = collection("a", BsonDateTime::now());

    assert_eq!(store.insert_collection(&c).await.unwrap(), Mutation::Applied(()));
    assert_eq!(store.insert_collection(&c).await.unwrap(), Mutation::Conflict);
    assert_eq!(store.count_collections().await.unwrap(), 1);

    let found = store.find_collection("a").await.unwrap().expect("stored collection");
    assert_eq!(found.username, "a");
    assert_eq!(found.password.as_deref(), Some("pw"));

    assert!(store.delete_collection("a").await.unwrap());
    assert!(!store.delete_collection("a").await.unwrap());
    assert!(store.find_collection("a").await.unwrap().is_none());
}

pub async fn push_keeps_numeric_order_and_rejects_duplicates(store: &dyn CollectionStore) {
    with_collection(store, "a").await;

    for (id, serial) in [("x", 10), ("y", 2), ("z", 1)] {
        let result = store.push_submission("a", &submission(id, serial)).await;
        assert_eq!(result.unwrap(), Mutation::Applied(()));
    }
    assert_eq!(
        store.push_submission("a", &submission("w", 2)).await.unwrap(),
        Mutation::Conflict
    );
    assert_eq!(
        store.push_submission("b", &submission("w", 5)).await.unwrap(),
        Mutation::MissingCollection
    );

    let submissions = store.find_submissions("a").await.unwrap().unwrap();
    assert_eq!(serials(&submissions), vec!["1", "2", "10"]);
    assert_eq!(store.count_submissions().await.unwrap(), 3);
    assert!(store.find_submissions("b").await.unwrap().is_none());
}

pub async fn update_moves_entry_and_detects_conflicts(store: &dyn CollectionStore) {
    with_collection(store, "a").await;
    store.push_submission("a", &submission("x", 1)).await.unwrap();
    store.push_submission("a", &submission("y", 2)).await.unwrap();

    let edit = SubmissionEdit {
        team_name: Some("Owls".to_string()),
        team_serial: "5".to_string(),
        serial_order: 5,
        slide_link: "http://new".to_string(),
        leader_email: None,
        updated_at: BsonDateTime::now(),
    };

    match store.update_submission("a", "x", &edit).await.unwrap() {
        Mutation::Applied(updated) => {
            assert_eq!(updated.id, "x");
            assert_eq!(updated.team_serial, "5");
            assert_eq!(updated.team_name.as_deref(), Some("Owls"));
            assert!(updated.updated_at.is_some());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    let submissions = store.find_submissions("a").await.unwrap().unwrap();
    assert_eq!(serials(&submissions), vec!["2", "5"]);

    // Keeping its own serial is allowed.
    assert!(matches!(
        store.update_submission("a", "x", &edit).await.unwrap(),
        Mutation::Applied(_)
    ));

    let clash = SubmissionEdit {
        team_serial: "5".to_string(),
        ..edit.clone()
    };
    assert_eq!(
        store.update_submission("a", "y", &clash).await.unwrap(),
        Mutation::Conflict
    );
    assert_eq!(
        store.update_submission("a", "missing", &edit).await.unwrap(),
        Mutation::MissingSubmission
    );
    assert_eq!(
        store.update_submission("b", "x", &edit).await.unwrap(),
        Mutation::MissingCollection
    );
}

pub async fn pull_preserves_remaining_order(store: &dyn CollectionStore) {
    with_collection(store, "a").await;
    for (id, serial) in [("x", 1), ("y", 2), ("z", 3)] {
        store.push_submission("a", &submission(id, serial)).await.unwrap();
    }

    assert_eq!(store.pull_submission("a", "y").await.unwrap(), Mutation::Applied(()));
    assert_eq!(
        store.pull_submission("a", "y").await.unwrap(),
        Mutation::MissingSubmission
    );
    assert_eq!(
        store.pull_submission("b", "x").await.unwrap(),
        Mutation::MissingCollection
    );

    let submissions = store.find_submissions("a").await.unwrap().unwrap();
    assert_eq!(serials(&submissions), vec!["1", "3"]);
}

pub async fn recent_and_active_use_creation_time(store: &dyn CollectionStore) {
    let now = BsonDateTime::now().timestamp_millis();
    for (age, name) in [(60, "old"), (30, "mid"), (0, "new")] {
        let created = BsonDateTime::from_millis(now - age * HOUR_MILLIS);
        store.insert_collection(&collection(name, created)).await.unwrap();
    }

    let recent = store.recent_collections(2).await.unwrap();
    let names: Vec<&str> = recent.iter().map(|it| it.username.as_str()).collect();
    assert_eq!(names, vec!["new", "mid"]);

    let since = BsonDateTime::from_millis(now - 24 * HOUR_MILLIS);
    assert_eq!(store.count_created_since(since).await.unwrap(), 1);
}

/// Submits `2 * serials` entries at once, two per serial, on one collection.
pub async fn parallel_pushes_keep_one_entry_per_serial(store: Arc<dyn CollectionStore>) {
    const SERIALS: i64 = 25;
    with_collection(store.as_ref(), "a").await;

    let tasks: Vec<_> = (0..SERIALS * 2)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let entry = submission(&format!("s{}", i), i % SERIALS);
                store.push_submission("a", &entry).await
            })
        })
        .collect();

    let mut applied = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.expect("submit task panicked").unwrap() {
            Mutation::Applied(()) => applied += 1,
            Mutation::Conflict => conflicts += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(applied, SERIALS);
    assert_eq!(conflicts, SERIALS);

    let submissions = store.find_submissions("a").await.unwrap().unwrap();
    assert_eq!(submissions.len() as i64, SERIALS);
    let unique: HashSet<&str> = submissions.iter().map(|it| it.team_serial.as_str()).collect();
    assert_eq!(unique.len() as i64, SERIALS);
    assert!(submissions
        .windows(2)
        .all(|pair| pair[0].serial_order < pair[1].serial_order));
}
