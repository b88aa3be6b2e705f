use std::collections::HashMap;

use bson::DateTime as BsonDateTime;
use tokio::sync::RwLock;

use super::{CollectionStore, Mutation, SubmissionEdit};
use crate::data::collection::{Collection, Submission};
use crate::error::StoreError;

/// Process-local store backing the test suite.
///
/// A single lock serializes writers, matching the per-document atomicity of
/// the MongoDB store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

fn sort_submissions(submissions: &mut [Submission]) {
    submissions.sort_by_key(|it| it.serial_order);
}

#[rocket::async_trait]
impl CollectionStore for MemoryStore {
    async fn insert_collection(&self, collection: &Collection) -> Result<Mutation, StoreError> {
        let mut collections = self.collections.write().await;

        if collections.contains_key(&collection.username) {
            return Ok(Mutation::Conflict);
        }
        collections.insert(collection.username.clone(), collection.clone());

        Ok(Mutation::Applied(()))
    }

    async fn find_collection(&self, username: &str) -> Result<Option<Collection>, StoreError> {
        Ok(self.collections.read().await.get(username).cloned())
    }

    async fn delete_collection(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.collections.write().await.remove(username).is_some())
    }

    async fn find_submissions(
        &self,
        username: &str,
    ) -> Result<Option<Vec<Submission>>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(username)
            .map(|it| it.submissions.clone()))
    }

    async fn push_submission(
        &self,
        username: &str,
        submission: &Submission,
    ) -> Result<Mutation, StoreError> {
        let mut collections = self.collections.write().await;
        let collection = match collections.get_mut(username) {
            Some(it) => it,
            None => return Ok(Mutation::MissingCollection),
        };

        if collection
            .submissions
            .iter()
            .any(|it| it.team_serial == submission.team_serial)
        {
            return Ok(Mutation::Conflict);
        }

        collection.submissions.push(submission.clone());
        sort_submissions(&mut collection.submissions);

        Ok(Mutation::Applied(()))
    }

    async fn update_submission(
        &self,
        username: &str,
        id: &str,
        edit: &SubmissionEdit,
    ) -> Result<Mutation<Submission>, StoreError> {
        let mut collections = self.collections.write().await;
        let collection = match collections.get_mut(username) {
            Some(it) => it,
            None => return Ok(Mutation::MissingCollection),
        };

        let index = match collection.submissions.iter().position(|it| it.id == id) {
            Some(it) => it,
            None => return Ok(Mutation::MissingSubmission),
        };

        if collection
            .submissions
            .iter()
            .any(|it| it.id != id && it.team_serial == edit.team_serial)
        {
            return Ok(Mutation::Conflict);
        }

        edit.apply(&mut collection.submissions[index]);
        let updated = collection.submissions[index].clone();
        sort_submissions(&mut collection.submissions);

        Ok(Mutation::Applied(updated))
    }

    async fn pull_submission(&self, username: &str, id: &str) -> Result<Mutation, StoreError> {
        let mut collections = self.collections.write().await;
        let collection = match collections.get_mut(username) {
            Some(it) => it,
            None => return Ok(Mutation::MissingCollection),
        };

        let before = collection.submissions.len();
        collection.submissions.retain(|it| it.id != id);

        if collection.submissions.len() == before {
            Ok(Mutation::MissingSubmission)
        } else {
            Ok(Mutation::Applied(()))
        }
    }

    async fn count_collections(&self) -> Result<u64, StoreError> {
        Ok(self.collections.read().await.len() as u64)
    }

    async fn count_submissions(&self) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .values()
            .map(|it| it.submissions.len() as u64)
            .sum())
    }

    async fn count_created_since(&self, since: BsonDateTime) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .values()
            .filter(|it| it.created_at >= since)
            .count() as u64)
    }

    async fn recent_collections(&self, limit: i64) -> Result<Vec<Collection>, StoreError> {
        let mut collections: Vec<Collection> =
            self.collections.read().await.values().cloned().collect();
        collections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        collections.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(collections)
    }
}
