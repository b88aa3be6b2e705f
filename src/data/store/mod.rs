//! Persistence seam of the service.
//!
//! Every array mutation is a single conditional operation on one collection
//! document, so concurrent writers against the same collection can't lose
//! each other's submissions.

use std::fmt::Debug;

use bson::DateTime as BsonDateTime;

use crate::data::collection::{Collection, Submission};
use crate::error::StoreError;

pub mod memory;
pub mod mongo;
#[cfg(test)]
pub(crate) mod scenarios;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Result of a conditional write against a collection document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T = ()> {
    Applied(T),
    /// The guarding uniqueness condition (username or team serial) didn't hold.
    Conflict,
    MissingCollection,
    MissingSubmission,
}

/// Replacement values for an existing submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionEdit {
    pub team_name: Option<String>,
    pub team_serial: String,
    pub serial_order: i64,
    pub slide_link: String,
    pub leader_email: Option<String>,
    pub updated_at: BsonDateTime,
}

impl SubmissionEdit {
    pub fn apply(&self, submission: &mut Submission) {
        submission.team_name = self.team_name.clone();
        submission.team_serial = self.team_serial.clone();
        submission.serial_order = self.serial_order;
        submission.slide_link = self.slide_link.clone();
        submission.leader_email = self.leader_email.clone();
        submission.updated_at = Some(self.updated_at);
    }
}

#[rocket::async_trait]
pub trait CollectionStore: Debug + Send + Sync {
    /// Inserts a new collection; [Mutation::Conflict] if the username is taken.
    async fn insert_collection(&self, collection: &Collection) -> Result<Mutation, StoreError>;

    async fn find_collection(&self, username: &str) -> Result<Option<Collection>, StoreError>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_collection(&self, username: &str) -> Result<bool, StoreError>;

    async fn find_submissions(&self, username: &str)
        -> Result<Option<Vec<Submission>>, StoreError>;

    /// Adds a submission unless its team serial is already present, keeping the list sorted.
    async fn push_submission(
        &self,
        username: &str,
        submission: &Submission,
    ) -> Result<Mutation, StoreError>;

    /// Edits the submission with `id` unless another one holds the new team serial,
    /// keeping the list sorted. Yields the edited submission.
    async fn update_submission(
        &self,
        username: &str,
        id: &str,
        edit: &SubmissionEdit,
    ) -> Result<Mutation<Submission>, StoreError>;

    async fn pull_submission(&self, username: &str, id: &str) -> Result<Mutation, StoreError>;

    async fn count_collections(&self) -> Result<u64, StoreError>;

    async fn count_submissions(&self) -> Result<u64, StoreError>;

    async fn count_created_since(&self, since: BsonDateTime) -> Result<u64, StoreError>;

    /// Newest collections first.
    async fn recent_collections(&self, limit: i64) -> Result<Vec<Collection>, StoreError>;
}
