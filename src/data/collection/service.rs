use std::sync::Arc;

use bson::DateTime as BsonDateTime;
use chrono::{Datelike, Duration, Utc};
use uuid::Uuid;

use super::db::{CollectionCreateData, JoinData, SubmissionData};
use super::secret::{verify_password, PasswordStorage};
use super::username::derive_username;
use super::{Collection, CollectionSummary, DashboardStats, Submission};
use crate::data::store::{CollectionStore, Mutation, SubmissionEdit};
use crate::error::ServiceError;

/// Business rules of collections and their submissions, over an injected store.
#[derive(Debug, Clone)]
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    passwords: PasswordStorage,
    recent_limit: i64,
    active_window: Duration,
}

impl CollectionService {
    pub fn new(store: Arc<dyn CollectionStore>) -> CollectionService {
        CollectionService {
            store,
            passwords: PasswordStorage::Plain,
            recent_limit: 6,
            active_window: Duration::hours(24),
        }
    }

    pub fn with_password_storage(mut self, passwords: PasswordStorage) -> CollectionService {
        self.passwords = passwords;
        self
    }

    pub fn with_recent_limit(mut self, limit: i64) -> CollectionService {
        self.recent_limit = limit;
        self
    }

    pub fn with_active_window(mut self, window: Duration) -> CollectionService {
        self.active_window = window;
        self
    }

    pub async fn create_collection(
        &self,
        data: &CollectionCreateData,
    ) -> Result<Collection, ServiceError> {
        let valid = data.validate()?;
        let username = derive_username(
            valid.section,
            valid.course_code,
            valid.department,
            Utc::now().year(),
        );

        if self.store.find_collection(&username).await?.is_some() {
            return Err(ServiceError::DuplicateCollection(username));
        }

        let (password, password_hash) = self.passwords.seal(valid.password);
        let collection = Collection {
            username,
            password,
            password_hash,
            section: valid.section.to_string(),
            course_code: valid.course_code.to_string(),
            semester: valid.semester.to_string(),
            faculty: valid.faculty.to_string(),
            department: valid.department.to_string(),
            team_count: valid.team_count,
            slides: vec![],
            submissions: vec![],
            created_at: BsonDateTime::now(),
        };

        // The unique index still catches a create racing past the lookup above.
        match self.store.insert_collection(&collection).await? {
            Mutation::Applied(()) => {
                tracing::info!("Created collection {}", collection.username);
                Ok(collection)
            }
            _ => Err(ServiceError::DuplicateCollection(collection.username)),
        }
    }

    pub async fn join(&self, data: &JoinData) -> Result<CollectionSummary, ServiceError> {
        let (username, password) = data.validate()?;

        let collection = self.get_collection(username).await?;
        if !verify_password(&collection, password) {
            tracing::debug!("Rejected join attempt for {}", username);
            return Err(ServiceError::InvalidPassword);
        }

        Ok(CollectionSummary::from(&collection))
    }

    pub async fn get_collection(&self, username: &str) -> Result<Collection, ServiceError> {
        self.store
            .find_collection(username)
            .await?
            .ok_or_else(|| ServiceError::CollectionNotFound(username.to_string()))
    }

    pub async fn delete_collection(&self, username: &str) -> Result<(), ServiceError> {
        if self.store.delete_collection(username).await? {
            tracing::info!("Deleted collection {}", username);
            Ok(())
        } else {
            Err(ServiceError::CollectionNotFound(username.to_string()))
        }
    }

    pub async fn submissions(&self, username: &str) -> Result<Vec<Submission>, ServiceError> {
        self.store
            .find_submissions(username)
            .await?
            .ok_or_else(|| ServiceError::CollectionNotFound(username.to_string()))
    }

    pub async fn submit(
        &self,
        username: &str,
        data: &SubmissionData,
    ) -> Result<Submission, ServiceError> {
        let valid = data.validate()?;

        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            team_name: valid.team_name,
            team_serial: valid.team_serial,
            serial_order: valid.serial_order,
            slide_link: valid.slide_link,
            leader_email: valid.leader_email,
            submitted_at: BsonDateTime::now(),
            updated_at: None,
        };

        match self.store.push_submission(username, &submission).await? {
            Mutation::Applied(()) => Ok(submission),
            Mutation::Conflict => Err(ServiceError::DuplicateTeamSerial(submission.team_serial)),
            Mutation::MissingCollection | Mutation::MissingSubmission => {
                Err(ServiceError::CollectionNotFound(username.to_string()))
            }
        }
    }

    pub async fn update_submission(
        &self,
        username: &str,
        id: &str,
        data: &SubmissionData,
    ) -> Result<Submission, ServiceError> {
        let valid = data.validate()?;

        let edit = SubmissionEdit {
            team_name: valid.team_name,
            team_serial: valid.team_serial,
            serial_order: valid.serial_order,
            slide_link: valid.slide_link,
            leader_email: valid.leader_email,
            updated_at: BsonDateTime::now(),
        };

        match self.store.update_submission(username, id, &edit).await? {
            Mutation::Applied(submission) => Ok(submission),
            Mutation::Conflict => Err(ServiceError::DuplicateTeamSerial(edit.team_serial)),
            Mutation::MissingCollection => {
                Err(ServiceError::CollectionNotFound(username.to_string()))
            }
            Mutation::MissingSubmission => Err(ServiceError::SubmissionNotFound(id.to_string())),
        }
    }

    pub async fn delete_submission(&self, username: &str, id: &str) -> Result<(), ServiceError> {
        match self.store.pull_submission(username, id).await? {
            Mutation::Applied(()) => Ok(()),
            Mutation::MissingCollection => {
                Err(ServiceError::CollectionNotFound(username.to_string()))
            }
            Mutation::MissingSubmission | Mutation::Conflict => {
                Err(ServiceError::SubmissionNotFound(id.to_string()))
            }
        }
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let since = BsonDateTime::from_chrono(Utc::now() - self.active_window);

        Ok(DashboardStats {
            total: self.store.count_collections().await?,
            total_submissions: self.store.count_submissions().await?,
            active: self.store.count_created_since(since).await?,
        })
    }

    pub async fn recent_collections(&self) -> Result<Vec<Collection>, ServiceError> {
        Ok(self.store.recent_collections(self.recent_limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::CollectionService;
    use crate::data::collection::db::{CollectionCreateData, SubmissionData};
    use crate::data::store::MemoryStore;
    use crate::error::ServiceError;

    fn service() -> CollectionService {
        CollectionService::new(Arc::new(MemoryStore::new()))
    }

    fn create_data() -> CollectionCreateData {
        CollectionCreateData {
            section: Some("C3".to_string()),
            course_code: Some("PHY110".to_string()),
            semester: Some("Spring".to_string()),
            faculty: Some("Science".to_string()),
            department: Some("Physics (PHY)".to_string()),
            team_count: Some(10),
            password: Some("pw".to_string()),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_creates_yield_a_single_collection() {
        let svc = service();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.create_collection(&create_data()).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.expect("create task panicked") {
                Ok(_) => created += 1,
                Err(ServiceError::DuplicateCollection(_)) => {}
                Err(other) => panic!("unexpected error {}", other),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(svc.dashboard_stats().await.unwrap().total, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_submits_with_clashing_serials() {
        let svc = service();
        let username = svc.create_collection(&create_data()).await.unwrap().username;

        // Every serial is sent twice, once zero padded.
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let svc = svc.clone();
                let username = username.clone();
                let serial = if i % 2 == 0 {
                    format!("{}", i / 2)
                } else {
                    format!("0{}", i / 2)
                };
                tokio::spawn(async move {
                    let data = SubmissionData {
                        team_serial: Some(serial),
                        slide_link: Some(format!("http://slides/{}", i)),
                        ..Default::default()
                    };
                    svc.submit(&username, &data).await
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            match task.await.expect("submit task panicked") {
                Ok(_) => accepted += 1,
                Err(ServiceError::DuplicateTeamSerial(_)) => {}
                Err(other) => panic!("unexpected error {}", other),
            }
        }
        assert_eq!(accepted, 10);

        let serials: Vec<String> = svc
            .submissions(&username)
            .await
            .unwrap()
            .into_iter()
            .map(|it| it.team_serial)
            .collect();
        let expected: Vec<String> = (0..10).map(|it: i32| it.to_string()).collect();
        assert_eq!(serials, expected);
    }
}
