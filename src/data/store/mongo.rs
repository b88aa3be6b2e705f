use bson::{doc, Bson, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Database, IndexModel};
use rocket::futures::TryStreamExt;

use super::{CollectionStore, Mutation, SubmissionEdit};
use crate::data::collection::{Collection, Submission, COLLECTION_NAME};
use crate::error::StoreError;

const DUPLICATE_KEY: i32 = 11000;

/// Ordering applied to the embedded submissions array on every write.
fn submission_order() -> Document {
    doc! { "serialOrder": 1 }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Wraps a client supplied value so a leading `$` isn't read as a field path.
fn literal(value: impl Into<Bson>) -> Document {
    doc! { "$literal": value.into() }
}

#[derive(Debug, Clone)]
pub struct MongoStore {
    collections: mongodb::Collection<Collection>,
}

impl MongoStore {
    pub fn new(db: &Database) -> MongoStore {
        MongoStore {
            collections: db.collection(COLLECTION_NAME),
        }
    }

    /// Connects, checks the server answers and makes sure usernames are unique.
    pub async fn connect(uri: &str, db_name: &str) -> Result<MongoStore, StoreError> {
        let client = Client::with_uri_str(uri).await?;

        tracing::info!("Using MongoDB database: {}", db_name);
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }, None).await?;

        let store = MongoStore::new(&db);
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let username = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let created_at = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .build();

        self.collections
            .create_indexes([username, created_at], None)
            .await?;
        Ok(())
    }

    fn raw(&self) -> mongodb::Collection<Document> {
        self.collections.clone_with_type()
    }

    /// Works out why a conditional write on `username` matched nothing.
    async fn classify<T>(&self, username: &str, id: Option<&str>) -> Result<Mutation<T>, StoreError> {
        let submissions = match self.find_submissions(username).await? {
            Some(it) => it,
            None => return Ok(Mutation::MissingCollection),
        };

        match id {
            Some(id) if !submissions.iter().any(|it| it.id == id) => {
                Ok(Mutation::MissingSubmission)
            }
            _ => Ok(Mutation::Conflict),
        }
    }
}

#[rocket::async_trait]
impl CollectionStore for MongoStore {
    async fn insert_collection(&self, collection: &Collection) -> Result<Mutation, StoreError> {
        match self.collections.insert_one(collection, None).await {
            Ok(_) => Ok(Mutation::Applied(())),
            Err(e) if is_duplicate_key(&e) => Ok(Mutation::Conflict),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_collection(&self, username: &str) -> Result<Option<Collection>, StoreError> {
        Ok(self
            .collections
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn delete_collection(&self, username: &str) -> Result<bool, StoreError> {
        let result = self
            .collections
            .delete_one(doc! { "username": username }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_submissions(
        &self,
        username: &str,
    ) -> Result<Option<Vec<Submission>>, StoreError> {
        let options = FindOneOptions::builder()
            .projection(doc! { "_id": 0, "submissions": 1 })
            .build();

        let document = match self
            .raw()
            .find_one(doc! { "username": username }, options)
            .await?
        {
            Some(it) => it,
            None => return Ok(None),
        };

        let submissions = match document.get("submissions") {
            Some(value) => bson::from_bson(value.clone())?,
            None => vec![],
        };
        Ok(Some(submissions))
    }

    async fn push_submission(
        &self,
        username: &str,
        submission: &Submission,
    ) -> Result<Mutation, StoreError> {
        let filter = doc! {
            "username": username,
            "submissions.teamSerial": { "$ne": submission.team_serial.as_str() }
        };
        let entry = bson::to_bson(submission)?;
        let update = doc! {
            "$push": {
                "submissions": {
                    "$each": [entry],
                    "$sort": submission_order()
                }
            }
        };

        let result = self.collections.update_one(filter, update, None).await?;
        if result.matched_count == 1 {
            return Ok(Mutation::Applied(()));
        }

        self.classify(username, None).await
    }

    async fn update_submission(
        &self,
        username: &str,
        id: &str,
        edit: &SubmissionEdit,
    ) -> Result<Mutation<Submission>, StoreError> {
        let filter = doc! {
            "username": username,
            "submissions.id": id,
            "submissions": {
                "$not": {
                    "$elemMatch": {
                        "teamSerial": edit.team_serial.as_str(),
                        "id": { "$ne": id }
                    }
                }
            }
        };

        let replacement = doc! {
            "teamName": literal(edit.team_name.clone()),
            "teamSerial": literal(edit.team_serial.clone()),
            "serialOrder": literal(edit.serial_order),
            "slideLink": literal(edit.slide_link.clone()),
            "leaderEmail": literal(edit.leader_email.clone()),
            "updatedAt": edit.updated_at
        };
        let pipeline = vec![doc! {
            "$set": {
                "submissions": {
                    "$sortArray": {
                        "input": {
                            "$map": {
                                "input": "$submissions",
                                "as": "s",
                                "in": {
                                    "$cond": [
                                        { "$eq": ["$$s.id", literal(id)] },
                                        { "$mergeObjects": ["$$s", replacement] },
                                        "$$s"
                                    ]
                                }
                            }
                        },
                        "sortBy": submission_order()
                    }
                }
            }
        }];
        let options = FindOneAndUpdateOptions::builder()
            .projection(doc! { "_id": 0, "submissions": 1 })
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .raw()
            .find_one_and_update(filter, pipeline, options)
            .await?;

        let document = match updated {
            Some(it) => it,
            None => return self.classify(username, Some(id)).await,
        };

        let submissions: Vec<Submission> =
            bson::from_bson(Bson::Array(document.get_array("submissions")?.clone()))?;
        match submissions.into_iter().find(|it| it.id == id) {
            Some(submission) => Ok(Mutation::Applied(submission)),
            None => Ok(Mutation::MissingSubmission),
        }
    }

    async fn pull_submission(&self, username: &str, id: &str) -> Result<Mutation, StoreError> {
        let filter = doc! { "username": username, "submissions.id": id };
        let update = doc! { "$pull": { "submissions": { "id": id } } };

        let result = self.collections.update_one(filter, update, None).await?;
        if result.matched_count == 1 {
            return Ok(Mutation::Applied(()));
        }

        self.classify(username, Some(id)).await
    }

    async fn count_collections(&self) -> Result<u64, StoreError> {
        Ok(self.collections.count_documents(None, None).await?)
    }

    async fn count_submissions(&self) -> Result<u64, StoreError> {
        let pipeline = vec![doc! {
            "$group": {
                "_id": Bson::Null,
                "total": { "$sum": { "$size": { "$ifNull": ["$submissions", []] } } }
            }
        }];

        let mut cursor = self.collections.aggregate(pipeline, None).await?;
        let total = match cursor.try_next().await? {
            Some(group) => match group.get("total") {
                Some(Bson::Int32(n)) => *n as u64,
                Some(Bson::Int64(n)) => *n as u64,
                Some(Bson::Double(n)) => *n as u64,
                _ => 0,
            },
            None => 0,
        };

        Ok(total)
    }

    async fn count_created_since(&self, since: BsonDateTime) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .count_documents(doc! { "createdAt": { "$gte": since } }, None)
            .await?)
    }

    async fn recent_collections(&self, limit: i64) -> Result<Vec<Collection>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .limit(limit)
            .build();

        let mut cursor = self.raw().find(None, options).await?;
        let mut recent = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            let username = document.get_str("username").unwrap_or("<unnamed>").to_string();
            match bson::from_document::<Collection>(document) {
                Ok(collection) => recent.push(collection),
                Err(e) => tracing::warn!("Skipping unreadable collection {}: {}", username, e),
            }
        }

        Ok(recent)
    }
}
