use bson::{Bson, DateTime as BsonDateTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use utoipa::ToSchema;

pub mod db;
pub mod secret;
pub mod service;
pub mod username;

use secret::PasswordHash;

pub static COLLECTION_NAME: &str = "collections";

/// A course-section submission container as it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<PasswordHash>,

    pub section: String,
    pub course_code: String,
    pub semester: String,
    pub faculty: String,
    pub department: String,
    #[serde(default, deserialize_with = "stored_count")]
    pub team_count: u32,

    #[serde(default)]
    pub slides: Vec<Value>,
    #[serde(default)]
    pub submissions: Vec<Submission>,

    pub created_at: BsonDateTime,
}

/// One team's slide link, embedded in its [Collection].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(alias = "_id", deserialize_with = "stored_id")]
    pub id: String,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default, deserialize_with = "stored_serial")]
    pub team_serial: String,
    /// Numeric value of `team_serial`, the array sort key.
    #[serde(default)]
    pub serial_order: i64,
    pub slide_link: String,
    #[serde(default)]
    pub leader_email: Option<String>,
    pub submitted_at: BsonDateTime,
    #[serde(default)]
    pub updated_at: Option<BsonDateTime>,
}

// Documents written before submissions carried an `id` and a numeric serial
// store `teamCount` as text and key submissions by an ObjectId `_id`.

fn stored_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Int32(n) => u32::try_from(n).unwrap_or_default(),
        Bson::Int64(n) => u32::try_from(n).unwrap_or_default(),
        Bson::Double(n) if n.is_finite() && n >= 0.0 => n as u32,
        Bson::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

fn stored_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error;

    match Bson::deserialize(deserializer)? {
        Bson::String(s) => Ok(s),
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(D::Error::custom(format!(
            "submission id must be a string or ObjectId, got {:?}",
            other.element_type()
        ))),
    }
}

fn stored_serial<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Bson::deserialize(deserializer)? {
        Bson::String(s) => s,
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        Bson::Double(n) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: String,
    pub team_name: Option<String>,
    pub team_serial: String,
    pub slide_link: String,
    pub leader_email: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Submission> for SubmissionResponse {
    fn from(value: Submission) -> Self {
        Self {
            id: value.id,
            team_name: value.team_name,
            team_serial: value.team_serial,
            slide_link: value.slide_link,
            leader_email: value.leader_email,
            submitted_at: value.submitted_at.to_chrono(),
            updated_at: value.updated_at.map(|it| it.to_chrono()),
        }
    }
}

/// A collection with every secret field removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub username: String,
    pub section: String,
    pub course_code: String,
    pub semester: String,
    pub faculty: String,
    pub department: String,
    pub team_count: u32,
    #[schema(value_type = Vec<Object>)]
    pub slides: Vec<Value>,
    pub submissions: Vec<SubmissionResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Collection> for CollectionResponse {
    fn from(value: Collection) -> Self {
        Self {
            username: value.username,
            section: value.section,
            course_code: value.course_code,
            semester: value.semester,
            faculty: value.faculty,
            department: value.department,
            team_count: value.team_count,
            slides: value.slides,
            submissions: value.submissions.into_iter().map(Into::into).collect(),
            created_at: value.created_at.to_chrono(),
        }
    }
}

/// Non-secret summary returned after a successful join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub username: String,
    pub section: String,
    pub course_code: String,
    pub semester: String,
    pub faculty: String,
    pub department: String,
    pub team_count: u32,
}

impl From<&Collection> for CollectionSummary {
    fn from(value: &Collection) -> Self {
        Self {
            username: value.username.clone(),
            section: value.section.clone(),
            course_code: value.course_code.clone(),
            semester: value.semester.clone(),
            faculty: value.faculty.clone(),
            department: value.department.clone(),
            team_count: value.team_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: u64,
    pub total_submissions: u64,
    pub active: u64,
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use bson::{doc, DateTime as BsonDateTime};

    use super::Collection;

    #[test]
    fn documents_without_submission_ids_still_decode() {
        let legacy_id = ObjectId::new();
        let document = doc! {
            "_id": ObjectId::new(),
            "username": "A1-CS101-2024-CSE",
            "password": "pw",
            "section": "A1",
            "courseCode": "CS101",
            "semester": "Fall",
            "faculty": "Engineering",
            "department": "Computer Science (CSE)",
            "teamCount": "12",
            "slides": [],
            "submissions": [{
                "_id": legacy_id,
                "teamName": "Owls",
                "slideLink": "http://slides",
                "leaderEmail": null,
                "submittedAt": BsonDateTime::now()
            }],
            "createdAt": BsonDateTime::now()
        };

        let collection: Collection = bson::from_document(document).expect("legacy document");
        assert_eq!(collection.team_count, 12);

        let submission = &collection.submissions[0];
        assert_eq!(submission.id, legacy_id.to_hex());
        assert_eq!(submission.team_name.as_deref(), Some("Owls"));
        assert_eq!(submission.team_serial, "");
        assert_eq!(submission.serial_order, 0);
    }

    #[test]
    fn numeric_fields_accept_either_representation() {
        let document = doc! {
            "username": "B2-SE300-2025-SWE",
            "section": "B2",
            "courseCode": "SE300",
            "semester": "Fall",
            "faculty": "Engineering",
            "department": "SWE",
            "teamCount": 4,
            "submissions": [{
                "id": "abc",
                "teamSerial": 3,
                "serialOrder": 3_i64,
                "slideLink": "http://three",
                "submittedAt": BsonDateTime::now()
            }],
            "createdAt": BsonDateTime::now()
        };

        let collection: Collection = bson::from_document(document).expect("current document");
        assert_eq!(collection.team_count, 4);
        assert!(collection.slides.is_empty());
        assert_eq!(collection.submissions[0].id, "abc");
        assert_eq!(collection.submissions[0].team_serial, "3");
    }
}
