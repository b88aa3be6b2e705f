use std::io::Cursor;

use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::error::{ServiceError, StoreError};

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,
    pub instance_uri: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            instance_uri: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: "about:blank".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Problem carrying a machine readable `reason` and the `error` message clients
    /// of the original API read.
    pub fn with_reason(status: Status, reason: &str, title: impl ToString) -> Problem {
        let title = title.to_string();
        Problem::new_untyped(status, title.clone())
            .insert_str("reason", reason)
            .insert_str("error", title)
            .to_owned()
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn instance_uri(&mut self, value: String) -> &mut Problem {
        self.instance_uri = Some(value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.title)
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let mut body = self.body;

        // Following are required by rfc7807
        body.insert(String::from("type"), Value::from(self.type_uri));
        body.insert(String::from("title"), Value::from(self.title));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = self.detail {
            body.insert(String::from("detail"), Value::from(detail));
        }
        body.insert(String::from("status"), Value::from(self.status.code));
        if let Some(instance) = self.instance_uri {
            body.insert(String::from("instance"), Value::from(instance));
        }

        let body_string = Value::Object(body).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header("Content-Language", "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn parse_problem(detail: impl ToString) -> Problem {
        Problem::with_reason(
            Status::BadRequest,
            "malformed_body",
            "There was a problem parsing part of the request.",
        )
        .detail(detail)
        .to_owned()
    }

    #[inline]
    pub fn internal() -> Problem {
        Problem::with_reason(Status::InternalServerError, "internal", "Internal server error")
    }
}

impl From<ServiceError> for Problem {
    fn from(e: ServiceError) -> Self {
        let reason = e.reason();
        let title = e.to_string();

        match e {
            ServiceError::MissingField(field) => {
                Problem::with_reason(Status::BadRequest, reason, title)
                    .insert_str("field", field)
                    .to_owned()
            }
            ServiceError::InvalidField { field, detail } => {
                Problem::with_reason(Status::BadRequest, reason, title)
                    .insert_str("field", field)
                    .detail(detail)
                    .to_owned()
            }
            ServiceError::InvalidPassword => {
                Problem::with_reason(Status::Unauthorized, reason, title)
            }
            ServiceError::CollectionNotFound(username) => {
                Problem::with_reason(Status::NotFound, reason, title)
                    .insert_str("username", username)
                    .to_owned()
            }
            ServiceError::SubmissionNotFound(id) => {
                Problem::with_reason(Status::NotFound, reason, title)
                    .insert_str("id", id)
                    .to_owned()
            }
            ServiceError::DuplicateCollection(username) => {
                Problem::with_reason(Status::Conflict, reason, title)
                    .insert_str("username", username)
                    .to_owned()
            }
            ServiceError::DuplicateTeamSerial(serial) => {
                Problem::with_reason(Status::Conflict, reason, title)
                    .insert_str("teamSerial", serial)
                    .to_owned()
            }
            ServiceError::Store(e) => Problem::from(e),
        }
    }
}

impl From<StoreError> for Problem {
    fn from(e: StoreError) -> Self {
        tracing::error!("Collection store failed: {}", e);

        match e {
            StoreError::Database(e) => Problem::from(e),
            StoreError::BsonSerialization(_)
            | StoreError::BsonDeserialization(_)
            | StoreError::BsonAccess(_) => problems::internal()
                .detail("There was a problem with handling MongoDB bson.")
                .to_owned(),
        }
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        let detail = match e.kind.as_ref() {
            ErrorKind::Authentication { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::InvalidTlsConfig { .. }
            | ErrorKind::IncompatibleServer { .. } => "Server was unable to access MongoDB.",
            ErrorKind::Io(_) => {
                "An IO error occurred. Submitted data might not be properly stored."
            }
            ErrorKind::Write(_) => {
                "A write error occurred. Submitted data might not be properly stored."
            }
            _ => "MongoDB failed while processing request.",
        };

        problems::internal().detail(detail).to_owned()
    }
}
