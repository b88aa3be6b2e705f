use serde::{Deserialize, Deserializer};
use serde_json::Value;
use utoipa::ToSchema;

use super::username::clean_section;
use crate::error::ServiceError;

/// Accepts `teamCount` either as a JSON number or as numeric text.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|it| u32::try_from(it).ok())
            .map(Some)
            .ok_or_else(|| D::Error::custom("teamCount must be a positive integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom("teamCount must be a positive integer")),
        Some(_) => Err(D::Error::custom("teamCount must be a positive integer")),
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ServiceError> {
    match value.as_deref().map(str::trim) {
        Some(it) if !it.is_empty() => Ok(it),
        _ => Err(ServiceError::MissingField(field)),
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|it| !it.is_empty())
        .map(str::to_string)
}

#[derive(Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCreateData {
    pub section: Option<String>,
    pub course_code: Option<String>,
    pub semester: Option<String>,
    pub faculty: Option<String>,
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    #[schema(value_type = Option<u32>)]
    pub team_count: Option<u32>,
    #[schema(format = "password")]
    pub password: Option<String>,
}

impl std::fmt::Debug for CollectionCreateData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CollectionCreateData:{}/{}",
            self.section.as_deref().unwrap_or_default(),
            self.course_code.as_deref().unwrap_or_default()
        )
    }
}

/// Create payload after every required field has been checked.
#[derive(Clone)]
pub struct ValidCollection<'a> {
    pub section: &'a str,
    pub course_code: &'a str,
    pub semester: &'a str,
    pub faculty: &'a str,
    pub department: &'a str,
    pub team_count: u32,
    pub password: &'a str,
}

impl CollectionCreateData {
    /// Checks required fields in a fixed order and reports the first one missing.
    pub fn validate(&self) -> Result<ValidCollection<'_>, ServiceError> {
        let section = required(&self.section, "section")?;
        let course_code = required(&self.course_code, "courseCode")?;
        let semester = required(&self.semester, "semester")?;
        let faculty = required(&self.faculty, "faculty")?;
        let department = required(&self.department, "department")?;
        let team_count = match self.team_count {
            Some(count) if count > 0 => count,
            _ => return Err(ServiceError::MissingField("teamCount")),
        };
        // Passwords are compared verbatim, so they aren't trimmed.
        let password = match self.password.as_deref() {
            Some(it) if !it.is_empty() => it,
            _ => return Err(ServiceError::MissingField("password")),
        };

        if clean_section(section).is_empty() {
            return Err(ServiceError::InvalidField {
                field: "section",
                detail: format!("'{}' has no letters or digits.", section),
            });
        }

        Ok(ValidCollection {
            section,
            course_code,
            semester,
            faculty,
            department,
            team_count,
            password,
        })
    }
}

#[derive(Clone, Default, Deserialize, ToSchema)]
pub struct JoinData {
    pub username: Option<String>,
    #[schema(format = "password")]
    pub password: Option<String>,
}

impl std::fmt::Debug for JoinData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "JoinData:{}",
            self.username.as_deref().unwrap_or_default()
        )
    }
}

impl JoinData {
    pub fn validate(&self) -> Result<(&str, &str), ServiceError> {
        let username = required(&self.username, "username")?;
        let password = match self.password.as_deref() {
            Some(it) if !it.is_empty() => it,
            _ => return Err(ServiceError::MissingField("password")),
        };
        Ok((username, password))
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionData {
    pub team_name: Option<String>,
    pub team_serial: Option<String>,
    pub slide_link: Option<String>,
    pub leader_email: Option<String>,
}

/// Submission payload after validation, with the parsed serial order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub team_name: Option<String>,
    pub team_serial: String,
    pub serial_order: i64,
    pub slide_link: String,
    pub leader_email: Option<String>,
}

impl SubmissionData {
    pub fn validate(&self) -> Result<ValidSubmission, ServiceError> {
        let team_serial = required(&self.team_serial, "teamSerial")?;
        let slide_link = required(&self.slide_link, "slideLink")?;

        let serial_order = team_serial
            .parse::<u32>()
            .map_err(|_| ServiceError::InvalidField {
                field: "teamSerial",
                detail: format!("'{}' is not a non-negative integer.", team_serial),
            })?;

        // "05", "+5" and "5" name the same team.
        Ok(ValidSubmission {
            team_name: optional(&self.team_name),
            team_serial: serial_order.to_string(),
            serial_order: i64::from(serial_order),
            slide_link: slide_link.to_string(),
            leader_email: optional(&self.leader_email),
        })
    }
}
