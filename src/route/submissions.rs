use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;
use utoipa::ToSchema;

use crate::data::collection::db::SubmissionData;
use crate::data::collection::service::CollectionService;
use crate::data::collection::SubmissionResponse;
use crate::resp::problem::{problems, Problem};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionSavedResponse {
    pub message: String,
    pub submission: SubmissionResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmissionDeletedResponse {
    pub message: String,
    pub id: String,
}

/// List submissions of a collection, ordered by team serial
#[utoipa::path(
    params(
        ("username", description = "collection username")
    ),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
        (status = 404, description = "Collection doesn't exist", body = Problem),
    )
)]
#[get("/collections/<username>/submissions")]
#[tracing::instrument(skip(svc))]
pub async fn submission_list(
    username: &str,
    svc: &State<CollectionService>,
) -> Result<Json<SubmissionListResponse>, Problem> {
    let submissions = svc.submissions(username).await?;

    Ok(Json(SubmissionListResponse {
        submissions: submissions.into_iter().map(Into::into).collect(),
    }))
}

/// Submit a team's slide link
#[utoipa::path(
    params(
        ("username", description = "collection username")
    ),
    request_body = SubmissionData,
    responses(
        (status = 201, description = "Slide link submitted", body = SubmissionSavedResponse),
        (status = 400, description = "Team serial or slide link missing or invalid", body = Problem),
        (status = 404, description = "Collection doesn't exist", body = Problem),
        (status = 409, description = "Team serial already submitted", body = Problem),
    )
)]
#[post("/collections/<username>/submissions", data = "<data>")]
#[tracing::instrument(skip(svc))]
pub async fn submission_create(
    username: &str,
    data: Result<Json<SubmissionData>, json::Error<'_>>,
    svc: &State<CollectionService>,
) -> Result<(Status, Json<SubmissionSavedResponse>), Problem> {
    let data = data.map_err(problems::parse_problem)?;
    let submission = svc.submit(username, &data).await?;

    Ok((
        Status::Created,
        Json(SubmissionSavedResponse {
            message: "Slide link submitted successfully".to_string(),
            submission: submission.into(),
        }),
    ))
}

/// Edit a submission
#[utoipa::path(
    params(
        ("username", description = "collection username"),
        ("id", description = "submission ID")
    ),
    request_body = SubmissionData,
    responses(
        (status = 200, description = "Submission updated", body = SubmissionSavedResponse),
        (status = 400, description = "Team serial or slide link missing or invalid", body = Problem),
        (status = 404, description = "Collection or submission doesn't exist", body = Problem),
        (status = 409, description = "Another team holds the serial", body = Problem),
    )
)]
#[put("/collections/<username>/submissions/<id>", data = "<data>")]
#[tracing::instrument(skip(svc))]
pub async fn submission_update(
    username: &str,
    id: &str,
    data: Result<Json<SubmissionData>, json::Error<'_>>,
    svc: &State<CollectionService>,
) -> Result<Json<SubmissionSavedResponse>, Problem> {
    let data = data.map_err(problems::parse_problem)?;
    let submission = svc.update_submission(username, id, &data).await?;

    Ok(Json(SubmissionSavedResponse {
        message: "Submission updated successfully".to_string(),
        submission: submission.into(),
    }))
}

/// Delete a submission
#[utoipa::path(
    params(
        ("username", description = "collection username"),
        ("id", description = "submission ID")
    ),
    responses(
        (status = 200, description = "Submission deleted", body = SubmissionDeletedResponse),
        (status = 404, description = "Collection or submission doesn't exist", body = Problem),
    )
)]
#[delete("/collections/<username>/submissions/<id>")]
#[tracing::instrument(skip(svc))]
pub async fn submission_delete(
    username: &str,
    id: &str,
    svc: &State<CollectionService>,
) -> Result<Json<SubmissionDeletedResponse>, Problem> {
    svc.delete_submission(username, id).await?;

    Ok(Json(SubmissionDeletedResponse {
        message: "Submission deleted successfully".to_string(),
        id: id.to_string(),
    }))
}

///////////////////////
//       TESTS
///////////////////////
