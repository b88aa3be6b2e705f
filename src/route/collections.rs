use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::State;
use utoipa::ToSchema;

use crate::data::collection::db::{CollectionCreateData, JoinData};
use crate::data::collection::service::CollectionService;
use crate::data::collection::{CollectionResponse, CollectionSummary};
use crate::resp::problem::{problems, Problem};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CollectionCreatedResponse {
    pub message: String,
    pub collection: CollectionResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    pub message: String,
    #[serde(flatten)]
    pub collection: CollectionSummary,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CollectionDeletedResponse {
    pub message: String,
    pub username: String,
}

/// Create a collection
///
/// The collection username is derived from the section, course code, current
/// year and department code.
#[utoipa::path(
    request_body = CollectionCreateData,
    responses(
        (status = 201, description = "Collection created", body = CollectionCreatedResponse),
        (status = 400, description = "A required field is missing", body = Problem),
        (status = 409, description = "Derived username is already taken", body = Problem),
    )
)]
#[post("/collections", data = "<data>")]
#[tracing::instrument(skip(svc))]
pub async fn collection_create(
    data: Result<Json<CollectionCreateData>, json::Error<'_>>,
    svc: &State<CollectionService>,
) -> Result<(Status, Json<CollectionCreatedResponse>), Problem> {
    let data = data.map_err(problems::parse_problem)?;
    let collection = svc.create_collection(&data).await?;

    Ok((
        Status::Created,
        Json(CollectionCreatedResponse {
            message: "Collection created successfully".to_string(),
            collection: collection.into(),
        }),
    ))
}

/// Authenticate against a collection with its shared password
#[utoipa::path(
    request_body = JoinData,
    responses(
        (status = 200, description = "Password accepted", body = JoinResponse),
        (status = 400, description = "Username or password missing", body = Problem),
        (status = 401, description = "Wrong password", body = Problem),
        (status = 404, description = "Collection doesn't exist", body = Problem),
    )
)]
#[post("/collections/join", data = "<data>")]
#[tracing::instrument(skip(svc))]
pub async fn collection_join(
    data: Result<Json<JoinData>, json::Error<'_>>,
    svc: &State<CollectionService>,
) -> Result<Json<JoinResponse>, Problem> {
    let data = data.map_err(problems::parse_problem)?;
    let summary = svc.join(&data).await?;

    Ok(Json(JoinResponse {
        message: "Authentication successful".to_string(),
        collection: summary,
    }))
}

/// Most recently created collections
#[utoipa::path(
    responses(
        (status = 200, description = "Newest collections first", body = Vec<CollectionResponse>),
    )
)]
#[get("/collections/recent")]
#[tracing::instrument(skip(svc))]
pub async fn collection_recent(
    svc: &State<CollectionService>,
) -> Result<Json<Vec<CollectionResponse>>, Problem> {
    let recent = svc.recent_collections().await?;
    Ok(Json(recent.into_iter().map(Into::into).collect()))
}

/// Get a collection without its password
#[utoipa::path(
    params(
        ("username", description = "collection username")
    ),
    responses(
        (status = 200, description = "Collection", body = CollectionResponse),
        (status = 404, description = "Collection doesn't exist", body = Problem),
    )
)]
#[get("/collections/<username>")]
#[tracing::instrument(skip(svc))]
pub async fn collection_get(
    username: &str,
    svc: &State<CollectionService>,
) -> Result<Json<CollectionResponse>, Problem> {
    let collection = svc.get_collection(username).await?;
    Ok(Json(collection.into()))
}

/// Delete a collection together with its submissions
#[utoipa::path(
    params(
        ("username", description = "collection username")
    ),
    responses(
        (status = 200, description = "Collection deleted", body = CollectionDeletedResponse),
        (status = 404, description = "Collection doesn't exist", body = Problem),
    )
)]
#[delete("/collections/<username>")]
#[tracing::instrument(skip(svc))]
pub async fn collection_delete(
    username: &str,
    svc: &State<CollectionService>,
) -> Result<Json<CollectionDeletedResponse>, Problem> {
    svc.delete_collection(username).await?;

    Ok(Json(CollectionDeletedResponse {
        message: "Collection deleted successfully".to_string(),
        username: username.to_string(),
    }))
}

///////////////////////
//       TESTS
///////////////////////
