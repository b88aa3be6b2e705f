use std::collections::BTreeMap;

use rocket::http::Status;
use rocket::{Build, Request, Rocket, Route};

pub mod collections;
pub mod dashboard;
pub mod submissions;

use collections::*;
use dashboard::*;
use submissions::*;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    data::collection::{
        db::{CollectionCreateData, JoinData, SubmissionData},
        CollectionResponse, CollectionSummary, DashboardStats, SubmissionResponse,
    },
    resp::problem::Problem,
};

pub const API_PREFIX: &str = "/api";

#[derive(OpenApi)]
#[openapi(
    paths(
        collection_create,
        collection_join,
        collection_recent,
        collection_get,
        collection_delete,
        submission_list,
        submission_create,
        submission_update,
        submission_delete,
        dashboard_stats
    ),
    components(schemas(
        CollectionCreateData,
        JoinData,
        SubmissionData,
        CollectionResponse,
        CollectionSummary,
        SubmissionResponse,
        DashboardStats,
        CollectionCreatedResponse,
        CollectionDeletedResponse,
        JoinResponse,
        SubmissionListResponse,
        SubmissionSavedResponse,
        SubmissionDeletedResponse,
        Problem
    )),
    modifiers(&API_PATH_PREFIX)
)]
pub struct ApiDoc;

pub struct PathPrefix(pub &'static str);
static API_PATH_PREFIX: PathPrefix = PathPrefix(API_PREFIX);

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + &path, item);
        }

        openapi.paths.paths = new_paths;
    }
}

pub fn api() -> Vec<Route> {
    routes![
        collection_create,
        collection_join,
        collection_recent,
        collection_get,
        collection_delete,
        submission_list,
        submission_create,
        submission_update,
        submission_delete,
        dashboard_stats
    ]
}

#[get("/")]
pub fn index() -> &'static str {
    "SlideLink Backend is running!"
}

/// Renders every unhandled status (unknown route, failed guard) as a [Problem].
#[catch(default)]
pub fn default_catcher(status: Status, request: &Request<'_>) -> Problem {
    let reason = match status.code {
        404 => "not_found",
        400 | 422 => "malformed_body",
        500..=599 => "internal",
        _ => "request_failed",
    };

    Problem::with_reason(
        status,
        reason,
        status.reason().unwrap_or("Request failed"),
    )
    .instance_uri(request.uri().to_string())
    .to_owned()
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount(API_PREFIX, api())
        .mount(
            "/",
            SwaggerUi::new("/swagger-ui/<_..>").url("/api/openapi.json", ApiDoc::openapi()),
        )
        .mount("/", routes![index])
        .register("/", catchers![default_catcher])
}


#[cfg(test)]
mod general_endpoints {
    use rocket::http::Status;
    use serde_json::Value;

    use super::testing::test_client;

    #[rocket::async_test]
    async fn index_reports_liveness() {
        let client = test_client().await;

        let response = client.get("/").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_string().await.as_deref(),
            Some("SlideLink Backend is running!")
        );
    }

    #[rocket::async_test]
    async fn unknown_route_is_a_problem_document() {
        let client = test_client().await;

        let response = client.get("/api/nothing/here/at/all").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let problem: Value = response.into_json().await.expect("invalid problem json");
        assert_eq!(problem["reason"], "not_found");
        assert_eq!(problem["instance"], "/api/nothing/here/at/all");
    }

    #[rocket::async_test]
    async fn openapi_document_lists_prefixed_paths() {
        let client = test_client().await;

        let response = client.get("/api/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let doc: Value = response.into_json().await.expect("invalid openapi json");
        assert!(doc["paths"].get("/api/collections").is_some());
        assert!(doc["paths"].get("/api/dashboard-stats").is_some());
    }
}
