use rocket::serde::json::Json;
use rocket::State;

use crate::data::collection::service::CollectionService;
use crate::data::collection::DashboardStats;
use crate::resp::problem::Problem;

/// Aggregate collection and submission counts
#[utoipa::path(
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 500, description = "Store unavailable", body = Problem),
    )
)]
#[get("/dashboard-stats")]
#[tracing::instrument(skip(svc))]
pub async fn dashboard_stats(svc: &State<CollectionService>) -> Result<Json<DashboardStats>, Problem> {
    Ok(Json(svc.dashboard_stats().await?))
}
