use axum::{Json, extract::State};

use crate::{application::error::HttpError, domain::listings::JobRecord};

use super::HttpState;

pub(super) async fn list_jobs(
    State(state): State<HttpState>,
) -> Result<Json<Vec<JobRecord>>, HttpError> {
    let records = state.listings.fetch_all().await?;
    Ok(Json(records))
}
