use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use serde::Deserialize;

use crate::application::{error::HttpError, resume::CompiledArtifact};

use super::HttpState;

#[derive(Debug, Deserialize)]
pub(super) struct GenerateResumeRequest {
    latex: String,
}

pub(super) async fn generate_resume(
    State(state): State<HttpState>,
    payload: Result<Json<GenerateResumeRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    const SOURCE: &str = "infra::http::resume::generate_resume";

    let Json(request) = payload.map_err(|rejection| {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        HttpError::new(
            SOURCE,
            status,
            "Request body must be JSON with a `latex` string",
            rejection.body_text(),
        )
    })?;

    let artifact = state.resume.compile(&request.latex).await?;
    Ok(artifact_response(artifact))
}

fn artifact_response(artifact: CompiledArtifact) -> Response {
    let length = artifact.bytes.len();
    let mut response = Response::new(Body::from(artifact.bytes));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(artifact.content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
