use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::contract::ResumeUpload;
use crate::errors::AppError;
use crate::models::profile::{ProfileFetchRequest, ProfileFetchResponse, ProfileRecord};
use crate::models::project::{ProjectApplication, SuggestionQuery, SuggestionRecord, SuggestionsPage};
use crate::models::resume::{ResumePatch, ResumeRecord, ResumeUploadResponse};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// POST /api/resume/upload
/// Expects a multipart body with the document in the `file` field.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume").to_string();
        let media_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
        upload = Some(ResumeUpload {
            file_name,
            media_type,
            bytes,
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AppError::Validation("No file was uploaded".to_string()))?;
    info!("Received résumé upload '{}'", upload.file_name);

    Ok(Json(state.services.upload_resume(upload).await?))
}

/// GET /api/resume/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(state.services.get_resume(&id).await?))
}

/// PUT /api/resume/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<ResumePatch>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(state.services.update_resume(&id, patch).await?))
}

/// POST /api/scholar/fetch
pub async fn handle_fetch_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileFetchRequest>,
) -> Result<Json<ProfileFetchResponse>, AppError> {
    Ok(Json(state.services.fetch_profile(&req.profile_url).await?))
}

/// GET /api/scholar/:id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileRecord>, AppError> {
    Ok(Json(state.services.get_profile(&id).await?))
}

/// POST /api/scholar/:id/refresh
pub async fn handle_refresh_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileRecord>, AppError> {
    Ok(Json(state.services.refresh_profile(&id).await?))
}

/// POST /api/projects/suggestions
pub async fn handle_suggestions(
    State(state): State<AppState>,
    Json(query): Json<SuggestionQuery>,
) -> Result<Json<SuggestionsPage>, AppError> {
    Ok(Json(state.services.get_suggestions(query).await?))
}

/// GET /api/projects/:id
pub async fn handle_get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuggestionRecord>, AppError> {
    Ok(Json(state.services.get_project(&id).await?))
}

/// POST /api/projects/:id/bookmark
pub async fn handle_bookmark_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.services.bookmark_project(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/projects/:id/apply
pub async fn handle_apply_to_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(application): Json<ProjectApplication>,
) -> Result<StatusCode, AppError> {
    state.services.apply_to_project(&id, application).await?;
    Ok(StatusCode::NO_CONTENT)
}
