//! Image uploads under `/api/files`.

use axum::{
    Json,
    extract::{
        State,
        multipart::{Multipart, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    middleware::auth::AuthGuard,
    model::files::{FailedUploadDto, MultiUploadDto},
    service::{auth::token::Role, files::FileService},
    state::AppState,
};

fn multipart_error(service: &FileService<'_>, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return service.too_large();
    }

    tracing::debug!("Rejected multipart body: {}", err.body_text());
    AppError::validation("Failed to parse uploaded file")
}

fn multipart_body(service: &FileService<'_>, payload: Result<Multipart, MultipartRejection>) -> Result<Multipart, AppError> {
    payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            service.too_large()
        } else {
            tracing::debug!("Rejected multipart request: {}", rejection.body_text());
            AppError::validation("Expected a multipart/form-data body")
        }
    })
}

/// Message reported for one failed file of a batch.
fn failure_message(err: AppError) -> String {
    match err {
        AppError::Validation(msg) | AppError::PayloadTooLarge(msg) => msg,
        err => {
            tracing::error!("Failed to save upload: {}", err);
            "Failed to save file".to_string()
        }
    }
}

/// POST /api/files/upload - Admin only
///
/// Reads the multipart field `file`; other fields are ignored.
///
/// # Returns
/// - `201 Created`: `{url, filename, size}`
/// - `400 Bad Request`: no file, or not an allowed image type
/// - `413 Payload Too Large`: above the configured maximum
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let service = FileService::new(&state);
    let mut multipart = multipart_body(&service, payload)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(&service, err))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(&service, err))?;

        let uploaded = service.store(&filename, &bytes).await?;
        tracing::info!("Uploaded {} ({} bytes)", uploaded.filename, uploaded.size);

        return Ok((StatusCode::CREATED, Json(uploaded)));
    }

    Err(AppError::validation("No file uploaded"))
}

/// POST /api/files/upload-multiple - Admin only
///
/// Reads every multipart field named `files`. Each file is validated on its own, so
/// one bad file does not reject the batch.
///
/// # Returns
/// - `201 Created`: at least one file was stored; `errors` lists the rest
/// - `400 Bad Request`: no files, or none could be stored
/// - `413 Payload Too Large`: the whole body is above the configured maximum
pub async fn upload_multiple(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let service = FileService::new(&state);
    let mut multipart = multipart_body(&service, payload)?;

    let mut files = Vec::new();
    let mut errors = Vec::new();
    let mut index = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(&service, err))?
    {
        if field.name() != Some("files") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(&service, err))?;

        match service.store(&filename, &bytes).await {
            Ok(uploaded) => files.push(uploaded),
            Err(err) => errors.push(FailedUploadDto {
                filename,
                error: failure_message(err),
                index,
            }),
        }

        index += 1;
    }

    if index == 0 {
        return Err(AppError::validation("No files uploaded"));
    }

    tracing::info!("Uploaded {} of {} files", files.len(), index);

    let status = if files.is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    };

    Ok((
        status,
        Json(MultiUploadDto {
            files,
            errors,
            total_attempted: index,
        }),
    ))
}

/// GET /api/files/limits - Admin only
pub async fn limits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    Ok((StatusCode::OK, Json(FileService::new(&state).limits())))
}
