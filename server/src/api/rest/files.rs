//! File operations routes
//!
//! Listing, upload, download and delete for the served directory.

use crate::api::AppState;
use crate::storage::{self, base_name, FileCatalog, UploadSpool};
use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
        DefaultBodyLimit, Multipart, Path, State,
    },
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use tokio_util::io::ReaderStream;

use super::error::AppError;
use super::page;
use super::types::DeleteForm;

// ============================================================================
// ROUTES
// ============================================================================

pub fn file_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/download/", get(download_file))
        .route("/download/*name", get(download_file))
        .route("/delete/", post(delete_file))
        .route("/delete/*name", post(delete_file))
}

// ============================================================================
// HANDLERS
// ============================================================================

async fn list_files(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let files = FileCatalog::new(state.root()).list().await?;
    Ok(Html(page::render_listing(&files)))
}

fn malformed(err: MultipartError) -> AppError {
    tracing::debug!("rejecting upload body: {}", err);
    AppError::BadRequest("File too large or malformed request".into())
}

/// Create-only upload from the multipart field `file`.
///
/// The whole body is staged before anything under the root is created.
async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Redirect, AppError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("rejecting upload request: {}", e);
        AppError::BadRequest("File too large or malformed request".into())
    })?;

    let mut upload: Option<(Option<String>, UploadSpool)> = None;
    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        if upload.is_some() || field.name() != Some("file") {
            continue;
        }

        let client_name = field.file_name().map(str::to_string);
        let mut spool = UploadSpool::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            spool.write(&chunk).await?;
        }
        upload = Some((client_name, spool));
    }

    let (client_name, spool) = match upload {
        Some((Some(client_name), spool)) => (client_name, spool),
        _ => return Err(AppError::BadRequest("Invalid file".into())),
    };

    tracing::debug!(bytes = spool.len(), spilled = spool.is_spilled(), "upload staged");

    let name = base_name(&client_name);
    let path = state.root().resolve(name)?;
    let written = spool.persist_new(&path).await?;

    tracing::info!(name = %name, bytes = written, "uploaded");
    Ok(Redirect::to("/"))
}

async fn download_file(
    State(state): State<AppState>,
    name: Option<Path<String>>,
) -> Result<Response, AppError> {
    let name = name.map(|Path(name)| name).unwrap_or_default();
    let path = state.root().resolve(&name)?;
    let (file, len) = storage::files::open_existing(&path).await?;

    // Never derive the content type from the file; browsers must save it.
    let content_disposition = format!("attachment; filename=\"{}\"", quote_filename(&name));
    let content_disposition_header = HeaderValue::from_bytes(content_disposition.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    tracing::debug!("Serving file: {} ({} bytes)", name, len);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, content_disposition_header),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

async fn delete_file(
    State(state): State<AppState>,
    name: Option<Path<String>>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Redirect, AppError> {
    // The override marker is required no matter what the name looks like.
    match form {
        Ok(Form(form)) if form.is_delete() => {}
        _ => return Err(AppError::BadRequest("Bad Request".into())),
    }

    let name = name.map(|Path(name)| name).unwrap_or_default();
    let path = state.root().resolve(&name)?;
    storage::files::remove(&path).await?;

    tracing::info!(name = %name, "deleted");
    Ok(Redirect::to("/"))
}

fn quote_filename(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
