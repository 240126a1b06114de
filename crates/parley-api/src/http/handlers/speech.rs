//! Speech fetch endpoint: the HTTP reader of the pending speech registry.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /api/v1/speech/{id} - Synthesize (or serve cached) audio for an entry.
pub async fn get_speech(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let audio = state.speech.fetch(&id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, audio.format.content_type()),
            (header::CACHE_CONTROL, "no-store"),
        ],
        audio.bytes.as_ref().clone(),
    )
        .into_response())
}
