//! Character listing.

use std::time::Instant;

use axum::extract::State;
use parley_core::repository::character::CharacterRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Public view of a character; the prompt text stays on the server.
#[derive(Debug, Serialize)]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub culture: String,
    pub voice: Option<String>,
}

/// GET /api/v1/characters - Characters a client can start a chat with.
pub async fn list_characters(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<CharacterSummary>>, AppError> {
    let started = Instant::now();
    let characters = state.characters.list_characters().await?;

    let summaries = characters
        .into_iter()
        .map(|c| CharacterSummary {
            id: c.id,
            name: c.name,
            description: c.description,
            culture: c.culture,
            voice: c.voice,
        })
        .collect();

    Ok(ApiResponse::success(
        summaries,
        Uuid::now_v7().to_string(),
        started.elapsed().as_millis() as u64,
    ))
}
