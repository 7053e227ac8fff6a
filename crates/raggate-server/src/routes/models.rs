//! Model listing endpoint

use axum::{extract::State, Json};

use raggate_core::{ModelCard, ModelList};

use crate::state::AppState;

/// GET /v1/models - the model ids this gateway fronts
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    let cards = state
        .config
        .chat
        .models
        .iter()
        .map(ModelCard::new)
        .collect();
    Json(ModelList::new(cards))
}
