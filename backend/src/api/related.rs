//! Related questions API

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::api::utils::{resolve_model, validate_message, GenerateRequest};
use crate::error::AppError;
use crate::state::AppState;

#[allow(missing_docs)]
#[derive(Debug, Serialize)]
pub struct RelatedQuestionsResponse {
    pub success: bool,
    pub questions: Vec<String>,
}

/// Suggest follow-up questions for a message
///
/// # Returns
/// * `Ok(Json)` - `{"success": true, "questions": [...]}`
/// * `Err(AppError)` - 400 for an empty message, 500 when the model call fails
pub async fn related_questions(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<RelatedQuestionsResponse>, AppError> {
    let message = validate_message(&request.message)?;
    let model = resolve_model(request.model.as_deref(), &state.models.related);

    let questions = state.related.generate(&message, &model).await?;
    info!(model = %model, count = questions.len(), "Related questions generated");

    Ok(Json(RelatedQuestionsResponse {
        success: true,
        questions,
    }))
}
