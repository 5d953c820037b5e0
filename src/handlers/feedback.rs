use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::Resource;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::routes::AppState;

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

/// Length problems for a resource name, if any
pub fn name_length_feedback(name: &str) -> Option<&'static str> {
    let len = name.chars().count();
    if len < NAME_MIN_LEN {
        Some("Name too short!")
    } else if len > NAME_MAX_LEN {
        Some("Name too long!")
    } else {
        None
    }
}

/// GET /api/feedbacks/{location|product|category}-name?name= - live name check.
///
/// Feedback text containing `!` marks the value as invalid.
pub async fn name_feedback(
    State(state): State<AppState>,
    Extension(resource): Extension<Resource>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Value>, ApiError> {
    let name = query
        .name
        .ok_or_else(|| ApiError::bad_request("Missing query parameter: name"))?;

    let feedback = match name_length_feedback(&name) {
        Some(problem) => problem,
        None if state.repository.name_in_use(resource, user.id, &name).await? => "Name already used!",
        None => "Valid Name",
    };

    Ok(Json(json!({ "feedback": feedback })))
}
