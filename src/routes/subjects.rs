use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::users::SubjectList, error::AppResult, response::ApiResponse, services::subject_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_subjects))
}

#[utoipa::path(
    get,
    path = "/api/subjects",
    responses(
        (status = 200, description = "All subjects by name", body = ApiResponse<SubjectList>)
    ),
    tag = "Subjects"
)]
pub async fn list_subjects(State(state): State<AppState>) -> AppResult<Json<ApiResponse<SubjectList>>> {
    let resp = subject_service::list_subjects(&state).await?;
    Ok(Json(resp))
}
