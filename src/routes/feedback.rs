use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::feedback::{CreateQuestionnaireRequest, CreateReviewRequest, QuestionnaireList, ReviewList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Questionnaire, Review},
    response::ApiResponse,
    services::feedback_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews).post(add_review))
        .route(
            "/questionnaires",
            get(list_questionnaires).post(add_questionnaire),
        )
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    responses((status = 200, description = "All reviews, newest first", body = ApiResponse<ReviewList>)),
    tag = "Feedback"
)]
pub async fn list_reviews(State(state): State<AppState>) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = feedback_service::list_reviews(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review a finished order", body = ApiResponse<Review>),
        (status = 400, description = "Invalid rating or order not finished"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn add_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = feedback_service::add_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/questionnaires",
    responses(
        (status = 200, description = "All questionnaires (admin only)", body = ApiResponse<QuestionnaireList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn list_questionnaires(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<QuestionnaireList>>> {
    let resp = feedback_service::list_questionnaires(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/questionnaires",
    request_body = CreateQuestionnaireRequest,
    responses(
        (status = 200, description = "Answer the questionnaire for a finished order", body = ApiResponse<Questionnaire>),
        (status = 400, description = "Missing feedback or order not finished"),
        (status = 409, description = "Already answered")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn add_questionnaire(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateQuestionnaireRequest>,
) -> AppResult<Json<ApiResponse<Questionnaire>>> {
    let resp = feedback_service::add_questionnaire(&state, &user, payload).await?;
    Ok(Json(resp))
}
