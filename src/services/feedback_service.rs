use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit,
    dto::feedback::{CreateQuestionnaireRequest, CreateReviewRequest, QuestionnaireList, ReviewList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Questionnaire, Review},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Feedback is only taken for the caller's own finished orders.
async fn finished_order_of(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<Order> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|o| o.user_id == Some(user.user_id))
        .ok_or(AppError::NotFound("order"))?;
    if !order.status.is_terminal() {
        return Err(AppError::BadRequest(
            "feedback is only accepted for finished orders".into(),
        ));
    }
    Ok(order)
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    let order = finished_order_of(state, user, payload.order_id).await?;
    if state.store.review_for_order(order.id).await?.is_some() {
        return Err(AppError::Conflict("order already has a review".into()));
    }

    let review = state
        .store
        .insert_review(Review {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: user.user_id,
            user_name: order.user_name.clone(),
            rating: payload.rating,
            comment: payload.comment.trim().to_string(),
            created_at: Utc::now(),
        })
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "order_id": order.id, "rating": review.rating }),
    )
    .await;
    Ok(ApiResponse::success("Review saved", review, Some(Meta::empty())))
}

pub async fn list_reviews(state: &AppState) -> AppResult<ApiResponse<ReviewList>> {
    let items = state.store.list_reviews().await?;
    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

pub async fn add_questionnaire(
    state: &AppState,
    user: &AuthUser,
    payload: CreateQuestionnaireRequest,
) -> AppResult<ApiResponse<Questionnaire>> {
    let mut answers = payload.answers;
    answers.feedback = answers.feedback.trim().to_string();
    if answers.feedback.is_empty() {
        return Err(AppError::BadRequest("feedback is required".into()));
    }
    let order = finished_order_of(state, user, payload.order_id).await?;
    if state.store.questionnaire_for_order(order.id).await?.is_some() {
        return Err(AppError::Conflict("order already has a questionnaire".into()));
    }

    let questionnaire = state
        .store
        .insert_questionnaire(Questionnaire {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: user.user_id,
            answers,
            created_at: Utc::now(),
        })
        .await?;

    audit::record(
        state,
        Some(user.user_id),
        "questionnaire_create",
        "questionnaires",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    Ok(ApiResponse::success(
        "Questionnaire saved",
        questionnaire,
        Some(Meta::empty()),
    ))
}

pub async fn list_questionnaires(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<QuestionnaireList>> {
    ensure_admin(user)?;
    let items = state.store.list_questionnaires().await?;
    Ok(ApiResponse::success(
        "Questionnaires",
        QuestionnaireList { items },
        None,
    ))
}
