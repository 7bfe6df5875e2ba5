use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Questionnaire, QuestionnaireAnswers, Review};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub order_id: Uuid,
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateQuestionnaireRequest {
    pub order_id: Uuid,
    pub answers: QuestionnaireAnswers,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<Review>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionnaireList {
    pub items: Vec<Questionnaire>,
}
