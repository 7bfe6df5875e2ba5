mod common;

use zonaprint_api::{
    dto::{
        feedback::{CreateQuestionnaireRequest, CreateReviewRequest},
        orders::{ManualOrderRequest, UpdateOrderStatusRequest},
        products::{InventoryAdjustRequest, LowStockQuery},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{
        DiscoverySource, Order, OrderItem, OrderStatus, PaymentMethod, QuestionnaireAnswers,
        ServiceSpeed,
    },
    services::{admin_service, feedback_service, order_service},
    state::AppState,
};

/// Stores a customer order directly, bypassing the cart.
async fn customer_order(state: &AppState, user: &AuthUser, status: OrderStatus) -> Order {
    let now = chrono::Utc::now();
    state
        .store
        .insert_order(Order {
            id: uuid::Uuid::new_v4(),
            user_id: Some(user.user_id),
            user_name: "Rina".into(),
            user_email: "rina@example.com".into(),
            user_phone: None,
            user_address: None,
            items: vec![OrderItem {
                product_id: None,
                name: "Banner".into(),
                price: 50_000,
                quantity: 1,
            }],
            attachments: Vec::new(),
            total: 50_000,
            status,
            payment_method: PaymentMethod::Qris,
            stock_committed: false,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap()
}

fn review(order: &Order, rating: i16) -> CreateReviewRequest {
    CreateReviewRequest {
        order_id: order.id,
        rating,
        comment: " Hasil cetak rapi ".into(),
    }
}

#[tokio::test]
async fn reviews_only_for_own_finished_orders() {
    let (state, _) = common::memory_state();
    let user = common::customer(&state).await;
    let stranger = common::customer(&state).await;
    let pending = customer_order(&state, &user, OrderStatus::Dikirim).await;
    let finished = customer_order(&state, &user, OrderStatus::Selesai).await;

    let err = feedback_service::add_review(&state, &user, review(&pending, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = feedback_service::add_review(&state, &stranger, review(&finished, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = feedback_service::add_review(&state, &user, review(&finished, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let saved = feedback_service::add_review(&state, &user, review(&finished, 4))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(saved.comment, "Hasil cetak rapi");
    assert_eq!(saved.user_name, "Rina");

    let err = feedback_service::add_review(&state, &user, review(&finished, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let listed = feedback_service::list_reviews(&state).await.unwrap().data.unwrap();
    assert_eq!(listed.items.len(), 1);
}

#[tokio::test]
async fn questionnaires_need_feedback_and_admin_to_list() {
    let (state, _) = common::memory_state();
    let admin = common::admin(&state).await;
    let user = common::customer(&state).await;
    let finished = customer_order(&state, &user, OrderStatus::Selesai).await;

    let answers = |feedback: &str| QuestionnaireAnswers {
        source: DiscoverySource::Instagram,
        speed: ServiceSpeed::Fast,
        feedback: feedback.into(),
    };

    let err = feedback_service::add_questionnaire(
        &state,
        &user,
        CreateQuestionnaireRequest {
            order_id: finished.id,
            answers: answers("  "),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    feedback_service::add_questionnaire(
        &state,
        &user,
        CreateQuestionnaireRequest {
            order_id: finished.id,
            answers: answers("Cepat dan ramah"),
        },
    )
    .await
    .unwrap();

    let err = feedback_service::list_questionnaires(&state, &user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let listed = feedback_service::list_questionnaires(&state, &admin)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].answers.feedback, "Cepat dan ramah");
}

#[tokio::test]
async fn overview_sums_revenue_across_orders() {
    let (state, _) = common::memory_state();
    let admin = common::admin(&state).await;
    let user = common::customer(&state).await;
    customer_order(&state, &user, OrderStatus::Baru).await;
    customer_order(&state, &user, OrderStatus::Selesai).await;
    order_service::add_manual_order(
        &state,
        &admin,
        ManualOrderRequest {
            admin_key: common::MANUAL_KEY.into(),
            customer_name: None,
            items: None,
            total: Some(20_000),
            note: None,
        },
    )
    .await
    .unwrap();

    let view = admin_service::overview(&state, &admin).await.unwrap().data.unwrap();
    assert_eq!(view.total_orders, 3);
    assert_eq!(view.total_revenue, 120_000);
    assert_eq!(view.average_order, 40_000);
    let finished = view
        .status_counts
        .iter()
        .find(|c| c.status == OrderStatus::Selesai)
        .unwrap();
    assert_eq!(finished.count, 2);
    assert_eq!(view.top_customers[0].user_id, Some(user.user_id));

    let perf = admin_service::product_performance(&state, &admin)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(perf[0].name, "Banner");
    assert_eq!(perf[0].total_sold, 2);

    let err = admin_service::overview(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn inventory_adjustments_and_low_stock() {
    let (state, _) = common::memory_state();
    let admin = common::admin(&state).await;
    let low = common::seed_product(&state, "Kaos", 85_000, 2).await;
    let plenty = common::seed_product(&state, "Stiker", 10_000, 50).await;

    let listed = admin_service::list_low_stock(&state, &admin, LowStockQuery::default())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, low.id);

    let err = admin_service::adjust_inventory(&state, &admin, low.id, InventoryAdjustRequest { delta: -3 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(common::stock_of(&state, low.id).await, 2);

    let product = admin_service::adjust_inventory(&state, &admin, low.id, InventoryAdjustRequest { delta: 10 })
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(product.stock, 12);

    // out-of-range deltas are refused and the store stays usable
    for delta in [i32::MAX, i32::MIN] {
        let err = admin_service::adjust_inventory(&state, &admin, low.id, InventoryAdjustRequest { delta })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
    assert_eq!(common::stock_of(&state, low.id).await, 12);

    let err = admin_service::adjust_inventory(&state, &admin, plenty.id, InventoryAdjustRequest { delta: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::adjust_inventory(
        &state,
        &admin,
        uuid::Uuid::new_v4(),
        InventoryAdjustRequest { delta: 1 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn status_changes_are_audited() {
    let (state, store) = common::memory_state();
    let admin = common::admin(&state).await;
    let user = common::customer(&state).await;
    let order = customer_order(&state, &user, OrderStatus::Baru).await;

    order_service::update_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Diproses,
        },
    )
    .await
    .unwrap();
    assert!(store.audit_actions().iter().any(|a| a == "order_status_update"));
}
