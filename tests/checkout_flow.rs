mod common;

use zonaprint_api::{
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    error::AppError,
    handoff::Branch,
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentMethod, WELCOME_VOUCHER_AMOUNT, WELCOME_VOUCHER_CODE},
    services::{cart_service, order_service},
    state::AppState,
};

fn checkout(voucher: Option<&str>, branch: Branch) -> CheckoutRequest {
    CheckoutRequest {
        name: "Rina".into(),
        email: "rina@example.com".into(),
        phone: "081234567".into(),
        address: "Jl. Veteran 1, Purwakarta".into(),
        payment_method: PaymentMethod::Qris,
        voucher_code: voucher.map(str::to_string),
        branch,
    }
}

async fn buyer_with_cart(state: &AppState, price: i64, quantity: i32) -> (AuthUser, uuid::Uuid) {
    let user = common::customer(state).await;
    state
        .store
        .upsert_voucher(user.user_id, WELCOME_VOUCHER_CODE, WELCOME_VOUCHER_AMOUNT)
        .await
        .unwrap();
    let product = common::seed_product(state, "Banner Flexi", price, 10).await;
    cart_service::add_to_cart(
        state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity,
            selected_option: None,
            note: Some("warna cerah".into()),
        },
    )
    .await
    .unwrap();
    (user, product.id)
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let (state, _) = common::memory_state();
    let user = common::customer(&state).await;
    state
        .store
        .upsert_voucher(user.user_id, WELCOME_VOUCHER_CODE, WELCOME_VOUCHER_AMOUNT)
        .await
        .unwrap();

    let err = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Purwakarta))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    // the voucher is still available
    let vouchers = state.store.vouchers_for(user.user_id).await.unwrap();
    assert!(!vouchers[0].used);
}

#[tokio::test]
async fn welcome_voucher_discounts_once() {
    let (state, _) = common::memory_state();
    let (user, product_id) = buyer_with_cart(&state, 50_000, 2).await;

    let resp = order_service::place_order(&state, &user, checkout(Some("welcome25"), Branch::Purwakarta))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(resp.subtotal, 100_000);
    assert_eq!(resp.discount, 25_000);
    assert_eq!(resp.order.total, 75_000);
    assert_eq!(resp.order.status, OrderStatus::Baru);
    assert!(!resp.order.stock_committed);
    assert_eq!(resp.order.items[0].product_id, Some(product_id));

    // checkout does not touch stock and empties the cart
    assert_eq!(common::stock_of(&state, product_id).await, 10);
    let cart = cart_service::list_cart(&state, &user).await.unwrap().data.unwrap();
    assert!(cart.items.is_empty());

    let profile = state.store.get_user(user.user_id).await.unwrap().unwrap();
    assert!(profile.welcome_voucher_used);

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id,
            quantity: 1,
            selected_option: None,
            note: None,
        },
    )
    .await
    .unwrap();
    let err = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Purwakarta))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VoucherAlreadyUsed));
}

#[tokio::test]
async fn discount_never_pushes_the_total_below_zero() {
    let (state, _) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 10_000, 1).await;

    let resp = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Wanayasa))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(resp.subtotal, 10_000);
    assert_eq!(resp.order.total, 0);
}

#[tokio::test]
async fn unknown_voucher_is_rejected_and_the_cart_kept() {
    let (state, _) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 50_000, 1).await;

    let err = order_service::place_order(&state, &user, checkout(Some("DISKON99"), Branch::Purwakarta))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidVoucher));

    let cart = cart_service::list_cart(&state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[tokio::test]
async fn failed_order_write_keeps_cart_and_restores_voucher() {
    let (state, store) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 50_000, 2).await;

    store.fail_order_writes(true);
    let err = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Purwakarta))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));

    let cart = cart_service::list_cart(&state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.items.len(), 1);
    let vouchers = state.store.vouchers_for(user.user_id).await.unwrap();
    assert!(!vouchers[0].used);
    assert!(store.audit_actions().iter().any(|a| a == "voucher_restore"));

    store.fail_order_writes(false);
    let resp = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Purwakarta))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(resp.order.total, 75_000);
}

#[tokio::test]
async fn stale_cart_after_insert_still_completes_checkout() {
    let (state, store) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 50_000, 2).await;

    store.fail_cart_clears(true);
    let resp = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Purwakarta))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(resp.order.total, 75_000);

    let stored = state.store.get_order(resp.order.id).await.unwrap();
    assert!(stored.is_some());
    let vouchers = state.store.vouchers_for(user.user_id).await.unwrap();
    assert!(vouchers[0].used);
    assert!(!store.audit_actions().iter().any(|a| a == "voucher_restore"));
}

#[tokio::test]
async fn handoff_targets_the_chosen_branch() {
    let (state, _) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 50_000, 2).await;

    let resp = order_service::place_order(&state, &user, checkout(Some("WELCOME25"), Branch::Wanayasa))
        .await
        .unwrap()
        .data
        .unwrap();
    let handoff = resp.handoff;
    assert_eq!(handoff.branch, Branch::Wanayasa);
    assert_eq!(handoff.whatsapp_number, "6282246907899");
    assert!(handoff.link.starts_with("https://wa.me/6282246907899?text="));
    assert!(handoff.message.contains("Cabang Wanayasa"));
    assert!(handoff.message.contains("A. Banner Flexi"));
    assert!(handoff.message.contains("Catatan: warna cerah"));
    assert!(handoff.message.contains("Total: Rp 75.000"));
    assert!(handoff.link.contains("Total%3A%20Rp%2075.000"));
}

#[tokio::test]
async fn checkout_requires_contact_details() {
    let (state, _) = common::memory_state();
    let (user, _) = buyer_with_cart(&state, 50_000, 1).await;

    let mut payload = checkout(None, Branch::Purwakarta);
    payload.phone = "  ".into();
    let err = order_service::place_order(&state, &user, payload).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}
