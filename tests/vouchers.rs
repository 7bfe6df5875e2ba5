mod common;

use zonaprint_api::{
    dto::vouchers::{ApplyVoucherRequest, DeleteVoucherRequest, UpsertVoucherRequest},
    error::AppError,
    models::Role,
    services::voucher_service,
};

fn code(code: &str) -> ApplyVoucherRequest {
    ApplyVoucherRequest { code: code.into() }
}

#[tokio::test]
async fn admin_grants_and_customer_redeems() {
    let (state, _) = common::memory_state();
    let admin = common::admin(&state).await;
    let user = common::seed_user(&state, "lina@example.com", Role::User).await;

    let granted = voucher_service::upsert_voucher(
        &state,
        &admin,
        UpsertVoucherRequest {
            email: "lina@example.com".into(),
            code: "lebaran10".into(),
            amount: 10_000,
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(granted.vouchers.len(), 1);
    assert_eq!(granted.vouchers[0].code, "LEBARAN10");

    let preview = voucher_service::check_voucher(&state, &user, code("Lebaran10"))
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(preview.amount, 10_000);
    // checking does not burn it
    assert!(!state.store.vouchers_for(user.user_id).await.unwrap()[0].used);

    voucher_service::apply_voucher(&state, &user, code("LEBARAN10"))
        .await
        .unwrap();
    let err = voucher_service::apply_voucher(&state, &user, code("LEBARAN10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VoucherAlreadyUsed));
    let err = voucher_service::check_voucher(&state, &user, code("LEBARAN10"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VoucherAlreadyUsed));

    // re-granting resets it
    voucher_service::upsert_voucher(
        &state,
        &admin,
        UpsertVoucherRequest {
            email: "lina@example.com".into(),
            code: "LEBARAN10".into(),
            amount: 15_000,
        },
    )
    .await
    .unwrap();
    let vouchers = state.store.vouchers_for(user.user_id).await.unwrap();
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0].amount, 15_000);
    assert!(!vouchers[0].used);
}

#[tokio::test]
async fn codes_belong_to_one_account() {
    let (state, _) = common::memory_state();
    let owner = common::customer(&state).await;
    let stranger = common::customer(&state).await;
    state
        .store
        .upsert_voucher(owner.user_id, "VIP50", 50_000)
        .await
        .unwrap();

    let err = voucher_service::apply_voucher(&state, &stranger, code("VIP50"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidVoucher));

    let err = voucher_service::apply_voucher(&state, &owner, code("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn restore_only_flips_a_used_voucher() {
    let (state, _) = common::memory_state();
    let user = common::customer(&state).await;
    state
        .store
        .upsert_voucher(user.user_id, "HEMAT5", 5_000)
        .await
        .unwrap();

    assert!(!voucher_service::restore_voucher(&state, user.user_id, "HEMAT5").await.unwrap());
    voucher_service::redeem_voucher(&state, user.user_id, "hemat5").await.unwrap();
    assert!(voucher_service::restore_voucher(&state, user.user_id, "HEMAT5").await.unwrap());
    assert!(!state.store.vouchers_for(user.user_id).await.unwrap()[0].used);
}

#[tokio::test]
async fn admin_voucher_management_is_guarded() {
    let (state, _) = common::memory_state();
    let admin = common::admin(&state).await;
    let user = common::seed_user(&state, "eko@example.com", Role::User).await;

    let err = voucher_service::upsert_voucher(
        &state,
        &user,
        UpsertVoucherRequest {
            email: "eko@example.com".into(),
            code: "FREE".into(),
            amount: 100_000,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = voucher_service::upsert_voucher(
        &state,
        &admin,
        UpsertVoucherRequest {
            email: "eko@example.com".into(),
            code: "FREE".into(),
            amount: 0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = voucher_service::upsert_voucher(
        &state,
        &admin,
        UpsertVoucherRequest {
            email: "nobody@example.com".into(),
            code: "FREE".into(),
            amount: 1_000,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = voucher_service::delete_voucher(
        &state,
        &admin,
        DeleteVoucherRequest {
            email: "eko@example.com".into(),
            code: "FREE".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let listing = voucher_service::list_user_vouchers(&state, &admin)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(listing.len(), 2);
}
