use marketplace_api::{
    config::{AppConfig, PaymentConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::cart::AddToCartRequest,
    dto::orders::{CheckoutRequest, PayOrderRequest},
    dto::payments::PaymentCallbackRequest,
    error::AppError,
    middleware::auth::AuthUser,
    models::{Order, PaymentMethod, UserRole},
    payments::{PaymentGateway, SandboxGateway},
    services::{cart_service, order_service, payment_service},
    state::AppState,
};
use uuid::Uuid;

const CALLBACK_TOKEN: &str = "test-callback-token";

async fn test_state() -> anyhow::Result<Option<AppState>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        cors_origin: None,
        currency: "XOF".into(),
        payment: PaymentConfig {
            api_url: None,
            api_key: None,
            callback_token: CALLBACK_TOKEN.into(),
        },
    };

    Ok(Some(AppState {
        pool,
        orm,
        gateway: PaymentGateway::Sandbox(SandboxGateway),
        config,
    }))
}

async fn create_user(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, full_name, role) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(format!("{}-{}@example.com", role.as_str(), id.simple()))
    .bind("not-a-real-hash")
    .bind("Payment Tester")
    .bind(role.as_str())
    .execute(&state.pool)
    .await?;
    Ok(AuthUser { user_id: id, role })
}

/// Seeds a seller with one product and checks out a one-line order for a fresh
/// customer.
async fn place_order(state: &AppState) -> anyhow::Result<(AuthUser, Order)> {
    let seller = create_user(state, UserRole::Seller).await?;
    let customer = create_user(state, UserRole::Customer).await?;

    let product_id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, seller_id, name, price, stock) VALUES ($1, $2, $3, $4, $5)")
        .bind(product_id)
        .bind(seller.user_id)
        .bind(format!("Payment Widget {}", product_id.simple()))
        .bind(2500_i64)
        .bind(5_i32)
        .execute(&state.pool)
        .await?;

    cart_service::add_to_cart(
        state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;

    let order = order_service::checkout(
        state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await?
    .data
    .expect("order data")
    .order;

    Ok((customer, order))
}

fn pay(method: PaymentMethod, phone: Option<&str>) -> PayOrderRequest {
    PayOrderRequest {
        method,
        phone: phone.map(str::to_string),
    }
}

fn callback(reference: &str, status: &str, amount: Option<i64>) -> PaymentCallbackRequest {
    PaymentCallbackRequest {
        reference: reference.to_string(),
        status: status.to_string(),
        amount,
    }
}

#[tokio::test]
async fn mobile_money_payment_completes_via_callback() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::OrangeMoney, Some("771234567")),
    )
    .await?
    .data
    .expect("payment data");

    assert_eq!(initiated.payment.status, "pending");
    assert!(
        initiated
            .instructions
            .as_deref()
            .is_some_and(|text| text.contains("#144#"))
    );

    let reference = initiated.payment.id.to_string();

    // Wrong shared secret is turned away before anything is looked up.
    let err = payment_service::handle_callback(
        &state,
        Some("not-the-token"),
        callback(&reference, "completed", None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let settled = payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&reference, "completed", Some(order.total_amount)),
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(settled.status, "completed");

    let order = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order.payment_status, "paid");
    assert_eq!(order.status, "confirmed");
    assert!(order.paid_at.is_some());

    Ok(())
}

#[tokio::test]
async fn completed_payments_ignore_later_callbacks() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::MtnMoney, Some("781234567")),
    )
    .await?
    .data
    .expect("payment data");
    let reference = initiated.payment.id.to_string();

    payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&reference, "completed", None),
    )
    .await?;

    // A stale failure delivered afterwards must not regress the payment.
    let after = payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&reference, "failed", None),
    )
    .await?
    .data
    .expect("payment");
    assert_eq!(after.status, "completed");

    Ok(())
}

#[tokio::test]
async fn polling_a_pending_sandbox_payment_settles_it() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::Wave, Some("761234567")),
    )
    .await?;

    // The sandbox approves on verification, so one status poll settles it.
    let payment = payment_service::payment_status(&state, &customer, order.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(payment.status, "completed");

    let order = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order.payment_status, "paid");

    Ok(())
}

#[tokio::test]
async fn callbacks_with_a_wrong_amount_are_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::Card, None),
    )
    .await?
    .data
    .expect("payment data");
    let reference = initiated.payment.id.to_string();

    let err = payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&reference, "completed", Some(order.total_amount + 1)),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Amount mismatch"));

    // An unknown final status is rejected as well.
    let err = payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&reference, "pending", None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Invalid callback status"));

    Ok(())
}

#[tokio::test]
async fn cash_on_delivery_waits_for_admin_settlement() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::CashOnDelivery, None),
    )
    .await?
    .data
    .expect("payment data");
    assert_eq!(initiated.payment.status, "pending");
    assert!(initiated.instructions.is_none());
    assert!(initiated.payment.provider_ref.is_none());

    // Polling does not settle an offline payment.
    let still_pending = payment_service::payment_status(&state, &customer, order.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(still_pending.status, "pending");

    let settled = payment_service::settle_cash_payment(&state, &admin, initiated.payment.id)
        .await?
        .data
        .expect("payment");
    assert_eq!(settled.status, "completed");

    let order = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .expect("order")
        .order;
    assert_eq!(order.payment_status, "paid");

    let err = payment_service::settle_cash_payment(&state, &admin, settled.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Payment is not pending"));

    Ok(())
}

#[tokio::test]
async fn gateway_settlement_cannot_be_forced_manually() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::OrangeMoney, Some("771234567")),
    )
    .await?
    .data
    .expect("payment data");

    let err = payment_service::settle_cash_payment(&state, &admin, initiated.payment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn one_pending_payment_per_order() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::OrangeMoney, Some("771234567")),
    )
    .await?;

    let err = payment_service::pay_order(&state, &customer, order.id, pay(PaymentMethod::Card, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("already pending")));

    Ok(())
}

#[tokio::test]
async fn cancelled_and_paid_orders_cannot_be_paid() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };

    let (customer, order) = place_order(&state).await?;
    order_service::cancel_order(&state, &customer, order.id).await?;
    let err = payment_service::pay_order(&state, &customer, order.id, pay(PaymentMethod::Card, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Order is cancelled"));

    let (customer, order) = place_order(&state).await?;
    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::Wave, Some("761234567")),
    )
    .await?
    .data
    .expect("payment data");
    payment_service::handle_callback(
        &state,
        Some(CALLBACK_TOKEN),
        callback(&initiated.payment.id.to_string(), "completed", None),
    )
    .await?;

    let err = payment_service::pay_order(&state, &customer, order.id, pay(PaymentMethod::Card, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Order already paid"));

    Ok(())
}

#[tokio::test]
async fn mobile_money_requires_a_phone_number() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let (customer, order) = place_order(&state).await?;

    let err = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::OrangeMoney, None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn payments_are_visible_to_payer_and_admin_only() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let stranger = create_user(&state, UserRole::Customer).await?;
    let (customer, order) = place_order(&state).await?;

    let initiated = payment_service::pay_order(
        &state,
        &customer,
        order.id,
        pay(PaymentMethod::CashOnDelivery, None),
    )
    .await?
    .data
    .expect("payment data");

    let err = payment_service::get_payment(&state, &stranger, initiated.payment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    payment_service::get_payment(&state, &customer, initiated.payment.id).await?;
    payment_service::get_payment(&state, &admin, initiated.payment.id).await?;

    Ok(())
}
