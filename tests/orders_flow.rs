use marketplace_api::{
    config::{AppConfig, PaymentConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::cart::AddToCartRequest,
    dto::categories::CreateCategoryRequest,
    dto::orders::CheckoutRequest,
    dto::products::UpdateProductRequest,
    error::AppError,
    middleware::auth::AuthUser,
    models::UserRole,
    payments::{PaymentGateway, SandboxGateway},
    routes::admin::{LowStockQuery, UpdateOrderStatusRequest, UpdateUserRequest},
    routes::params::Pagination,
    services::{admin_service, cart_service, category_service, order_service, product_service},
    state::AppState,
};
use uuid::Uuid;

// Integration tests run against a real database and skip politely without one.
// Every test seeds its own users and products, so no table wiping is needed
// and the tests can run in parallel.
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
            callback_token: "test-callback-token".into(),
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
    .bind("Flow Tester")
    .bind(role.as_str())
    .execute(&state.pool)
    .await?;
    Ok(AuthUser { user_id: id, role })
}

async fn create_product(
    state: &AppState,
    seller: &AuthUser,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, seller_id, name, price, stock) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(seller.user_id)
        .bind(format!("Flow Widget {}", id.simple()))
        .bind(price)
        .bind(stock)
        .execute(&state.pool)
        .await?;
    Ok(id)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let row: (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(row.0)
}

#[tokio::test]
async fn checkout_moves_the_cart_into_an_order() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let product_id = create_product(&state, &seller, 1000, 10).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 2,
        },
    )
    .await?;

    let resp = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: Some("12 Market Street, Dakar".into()),
        },
    )
    .await?;
    let data = resp.data.expect("order data");

    assert_eq!(data.order.total_amount, 2000);
    assert_eq!(data.order.status, "pending");
    assert_eq!(data.order.payment_status, "unpaid");
    assert!(data.order.invoice_number.starts_with("INV-"));
    assert_eq!(data.items.len(), 1);
    assert_eq!(data.items[0].quantity, 2);
    assert_eq!(data.items[0].unit_price, 1000);
    assert_eq!(data.items[0].seller_id, seller.user_id);

    assert_eq!(stock_of(&state, product_id).await?, 8);

    let cart = cart_service::list_cart(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .expect("cart data");
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);

    Ok(())
}

#[tokio::test]
async fn checkout_with_an_empty_cart_is_rejected() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, UserRole::Customer).await?;

    let err = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Cart is empty"));

    Ok(())
}

#[tokio::test]
async fn checkout_fails_when_stock_ran_out_after_adding() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let product_id = create_product(&state, &seller, 500, 5).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 3,
        },
    )
    .await?;

    // Somebody else bought most of the stock in the meantime.
    sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    let err = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("Insufficient stock")));

    // Nothing was committed.
    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(customer.user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders.0, 0);
    assert_eq!(stock_of(&state, product_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_pending_order_restores_stock() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let product_id = create_product(&state, &seller, 1000, 10).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 4,
        },
    )
    .await?;
    let order = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await?
    .data
    .expect("order data")
    .order;
    assert_eq!(stock_of(&state, product_id).await?, 6);

    let cancelled = order_service::cancel_order(&state, &customer, order.id)
        .await?
        .data
        .expect("cancelled order");
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(stock_of(&state, product_id).await?, 10);

    // A cancelled order stays cancelled.
    let err = order_service::cancel_order(&state, &customer, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled_by_the_customer() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product_id = create_product(&state, &seller, 800, 10).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;
    let order = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await?
    .data
    .expect("order data")
    .order;

    for status in ["confirmed", "shipped"] {
        admin_service::update_order_status(
            &state,
            &admin,
            order.id,
            UpdateOrderStatusRequest {
                status: status.into(),
            },
        )
        .await?;
    }

    let err = order_service::cancel_order(&state, &customer, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("Cannot cancel")));

    Ok(())
}

#[tokio::test]
async fn admin_status_changes_follow_the_lifecycle() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product_id = create_product(&state, &seller, 800, 10).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;
    let order = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await?
    .data
    .expect("order data")
    .order;

    let set_status = |status: &str| {
        admin_service::update_order_status(
            &state,
            &admin,
            order.id,
            UpdateOrderStatusRequest {
                status: status.into(),
            },
        )
    };

    // Unknown and out-of-order statuses are rejected.
    assert!(matches!(
        set_status("bogus").await.unwrap_err(),
        AppError::BadRequest(ref msg) if msg == "Invalid order status"
    ));
    assert!(matches!(
        set_status("shipped").await.unwrap_err(),
        AppError::BadRequest(ref msg) if msg.contains("Cannot change status")
    ));

    // The happy path walks the chain one step at a time.
    assert_eq!(
        set_status("confirmed").await?.data.expect("order").status,
        "confirmed"
    );
    assert!(set_status("delivered").await.is_err());
    assert_eq!(
        set_status("shipped").await?.data.expect("order").status,
        "shipped"
    );
    assert_eq!(
        set_status("delivered").await?.data.expect("order").status,
        "delivered"
    );

    // Delivered is terminal.
    assert!(set_status("confirmed").await.is_err());

    Ok(())
}

#[tokio::test]
async fn admin_cancellation_restocks_the_order() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let customer = create_user(&state, UserRole::Customer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product_id = create_product(&state, &seller, 800, 10).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id,
            quantity: 5,
        },
    )
    .await?;
    let order = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            shipping_address: None,
        },
    )
    .await?
    .data
    .expect("order data")
    .order;
    assert_eq!(stock_of(&state, product_id).await?, 5);

    let cancelled = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "cancelled".into(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(stock_of(&state, product_id).await?, 10);

    Ok(())
}

#[tokio::test]
async fn sellers_cannot_edit_foreign_products() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let owner = create_user(&state, UserRole::Seller).await?;
    let other = create_user(&state, UserRole::Seller).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let product_id = create_product(&state, &owner, 800, 10).await?;

    let update = || UpdateProductRequest {
        name: Some("Renamed".into()),
        description: None,
        price: None,
        stock: None,
        category_id: None,
        image_url: None,
        is_active: None,
    };

    let err = product_service::update_product(&state, &other, product_id, update())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // The owner and any admin may edit.
    product_service::update_product(&state, &owner, product_id, update()).await?;
    product_service::update_product(&state, &admin, product_id, update()).await?;

    Ok(())
}

#[tokio::test]
async fn low_stock_report_lists_scarce_active_products() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let scarce = create_product(&state, &seller, 800, 0).await?;
    let plentiful = create_product(&state, &seller, 800, 50).await?;

    let report = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            page: None,
            per_page: None,
            threshold: None,
        },
    )
    .await?
    .data
    .expect("low stock report");

    assert!(report.items.iter().any(|p| p.id == scarce));
    assert!(report.items.iter().all(|p| p.id != plentiful));

    Ok(())
}

#[tokio::test]
async fn categories_with_products_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let seller = create_user(&state, UserRole::Seller).await?;
    let admin = create_user(&state, UserRole::Admin).await?;

    let category = category_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: format!("Gadgets {}", Uuid::new_v4().simple()),
            slug: None,
            description: None,
        },
    )
    .await?
    .data
    .expect("category");

    let product_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, seller_id, category_id, name, price, stock) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(product_id)
    .bind(seller.user_id)
    .bind(category.id)
    .bind(format!("Flow Widget {}", product_id.simple()))
    .bind(900_i64)
    .bind(3_i32)
    .execute(&state.pool)
    .await?;

    let err = category_service::delete_category(&state, &admin, category.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&state.pool)
        .await?;
    category_service::delete_category(&state, &admin, category.id).await?;

    Ok(())
}

#[tokio::test]
async fn admins_manage_roles_and_activation() -> anyhow::Result<()> {
    let Some(state) = test_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let second_admin = create_user(&state, UserRole::Admin).await?;
    let customer = create_user(&state, UserRole::Customer).await?;

    // With more than one active admin around, a demotion goes through.
    let demoted = admin_service::update_user(
        &state,
        &admin,
        second_admin.user_id,
        UpdateUserRequest {
            role: Some(UserRole::Customer),
            is_active: None,
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(demoted.role, "customer");

    let deactivated = admin_service::update_user(
        &state,
        &admin,
        customer.user_id,
        UpdateUserRequest {
            role: None,
            is_active: Some(false),
        },
    )
    .await?
    .data
    .expect("profile");
    assert!(!deactivated.is_active);

    // Non-admins are turned away.
    let err = admin_service::update_user(
        &state,
        &customer,
        admin.user_id,
        UpdateUserRequest {
            role: None,
            is_active: Some(false),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
