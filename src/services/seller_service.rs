use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    dto::products::ProductList,
    entity::products::{Column as ProdCol, Entity as Products},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_seller},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    routes::seller::{SellerOrderLine, SellerOrderList},
    state::AppState,
};

/// The seller's own inventory, inactive products included.
pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_seller(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .filter(ProdCol::SellerId.eq(user.user_id))
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

/// Order lines that sold this seller's products, newest orders first.
pub async fn list_my_order_lines(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<SellerOrderList>> {
    ensure_seller(user)?;
    let (page, limit, offset) = pagination.normalize();

    let items = sqlx::query_as::<_, SellerOrderLine>(
        r#"
        SELECT oi.id, oi.order_id, o.invoice_number, oi.product_id, oi.product_name,
               oi.quantity, oi.unit_price, o.status AS order_status, o.created_at AS ordered_at
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE oi.seller_id = $1
        ORDER BY o.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items WHERE seller_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Order lines",
        SellerOrderList { items },
        Some(meta),
    ))
}
