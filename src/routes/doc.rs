use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        favorites::{AddFavoriteRequest, FavoriteProductList},
        orders::{CheckoutRequest, OrderList, OrderWithItems, PayOrderRequest},
        payments::{PaymentCallbackRequest, PaymentInitiated, PaymentList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{
        CartItem, Category, Favorite, Order, OrderItem, OrderStatus, Payment, PaymentMethod,
        PaymentState, Product, UserProfile, UserRole,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, categories, favorites, health, orders, payments,
        products as product_routes, seller,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::health_db,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        cart::list_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::pay_order,
        orders::payment_status,
        payments::payment_callback,
        payments::get_payment,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        seller::list_my_products,
        seller::list_my_order_lines,
        admin::dashboard_stats,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_users,
        admin::update_user,
        admin::list_payments,
        admin::settle_cash_payment
    ),
    components(
        schemas(
            UserProfile,
            UserRole,
            Category,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            Payment,
            PaymentMethod,
            PaymentState,
            Favorite,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CheckoutRequest,
            PayOrderRequest,
            OrderList,
            OrderWithItems,
            PaymentCallbackRequest,
            PaymentInitiated,
            PaymentList,
            AddFavoriteRequest,
            FavoriteProductList,
            health::HealthData,
            seller::SellerOrderLine,
            seller::SellerOrderList,
            admin::UpdateOrderStatusRequest,
            admin::LowStockQuery,
            admin::InventoryAdjustRequest,
            admin::UpdateUserRequest,
            admin::OrdersByStatus,
            admin::DashboardStats,
            admin::UserList,
            Meta,
            ApiResponse<UserProfile>,
            ApiResponse<LoginResponse>,
            ApiResponse<Category>,
            ApiResponse<CategoryList>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartItem>,
            ApiResponse<CartList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<Payment>,
            ApiResponse<PaymentInitiated>,
            ApiResponse<PaymentList>,
            ApiResponse<Favorite>,
            ApiResponse<FavoriteProductList>,
            ApiResponse<health::HealthData>,
            ApiResponse<seller::SellerOrderList>,
            ApiResponse<admin::DashboardStats>,
            ApiResponse<admin::UserList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Categories", description = "Catalog categories"),
        (name = "Products", description = "Product catalog"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Payments", description = "Payment status and provider callback"),
        (name = "Favorites", description = "Favorite products"),
        (name = "Seller", description = "Seller-facing catalog and sales"),
        (name = "Admin", description = "Back-office operations"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
