use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use marketplace_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "Admin", "admin").await?;
    let seller_id = ensure_user(
        &pool,
        "seller@example.com",
        "seller123",
        "Demo Seller",
        "seller",
    )
    .await?;
    ensure_user(
        &pool,
        "customer@example.com",
        "customer123",
        "Demo Customer",
        "customer",
    )
    .await?;

    seed_catalog(&pool, seller_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    full_name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str, slug: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

async fn seed_catalog(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let electronics = ensure_category(pool, "Electronics", "electronics").await?;
    let fashion = ensure_category(pool, "Fashion", "fashion").await?;
    let home = ensure_category(pool, "Home", "home").await?;

    // Prices in whole XOF.
    let products = vec![
        ("Wireless Earbuds", "Bluetooth 5.3, 24h battery", 15000, 40, electronics),
        ("Power Bank 20000mAh", "Dual USB-C fast charge", 12000, 60, electronics),
        ("Wax Print Shirt", "Handmade, local fabric", 8000, 25, fashion),
        ("Leather Sandals", "Artisan made", 6500, 30, fashion),
        ("Ceramic Teapot", "1.2L, hand painted", 4500, 15, home),
    ];

    for (name, desc, price, stock, category_id) in products {
        // No unique key on product names, so guard by (seller, name).
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, category_id, name, description, price, stock)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (
                SELECT 1 FROM products WHERE seller_id = $2 AND name = $4
            )
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(category_id)
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded categories and products");
    Ok(())
}
