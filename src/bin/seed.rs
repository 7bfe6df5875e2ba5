use uuid::Uuid;
use zonaprint_api::{
    db::{create_orm_conn, run_migrations},
    models::{WELCOME_VOUCHER_AMOUNT, WELCOME_VOUCHER_CODE},
    services::auth_service::hash_password,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm, "migrations").await?;
    let pool = orm.get_postgres_connection_pool();

    let admin_id = ensure_user(pool, "Admin ZonaPrint", "admin@zonaprint.com", "admin123", "admin").await?;
    let user_id = ensure_user(pool, "Pelanggan Demo", "user@zonaprint.com", "user123", "user").await?;
    ensure_welcome_voucher(pool, user_id).await?;
    seed_products(pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_welcome_voucher(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vouchers (id, user_id, code, amount)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(WELCOME_VOUCHER_CODE)
    .bind(WELCOME_VOUCHER_AMOUNT)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        ("Banner Flexi", "Cetak banner outdoor 280gsm", 35_000_i64, 40, "banner", vec!["1x1m", "1x2m", "2x3m"]),
        ("Stiker Vinyl", "Stiker vinyl glossy tahan air", 15_000, 120, "stiker", vec!["A4", "A3"]),
        ("Kartu Nama", "Art carton 260gsm, 1 box isi 100", 45_000, 60, "kartu-nama", vec!["1 sisi", "2 sisi"]),
        ("Mug Custom", "Mug keramik putih dengan desain sendiri", 30_000, 25, "merchandise", vec![]),
        ("Kaos Sablon", "Kaos cotton combed 30s", 85_000, 5, "apparel", vec!["S", "M", "L", "XL"]),
    ];

    for (name, desc, price, stock, category, options) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, category, options)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(category)
        .bind(serde_json::json!(options))
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
