use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use uuid::Uuid;
use vastra_commerce_api::db::{create_orm_conn, create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&database_url).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "user@example.com", "user1234", "user").await?;
    seed_catalog(&pool, admin_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

/// Seeded accounts are pre-verified so checkout works out of the box.
async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let username = email.split('@').next().unwrap_or("user");

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (
            id, username, email, password_hash, first_name, last_name, phone,
            role, email_verified, phone_verified
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, TRUE)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind("Seed")
    .bind("User")
    .bind(format!("+9190000{:05}", rand::random::<u16>()))
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool, admin_id: Uuid) -> anyhow::Result<()> {
    let category_id = ensure_category(pool, "T-Shirts", "Everyday cotton tees").await?;

    let products: Vec<(&str, &str, &str, &str, Vec<(&str, &str, &str, i64, i32)>)> = vec![
        (
            "Classic Crew Tee",
            "Heavyweight cotton crew neck",
            "tshirt",
            "Machine wash cold",
            vec![
                ("S", "Black", "Regular", 500, 50),
                ("M", "Black", "Regular", 500, 50),
                ("L", "White", "Oversized", 550, 30),
            ],
        ),
        (
            "Pocket Tee",
            "Single chest pocket, garment dyed",
            "tshirt",
            "Machine wash cold",
            vec![
                ("M", "Olive", "Regular", 650, 40),
                ("L", "Olive", "Regular", 650, 25),
            ],
        ),
    ];

    for (name, desc, garment_type, care, variants) in products {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            continue;
        }

        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, category_id, name, description, garment_type, care, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category_id)
        .bind(name)
        .bind(desc)
        .bind(garment_type)
        .bind(care)
        .bind(admin_id)
        .fetch_one(pool)
        .await?;

        for (size, color, fit, mrp, stock) in variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants (id, product_id, size, color, fit, mrp, stock_quantity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(size)
            .bind(color)
            .bind(fit)
            .bind(Decimal::from(mrp))
            .bind(stock)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    name: &str,
    description: &str,
) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((id,)) => Ok(id),
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
                .bind(name)
                .fetch_one(pool)
                .await?;
            Ok(existing.0)
        }
    }
}
