use std::sync::Arc;

use rust_decimal_macros::dec;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use vastra_commerce_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::cart::{AddCartItemRequest, CartView, UpdateCartItemRequest},
    entity::{
        categories::ActiveModel as CategoryActive,
        product_variants::ActiveModel as VariantActive,
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    gateway::MockPaymentGateway,
    middleware::auth::CartOwner,
    services::{auth_service, cart_service},
    state::AppState,
};

#[tokio::test]
async fn cart_lines_are_capped_at_five_and_bounded_by_stock() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;
    let user_id = seed_user(&state).await?;
    let owner = CartOwner::User(user_id);
    let (deep_stock, shallow_stock) = seed_variants(&state, user_id).await?;

    // 3 + 2 lands exactly on the cap; one more is rejected.
    add(&state, owner, deep_stock, 3).await?;
    add(&state, owner, deep_stock, 2).await?;
    let err = add(&state, owner, deep_stock, 1)
        .await
        .expect_err("line cap must hold");
    assert!(matches!(err, AppError::Validation(_)));

    // Within the cap but beyond the variant's stock of 4.
    let err = add(&state, owner, shallow_stock, 5)
        .await
        .expect_err("stock bound must hold");
    assert!(matches!(err, AppError::Validation(_)));

    let cart = view(&state, owner).await?;
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.total_amount, dec!(2500));
    Ok(())
}

#[tokio::test]
async fn delta_updates_delete_a_line_at_zero() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;
    let user_id = seed_user(&state).await?;
    let owner = CartOwner::User(user_id);
    let (variant_id, _) = seed_variants(&state, user_id).await?;

    add(&state, owner, variant_id, 3).await?;
    update(&state, owner, variant_id, -1).await?;
    let cart = view(&state, owner).await?;
    assert_eq!(cart.items[0].quantity, 2);

    update(&state, owner, variant_id, -2).await?;
    let cart = view(&state, owner).await?;
    assert!(cart.items.is_empty());

    // The line is gone, so a further delta has nothing to apply to.
    let err = update(&state, owner, variant_id, 1)
        .await
        .expect_err("missing line must be reported");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn removing_an_absent_line_is_not_found() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;
    let user_id = seed_user(&state).await?;
    let owner = CartOwner::User(user_id);
    let (variant_id, _) = seed_variants(&state, user_id).await?;

    add(&state, owner, variant_id, 1).await?;
    let err = cart_service::remove_item(&state, owner, Uuid::new_v4())
        .await
        .expect_err("unknown variant must be reported");
    assert!(matches!(err, AppError::NotFound(_)));

    cart_service::remove_item(&state, owner, variant_id).await?;
    let cart = view(&state, owner).await?;
    assert!(cart.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn guest_cart_merges_into_the_user_cart() -> anyhow::Result<()> {
    let Some(database_url) = test_database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;
    let user_id = seed_user(&state).await?;
    let (deep_stock, shallow_stock) = seed_variants(&state, user_id).await?;

    let guest = auth_service::create_guest_session(&state)
        .await?
        .data
        .expect("guest session");
    let guest_owner = CartOwner::Guest(guest.guest_id);
    let user_owner = CartOwner::User(user_id);

    // Overlapping line sums past the cap and gets clamped; the other
    // line carries over as-is.
    add(&state, guest_owner, deep_stock, 3).await?;
    add(&state, guest_owner, shallow_stock, 2).await?;
    add(&state, user_owner, deep_stock, 4).await?;

    cart_service::merge_guest_cart(&state, user_id, guest.guest_id).await?;

    let cart = view(&state, user_owner).await?;
    assert_eq!(cart.items.len(), 2);
    let quantity_of = |variant_id: Uuid| {
        cart.items
            .iter()
            .find(|line| line.variant.id == variant_id)
            .map(|line| line.quantity)
    };
    assert_eq!(quantity_of(deep_stock), Some(5));
    assert_eq!(quantity_of(shallow_stock), Some(2));

    let guest_cart = view(&state, guest_owner).await?;
    assert!(guest_cart.items.is_empty());
    Ok(())
}

// --- helpers ---------------------------------------------------------------

fn test_database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState {
        pool,
        orm,
        gateway: Arc::new(MockPaymentGateway::new()),
    })
}

async fn seed_user(state: &AppState) -> anyhow::Result<Uuid> {
    let suffix = Uuid::new_v4().simple().to_string();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(format!("cart_{}", &suffix[..12])),
        email: Set(format!("cart-{suffix}@example.com")),
        password_hash: Set("not-a-real-hash".into()),
        first_name: Set("Test".into()),
        last_name: Set("Shopper".into()),
        phone: Set(format!("+91-{}", &suffix[..10])),
        role: Set("user".into()),
        email_verified: Set(true),
        phone_verified: Set(true),
        email_verification_token: Set(None),
        email_verification_expires_at: Set(None),
        phone_verification_code: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

/// Two variants of one product: 500 rupees with stock 10, 300 rupees
/// with stock 4.
async fn seed_variants(state: &AppState, created_by: Uuid) -> anyhow::Result<(Uuid, Uuid)> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Tees {}", Uuid::new_v4().simple())),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(category.id),
        name: Set("Classic Crew Tee".into()),
        description: Set("Plain cotton tee".into()),
        garment_type: Set("T-Shirt".into()),
        care: Set("Machine wash cold".into()),
        created_by: Set(created_by),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let deep_stock = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("M".into()),
        color: Set("Black".into()),
        fit: Set("Regular".into()),
        mrp: Set(dec!(500)),
        stock_quantity: Set(10),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let shallow_stock = VariantActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("L".into()),
        color: Set("White".into()),
        fit: Set("Regular".into()),
        mrp: Set(dec!(300)),
        stock_quantity: Set(4),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok((deep_stock.id, shallow_stock.id))
}

async fn add(
    state: &AppState,
    owner: CartOwner,
    product_variant_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    cart_service::add_item(
        state,
        owner,
        AddCartItemRequest {
            product_variant_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

async fn update(
    state: &AppState,
    owner: CartOwner,
    product_variant_id: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    cart_service::update_item(
        state,
        owner,
        UpdateCartItemRequest {
            product_variant_id,
            quantity,
        },
    )
    .await?;
    Ok(())
}

async fn view(state: &AppState, owner: CartOwner) -> anyhow::Result<CartView> {
    let response = cart_service::view_cart(state, owner).await?;
    Ok(response.data.expect("cart view"))
}
