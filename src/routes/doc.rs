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
        auth::{
            ForgotPasswordRequest, GuestSession, LoginRequest, LoginResponse, RegisterRequest,
            ResendVerificationRequest, ResetPasswordRequest, VerifyEmailRequest,
            VerifyPhoneRequest,
        },
        cart::{AddCartItemRequest, CartLine, CartView, UpdateCartItemRequest},
        categories::{CategoryList, CreateCategoryRequest},
        coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest},
        orders::{
            CancelItemsRequest, CancelOrderRequest, CancelOutcome, CheckoutRequest,
            CheckoutResponse, OrderList, OrderWithItems, ReturnItemRequest,
        },
        products::{
            CreateProductRequest, CreateVariantRequest, ProductList, ProductWithVariants,
            UpdateProductRequest,
        },
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        users::{ChangePasswordRequest, UpdateProfileRequest, UpsertAddressRequest},
        wishlist::{AddWishlistRequest, WishlistVariantList},
    },
    models::{
        Address, Category, Coupon, Order, OrderItem, Payment, Product, ProductVariant, Review,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, categories, coupons, health, orders, params,
        products as product_routes, reviews, users, wishlist,
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
        auth::register,
        auth::login,
        auth::logout,
        auth::guest_session,
        auth::verify_email,
        auth::verify_phone,
        auth::resend_email_verification,
        auth::resend_phone_code,
        auth::forgot_password,
        auth::reset_password,
        users::get_profile,
        users::update_profile,
        users::change_password,
        users::get_address,
        users::upsert_address,
        users::delete_address,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::delete_category,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        cart::view_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::cancel_order_items,
        orders::return_item,
        reviews::list_product_reviews,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        coupons::list_active_coupons,
        coupons::get_coupon_by_code,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::record_delivery_attempt,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            User,
            Address,
            Category,
            Product,
            ProductVariant,
            Order,
            OrderItem,
            Payment,
            Review,
            Coupon,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            GuestSession,
            VerifyEmailRequest,
            VerifyPhoneRequest,
            ResendVerificationRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateProfileRequest,
            ChangePasswordRequest,
            UpsertAddressRequest,
            CategoryList,
            CreateCategoryRequest,
            CreateProductRequest,
            CreateVariantRequest,
            UpdateProductRequest,
            ProductWithVariants,
            ProductList,
            AddCartItemRequest,
            UpdateCartItemRequest,
            CartLine,
            CartView,
            CheckoutRequest,
            CheckoutResponse,
            CancelOrderRequest,
            CancelItemsRequest,
            CancelOutcome,
            ReturnItemRequest,
            OrderList,
            OrderWithItems,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            CreateCouponRequest,
            UpdateCouponRequest,
            CouponList,
            AddWishlistRequest,
            WishlistVariantList,
            admin::UpdateOrderStatusRequest,
            admin::InventoryAdjustRequest,
            admin::LowStockQuery,
            admin::VariantList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartView>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication and verification endpoints"),
        (name = "Users", description = "Profile and address endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product and variant endpoints"),
        (name = "Cart", description = "Cart endpoints (users and guests)"),
        (name = "Orders", description = "Checkout, cancellation and return endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Coupons", description = "Coupon endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
