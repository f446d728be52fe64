use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CancelItemsRequest, CancelOrderRequest, CancelOutcome, CheckoutRequest, CheckoutResponse,
        OrderList, OrderWithItems, ReturnItemRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderItem,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/cancel-items", post(cancel_order_items))
        .route("/{id}/return", post(return_item))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "List own orders", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Place an order from the cart", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart or insufficient stock"),
        (status = 401, description = "Unverified email or phone"),
        (status = 502, description = "Payment gateway failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Get own order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Cancel the whole order", body = ApiResponse<CancelOutcome>),
        (status = 400, description = "Already cancelled or missing reason"),
        (status = 404, description = "Not Found"),
        (status = 502, description = "Refund failed; order left unchanged"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<ApiResponse<CancelOutcome>>> {
    let resp = order_service::cancel_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel-items",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = CancelItemsRequest,
    responses(
        (status = 200, description = "Cancel selected items", body = ApiResponse<CancelOutcome>),
        (status = 404, description = "Order or items not found; nothing is changed"),
        (status = 502, description = "Refund failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order_items(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelItemsRequest>,
) -> AppResult<Json<ApiResponse<CancelOutcome>>> {
    let resp = order_service::cancel_order_items(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/return",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = ReturnItemRequest,
    responses(
        (status = 200, description = "Return a delivered item", body = ApiResponse<OrderItem>),
        (status = 400, description = "Missing refund details"),
        (status = 404, description = "Item not found or outside the return window"),
        (status = 502, description = "Refund failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn return_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_service::return_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
