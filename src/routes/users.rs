use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::users::{ChangePasswordRequest, UpdateProfileRequest, UpsertAddressRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Address, User},
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/password", post(change_password))
        .route(
            "/me/address",
            get(get_address).put(upsert_address).delete(delete_address),
        )
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Get own profile", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_profile(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Update own profile", body = ApiResponse<User>),
        (status = 400, description = "Empty field")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_profile(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Change password"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = user_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/me/address",
    responses(
        (status = 200, description = "Get delivery address", body = ApiResponse<Address>),
        (status = 404, description = "No address saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_address(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = user_service::get_address(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me/address",
    request_body = UpsertAddressRequest,
    responses(
        (status = 200, description = "Create or replace delivery address", body = ApiResponse<Address>),
        (status = 400, description = "Empty field")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn upsert_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpsertAddressRequest>,
) -> AppResult<Json<ApiResponse<Address>>> {
    let resp = user_service::upsert_address(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/me/address",
    responses(
        (status = 200, description = "Delete delivery address"),
        (status = 404, description = "No address saved")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = user_service::delete_address(&state, &user).await?;
    Ok(Json(resp))
}
