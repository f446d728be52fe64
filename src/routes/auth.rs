use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{
        ForgotPasswordRequest, GuestSession, LoginRequest, LoginResponse, RegisterRequest,
        ResendVerificationRequest, ResetPasswordRequest, VerifyEmailRequest, VerifyPhoneRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/guest", post(guest_session))
        .route("/verify-email", post(verify_email))
        .route("/verify-phone", post(verify_phone))
        .route("/resend-email-verification", post(resend_email_verification))
        .route("/resend-phone-code", post(resend_phone_code))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Register user", body = ApiResponse<User>),
        (status = 400, description = "Email or phone already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout user")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::logout_user(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/guest",
    responses(
        (status = 200, description = "Create a guest session", body = ApiResponse<GuestSession>)
    ),
    tag = "Auth"
)]
pub async fn guest_session(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<GuestSession>>> {
    let resp = auth_service::create_guest_session(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Verify email address"),
        (status = 400, description = "Token expired"),
        (status = 404, description = "Unknown token")
    ),
    tag = "Auth"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::verify_email(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-phone",
    request_body = VerifyPhoneRequest,
    responses(
        (status = 200, description = "Verify phone number"),
        (status = 400, description = "Invalid code")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn verify_phone(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPhoneRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::verify_phone(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-email-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Reissue email verification"),
        (status = 400, description = "Already verified"),
        (status = 404, description = "Unknown email")
    ),
    tag = "Auth"
)]
pub async fn resend_email_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::resend_email_verification(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-phone-code",
    responses(
        (status = 200, description = "Reissue phone verification code"),
        (status = 400, description = "Already verified")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn resend_phone_code(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::resend_phone_code(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Issue a password reset token")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Reset password with a token"),
        (status = 400, description = "Token expired"),
        (status = 404, description = "Unknown token")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}
