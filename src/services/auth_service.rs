use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use rand::Rng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::dto::auth::{
    Claims, ForgotPasswordRequest, GuestSession, LoginRequest, LoginResponse, RegisterRequest,
    ResendVerificationRequest, ResetPasswordRequest, VerifyEmailRequest, VerifyPhoneRequest,
};
use crate::{
    audit::log_audit,
    entity::{
        guests::ActiveModel as GuestActive,
        users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::cart_service,
    state::AppState,
};

const EMAIL_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        password,
        first_name,
        last_name,
        phone,
        guest_id,
    } = payload;

    if email.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email is required".into()));
    }
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }
    if phone.trim().is_empty() {
        return Err(AppError::Validation("Phone number is required".into()));
    }

    let taken = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(email.as_str()))
                .add(UserCol::Phone.eq(phone.as_str())),
        )
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(
            "Email or phone is already registered".into(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let username = generate_username(state, &email).await?;
    let email_token = Uuid::new_v4().to_string();
    let phone_code = generate_phone_code();
    let now = Utc::now();

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        first_name: Set(first_name),
        last_name: Set(last_name),
        phone: Set(phone),
        role: Set("user".to_string()),
        email_verified: Set(false),
        phone_verified: Set(false),
        email_verification_token: Set(Some(email_token.clone())),
        email_verification_expires_at: Set(Some(
            (now + Duration::hours(EMAIL_TOKEN_TTL_HOURS)).into(),
        )),
        phone_verification_code: Set(Some(phone_code.clone())),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Delivery channels are out of process; the token and code are
    // surfaced through logs for now.
    tracing::info!(user_id = %user.id, %email_token, %phone_code, "verification issued");

    if let Some(guest_id) = guest_id {
        cart_service::merge_guest_cart(state, user.id, guest_id).await?;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("User created", user.into(), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest {
        email,
        password,
        guest_id,
    } = payload;

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = issue_jwt(&user)?;

    if let Some(guest_id) = guest_id {
        cart_service::merge_guest_cart(state, user.id, guest_id).await?;
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {token}"),
        },
        Some(Meta::empty()),
    ))
}

/// Tokens are stateless, so logout is an audit event only; clients drop
/// the token.
pub async fn logout_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<()>> {
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "user_logout",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success("Logged out", (), Some(Meta::empty())))
}

pub async fn create_guest_session(state: &AppState) -> AppResult<ApiResponse<GuestSession>> {
    let guest = GuestActive {
        id: Set(Uuid::new_v4()),
        token: Set(Uuid::new_v4().to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Guest session created",
        GuestSession {
            guest_id: guest.id,
            token: guest.token,
        },
        Some(Meta::empty()),
    ))
}

pub async fn verify_email(
    state: &AppState,
    payload: VerifyEmailRequest,
) -> AppResult<ApiResponse<()>> {
    let user = Users::find()
        .filter(UserCol::EmailVerificationToken.eq(payload.token.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid verification token".into()))?;

    let expires_at = user
        .email_verification_expires_at
        .ok_or_else(|| AppError::Validation("Verification token has expired".into()))?;
    if expires_at.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::Validation("Verification token has expired".into()));
    }

    let mut active: UserActive = user.into();
    active.email_verified = Set(true);
    active.email_verification_token = Set(None);
    active.email_verification_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    Ok(ApiResponse::success("Email verified", (), Some(Meta::empty())))
}

pub async fn verify_phone(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyPhoneRequest,
) -> AppResult<ApiResponse<()>> {
    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    match &record.phone_verification_code {
        Some(code) if *code == payload.code => {}
        _ => return Err(AppError::Validation("Invalid verification code".into())),
    }

    let mut active: UserActive = record.into();
    active.phone_verified = Set(true);
    active.phone_verification_code = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    Ok(ApiResponse::success("Phone verified", (), Some(Meta::empty())))
}

pub async fn resend_email_verification(
    state: &AppState,
    payload: ResendVerificationRequest,
) -> AppResult<ApiResponse<()>> {
    let user = Users::find()
        .filter(UserCol::Email.eq(payload.email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.email_verified {
        return Err(AppError::Conflict("Email is already verified".into()));
    }

    let email_token = Uuid::new_v4().to_string();
    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.email_verification_token = Set(Some(email_token.clone()));
    active.email_verification_expires_at =
        Set(Some((Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS)).into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(%user_id, %email_token, "email verification reissued");

    Ok(ApiResponse::success(
        "Verification email sent",
        (),
        Some(Meta::empty()),
    ))
}

pub async fn resend_phone_code(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<()>> {
    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if record.phone_verified {
        return Err(AppError::Conflict("Phone is already verified".into()));
    }

    let phone_code = generate_phone_code();
    let user_id = record.id;
    let mut active: UserActive = record.into();
    active.phone_verification_code = Set(Some(phone_code.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(%user_id, %phone_code, "phone verification reissued");

    Ok(ApiResponse::success(
        "Verification code sent",
        (),
        Some(Meta::empty()),
    ))
}

/// Always answers the same way so the endpoint cannot be used to probe
/// which emails exist.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<()>> {
    if let Some(user) = Users::find()
        .filter(UserCol::Email.eq(payload.email.as_str()))
        .one(&state.orm)
        .await?
    {
        let reset_token = Uuid::new_v4().to_string();
        let user_id = user.id;
        let mut active: UserActive = user.into();
        active.reset_token = Set(Some(reset_token.clone()));
        active.reset_token_expires_at =
            Set(Some((Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS)).into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        tracing::info!(%user_id, %reset_token, "password reset issued");
    }

    Ok(ApiResponse::success(
        "If that account exists, a reset link has been sent",
        (),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<()>> {
    if payload.new_password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let user = Users::find()
        .filter(UserCol::ResetToken.eq(payload.token.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid reset token".into()))?;

    let expires_at = user
        .reset_token_expires_at
        .ok_or_else(|| AppError::Validation("Reset token has expired".into()))?;
    if expires_at.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::Validation("Reset token has expired".into()));
    }

    let password_hash = hash_password(&payload.new_password)?;
    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(password_hash);
    active.reset_token = Set(None);
    active.reset_token_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user_id),
        "password_reset",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Password updated",
        (),
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string())
}

fn issue_jwt(user: &users::Model) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Usernames come from the email local part plus a numeric suffix on
/// collision.
async fn generate_username(state: &AppState, email: &str) -> AppResult<String> {
    let base: String = email
        .split('@')
        .next()
        .unwrap_or("user")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let base = if base.is_empty() { "user".to_string() } else { base };

    let existing = Users::find()
        .filter(UserCol::Username.eq(base.as_str()))
        .one(&state.orm)
        .await?;
    if existing.is_none() {
        return Ok(base);
    }

    for _ in 0..5 {
        let candidate = format!("{base}{}", rand::thread_rng().gen_range(1000..10000));
        let taken = Users::find()
            .filter(UserCol::Username.eq(candidate.as_str()))
            .one(&state.orm)
            .await?;
        if taken.is_none() {
            return Ok(candidate);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a username"
    )))
}

fn generate_phone_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[cfg(test)]
mod tests {
    use super::generate_phone_code;

    #[test]
    fn phone_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_phone_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
