/// Account endpoints
///
/// Signup, the two halves of the password-reset flow, and the active-user
/// binding:
///
/// - `POST /account` - Register a new account
/// - `DELETE /account/password?email=…` - Request a password reset
/// - `POST /account/password` - Consume a reset token, set a new password
/// - `PUT /account/subscription/:id` - Bind the account's active user
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use saasbase_shared::{
    auth::{context::Principal, jwt, password},
    events::DomainEvent,
    models::Account,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// Email address, the login identity
    #[validate(email(message = "invalidEmail"))]
    pub email: String,

    /// Plaintext password, hashed before persistence
    #[validate(length(min = 8, message = "passwordTooShort"))]
    pub plain_password: String,
}

/// Token response
///
/// Returned after signup and after a completed password reset.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token (24h)
    pub token: String,
}

/// Reset-request query parameters
#[derive(Debug, Deserialize)]
pub struct ResetRequestQuery {
    /// Email of the account to reset
    pub email: String,
}

/// Reset-confirmation request
///
/// Both fields default to empty when absent: a missing token must reach
/// the reset core and fail there, not in request deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResetRequest {
    /// The token delivered to the account's email
    #[serde(default)]
    pub confirmation_token: String,

    /// The new plaintext password
    #[serde(default)]
    pub plain_password: String,
}

/// Converts a Rust field name to the wire's camelCase convention
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Maps validator failures into the field-error response shape
///
/// Field names are reported in camelCase, matching the request bodies.
fn validation_errors(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: camel_case(field),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "invalid".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /account
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "plainPassword": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or email already registered
/// - `500 Internal Server Error`: Server error
pub async fn create_account(
    State(state): State<AppState>,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate().map_err(validation_errors)?;

    if state.manager.account_by_email(&req.email).await?.is_some() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "email".to_string(),
            message: "emailAlreadyUsed".to_string(),
        }]));
    }

    let mut account = state.manager.create();
    account.email = req.email;
    account.password_hash = password::hash_password(&req.plain_password)?;
    state.manager.update(&mut account, None, true).await?;

    let account_id = account
        .id
        .ok_or_else(|| ApiError::InternalError("account not assigned an id".to_string()))?;

    state.events.publish(DomainEvent::AccountCreated {
        account_id,
        email: account.email.clone(),
    });

    let token = jwt::create_token(&jwt::Claims::new(account_id), state.jwt_secret())?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Request a password reset
///
/// Issues a fresh confirmation token for the account behind `email` and
/// announces it on the event bus for delivery. Rejected while a previous
/// request is still inside the cooldown window.
///
/// # Endpoint
///
/// ```text
/// DELETE /account/password?email=user@example.com
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `notEnoughTimeAgo` - cooldown not elapsed
/// - `404 Not Found`: `accountNotFound` - no account for that email
pub async fn request_password_reset(
    State(state): State<AppState>,
    Query(query): Query<ResetRequestQuery>,
) -> ApiResult<StatusCode> {
    state.reset.request(&query.email, Utc::now()).await?;
    Ok(StatusCode::CREATED)
}

/// Consume a reset token and set a new password
///
/// # Endpoint
///
/// ```text
/// POST /account/password
/// Content-Type: application/json
///
/// {
///   "confirmationToken": "a6F...",
///   "plainPassword": "NewSecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `noConfirmationToken` or new-password validation
/// - `404 Not Found`: `noValidConfirmationToken` - token matches no account
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<ConfirmResetRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let account = state
        .reset
        .consume(&req.confirmation_token, &req.plain_password)
        .await?;

    let account_id = account
        .id
        .ok_or_else(|| ApiError::InternalError("account not assigned an id".to_string()))?;

    let token = jwt::create_token(&jwt::Claims::new(account_id), state.jwt_secret())?;

    Ok(Json(TokenResponse { token }))
}

/// Bind the account's active user from a subscription
///
/// The user must belong to the requested subscription and carry the same
/// email as the authenticated account; anything else is rejected.
///
/// # Endpoint
///
/// ```text
/// PUT /account/subscription/{subscriptionId}
/// Authorization: Bearer eyJ...
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `invalidSubscriptionBinding` - no matching user
/// - `401 Unauthorized`: missing or invalid bearer token
pub async fn bind_subscription_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(subscription_id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    let account = state
        .binding
        .bind_active_user(Some(&principal), subscription_id)
        .await?;

    Ok(Json(account))
}
