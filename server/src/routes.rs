use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::{
    accounts::{AccountChanges, EditedAccount},
    auth::AuthAccount,
    errors::{ServiceError, ServiceResult},
    model::{AccountView, Deleted, ProfileInput, PublicProfile},
    profiles::{FollowOutcome, ProfileTarget, ProfileWithToken},
    state::AppState,
    token::BearerToken,
    validation::{validate_profile_input, EditAccountRequest, LoginRequest, RegisterRequest},
};

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        // Accounts
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(current_account))
        .route("/api/auth/token", get(reissue_token))
        .route("/api/auth", put(edit_account).delete(delete_account))
        // Profiles
        .route(
            "/api/profile",
            post(create_profile).put(edit_profile).delete(delete_profile),
        )
        .route("/api/profile/follow/:target", post(follow_profile))
        .route("/api/profile/:handle", get(get_profile))
        .fallback(unknown_route)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(sentry_tower::SentryHttpLayer::with_transaction())
        .layer(sentry_tower::NewSentryLayer::<Request>::new_from_top())
        .with_state(app_state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    logged_in: bool,
    token: BearerToken,
}

/// Malformed JSON is reported in the same `{status, message}` shape as every other failure
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ServiceResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ServiceError::Validation(vec![rejection.body_text()]))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServiceResult<Json<AccountView>> {
    let body = json_body(payload)?;
    body.validate()?;

    let account = state
        .accounts
        .register(&body.email, &body.first_name, &body.last_name, &body.password)
        .await?;

    Ok(Json(account))
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ServiceResult<Json<LoginResponse>> {
    let body = json_body(payload)?;
    body.validate()?;

    let token = state
        .accounts
        .authenticate(&body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        logged_in: true,
        token,
    }))
}

async fn current_account(State(state): State<AppState>, auth: AuthAccount) -> Json<AccountView> {
    Json(state.accounts.current(&auth.account, auth.profile))
}

async fn reissue_token(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ServiceResult<Json<LoginResponse>> {
    let token = state
        .accounts
        .issue_token_for_external_identity(auth.account.id)
        .await?;

    Ok(Json(LoginResponse {
        logged_in: true,
        token,
    }))
}

async fn edit_account(
    State(state): State<AppState>,
    auth: AuthAccount,
    payload: Result<Json<EditAccountRequest>, JsonRejection>,
) -> ServiceResult<Json<EditedAccount>> {
    let body = json_body(payload)?;
    body.validate()?;

    let changes = AccountChanges {
        password: body.new_password().map(str::to_string),
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
    };

    Ok(Json(state.accounts.edit(auth.account.id, changes).await?))
}

async fn delete_account(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ServiceResult<Json<Deleted>> {
    Ok(Json(state.accounts.delete(auth.account.id).await?))
}

async fn create_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> ServiceResult<Json<ProfileWithToken>> {
    let input = validate_profile_input(json_body(payload)?)?;

    Ok(Json(state.profiles.create(auth.account.id, input).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> ServiceResult<Json<PublicProfile>> {
    Ok(Json(state.profiles.get_by_handle(&handle).await?))
}

async fn edit_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> ServiceResult<Json<ProfileWithToken>> {
    let input = validate_profile_input(json_body(payload)?)?;

    Ok(Json(state.profiles.edit(auth.account.id, input).await?))
}

async fn follow_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(target): Path<String>,
) -> ServiceResult<Json<FollowOutcome>> {
    let outcome = state
        .profiles
        .follow(auth.account.id, ProfileTarget::parse(&target))
        .await?;

    Ok(Json(outcome))
}

async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ServiceResult<Json<Deleted>> {
    Ok(Json(state.profiles.delete(auth.account.id).await?))
}

async fn unknown_route() -> ServiceError {
    ServiceError::not_found("This route does not exist.")
}
