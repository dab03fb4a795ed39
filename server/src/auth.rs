use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::info;

use crate::errors::ServiceError;
use crate::model::{Account, Profile};
use crate::state::AppState;
use crate::token::BEARER_PREFIX;

const MISSING_TOKEN: &str = "Please provide a bearer token.";
const ACCOUNT_GONE: &str = "The account for this token no longer exists.";

/// The caller, resolved from `Authorization: Bearer <token>`.
///
/// The token only proves identity; account and profile are re-read from the
/// store so handlers never act on stale claims.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub account: Account,
    pub profile: Option<Profile>,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| value.starts_with(BEARER_PREFIX))
            .ok_or_else(|| {
                info!("No bearer token on request");
                ServiceError::unauthorized(MISSING_TOKEN)
            })?;

        let claims = state.tokens.verify(header)?;

        let (account, profile) = state
            .store
            .account_with_profile(claims.account.id)
            .await?
            .ok_or_else(|| {
                info!("Token presented for deleted account {}", claims.account.id);
                ServiceError::unauthorized(ACCOUNT_GONE)
            })?;

        Ok(AuthAccount { account, profile })
    }
}
