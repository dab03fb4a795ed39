use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::WrapErr as _;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::model::AccountView;
use crate::state::TokenConfig;
use crate::store::CredentialStore;

/// Session tokens are valid for one hour from issuance
pub const TOKEN_VALIDITY_SECS: i64 = 60 * 60;

pub const BEARER_PREFIX: &str = "Bearer ";

const INVALID_TOKEN: &str = "The provided token is invalid or has expired.";

/// Signed claims: a snapshot of the account and its profile at issue time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub account: AccountView,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed session token, rendered with its `Bearer ` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// The bare JWT without the prefix
    pub fn jwt(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BEARER_PREFIX, self.0)
    }
}

impl Serialize for BearerToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Signs session tokens from a fresh read of the credential store
#[derive(Clone)]
pub struct TokenIssuer {
    config: TokenConfig,
    store: Arc<dyn CredentialStore>,
}

impl TokenIssuer {
    pub fn new(config: TokenConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self { config, store }
    }

    /// Issues a token for the account as it exists in storage right now.
    ///
    /// Returns `None` when the account does not exist; callers must treat that as a failure.
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, account_id: Uuid) -> ServiceResult<Option<BearerToken>> {
        let Some((account, profile)) = self.store.account_with_profile(account_id).await? else {
            warn!("Refusing to issue a token for missing account {}", account_id);
            return Ok(None);
        };

        let now = Utc::now().timestamp();
        let claims = Claims {
            account: AccountView::new(&account, profile),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + TOKEN_VALIDITY_SECS,
        };

        let jwt = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .wrap_err("Failed to sign session token")?;

        debug!("Issued session token for account {}", account_id);
        Ok(Some(BearerToken(jwt)))
    }

    /// Checks signature, expiry and issuer. Accepts the token with or without its prefix.
    pub fn verify(&self, token: &str) -> ServiceResult<Claims> {
        let jwt = token.trim();
        let jwt = jwt.strip_prefix(BEARER_PREFIX).unwrap_or(jwt).trim();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.leeway = 0;

        decode::<Claims>(
            jwt,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            debug!("Rejected session token: {}", err);
            ServiceError::unauthorized(INVALID_TOKEN)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewAccount;
    use crate::store::MemoryStore;

    fn config(secret: &str, issuer: &str) -> TokenConfig {
        TokenConfig {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
        }
    }

    async fn seeded() -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let account = store
            .insert_account(NewAccount {
                email: "a@x.com".into(),
                password_hash: "$argon2id$stub".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            })
            .await
            .unwrap();
        (store, account.id)
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let (store, id) = seeded().await;
        let issuer = TokenIssuer::new(config("secret", "devhub"), store);

        let token = issuer.issue(id).await.unwrap().unwrap();
        assert!(token.to_string().starts_with("Bearer "));

        let claims = issuer.verify(&token.to_string()).unwrap();
        assert_eq!(claims.account.id, id);
        assert_eq!(claims.account.email, "a@x.com");
        assert_eq!(claims.account.first_name, "Ada");
        assert!(claims.account.profile.is_none());
        assert_eq!(claims.iss, "devhub");
        assert_eq!(claims.exp - claims.iat, TOKEN_VALIDITY_SECS);

        // The bare JWT is accepted too
        assert!(issuer.verify(token.jwt()).is_ok());
    }

    #[tokio::test]
    async fn test_missing_account_yields_no_token() {
        let (store, _) = seeded().await;
        let issuer = TokenIssuer::new(config("secret", "devhub"), store);

        assert!(issuer.issue(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claims_reflect_current_storage() {
        let (store, id) = seeded().await;
        let issuer = TokenIssuer::new(config("secret", "devhub"), store.clone());

        let mut account = store.account_by_id(id).await.unwrap().unwrap();
        account.first_name = "Augusta".into();
        store.save_account(&account, None).await.unwrap();

        let token = issuer.issue(id).await.unwrap().unwrap();
        let claims = issuer.verify(token.jwt()).unwrap();
        assert_eq!(claims.account.first_name, "Augusta");
    }

    #[tokio::test]
    async fn test_rejects_foreign_secret_and_issuer() {
        let (store, id) = seeded().await;
        let ours = TokenIssuer::new(config("secret", "devhub"), store.clone());
        let other_secret = TokenIssuer::new(config("not-the-secret", "devhub"), store.clone());
        let other_issuer = TokenIssuer::new(config("secret", "someone-else"), store);

        let token = ours.issue(id).await.unwrap().unwrap();

        assert!(matches!(
            other_secret.verify(token.jwt()),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            other_issuer.verify(token.jwt()),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_expired_token() {
        let (store, id) = seeded().await;
        let issuer = TokenIssuer::new(config("secret", "devhub"), store.clone());
        let (account, profile) = store.account_with_profile(id).await.unwrap().unwrap();

        let issued_at = Utc::now().timestamp() - 2 * TOKEN_VALIDITY_SECS;
        let stale = Claims {
            account: AccountView::new(&account, profile),
            iss: "devhub".into(),
            iat: issued_at,
            exp: issued_at + TOKEN_VALIDITY_SECS,
        };
        let jwt = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            issuer.verify(&jwt),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_garbage_is_unauthorized() {
        let issuer = TokenIssuer::new(config("secret", "devhub"), Arc::new(MemoryStore::new()));

        assert!(issuer.verify("Bearer not.a.jwt").is_err());
        assert!(issuer.verify("").is_err());
    }
}
