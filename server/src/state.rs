use std::env;
use std::sync::Arc;

use color_eyre::eyre::eyre;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::accounts::AccountManager;
use crate::profiles::ProfileManager;
use crate::store::{CredentialStore, MemoryStore, PgStore};
use crate::token::TokenIssuer;

pub const DEFAULT_ISSUER: &str = "devhub";

/// Signing configuration for session tokens
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
}

impl TokenConfig {
    pub fn from_env() -> color_eyre::Result<Self> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| eyre!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            return Err(eyre!("JWT_SECRET must not be empty"));
        }

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());

        Ok(Self { secret, issuer })
    }
}

/// Whether an account may follow its own profile.
///
/// Only ever relaxed in test environments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowPolicy {
    pub allow_self_follow: bool,
}

impl FollowPolicy {
    pub fn strict() -> Self {
        Self {
            allow_self_follow: false,
        }
    }

    pub fn test_mode() -> Self {
        Self {
            allow_self_follow: true,
        }
    }

    pub fn from_env() -> Self {
        Self::for_environment(env::var("APP_ENV").ok().as_deref())
    }

    fn for_environment(app_env: Option<&str>) -> Self {
        match app_env {
            Some("test") => Self::test_mode(),
            _ => Self::strict(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub tokens: TokenIssuer,
    pub accounts: AccountManager,
    pub profiles: ProfileManager,
}

impl AppState {
    pub fn new(store: Arc<dyn CredentialStore>, token: TokenConfig, policy: FollowPolicy) -> Self {
        let tokens = TokenIssuer::new(token, store.clone());

        Self {
            accounts: AccountManager::new(store.clone(), tokens.clone()),
            profiles: ProfileManager::new(store.clone(), tokens.clone(), policy),
            tokens,
            store,
        }
    }

    pub async fn from_env() -> color_eyre::Result<Self> {
        let token = TokenConfig::from_env()?;
        let policy = FollowPolicy::from_env();

        if policy.allow_self_follow {
            warn!("APP_ENV=test: accounts may follow their own profile");
        }

        let store: Arc<dyn CredentialStore> = match env::var("DATABASE_URL") {
            Ok(database_url) => Arc::new(PgStore::new(setup_db_pool(&database_url).await?)),
            Err(_) => {
                warn!("DATABASE_URL not set, using the in-memory store. Data will not persist.");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::new(store, token, policy))
    }
}

#[tracing::instrument(err, skip(database_url))]
pub async fn setup_db_pool(database_url: &str) -> color_eyre::Result<PgPool> {
    const MIGRATION_LOCK_ID: i64 = 0xDE_5B_DE_5B;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&pool)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let unlocked: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&pool)
        .await?;

    if unlocked {
        info!("Migration lock unlocked");
    } else {
        warn!("Failed to unlock migration lock");
    }

    Ok(pool)
}
