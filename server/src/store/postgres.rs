use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{
    CredentialStore, ACCOUNT_NOT_FOUND, EMAIL_IN_USE, HANDLE_TAKEN, PROFILE_EXISTS,
    PROFILE_NOT_FOUND,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::model::{
    Account, FollowState, NewAccount, NewProfile, Profile, ProfileInput, ProfileLinks,
};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    handle: String,
    profile_picture: Option<String>,
    website: Option<String>,
    github: Option<String>,
    linkedin: Option<String>,
    dev: Option<String>,
    stackoverflow: Option<String>,
    biography: String,
}

/// Credential store backed by Postgres. Multi-record writes run in one transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates constraint violations into the caller-facing taxonomy
fn map_db_error(err: sqlx::Error) -> ServiceError {
    let mapped = err.as_database_error().and_then(|db_err| {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("accounts_email_key") => Some(ServiceError::conflict(EMAIL_IN_USE)),
                Some("profiles_handle_key") => Some(ServiceError::conflict(HANDLE_TAKEN)),
                Some("profiles_pkey") => Some(ServiceError::conflict(PROFILE_EXISTS)),
                _ => None,
            }
        } else if db_err.is_foreign_key_violation() {
            Some(ServiceError::not_found(PROFILE_NOT_FOUND))
        } else {
            None
        }
    });

    mapped.unwrap_or_else(|| ServiceError::from(err))
}

async fn load_profile(conn: &mut PgConnection, id: Uuid) -> ServiceResult<Option<Profile>> {
    let row = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT id, handle, profile_picture, website, github, linkedin, dev, stackoverflow, biography
        FROM profiles WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let followers = sqlx::query_scalar::<_, Uuid>(
        "SELECT follower_id FROM follows WHERE profile_id = $1 ORDER BY created_at, follower_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let following = sqlx::query_scalar::<_, Uuid>(
        "SELECT profile_id FROM follows WHERE follower_id = $1 ORDER BY created_at, profile_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Profile {
        id: row.id,
        handle: row.handle,
        owner: row.id,
        links: ProfileLinks {
            profile_picture: row.profile_picture,
            website: row.website,
            github: row.github,
            linkedin: row.linkedin,
            dev: row.dev,
            stackoverflow: row.stackoverflow,
        },
        biography: row.biography,
        followers,
        following,
    }))
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn account_by_id(&self, id: Uuid) -> ServiceResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account_by_email(&self, email: &str) -> ServiceResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn account_with_profile(
        &self,
        id: Uuid,
    ) -> ServiceResult<Option<(Account, Option<Profile>)>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match account {
            Some(account) => {
                let profile = load_profile(&mut *tx, id).await?;
                Some((account, profile))
            }
            None => None,
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn insert_account(&self, account: NewAccount) -> ServiceResult<Account> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        info!("Created new account with ID: {}", account.id);

        Ok(account)
    }

    async fn save_account(&self, account: &Account, handle: Option<&str>) -> ServiceResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET email = $1, password_hash = $2, first_name = $3, last_name = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        if let Some(handle) = handle {
            sqlx::query("UPDATE profiles SET handle = $1, updated_at = NOW() WHERE id = $2")
                .bind(handle)
                .bind(account.id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        tx.commit().await?;

        info!("Updated account {}", account.id);
        Ok(true)
    }

    async fn delete_account(&self, id: Uuid) -> ServiceResult<bool> {
        // Profiles and follow edges go with it through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            info!("Deleted account {}", id);
        }

        Ok(deleted > 0)
    }

    async fn profile_by_id(&self, id: Uuid) -> ServiceResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;
        load_profile(&mut *conn, id).await
    }

    async fn profile_by_handle(&self, handle: &str) -> ServiceResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;

        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE handle = $1")
            .bind(handle)
            .fetch_optional(&mut *conn)
            .await?;

        match id {
            Some(id) => load_profile(&mut *conn, id).await,
            None => Ok(None),
        }
    }

    async fn insert_profile(&self, profile: NewProfile) -> ServiceResult<Profile> {
        let mut tx = self.pool.begin().await?;
        let links = &profile.input.links;

        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, handle, profile_picture, website, github, linkedin, dev, stackoverflow, biography
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.owner)
        .bind(&profile.handle)
        .bind(links.profile_picture.as_deref())
        .bind(links.website.as_deref())
        .bind(links.github.as_deref())
        .bind(links.linkedin.as_deref())
        .bind(links.dev.as_deref())
        .bind(links.stackoverflow.as_deref())
        .bind(&profile.input.biography)
        .execute(&mut *tx)
        .await
        .map_err(|err| match map_db_error(err) {
            ServiceError::NotFound(_) => ServiceError::not_found(ACCOUNT_NOT_FOUND),
            other => other,
        })?;

        let created = load_profile(&mut *tx, profile.owner)
            .await?
            .ok_or_else(|| ServiceError::not_found(PROFILE_NOT_FOUND))?;

        tx.commit().await?;

        info!(
            "Created profile {} for account {}",
            created.handle, profile.owner
        );
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        handle: &str,
        input: &ProfileInput,
    ) -> ServiceResult<Option<Profile>> {
        let mut tx = self.pool.begin().await?;
        let links = &input.links;

        let updated = sqlx::query(
            r#"
            UPDATE profiles
            SET handle = $1, profile_picture = $2, website = $3, github = $4, linkedin = $5,
                dev = $6, stackoverflow = $7, biography = $8, updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(handle)
        .bind(links.profile_picture.as_deref())
        .bind(links.website.as_deref())
        .bind(links.github.as_deref())
        .bind(links.linkedin.as_deref())
        .bind(links.dev.as_deref())
        .bind(links.stackoverflow.as_deref())
        .bind(&input.biography)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if updated == 0 {
            return Ok(None);
        }

        let profile = load_profile(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(profile)
    }

    async fn toggle_follow(&self, follower: Uuid, profile: Uuid) -> ServiceResult<FollowState> {
        let mut tx = self.pool.begin().await?;

        // Concurrent toggles of the same target queue on this row lock, so each
        // one sees the edge the previous one committed
        let target =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM profiles WHERE id = $1 FOR UPDATE")
                .bind(profile)
                .fetch_optional(&mut *tx)
                .await?;

        if target.is_none() {
            return Err(ServiceError::not_found(PROFILE_NOT_FOUND));
        }

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND profile_id = $2")
            .bind(follower)
            .bind(profile)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let state = if removed > 0 {
            FollowState::NotFollowing
        } else {
            // The profile is locked, so the only foreign key left to fail is the follower's
            sqlx::query("INSERT INTO follows (follower_id, profile_id) VALUES ($1, $2)")
                .bind(follower)
                .bind(profile)
                .execute(&mut *tx)
                .await
                .map_err(|err| match map_db_error(err) {
                    ServiceError::NotFound(_) => ServiceError::not_found(ACCOUNT_NOT_FOUND),
                    other => other,
                })?;

            FollowState::Following
        };

        tx.commit().await?;

        info!(
            "Account {} is now {:?} profile {}",
            follower, state, profile
        );
        Ok(state)
    }

    async fn delete_profile(&self, id: Uuid) -> ServiceResult<bool> {
        // Edges pointing at this profile are removed by ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            info!("Deleted profile {}", id);
        }

        Ok(deleted > 0)
    }
}
