use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CredentialStore, ACCOUNT_NOT_FOUND, EMAIL_IN_USE, HANDLE_TAKEN, PROFILE_EXISTS,
    PROFILE_NOT_FOUND,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::model::{Account, FollowState, NewAccount, NewProfile, Profile, ProfileInput};

#[derive(Debug, Clone)]
struct StoredProfile {
    handle: String,
    input: ProfileInput,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    profiles: HashMap<Uuid, StoredProfile>,
    /// `(follower account, followed profile)` in insertion order
    follows: Vec<(Uuid, Uuid)>,
}

impl Tables {
    fn profile(&self, id: Uuid) -> Option<Profile> {
        let stored = self.profiles.get(&id)?;

        Some(Profile {
            id,
            handle: stored.handle.clone(),
            owner: id,
            links: stored.input.links.clone(),
            biography: stored.input.biography.clone(),
            followers: self
                .follows
                .iter()
                .filter(|(_, profile)| *profile == id)
                .map(|(follower, _)| *follower)
                .collect(),
            following: self
                .follows
                .iter()
                .filter(|(follower, _)| *follower == id)
                .map(|(_, profile)| *profile)
                .collect(),
        })
    }

    fn handle_taken_by_other(&self, handle: &str, owner: Uuid) -> bool {
        self.profiles
            .iter()
            .any(|(id, p)| *id != owner && p.handle == handle)
    }

    fn email_taken_by_other(&self, email: &str, owner: Option<Uuid>) -> bool {
        self.accounts
            .values()
            .any(|a| Some(a.id) != owner && a.email == email)
    }
}

/// A process-local store, used when no database is configured and in tests.
///
/// Every operation holds the single table lock for its whole duration, which
/// makes each multi-record mutation atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn account_by_id(&self, id: Uuid) -> ServiceResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> ServiceResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn account_with_profile(
        &self,
        id: Uuid,
    ) -> ServiceResult<Option<(Account, Option<Profile>)>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .get(&id)
            .map(|account| (account.clone(), tables.profile(id))))
    }

    async fn insert_account(&self, account: NewAccount) -> ServiceResult<Account> {
        let mut tables = self.tables.write().await;

        if tables.email_taken_by_other(&account.email, None) {
            return Err(ServiceError::conflict(EMAIL_IN_USE));
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            created_at: Utc::now(),
        };
        tables.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn save_account(&self, account: &Account, handle: Option<&str>) -> ServiceResult<bool> {
        let mut tables = self.tables.write().await;

        if !tables.accounts.contains_key(&account.id) {
            return Ok(false);
        }
        if tables.email_taken_by_other(&account.email, Some(account.id)) {
            return Err(ServiceError::conflict(EMAIL_IN_USE));
        }
        if let Some(handle) = handle {
            if tables.profiles.contains_key(&account.id)
                && tables.handle_taken_by_other(handle, account.id)
            {
                return Err(ServiceError::conflict(HANDLE_TAKEN));
            }
        }

        // All checks passed, nothing below can fail
        if let (Some(handle), Some(profile)) = (handle, tables.profiles.get_mut(&account.id)) {
            profile.handle = handle.to_string();
        }
        tables.accounts.insert(account.id, account.clone());

        Ok(true)
    }

    async fn delete_account(&self, id: Uuid) -> ServiceResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.accounts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.profiles.remove(&id);
        tables
            .follows
            .retain(|(follower, profile)| *follower != id && *profile != id);

        Ok(true)
    }

    async fn profile_by_id(&self, id: Uuid) -> ServiceResult<Option<Profile>> {
        Ok(self.tables.read().await.profile(id))
    }

    async fn profile_by_handle(&self, handle: &str) -> ServiceResult<Option<Profile>> {
        let tables = self.tables.read().await;
        let id = tables
            .profiles
            .iter()
            .find(|(_, p)| p.handle == handle)
            .map(|(id, _)| *id);

        Ok(id.and_then(|id| tables.profile(id)))
    }

    async fn insert_profile(&self, profile: NewProfile) -> ServiceResult<Profile> {
        let mut tables = self.tables.write().await;

        if !tables.accounts.contains_key(&profile.owner) {
            return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
        }
        if tables.profiles.contains_key(&profile.owner) {
            return Err(ServiceError::conflict(PROFILE_EXISTS));
        }
        if tables.handle_taken_by_other(&profile.handle, profile.owner) {
            return Err(ServiceError::conflict(HANDLE_TAKEN));
        }

        tables.profiles.insert(
            profile.owner,
            StoredProfile {
                handle: profile.handle,
                input: profile.input,
            },
        );

        tables
            .profile(profile.owner)
            .ok_or_else(|| ServiceError::not_found(PROFILE_NOT_FOUND))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        handle: &str,
        input: &ProfileInput,
    ) -> ServiceResult<Option<Profile>> {
        let mut tables = self.tables.write().await;

        if !tables.profiles.contains_key(&id) {
            return Ok(None);
        }
        if tables.handle_taken_by_other(handle, id) {
            return Err(ServiceError::conflict(HANDLE_TAKEN));
        }

        if let Some(stored) = tables.profiles.get_mut(&id) {
            stored.handle = handle.to_string();
            stored.input = input.clone();
        }

        Ok(tables.profile(id))
    }

    async fn toggle_follow(&self, follower: Uuid, profile: Uuid) -> ServiceResult<FollowState> {
        let mut tables = self.tables.write().await;

        if !tables.profiles.contains_key(&profile) {
            return Err(ServiceError::not_found(PROFILE_NOT_FOUND));
        }
        if !tables.accounts.contains_key(&follower) {
            return Err(ServiceError::not_found(ACCOUNT_NOT_FOUND));
        }

        let before = tables.follows.len();
        tables
            .follows
            .retain(|edge| *edge != (follower, profile));

        if tables.follows.len() < before {
            Ok(FollowState::NotFollowing)
        } else {
            tables.follows.push((follower, profile));
            Ok(FollowState::Following)
        }
    }

    async fn delete_profile(&self, id: Uuid) -> ServiceResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.profiles.remove(&id).is_none() {
            return Ok(false);
        }
        tables.follows.retain(|(_, profile)| *profile != id);

        Ok(true)
    }
}
