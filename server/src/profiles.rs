use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::accounts::{fresh_token, ACCOUNT_NOT_FOUND};
use crate::errors::{ServiceError, ServiceResult};
use crate::handle::generate_handle;
use crate::model::{Deleted, NewProfile, Profile, ProfileInput, PublicProfile};
use crate::state::FollowPolicy;
use crate::store::{CredentialStore, PROFILE_EXISTS, PROFILE_NOT_FOUND};
use crate::token::{BearerToken, TokenIssuer};

pub const NO_PROFILE: &str = "You do not have a profile.";
pub const HANDLE_NOT_FOUND: &str = "A profile with this handle has not been found.";
pub const SELF_FOLLOW: &str = "You cannot follow your own profile.";

/// How a follow request names its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileTarget {
    Id(Uuid),
    Handle(String),
}

impl ProfileTarget {
    /// Anything that parses as a UUID is an id, everything else a handle
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => ProfileTarget::Id(id),
            Err(_) => ProfileTarget::Handle(raw.to_string()),
        }
    }
}

impl From<Uuid> for ProfileTarget {
    fn from(id: Uuid) -> Self {
        ProfileTarget::Id(id)
    }
}

/// A profile mutation result paired with the caller's refreshed token
#[derive(Debug, Clone, Serialize)]
pub struct ProfileWithToken {
    pub profile: Profile,
    pub token: BearerToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowOutcome {
    /// The target profile after the toggle
    pub profile: Profile,
    /// Whether the actor follows the target now
    pub following: bool,
    pub token: BearerToken,
}

#[derive(Clone)]
pub struct ProfileManager {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
    policy: FollowPolicy,
}

impl ProfileManager {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenIssuer, policy: FollowPolicy) -> Self {
        Self {
            store,
            tokens,
            policy,
        }
    }

    #[tracing::instrument(skip(self, input), err)]
    pub async fn create(&self, account_id: Uuid, input: ProfileInput) -> ServiceResult<ProfileWithToken> {
        let (account, existing) = self
            .store
            .account_with_profile(account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))?;

        if existing.is_some() {
            return Err(ServiceError::conflict(PROFILE_EXISTS));
        }

        let profile = self
            .store
            .insert_profile(NewProfile {
                owner: account.id,
                handle: generate_handle(&account.first_name, &account.last_name),
                input,
            })
            .await?;

        info!("Created profile {} for account {}", profile.handle, account_id);

        let token = fresh_token(&self.tokens, account_id).await?;
        Ok(ProfileWithToken { profile, token })
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn get_by_handle(&self, handle: &str) -> ServiceResult<PublicProfile> {
        let profile = self
            .store
            .profile_by_handle(handle)
            .await?
            .ok_or_else(|| ServiceError::not_found(HANDLE_NOT_FOUND))?;

        let owner = self
            .store
            .account_by_id(profile.owner)
            .await?
            .ok_or_else(|| ServiceError::not_found(HANDLE_NOT_FOUND))?;

        Ok(PublicProfile {
            id: owner.id,
            first_name: owner.first_name,
            last_name: owner.last_name,
            profile,
        })
    }

    /// Replaces links and biography. The handle is always recomputed from the
    /// owner's current names and never taken from input.
    #[tracing::instrument(skip(self, input), err)]
    pub async fn edit(&self, account_id: Uuid, input: ProfileInput) -> ServiceResult<ProfileWithToken> {
        let (account, existing) = self
            .store
            .account_with_profile(account_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ACCOUNT_NOT_FOUND))?;

        if existing.is_none() {
            return Err(ServiceError::not_found(NO_PROFILE));
        }

        let handle = generate_handle(&account.first_name, &account.last_name);
        let profile = self
            .store
            .update_profile(account_id, &handle, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found(NO_PROFILE))?;

        info!("Edited profile {}", profile.handle);

        let token = fresh_token(&self.tokens, account_id).await?;
        Ok(ProfileWithToken { profile, token })
    }

    /// Toggles the actor's follow of the target: following becomes not-following
    /// and the other way round.
    #[tracing::instrument(skip(self), err)]
    pub async fn follow(&self, actor_id: Uuid, target: ProfileTarget) -> ServiceResult<FollowOutcome> {
        let target = match target {
            ProfileTarget::Id(id) => self.store.profile_by_id(id).await?,
            ProfileTarget::Handle(handle) => self.store.profile_by_handle(&handle).await?,
        }
        .ok_or_else(|| ServiceError::not_found(PROFILE_NOT_FOUND))?;

        if target.owner == actor_id && !self.policy.allow_self_follow {
            return Err(ServiceError::InvalidOperation(SELF_FOLLOW.to_string()));
        }

        let state = self.store.toggle_follow(actor_id, target.id).await?;

        // Re-read so the response reflects the committed edge, not our guess
        let profile = self
            .store
            .profile_by_id(target.id)
            .await?
            .ok_or_else(|| ServiceError::not_found(PROFILE_NOT_FOUND))?;

        let token = fresh_token(&self.tokens, actor_id).await?;

        Ok(FollowOutcome {
            profile,
            following: state.is_following(),
            token,
        })
    }

    /// Deletes the caller's profile and every follow edge pointing at it
    #[tracing::instrument(skip(self), err)]
    pub async fn delete(&self, account_id: Uuid) -> ServiceResult<Deleted> {
        if !self.store.delete_profile(account_id).await? {
            return Err(ServiceError::not_found(NO_PROFILE));
        }

        info!("Deleted profile of account {}", account_id);
        Ok(Deleted::now())
    }
}
