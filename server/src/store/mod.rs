//! Persistence for accounts, profiles and follow edges.
//!
//! Follow relationships are stored once, as `(follower account, followed profile)`
//! edges. Both `Profile::followers` and `Profile::following` are derived from
//! that edge list whenever a profile is read, so the two sides cannot drift.
//!
//! Every operation that touches more than one record is a single call here and
//! each backend makes it atomic.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceResult;
use crate::model::{Account, FollowState, NewAccount, NewProfile, Profile, ProfileInput};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const EMAIL_IN_USE: &str = "This email is already in use.";
pub const PROFILE_EXISTS: &str = "You already have a profile.";
pub const HANDLE_TAKEN: &str = "This handle is already taken.";
pub const PROFILE_NOT_FOUND: &str = "Profile not found.";
pub const ACCOUNT_NOT_FOUND: &str = "User not found.";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn account_by_id(&self, id: Uuid) -> ServiceResult<Option<Account>>;

    async fn account_by_email(&self, email: &str) -> ServiceResult<Option<Account>>;

    /// Reads an account and its profile (if any) as one consistent snapshot
    async fn account_with_profile(
        &self,
        id: Uuid,
    ) -> ServiceResult<Option<(Account, Option<Profile>)>>;

    /// Fails with Conflict if the email is taken
    async fn insert_account(&self, account: NewAccount) -> ServiceResult<Account>;

    /// Overwrites the account's mutable fields. When `handle` is given and the
    /// account owns a profile, that profile's handle is replaced in the same write.
    ///
    /// Fails with Conflict if the new email or handle belongs to someone else.
    /// Returns false if the account no longer exists.
    async fn save_account(&self, account: &Account, handle: Option<&str>) -> ServiceResult<bool>;

    /// Removes the account, its profile, and every follow edge touching either
    async fn delete_account(&self, id: Uuid) -> ServiceResult<bool>;

    async fn profile_by_id(&self, id: Uuid) -> ServiceResult<Option<Profile>>;

    async fn profile_by_handle(&self, handle: &str) -> ServiceResult<Option<Profile>>;

    /// Creates the owner's profile with `id == owner`, which also links it to the account.
    ///
    /// Fails with Conflict if the owner already has a profile or the handle is taken.
    async fn insert_profile(&self, profile: NewProfile) -> ServiceResult<Profile>;

    /// Replaces the handle, links and biography. Returns None if the profile is gone.
    async fn update_profile(
        &self,
        id: Uuid,
        handle: &str,
        input: &ProfileInput,
    ) -> ServiceResult<Option<Profile>>;

    /// Flips the follow edge from `follower` to `profile` and reports the new state.
    ///
    /// Fails with NotFound if the profile (or the follower's account) does not exist.
    async fn toggle_follow(&self, follower: Uuid, profile: Uuid) -> ServiceResult<FollowState>;

    /// Removes the profile and every edge pointing at it
    async fn delete_profile(&self, id: Uuid) -> ServiceResult<bool>;
}
